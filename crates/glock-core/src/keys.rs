//! Store key layout shared by every backend.

/// Namespace applied when a client is configured without one.
pub const DEFAULT_NAMESPACE: &str = "glock";

/// Returns `namespace` unless it is empty, in which case [`DEFAULT_NAMESPACE`].
pub fn namespace_or_default(namespace: Option<String>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => DEFAULT_NAMESPACE.to_string(),
    }
}

/// Key holding the owner's client ID: `<namespace>:<name>`.
pub fn owner_key(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}

/// Key holding the lock payload: `<namespace>:<name>:data`.
pub fn data_key(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}:data")
}
