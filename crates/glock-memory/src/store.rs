//! Shared in-memory key-value store with per-key expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// Errors raised by [`MemoryStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// The store has been marked unavailable with [`MemoryStore::set_available`].
    #[error("memory store is unavailable")]
    Unavailable,

    /// Plain writes are failing, see [`MemoryStore::set_write_failures`].
    #[error("memory store rejected the write")]
    WriteRejected,
}

/// Longest lease the store records. Longer leases are cut down to it.
pub const MAX_LEASE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug)]
struct StoreInner {
    entries: Mutex<HashMap<String, Entry>>,
    available: AtomicBool,
    failing_writes: AtomicBool,
    operations: AtomicU64,
}

/// Raw values read by the info snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) owner: Option<String>,
    /// Remaining lease in milliseconds, `-2` if the key is missing, `-1` if it
    /// never expires.
    pub(crate) pttl: i64,
    pub(crate) data: Option<String>,
}

/// A key-value store shared by every client built on it.
///
/// Cloning yields another handle to the same store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                entries: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                failing_writes: AtomicBool::new(false),
                operations: AtomicU64::new(0),
            }),
        }
    }

    /// Marks the store reachable or unreachable.
    ///
    /// While unavailable every operation, including connection probes, fails
    /// with [`MemoryStoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Returns whether the store accepts operations.
    pub fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Makes plain (unconditional) writes fail with
    /// [`MemoryStoreError::WriteRejected`] while `failing` is set.
    ///
    /// Conditional and scripted operations are unaffected, so a lock's owner
    /// key can still be taken and rolled back while its payload write fails.
    pub fn set_write_failures(&self, failing: bool) {
        self.inner.failing_writes.store(failing, Ordering::SeqCst);
    }

    /// Number of operations attempted against the store so far.
    pub fn operation_count(&self) -> u64 {
        self.inner.operations.load(Ordering::SeqCst)
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock_entries();
        entries.retain(|_, entry| entry.is_live(now));
        entries.len()
    }

    /// Returns `true` if no live keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the operation, then locks the entries and drops every expired
    /// one if the store is available.
    fn begin(
        &self,
        now: Instant,
    ) -> Result<MutexGuard<'_, HashMap<String, Entry>>, MemoryStoreError> {
        self.inner.operations.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(MemoryStoreError::Unavailable);
        }
        let mut entries = self.lock_entries();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries)
    }

    fn deadline(now: Instant, ttl: Duration) -> Instant {
        now + ttl.min(MAX_LEASE)
    }

    pub(crate) fn ping(&self) -> Result<(), MemoryStoreError> {
        self.begin(Instant::now()).map(drop)
    }

    /// Sets `key` to `value` with a lease of `ttl` if no live value exists.
    pub(crate) fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, MemoryStoreError> {
        let now = Instant::now();
        let mut entries = self.begin(now)?;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Self::deadline(now, ttl)),
            },
        );
        Ok(true)
    }

    /// Sets `key` to `value` without expiry.
    pub(crate) fn set(&self, key: &str, value: &str) -> Result<(), MemoryStoreError> {
        let mut entries = self.begin(Instant::now())?;
        if self.inner.failing_writes.load(Ordering::SeqCst) {
            return Err(MemoryStoreError::WriteRejected);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    /// Deletes both keys if `owner_key` holds `id`.
    pub(crate) fn release_if_owner(
        &self,
        owner_key: &str,
        data_key: &str,
        id: &str,
    ) -> Result<bool, MemoryStoreError> {
        let mut entries = self.begin(Instant::now())?;
        if entries.get(owner_key).is_none_or(|entry| entry.value != id) {
            return Ok(false);
        }
        entries.remove(owner_key);
        entries.remove(data_key);
        Ok(true)
    }

    /// Re-arms `owner_key` for `ttl` and overwrites `data_key` if `owner_key` holds `id`.
    pub(crate) fn refresh_if_owner(
        &self,
        owner_key: &str,
        data_key: &str,
        id: &str,
        ttl: Duration,
        data: &str,
    ) -> Result<bool, MemoryStoreError> {
        let now = Instant::now();
        let mut entries = self.begin(now)?;
        if entries.get(owner_key).is_none_or(|entry| entry.value != id) {
            return Ok(false);
        }
        entries.insert(
            owner_key.to_string(),
            Entry {
                value: id.to_string(),
                expires_at: Some(Self::deadline(now, ttl)),
            },
        );
        entries.insert(
            data_key.to_string(),
            Entry {
                value: data.to_string(),
                expires_at: None,
            },
        );
        Ok(true)
    }

    /// Reads owner, remaining lease and payload under one lock.
    pub(crate) fn snapshot(
        &self,
        owner_key: &str,
        data_key: &str,
    ) -> Result<Snapshot, MemoryStoreError> {
        let now = Instant::now();
        let mut entries = self.begin(now)?;

        let (owner, pttl) = match entries.get(owner_key) {
            None => (None, -2),
            Some(entry) => {
                let pttl = match entry.expires_at {
                    None => -1,
                    Some(at) => {
                        i64::try_from(at.saturating_duration_since(now).as_millis())
                            .unwrap_or(i64::MAX)
                    }
                };
                (Some(entry.value.clone()), pttl)
            }
        };
        let data = entries.get(data_key).map(|entry| entry.value.clone());

        Ok(Snapshot { owner, pttl, data })
    }
}
