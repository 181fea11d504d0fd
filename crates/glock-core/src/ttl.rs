//! Lease duration helpers.

use std::time::Duration;

use crate::error::{LockError, LockResult};

/// Smallest lease a lock accepts.
pub const MIN_TTL: Duration = Duration::from_millis(1);

/// Converts a lease duration to whole milliseconds, the granularity the store works in.
///
/// Sub-millisecond remainders are truncated. Durations beyond `i64::MAX`
/// milliseconds are clamped.
pub fn to_millis(ttl: Duration) -> LockResult<i64> {
    if ttl < MIN_TTL {
        return Err(LockError::InvalidTtl(ttl));
    }
    Ok(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

/// Converts a `PTTL`-style reply into a remaining duration.
///
/// Negative replies (`-2` for a missing key, `-1` for a key without expiry)
/// map to zero.
pub fn from_pttl(pttl: i64) -> Duration {
    u64::try_from(pttl).map(Duration::from_millis).unwrap_or(Duration::ZERO)
}
