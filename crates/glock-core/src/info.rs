//! Point-in-time view of a lock's stored state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Snapshot returned by [`Lock::info`](crate::traits::Lock::info).
///
/// All fields are read from the store in a single atomic step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Lock name as given to `new_lock`.
    pub name: String,
    /// Whether the owner key exists with a positive remaining lease.
    pub acquired: bool,
    /// Client ID of the current holder, if any.
    pub owner: Option<String>,
    /// Remaining lease; zero when not acquired.
    pub ttl: Duration,
    /// Stored payload. Only meaningful while `acquired` is true.
    pub data: Option<String>,
}

impl LockInfo {
    /// Builds a snapshot from raw store replies.
    pub fn from_parts(
        name: impl Into<String>,
        owner: Option<String>,
        pttl: i64,
        data: Option<String>,
    ) -> Self {
        let ttl = crate::ttl::from_pttl(pttl);
        Self {
            name: name.into(),
            acquired: !ttl.is_zero(),
            owner,
            ttl,
            data,
        }
    }

    /// Snapshot of a lock that has no owner key in the store.
    pub fn unacquired(name: impl Into<String>) -> Self {
        Self::from_parts(name, None, -2, None)
    }

    /// Returns `true` if `client_id` is the current holder.
    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.acquired && self.owner.as_deref() == Some(client_id)
    }
}
