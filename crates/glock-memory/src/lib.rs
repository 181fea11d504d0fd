//! In-process backend for glock distributed locks.
//!
//! [`MemoryStore`] stands in for a shared key-value server: every client built
//! on the same store contends for the same keys. Each operation runs under one
//! mutex, which gives the same atomicity the Redis scripts provide. Lease
//! expiry follows `tokio::time`, so tests can pause and advance the clock.

pub mod client;
pub mod lock;
pub mod store;

pub use client::{MemoryLockClient, MemoryLockClientBuilder};
pub use lock::MemoryLock;
pub use store::{MAX_LEASE, MemoryStore, MemoryStoreError};
