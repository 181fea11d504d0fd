//! Distributed mutual-exclusion locks for Rust.
//!
//! Independent processes coordinate exclusive access to a named resource
//! through a shared key-value store. There is no lock manager process: the
//! store arbitrates with an atomic set-if-absent and with scripted
//! compare-and-delete / compare-and-refresh operations.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use glock::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RedisLockClient::builder()
//!         .url("redis://localhost:6379")
//!         .build()
//!         .await?;
//!
//!     // Creating a lock does not touch the store
//!     let mut lock = client.new_lock("my-resource");
//!     lock.set_data("owned by the nightly job");
//!
//!     // Non-blocking: fails with HeldByOtherClient instead of waiting
//!     lock.acquire(Duration::from_secs(30)).await?;
//!
//!     // Refresh before the lease runs out to keep holding the lock
//!     lock.refresh().await?;
//!
//!     lock.release().await?;
//!     client.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! ## Redis Backend
//!
//! Keys are `<namespace>:<name>` (owner, with the lease as expiry) and
//! `<namespace>:<name>:data` (payload). Release, refresh and info run as Lua
//! scripts.
//!
//! ## Memory Backend
//!
//! An in-process store with the same contract, for tests and single-process
//! use. Clients built on the same [`MemoryStore`] contend for the same locks.
//!
//! ```rust,no_run
//! use glock::*;
//!
//! # async fn run() -> LockResult<()> {
//! let store = MemoryStore::new();
//! let a = MemoryLockClient::builder(store.clone()).client_id("a1").build().await?;
//! let b = MemoryLockClient::builder(store).client_id("b2").build().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Crate Organization
//!
//! This is a meta-crate that re-exports types from:
//! - `glock-core`: Core traits and types
//! - `glock-redis`: Redis backend (feature `redis`)
//! - `glock-memory`: In-memory backend (feature `memory`)

// Re-export core types and traits
pub use glock_core::*;

// Re-export redis backend
#[cfg(feature = "redis")]
pub use glock_redis::{RedisLock, RedisLockClient, RedisLockClientBuilder};

// Re-export memory backend
#[cfg(feature = "memory")]
pub use glock_memory::{MemoryLock, MemoryLockClient, MemoryLockClientBuilder, MemoryStore};
