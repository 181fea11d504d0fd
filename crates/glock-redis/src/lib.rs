//! Redis backend for glock distributed locks.
//!
//! Mutual exclusion rests on a single `SET key id PX ttl NX`; release and
//! refresh run as Lua scripts so the ownership check and the mutation are one
//! atomic step on the server.

pub mod client;
pub mod lock;
pub mod scripts;

pub use client::{ConnectFn, DEFAULT_URL, RedisLockClient, RedisLockClientBuilder};
pub use lock::RedisLock;
