//! Core traits and types for glock distributed locks.

pub mod error;
pub mod info;
pub mod keys;
pub mod prelude;
pub mod traits;
pub mod ttl;

pub use error::{LockError, LockResult};
pub use prelude::*;
