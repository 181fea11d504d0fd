//! Convenience prelude for glock types.

pub use crate::error::{LockError, LockResult};
pub use crate::info::LockInfo;
pub use crate::keys::DEFAULT_NAMESPACE;
pub use crate::traits::{Lock, LockClient, LockClientExt};
