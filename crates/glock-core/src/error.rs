//! Error types for lock operations.

use std::time::Duration;
use thiserror::Error;

/// Boxed error produced by a backing store or its client library.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during lock operations.
#[derive(Error, Debug)]
pub enum LockError {
    /// The lease duration is below the one millisecond minimum.
    #[error("invalid ttl {0:?}: must be at least 1ms")]
    InvalidTtl(Duration),

    /// The lock is currently held by another client.
    #[error("lock {0:?} is held by another client")]
    HeldByOtherClient(String),

    /// This client does not own the lock (never acquired, released, or expired).
    #[error("lock {0:?} is not owned by this client")]
    NotOwned(String),

    /// Connecting to the store or probing it failed.
    #[error("connection error: {0}")]
    Connection(#[source] BoxError),

    /// The client has no live connection.
    #[error("client is not connected")]
    NotConnected,

    /// The store failed while executing a command.
    #[error("store error: {0}")]
    Store(#[source] BoxError),
}

impl LockError {
    /// Wraps an error raised while establishing a connection.
    pub fn connection(err: impl Into<BoxError>) -> Self {
        Self::Connection(err.into())
    }

    /// Wraps an error raised by the store on an established connection.
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    /// Returns `true` for errors that describe lock ownership rather than a failure
    /// to talk to the store.
    pub fn is_contention(&self) -> bool {
        matches!(self, Self::HeldByOtherClient(_) | Self::NotOwned(_))
    }
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
