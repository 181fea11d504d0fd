//! Core traits implemented by every lock backend.

use std::future::Future;
use std::time::Duration;

use crate::error::LockResult;
use crate::info::LockInfo;

// ============================================================================
// Lock Trait
// ============================================================================

/// A named, leasable mutual-exclusion lock.
///
/// The lock object itself holds no ownership state: whether it is acquired is
/// decided by the store, keyed by the owning client's ID. The same object can
/// go through any number of acquire/release cycles.
///
/// # Example
///
/// ```rust,ignore
/// let mut lock = client.new_lock("job-7");
/// lock.set_data("worker-3");
/// lock.acquire(Duration::from_secs(5)).await?;
///
/// // Long-running work must refresh before the lease runs out.
/// lock.refresh().await?;
///
/// lock.release().await?;
/// ```
pub trait Lock: Send + Sync {
    /// Returns the lock name.
    fn name(&self) -> &str;

    /// Returns the lease that the next `refresh` will apply.
    fn ttl(&self) -> Duration;

    /// Returns the payload that the next `acquire` or `refresh` will store.
    fn data(&self) -> &str;

    /// Replaces the local payload.
    ///
    /// Nothing is written to the store until the next successful `acquire`
    /// or `refresh`.
    fn set_data(&mut self, data: impl Into<String>);

    /// Acquires the lock for `ttl`, returning immediately.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Lock acquired; `ttl` becomes the lease for later refreshes
    /// * `Err(LockError::InvalidTtl)` - `ttl` is below 1ms (the store is not contacted)
    /// * `Err(LockError::HeldByOtherClient)` - Another client holds the lock
    /// * `Err(LockError::Store)` - The store failed
    fn acquire(&mut self, ttl: Duration) -> impl Future<Output = LockResult<()>> + Send;

    /// Releases the lock if this client owns it.
    ///
    /// Ownership check and deletion happen in one atomic store-side step.
    /// Returns `Err(LockError::NotOwned)` if this client is not the holder,
    /// including after the lease expired.
    fn release(&self) -> impl Future<Output = LockResult<()>> + Send;

    /// Re-arms the lease with the current ttl and stores the current payload.
    ///
    /// Returns `Err(LockError::NotOwned)` if this client is not the holder.
    fn refresh(&self) -> impl Future<Output = LockResult<()>> + Send;

    /// Sets a new ttl, then refreshes with it.
    fn refresh_ttl(&mut self, ttl: Duration) -> impl Future<Output = LockResult<()>> + Send;

    /// Reads owner, remaining lease and payload as one consistent snapshot.
    ///
    /// A lock with no owner key yields an unacquired snapshot, not an error.
    fn info(&self) -> impl Future<Output = LockResult<LockInfo>> + Send;
}

// ============================================================================
// Client Trait
// ============================================================================

/// A session against a backing store, and the factory for its locks.
///
/// The client carries the ID that is written into the store as the ownership
/// token, and the namespace prefixed to every key it creates.
pub trait LockClient: Send + Sync + Sized {
    /// The lock type created by this client.
    type Lock: Lock;

    /// Returns a client with the same configuration and ID but no connection.
    ///
    /// Call [`reconnect`](Self::reconnect) before using it.
    fn clone_disconnected(&self) -> Self;

    /// Closes the connection, if any. Never fails.
    fn close(&self) -> impl Future<Output = ()> + Send;

    /// Replaces the connection with a fresh one and probes it.
    fn reconnect(&self) -> impl Future<Output = LockResult<()>> + Send;

    /// Returns the client ID.
    fn id(&self) -> String;

    /// Replaces the client ID.
    ///
    /// Locks acquired under the previous ID are not transferred: this client can
    /// no longer refresh or release them, and they stay held until they expire.
    fn set_id(&self, id: impl Into<String>);

    /// Returns the key namespace.
    fn namespace(&self) -> &str;

    /// Creates a lock bound to this client. Does not touch the store.
    fn new_lock(&self, name: &str) -> Self::Lock;
}

// ============================================================================
// Convenience Extensions
// ============================================================================

/// Extension trait providing convenience methods for lock clients.
pub trait LockClientExt: LockClient {
    /// Creates a lock by name and acquires it for `ttl`.
    fn acquire_lock(
        &self,
        name: &str,
        ttl: Duration,
    ) -> impl Future<Output = LockResult<Self::Lock>> + Send {
        let mut lock = self.new_lock(name);
        async move {
            lock.acquire(ttl).await?;
            Ok(lock)
        }
    }
}

// Blanket implementation for all LockClients
impl<T: LockClient> LockClientExt for T {}
