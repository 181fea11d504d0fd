//! In-memory lock implementation.

use std::sync::{Arc, Weak};
use std::time::Duration;

use glock_core::error::{LockError, LockResult};
use glock_core::info::LockInfo;
use glock_core::keys;
use glock_core::traits::Lock;
use glock_core::ttl;
use tracing::{debug, instrument, warn};

use crate::client::ClientShared;
use crate::store::MemoryStore;

/// A lock kept in a [`MemoryStore`], with the same key layout as the Redis backend.
#[derive(Debug)]
pub struct MemoryLock {
    name: String,
    key: String,
    data_key: String,
    ttl: Duration,
    data: String,
    client: Weak<ClientShared>,
}

impl MemoryLock {
    pub(crate) fn new(name: String, client: &Arc<ClientShared>) -> Self {
        let namespace = client.namespace();
        Self {
            key: keys::owner_key(namespace, &name),
            data_key: keys::data_key(namespace, &name),
            name,
            ttl: Duration::ZERO,
            data: String::new(),
            client: Arc::downgrade(client),
        }
    }

    /// Returns the owner key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the data key.
    pub fn data_key(&self) -> &str {
        &self.data_key
    }

    fn session(&self) -> LockResult<(MemoryStore, String)> {
        let shared = self.client.upgrade().ok_or(LockError::NotConnected)?;
        Ok((shared.connection()?, shared.id()))
    }
}

impl Lock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    fn data(&self) -> &str {
        &self.data
    }

    fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "memory"))]
    async fn acquire(&mut self, ttl: Duration) -> LockResult<()> {
        ttl::to_millis(ttl)?;
        let (store, id) = self.session()?;
        self.ttl = ttl;

        if !store
            .set_if_absent(&self.key, &id, ttl)
            .map_err(LockError::store)?
        {
            debug!("lock held by another client");
            return Err(LockError::HeldByOtherClient(self.name.clone()));
        }
        if let Err(e) = store.set(&self.data_key, &self.data) {
            if let Err(rollback) = store.release_if_owner(&self.key, &self.data_key, &id) {
                warn!(error = %rollback, "failed to roll back owner key; it will expire");
            }
            return Err(LockError::store(e));
        }

        debug!("lock acquired");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "memory"))]
    async fn release(&self) -> LockResult<()> {
        let (store, id) = self.session()?;
        if !store
            .release_if_owner(&self.key, &self.data_key, &id)
            .map_err(LockError::store)?
        {
            return Err(LockError::NotOwned(self.name.clone()));
        }
        debug!("lock released");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "memory"))]
    async fn refresh(&self) -> LockResult<()> {
        ttl::to_millis(self.ttl)?;
        let (store, id) = self.session()?;
        if !store
            .refresh_if_owner(&self.key, &self.data_key, &id, self.ttl, &self.data)
            .map_err(LockError::store)?
        {
            return Err(LockError::NotOwned(self.name.clone()));
        }
        debug!("lock refreshed");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "memory"))]
    async fn refresh_ttl(&mut self, ttl: Duration) -> LockResult<()> {
        self.ttl = ttl;
        self.refresh().await
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "memory"))]
    async fn info(&self) -> LockResult<LockInfo> {
        let (store, _) = self.session()?;
        let snapshot = store
            .snapshot(&self.key, &self.data_key)
            .map_err(LockError::store)?;
        if snapshot.owner.is_none() {
            return Ok(LockInfo {
                data: snapshot.data,
                ..LockInfo::unacquired(&self.name)
            });
        }
        Ok(LockInfo::from_parts(
            &self.name,
            snapshot.owner,
            snapshot.pttl,
            snapshot.data,
        ))
    }
}
