//! In-memory lock client implementation.

use std::sync::{Arc, PoisonError, RwLock};

use glock_core::error::{LockError, LockResult};
use glock_core::keys;
use glock_core::traits::LockClient;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::lock::MemoryLock;
use crate::store::MemoryStore;

/// Builder for in-memory lock clients.
pub struct MemoryLockClientBuilder {
    store: MemoryStore,
    client_id: Option<String>,
    namespace: Option<String>,
}

impl MemoryLockClientBuilder {
    /// Creates a builder for clients of `store`.
    pub fn new(store: MemoryStore) -> Self {
        Self {
            store,
            client_id: None,
            namespace: None,
        }
    }

    /// Sets the client ID. A random UUID is generated when unset or empty.
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets the key namespace. Defaults to `glock`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Builds the client and connects it to the store.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Connection` if the store is unavailable.
    pub async fn build(self) -> LockResult<MemoryLockClient> {
        let client_id = match self.client_id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };
        let client = MemoryLockClient {
            store: self.store,
            shared: Arc::new(ClientShared::new(
                client_id,
                keys::namespace_or_default(self.namespace),
            )),
        };
        client.reconnect().await?;
        Ok(client)
    }
}

/// State shared between a client and the locks it created.
#[derive(Debug)]
pub(crate) struct ClientShared {
    id: RwLock<String>,
    namespace: String,
    connection: RwLock<Option<MemoryStore>>,
}

impl ClientShared {
    fn new(id: String, namespace: String) -> Self {
        Self {
            id: RwLock::new(id),
            namespace,
            connection: RwLock::new(None),
        }
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn id(&self) -> String {
        self.id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn connection(&self) -> LockResult<MemoryStore> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LockError::NotConnected)
    }

    fn replace_connection(&self, store: Option<MemoryStore>) -> Option<MemoryStore> {
        let mut slot = self.connection.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, store)
    }
}

/// Client for locks kept in a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryLockClient {
    store: MemoryStore,
    shared: Arc<ClientShared>,
}

impl MemoryLockClient {
    /// Returns a new builder for clients of `store`.
    pub fn builder(store: MemoryStore) -> MemoryLockClientBuilder {
        MemoryLockClientBuilder::new(store)
    }

    /// Creates a connected client with a random ID and the default namespace.
    pub async fn new(store: MemoryStore) -> LockResult<Self> {
        Self::builder(store).build().await
    }

    /// Returns `true` if the client currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.shared.connection().is_ok()
    }
}

impl LockClient for MemoryLockClient {
    type Lock = MemoryLock;

    fn clone_disconnected(&self) -> Self {
        Self {
            store: self.store.clone(),
            shared: Arc::new(ClientShared::new(
                self.shared.id(),
                self.shared.namespace.clone(),
            )),
        }
    }

    #[instrument(skip(self), fields(client.namespace = %self.shared.namespace, backend = "memory"))]
    async fn close(&self) {
        if self.shared.replace_connection(None).is_some() {
            debug!("connection closed");
        }
    }

    #[instrument(skip(self), fields(client.namespace = %self.shared.namespace, backend = "memory"))]
    async fn reconnect(&self) -> LockResult<()> {
        self.close().await;
        self.store.ping().map_err(LockError::connection)?;
        self.shared.replace_connection(Some(self.store.clone()));
        debug!("connected to memory store");
        Ok(())
    }

    fn id(&self) -> String {
        self.shared.id()
    }

    fn set_id(&self, id: impl Into<String>) {
        *self.shared.id.write().unwrap_or_else(PoisonError::into_inner) = id.into();
    }

    fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    fn new_lock(&self, name: &str) -> Self::Lock {
        MemoryLock::new(name.to_string(), &self.shared)
    }
}
