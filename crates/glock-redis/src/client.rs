//! Redis lock client implementation.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use glock_core::error::{LockError, LockResult};
use glock_core::keys;
use glock_core::traits::LockClient;
use fred::prelude::*;
use fred::types::CustomCommand;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::lock::RedisLock;

/// Server used when neither a URL nor a config is given.
pub const DEFAULT_URL: &str = "redis://localhost:6379";

/// Builds the `fred` client for a connection attempt.
///
/// Receives the resolved server config and the optional dial parameters. The
/// returned client must not be connected yet.
pub type ConnectFn = Arc<
    dyn Fn(RedisConfig, Option<PerformanceConfig>, Option<ConnectionConfig>) -> RedisClient
        + Send
        + Sync,
>;

/// Builder for Redis lock client configuration.
#[derive(Default)]
pub struct RedisLockClientBuilder {
    url: Option<String>,
    config: Option<RedisConfig>,
    client_id: Option<String>,
    namespace: Option<String>,
    performance: Option<PerformanceConfig>,
    connection: Option<ConnectionConfig>,
    connect_fn: Option<ConnectFn>,
}

impl RedisLockClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from environment variables.
    ///
    /// Reads `REDIS_URL`, `GLOCK_NAMESPACE` and `GLOCK_CLIENT_ID`; unset variables
    /// keep their defaults.
    pub fn from_env() -> Self {
        let mut builder = Self::new();
        if let Ok(url) = std::env::var("REDIS_URL") {
            builder = builder.url(url);
        }
        if let Ok(namespace) = std::env::var("GLOCK_NAMESPACE") {
            builder = builder.namespace(namespace);
        }
        if let Ok(id) = std::env::var("GLOCK_CLIENT_ID") {
            builder = builder.client_id(id);
        }
        builder
    }

    /// Sets the Redis server URL.
    ///
    /// The scheme selects the transport (`redis://` for TCP, `rediss://` for TLS
    /// when `fred` is built with a TLS feature).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Uses a pre-built server config. Takes precedence over [`url`](Self::url).
    pub fn config(mut self, config: RedisConfig) -> Self {
        self.config = Some(config);
        self
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

    /// Sets command-level tuning such as the default command timeout.
    pub fn performance(mut self, config: PerformanceConfig) -> Self {
        self.performance = Some(config);
        self
    }

    /// Sets connection-level tuning such as the connection timeout.
    pub fn connection(mut self, config: ConnectionConfig) -> Self {
        self.connection = Some(config);
        self
    }

    /// Replaces the function that constructs the `fred` client.
    pub fn connect_with<F>(mut self, connect: F) -> Self
    where
        F: Fn(RedisConfig, Option<PerformanceConfig>, Option<ConnectionConfig>) -> RedisClient
            + Send
            + Sync
            + 'static,
    {
        self.connect_fn = Some(Arc::new(connect));
        self
    }

    /// Builds the client and connects it.
    ///
    /// # Errors
    ///
    /// Returns `LockError::Connection` if the URL is invalid, the server is
    /// unreachable, or it does not answer `PING`.
    pub async fn build(self) -> LockResult<RedisLockClient> {
        let config = match (self.config, self.url) {
            (Some(config), _) => config,
            (None, url) => {
                let url = url.unwrap_or_else(|| DEFAULT_URL.to_string());
                RedisConfig::from_url(&url).map_err(|e| {
                    LockError::connection(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("invalid Redis URL {url:?}: {e}"),
                    ))
                })?
            }
        };

        let client_id = match self.client_id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };

        let options = ClientOptions {
            config,
            performance: self.performance,
            connection: self.connection,
            connect_fn: self.connect_fn.unwrap_or_else(|| {
                Arc::new(|config, performance, connection| {
                    RedisClient::new(config, performance, connection, None)
                })
            }),
        };

        let client = RedisLockClient {
            options: Arc::new(options),
            shared: Arc::new(ClientShared::new(
                client_id,
                keys::namespace_or_default(self.namespace),
            )),
        };
        client.reconnect().await?;
        Ok(client)
    }
}

/// Configuration needed to (re)open a connection.
struct ClientOptions {
    config: RedisConfig,
    performance: Option<PerformanceConfig>,
    connection: Option<ConnectionConfig>,
    connect_fn: ConnectFn,
}

/// State shared between a client and the locks it created.
pub(crate) struct ClientShared {
    id: RwLock<String>,
    namespace: String,
    connection: RwLock<Option<RedisClient>>,
}

impl ClientShared {
    pub(crate) fn new(id: String, namespace: String) -> Self {
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

    /// Returns the live connection.
    pub(crate) fn connection(&self) -> LockResult<RedisClient> {
        self.connection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LockError::NotConnected)
    }

    fn replace_connection(&self, client: Option<RedisClient>) -> Option<RedisClient> {
        let mut slot = self.connection.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, client)
    }
}

/// Client for Redis-based locks.
///
/// Holds one connection, the client ID used as the ownership token, and the
/// key namespace.
///
/// # Example
///
/// ```rust,no_run
/// use glock_core::prelude::*;
/// use glock_redis::RedisLockClient;
/// use std::time::Duration;
///
/// # async fn run() -> LockResult<()> {
/// let client = RedisLockClient::builder()
///     .url("redis://localhost:6379")
///     .namespace("billing")
///     .build()
///     .await?;
///
/// let mut lock = client.new_lock("invoice-run");
/// lock.acquire(Duration::from_secs(10)).await?;
/// lock.release().await?;
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct RedisLockClient {
    options: Arc<ClientOptions>,
    shared: Arc<ClientShared>,
}

impl RedisLockClient {
    /// Returns a new builder for configuring the client.
    pub fn builder() -> RedisLockClientBuilder {
        RedisLockClientBuilder::new()
    }

    /// Creates a client for the specified Redis URL.
    pub async fn new(url: impl Into<String>) -> LockResult<Self> {
        Self::builder().url(url).build().await
    }

    /// Returns `true` if the client currently holds a connection.
    pub fn is_connected(&self) -> bool {
        self.shared.connection().is_ok()
    }

    async fn ping(client: &RedisClient) -> Result<(), RedisError> {
        let cmd = CustomCommand::new_static("PING", None, false);
        let _: RedisValue = client.custom(cmd, Vec::<RedisValue>::new()).await?;
        Ok(())
    }
}

impl fmt::Debug for RedisLockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisLockClient")
            .field("id", &self.shared.id())
            .field("namespace", &self.shared.namespace)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl LockClient for RedisLockClient {
    type Lock = RedisLock;

    fn clone_disconnected(&self) -> Self {
        Self {
            options: self.options.clone(),
            shared: Arc::new(ClientShared::new(
                self.shared.id(),
                self.shared.namespace.clone(),
            )),
        }
    }

    #[instrument(skip(self), fields(client.namespace = %self.shared.namespace, backend = "redis"))]
    async fn close(&self) {
        let Some(client) = self.shared.replace_connection(None) else {
            return;
        };
        if let Err(e) = client.quit().await {
            warn!(error = %e, "error while closing Redis connection");
        }
        debug!("connection closed");
    }

    #[instrument(skip(self), fields(client.namespace = %self.shared.namespace, backend = "redis"))]
    async fn reconnect(&self) -> LockResult<()> {
        self.close().await;

        let options = &self.options;
        let client = (options.connect_fn)(
            options.config.clone(),
            options.performance.clone(),
            options.connection.clone(),
        );
        client.connect();
        client.wait_for_connect().await.map_err(LockError::connection)?;

        if let Err(e) = Self::ping(&client).await {
            let _ = client.quit().await;
            return Err(LockError::connection(e));
        }

        self.shared.replace_connection(Some(client));
        debug!("connected to Redis");
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
        RedisLock::new(name.to_string(), &self.shared)
    }
}
