//! Redis lock implementation.

use std::sync::{Arc, Weak};
use std::time::Duration;

use glock_core::error::{LockError, LockResult};
use glock_core::info::LockInfo;
use glock_core::keys;
use glock_core::traits::Lock;
use glock_core::ttl;
use fred::prelude::*;
use tracing::{debug, instrument, warn};

use crate::client::ClientShared;
use crate::scripts::{self, INFO_SCRIPT, REFRESH_SCRIPT, RELEASE_SCRIPT};

/// Connection and identity captured for one operation.
struct Session {
    client: RedisClient,
    id: String,
}

/// A Redis-based lock.
///
/// The owner key `<namespace>:<name>` holds the owning client's ID with the
/// lease as its expiry; the data key `<namespace>:<name>:data` holds the payload.
pub struct RedisLock {
    name: String,
    key: String,
    data_key: String,
    ttl: Duration,
    data: String,
    client: Weak<ClientShared>,
}

impl RedisLock {
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

    fn session(&self) -> LockResult<Session> {
        let shared = self.client.upgrade().ok_or(LockError::NotConnected)?;
        Ok(Session {
            client: shared.connection()?,
            id: shared.id(),
        })
    }

    async fn run_release(&self, session: &Session) -> Result<bool, RedisError> {
        let released: i64 = scripts::eval(
            &session.client,
            RELEASE_SCRIPT,
            &self.key,
            &self.data_key,
            vec![session.id.as_str().into()],
        )
        .await?;
        Ok(released == 1)
    }
}

/// Reads a bulk string that may be nil. Non-UTF-8 values are a store error.
fn reply_string(field: &str, value: &RedisValue) -> LockResult<Option<String>> {
    match value {
        RedisValue::Null => Ok(None),
        RedisValue::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(|s| Some(s.to_string()))
            .map_err(|e| LockError::store(format!("{field} is not valid UTF-8: {e}"))),
        other => other
            .as_string()
            .map(Some)
            .ok_or_else(|| LockError::store(format!("unexpected {field} reply: {other:?}"))),
    }
}

/// Turns the `{owner, pttl, data}` reply of the info script into a snapshot.
fn parse_info(name: &str, reply: RedisValue) -> LockResult<LockInfo> {
    let values = match reply {
        RedisValue::Array(values) if values.len() == 3 => values,
        RedisValue::Null => return Ok(LockInfo::unacquired(name)),
        other => {
            return Err(LockError::store(format!(
                "unexpected info reply: {other:?}"
            )));
        }
    };

    let owner = reply_string("owner", &values[0])?;
    let pttl = values[1]
        .as_i64()
        .ok_or_else(|| LockError::store(format!("unexpected PTTL reply: {:?}", values[1])))?;
    let data = reply_string("data", &values[2])?;

    if pttl == -2 {
        return Ok(LockInfo {
            data,
            ..LockInfo::unacquired(name)
        });
    }
    Ok(LockInfo::from_parts(name, owner, pttl, data))
}

impl Lock for RedisLock {
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

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "redis"))]
    async fn acquire(&mut self, ttl: Duration) -> LockResult<()> {
        let millis = ttl::to_millis(ttl)?;
        let session = self.session()?;
        self.ttl = ttl;

        // SET NX returns Some("OK") if the key was set, None if it already exists
        let result: Option<String> = session
            .client
            .set(
                self.key.as_str(),
                session.id.as_str(),
                Some(Expiration::PX(millis)),
                Some(SetOptions::NX),
                false,
            )
            .await
            .map_err(LockError::store)?;

        if result.is_none() {
            debug!("lock held by another client");
            return Err(LockError::HeldByOtherClient(self.name.clone()));
        }

        let written: Result<(), RedisError> = session
            .client
            .set(self.data_key.as_str(), self.data.as_str(), None, None, false)
            .await;
        if let Err(e) = written {
            // Give the lock back so a half-written acquisition is never observed as held.
            if let Err(rollback) = self.run_release(&session).await {
                warn!(error = %rollback, "failed to roll back owner key; it will expire");
            }
            return Err(LockError::store(e));
        }

        debug!(ttl_ms = millis, "lock acquired");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "redis"))]
    async fn release(&self) -> LockResult<()> {
        let session = self.session()?;
        if !self.run_release(&session).await.map_err(LockError::store)? {
            debug!("release rejected: not the owner");
            return Err(LockError::NotOwned(self.name.clone()));
        }
        debug!("lock released");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "redis"))]
    async fn refresh(&self) -> LockResult<()> {
        let millis = ttl::to_millis(self.ttl)?;
        let session = self.session()?;

        let refreshed: i64 = scripts::eval(
            &session.client,
            REFRESH_SCRIPT,
            &self.key,
            &self.data_key,
            vec![
                session.id.as_str().into(),
                millis.into(),
                self.data.as_str().into(),
            ],
        )
        .await
        .map_err(LockError::store)?;

        if refreshed != 1 {
            debug!("refresh rejected: not the owner");
            return Err(LockError::NotOwned(self.name.clone()));
        }
        debug!(ttl_ms = millis, "lock refreshed");
        Ok(())
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "redis"))]
    async fn refresh_ttl(&mut self, ttl: Duration) -> LockResult<()> {
        self.ttl = ttl;
        self.refresh().await
    }

    #[instrument(skip(self), fields(lock.name = %self.name, lock.key = %self.key, backend = "redis"))]
    async fn info(&self) -> LockResult<LockInfo> {
        let session = self.session()?;
        let reply: RedisValue = scripts::eval(
            &session.client,
            INFO_SCRIPT,
            &self.key,
            &self.data_key,
            Vec::new(),
        )
        .await
        .map_err(LockError::store)?;
        parse_info(&self.name, reply)
    }
}
