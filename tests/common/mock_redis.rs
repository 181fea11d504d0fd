//! `fred` mock that answers the commands the Redis backend sends.

use fred::mocks::{MockCommand, Mocks};
use fred::prelude::*;
use glock_redis::scripts::{INFO_SCRIPT, REFRESH_SCRIPT, RELEASE_SCRIPT};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// Mock Redis server holding string keys with optional expiry.
///
/// Handles `PING`, `SET` (with `PX`/`NX`), and `EVAL` of the backend's own
/// scripts, and records the name of every command it receives.
#[derive(Debug, Default)]
pub struct MockRedis {
    entries: Mutex<HashMap<String, Entry>>,
    commands: Mutex<Vec<String>>,
    failing: Mutex<Option<String>>,
    fail_data_writes: AtomicBool,
}

impl MockRedis {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Server config that routes every command to `mock`.
    pub fn config(mock: &Arc<Self>) -> RedisConfig {
        let mocks: Arc<dyn Mocks> = mock.clone();
        RedisConfig {
            mocks: Some(mocks),
            ..Default::default()
        }
    }

    /// Names of the commands received so far.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Makes every later command named `cmd` fail.
    pub fn fail_command(&self, cmd: &str) {
        *self.failing.lock().unwrap() = Some(cmd.to_string());
    }

    /// Makes every later `SET` without `NX` fail, i.e. payload writes.
    pub fn fail_data_writes(&self) {
        self.fail_data_writes.store(true, Ordering::SeqCst);
    }

    /// Returns the stored value of `key`, if live.
    pub fn get(&self, key: &str) -> Option<String> {
        Self::live(&mut self.entries.lock().unwrap(), key)
    }

    fn live(entries: &mut HashMap<String, Entry>, key: &str) -> Option<String> {
        let now = Instant::now();
        if entries
            .get(key)
            .is_some_and(|e| e.expires_at.is_some_and(|at| at <= now))
        {
            entries.remove(key);
        }
        entries.get(key).map(|e| e.value.clone())
    }

    fn set(&self, args: &[String]) -> Result<RedisValue, RedisError> {
        if self.fail_data_writes.load(Ordering::SeqCst) && !args.iter().any(|a| a == "NX") {
            return Err(RedisError::new(RedisErrorKind::IO, "injected data write failure"));
        }
        let mut entries = self.entries.lock().unwrap();
        let (key, value) = (&args[0], &args[1]);
        let mut expires_at = None;
        let mut only_if_absent = false;
        let mut rest = args[2..].iter();
        while let Some(arg) = rest.next() {
            match arg.as_str() {
                "PX" => {
                    let millis: u64 = rest.next().unwrap().parse().unwrap();
                    expires_at = Some(Instant::now() + Duration::from_millis(millis));
                }
                "NX" => only_if_absent = true,
                _ => {}
            }
        }
        if only_if_absent && Self::live(&mut entries, key).is_some() {
            return Ok(RedisValue::Null);
        }
        entries.insert(
            key.clone(),
            Entry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(RedisValue::from("OK"))
    }

    fn eval(&self, args: &[String]) -> RedisValue {
        let mut entries = self.entries.lock().unwrap();
        let script = args[0].as_str();
        let (owner_key, data_key) = (&args[2], &args[3]);
        let argv = &args[4..];

        if script == INFO_SCRIPT {
            let owner = Self::live(&mut entries, owner_key);
            let pttl = match entries.get(owner_key.as_str()) {
                None => -2,
                Some(Entry {
                    expires_at: None, ..
                }) => -1,
                Some(Entry {
                    expires_at: Some(at),
                    ..
                }) => at.saturating_duration_since(Instant::now()).as_millis() as i64,
            };
            let data = Self::live(&mut entries, data_key);
            let to_value = |v: Option<String>| v.map(RedisValue::from).unwrap_or(RedisValue::Null);
            return RedisValue::Array(vec![to_value(owner), pttl.into(), to_value(data)]);
        }

        if Self::live(&mut entries, owner_key).as_ref() != Some(&argv[0]) {
            return 0_i64.into();
        }
        if script == RELEASE_SCRIPT {
            entries.remove(owner_key.as_str());
            entries.remove(data_key.as_str());
        } else if script == REFRESH_SCRIPT {
            let millis: u64 = argv[1].parse().unwrap();
            entries.insert(
                owner_key.clone(),
                Entry {
                    value: argv[0].clone(),
                    expires_at: Some(Instant::now() + Duration::from_millis(millis)),
                },
            );
            entries.insert(
                data_key.clone(),
                Entry {
                    value: argv[2].clone(),
                    expires_at: None,
                },
            );
        } else {
            panic!("unexpected script: {script}");
        }
        1_i64.into()
    }
}

impl Mocks for MockRedis {
    fn process_command(&self, command: MockCommand) -> Result<RedisValue, RedisError> {
        let name = String::from(&*command.cmd);
        self.commands.lock().unwrap().push(name.clone());

        if self.failing.lock().unwrap().as_deref() == Some(name.as_str()) {
            return Err(RedisError::new(RedisErrorKind::IO, "injected failure"));
        }

        let args: Vec<String> = command
            .args
            .iter()
            .map(|arg| arg.as_string().unwrap_or_default())
            .collect();

        match name.as_str() {
            "PING" => Ok(RedisValue::from("PONG")),
            "QUIT" => Ok(RedisValue::from("OK")),
            "SET" => self.set(&args),
            "EVAL" => Ok(self.eval(&args)),
            other => Err(RedisError::new(
                RedisErrorKind::Unknown,
                format!("unsupported command {other}"),
            )),
        }
    }
}
