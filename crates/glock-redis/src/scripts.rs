//! Lua scripts executed atomically by Redis.
//!
//! Every script takes the owner key as `KEYS[1]` and the data key as `KEYS[2]`.

use fred::prelude::*;
use fred::types::{CustomCommand, FromRedis};

/// Deletes both keys if `ARGV[1]` owns the lock. Returns 1 on success, 0 otherwise.
pub const RELEASE_SCRIPT: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        redis.call('del', KEYS[1])
        redis.call('del', KEYS[2])
        return 1
    end
    return 0
"#;

/// Re-arms the lease to `ARGV[2]` milliseconds and stores payload `ARGV[3]` if
/// `ARGV[1]` owns the lock. Returns 1 on success, 0 otherwise.
pub const REFRESH_SCRIPT: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        redis.call('set', KEYS[1], ARGV[1], 'PX', ARGV[2])
        redis.call('set', KEYS[2], ARGV[3])
        return 1
    end
    return 0
"#;

/// Returns `{owner, pttl, data}` read in one step. Missing keys come back as nil.
pub const INFO_SCRIPT: &str = r#"
    local owner = redis.call('get', KEYS[1])
    local pttl = redis.call('pttl', KEYS[1])
    local data = redis.call('get', KEYS[2])
    return {owner, pttl, data}
"#;

/// Runs `script` with `EVAL` against the owner and data keys.
pub(crate) async fn eval<R: FromRedis>(
    client: &RedisClient,
    script: &'static str,
    owner_key: &str,
    data_key: &str,
    argv: Vec<RedisValue>,
) -> Result<R, RedisError> {
    let mut args: Vec<RedisValue> = Vec::with_capacity(4 + argv.len());
    args.push(script.into());
    args.push(2_i64.into()); // numkeys
    args.push(owner_key.into());
    args.push(data_key.into());
    args.extend(argv);

    let cmd = CustomCommand::new_static("EVAL", None, false);
    client.custom(cmd, args).await
}
