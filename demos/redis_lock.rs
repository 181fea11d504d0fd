//! Example: Using Redis distributed locks
//!
//! Run with: `cargo run --example redis_lock`
//!
//! Requires a Redis server. Set REDIS_URL (and optionally GLOCK_NAMESPACE,
//! GLOCK_CLIENT_ID) or the default `redis://localhost:6379` is used. Set
//! RUST_LOG=glock_redis=debug to see every lock operation.

use glock_core::prelude::*;
use glock_redis::RedisLockClientBuilder;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Connecting to Redis...");
    let client = RedisLockClientBuilder::from_env().build().await?;
    println!("Connected as client {}", client.id());

    // Creating a lock does not touch the store
    let mut lock = client.new_lock("example-resource");
    lock.set_data(r#"{"job":"nightly-report"}"#);

    println!("Acquiring lock with a 5 second lease...");
    match lock.acquire(Duration::from_secs(5)).await {
        Ok(()) => println!("Lock acquired"),
        Err(LockError::HeldByOtherClient(name)) => {
            let info = lock.info().await?;
            println!(
                "{name} is held by {:?} for another {:?}",
                info.owner, info.ttl
            );
            client.close().await;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    // Work longer than the lease, refreshing before it runs out
    for step in 1..=3 {
        tokio::time::sleep(Duration::from_secs(2)).await;
        lock.set_data(format!(r#"{{"job":"nightly-report","step":{step}}}"#));
        lock.refresh().await?;
        println!("Step {step} done, lease refreshed");
    }

    let info = lock.info().await?;
    println!("Lock info: {}", serde_json::to_string_pretty(&info)?);

    lock.release().await?;
    println!("Lock released");

    client.close().await;
    Ok(())
}
