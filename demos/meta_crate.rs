//! Example: Using the meta-crate (all backends)
//!
//! Run with: `cargo run --example meta_crate`
//!
//! This example shows how to use the meta-crate which re-exports
//! all backend implementations behind the same traits.

use glock::*;
use std::time::Duration;

/// Backend-agnostic guarded section.
async fn guarded<C: LockClient>(label: &str, client: &C) -> LockResult<()> {
    let lock = client.acquire_lock("example", Duration::from_secs(5)).await?;
    println!("{label} lock acquired: {:?}", lock.info().await?);
    lock.release().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    println!("Example: Using glock meta-crate\n");

    println!("=== Memory Backend ===");
    let memory = MemoryLockClient::new(MemoryStore::new()).await?;
    guarded("Memory", &memory).await?;

    // Redis backend example (if available)
    if let Ok(redis_url) = std::env::var("REDIS_URL") {
        println!("\n=== Redis Backend ===");
        match RedisLockClient::new(redis_url).await {
            Ok(redis) => {
                guarded("Redis", &redis).await?;
                redis.close().await;
            }
            Err(e) => println!("Redis unavailable: {e}"),
        }
    }

    println!("\nAll examples completed!");
    Ok(())
}
