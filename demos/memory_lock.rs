//! Example: Using in-memory locks
//!
//! Run with: `cargo run --example memory_lock`
//!
//! Two clients share one store and contend for the same lock.

use glock_core::prelude::*;
use glock_memory::{MemoryLockClient, MemoryStore};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = MemoryStore::new();
    let a = MemoryLockClient::builder(store.clone()).client_id("a1").build().await?;
    let b = MemoryLockClient::builder(store.clone()).client_id("b2").build().await?;

    let mut lock_a = a.new_lock("job-7");
    let mut lock_b = b.new_lock("job-7");

    lock_a.acquire(Duration::from_millis(500)).await?;
    println!("a1 holds job-7");

    if let Err(e) = lock_b.acquire(Duration::from_secs(1)).await {
        println!("b2 could not acquire: {e}");
    }

    // Let a1's lease lapse without refreshing
    tokio::time::sleep(Duration::from_millis(600)).await;
    lock_b.acquire(Duration::from_secs(1)).await?;
    println!("b2 took over after expiry: {:?}", lock_b.info().await?);

    if let Err(e) = lock_a.release().await {
        println!("a1 can no longer release: {e}");
    }
    lock_b.release().await?;

    println!("{} store operations, {} keys left", store.operation_count(), store.len());
    Ok(())
}
