//! Behaviour every backend must share, written against the core traits.

use glock_core::error::LockError;
use glock_core::traits::{Lock, LockClient, LockClientExt};
use std::time::Duration;

pub const TTL: Duration = Duration::from_secs(5);

/// Two clients with different IDs cannot hold the same lock.
pub async fn acquire_is_exclusive<C: LockClient>(a: &C, b: &C, name: &str) {
    let mut lock_a = a.new_lock(name);
    let mut lock_b = b.new_lock(name);

    lock_a.acquire(TTL).await.unwrap();

    let result = lock_b.acquire(TTL).await;
    assert!(
        matches!(result, Err(LockError::HeldByOtherClient(ref n)) if n == name),
        "expected HeldByOtherClient, got {result:?}"
    );

    // The holder itself cannot re-acquire without releasing either
    assert!(matches!(
        lock_a.acquire(TTL).await,
        Err(LockError::HeldByOtherClient(_))
    ));

    lock_a.release().await.unwrap();
    lock_b.acquire(TTL).await.unwrap();
    lock_b.release().await.unwrap();
}

/// Release by the owner succeeds exactly once.
pub async fn release_succeeds_once<C: LockClient>(client: &C, name: &str) {
    let lock = client.acquire_lock(name, TTL).await.unwrap();

    lock.release().await.unwrap();
    let second = lock.release().await;
    assert!(
        matches!(second, Err(LockError::NotOwned(_))),
        "expected NotOwned, got {second:?}"
    );

    let info = lock.info().await.unwrap();
    assert!(!info.acquired);
    assert_eq!(info.data, None);
}

/// Release and refresh of a lock that was never acquired are rejected.
pub async fn unacquired_lock_is_not_owned<C: LockClient>(client: &C, name: &str) {
    let mut lock = client.new_lock(name);
    assert!(matches!(lock.release().await, Err(LockError::NotOwned(_))));
    assert!(matches!(
        lock.refresh_ttl(TTL).await,
        Err(LockError::NotOwned(_))
    ));

    let info = lock.info().await.unwrap();
    assert_eq!(info.name, name);
    assert!(!info.acquired);
    assert_eq!(info.owner, None);
    assert_eq!(info.ttl, Duration::ZERO);
}

/// A non-owner's refresh and release leave the holder's lease and payload alone.
pub async fn non_owner_cannot_touch_lock<C: LockClient>(a: &C, b: &C, name: &str) {
    let mut lock_a = a.new_lock(name);
    lock_a.set_data("from-a");
    lock_a.acquire(TTL).await.unwrap();

    let mut lock_b = b.new_lock(name);
    lock_b.set_data("from-b");
    assert!(matches!(
        lock_b.refresh_ttl(Duration::from_secs(60)).await,
        Err(LockError::NotOwned(_))
    ));
    assert!(matches!(lock_b.release().await, Err(LockError::NotOwned(_))));

    let info = lock_b.info().await.unwrap();
    assert!(info.is_owned_by(&a.id()));
    assert!(info.ttl <= TTL);
    assert_eq!(info.data.as_deref(), Some("from-a"));

    lock_a.release().await.unwrap();
}

/// Payload changes reach the store only on acquire or refresh.
pub async fn data_is_written_on_acquire_and_refresh<C: LockClient>(client: &C, name: &str) {
    let mut lock = client.new_lock(name);
    lock.set_data("first");
    lock.acquire(TTL).await.unwrap();
    assert_eq!(lock.info().await.unwrap().data.as_deref(), Some("first"));

    lock.set_data("second");
    assert_eq!(lock.data(), "second");
    assert_eq!(lock.info().await.unwrap().data.as_deref(), Some("first"));

    lock.refresh().await.unwrap();
    let info = lock.info().await.unwrap();
    assert_eq!(info.data.as_deref(), Some("second"));
    assert!(info.acquired);

    lock.release().await.unwrap();
}

/// Info right after acquire reports the holder and a lease within (0, ttl].
pub async fn info_reports_holder<C: LockClient>(client: &C, name: &str) {
    let lock = client.acquire_lock(name, TTL).await.unwrap();

    let info = lock.info().await.unwrap();
    assert_eq!(info.name, name);
    assert!(info.acquired);
    assert_eq!(info.owner, Some(client.id()));
    assert!(info.ttl > Duration::ZERO && info.ttl <= TTL, "ttl was {:?}", info.ttl);
    assert_eq!(info.data.as_deref(), Some(""));

    lock.release().await.unwrap();
}

/// Sub-millisecond leases are rejected before the store is contacted.
pub async fn invalid_ttl_is_rejected<C: LockClient>(client: &C, name: &str) {
    let mut lock = client.new_lock(name);
    assert!(matches!(
        lock.acquire(Duration::ZERO).await,
        Err(LockError::InvalidTtl(_))
    ));
    assert!(matches!(
        lock.acquire(Duration::from_micros(500)).await,
        Err(LockError::InvalidTtl(_))
    ));
    assert!(matches!(lock.refresh().await, Err(LockError::InvalidTtl(_))));
    assert!(matches!(
        lock.refresh_ttl(Duration::ZERO).await,
        Err(LockError::InvalidTtl(_))
    ));
    assert!(!lock.info().await.unwrap().acquired);
}

/// Client "a1" and client "b2" contend for "job-7".
pub async fn job_scenario<C: LockClient>(a: &C, b: &C) {
    assert_eq!(a.id(), "a1");
    assert_eq!(b.id(), "b2");

    let mut lock_a = a.new_lock("job-7");
    let mut lock_b = b.new_lock("job-7");

    lock_a.acquire(Duration::from_millis(5000)).await.unwrap();
    assert!(matches!(
        lock_b.acquire(Duration::from_millis(1000)).await,
        Err(LockError::HeldByOtherClient(_))
    ));

    lock_a.refresh().await.unwrap();
    let info = lock_a.info().await.unwrap();
    assert_eq!(info.owner.as_deref(), Some("a1"));
    assert!(info.ttl <= Duration::from_millis(5000));

    lock_a.release().await.unwrap();
    lock_b.acquire(Duration::from_millis(1000)).await.unwrap();
    assert_eq!(lock_b.info().await.unwrap().owner.as_deref(), Some("b2"));
    lock_b.release().await.unwrap();
}

/// A disconnected clone keeps the identity and works after reconnecting.
pub async fn clone_shares_identity<C: LockClient>(client: &C, name: &str) {
    let clone = client.clone_disconnected();
    assert_eq!(clone.id(), client.id());
    assert_eq!(clone.namespace(), client.namespace());

    let mut lock = clone.new_lock(name);
    assert!(matches!(
        lock.acquire(TTL).await,
        Err(LockError::NotConnected)
    ));

    clone.reconnect().await.unwrap();
    lock.acquire(TTL).await.unwrap();

    // Same ID, so the original session can release what the clone acquired
    client.new_lock(name).release().await.unwrap();
    clone.close().await;
}

/// Changing the ID orphans locks acquired under the old one.
pub async fn set_id_orphans_held_locks<C: LockClient>(client: &C, name: &str) {
    let original = client.id();
    let lock = client.acquire_lock(name, TTL).await.unwrap();

    client.set_id("someone-else");
    assert!(matches!(lock.release().await, Err(LockError::NotOwned(_))));
    assert!(matches!(lock.refresh().await, Err(LockError::NotOwned(_))));

    client.set_id(original);
    lock.release().await.unwrap();
}

/// Close is idempotent and leaves the client reusable after reconnect.
pub async fn close_and_reconnect<C: LockClient>(client: &C, name: &str) {
    client.close().await;
    client.close().await;

    let mut lock = client.new_lock(name);
    assert!(matches!(lock.acquire(TTL).await, Err(LockError::NotConnected)));
    assert!(matches!(lock.info().await, Err(LockError::NotConnected)));

    client.reconnect().await.unwrap();
    // Reconnecting an already connected client replaces the connection
    client.reconnect().await.unwrap();

    lock.acquire(TTL).await.unwrap();
    lock.release().await.unwrap();
}

/// Without a refresh the lease runs out and another client can take over.
pub async fn lease_expires<C: LockClient>(a: &C, b: &C, name: &str, ttl: Duration) {
    let mut lock_a = a.new_lock(name);
    lock_a.acquire(ttl).await.unwrap();

    tokio::time::sleep(ttl + Duration::from_millis(50)).await;

    let info = lock_a.info().await.unwrap();
    assert!(!info.acquired);
    assert!(matches!(lock_a.refresh().await, Err(LockError::NotOwned(_))));

    let mut lock_b = b.new_lock(name);
    lock_b.acquire(ttl).await.unwrap();
    assert!(matches!(lock_a.release().await, Err(LockError::NotOwned(_))));
    lock_b.release().await.unwrap();
}

/// Refreshing before expiry keeps the lock held past its original lease.
pub async fn refresh_extends_lease<C: LockClient>(a: &C, b: &C, name: &str, ttl: Duration) {
    let mut lock_a = a.new_lock(name);
    lock_a.acquire(ttl).await.unwrap();

    for _ in 0..3 {
        tokio::time::sleep(ttl / 2).await;
        lock_a.refresh().await.unwrap();
    }

    let mut lock_b = b.new_lock(name);
    assert!(matches!(
        lock_b.acquire(ttl).await,
        Err(LockError::HeldByOtherClient(_))
    ));
    lock_a.release().await.unwrap();
}
