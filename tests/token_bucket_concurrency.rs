mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{new_bucket_type, ManualClock};
use rate_guard_buckets::{MemoryStorage, Storage, TokenBucket};
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_takes_never_over_admit() {
    let clock = ManualClock::at(0);
    let storage = Arc::new(MemoryStorage::new());
    let bucket = Arc::new(
        TokenBucket::new("api:alice", new_bucket_type(10, 1, 1000, storage.clone()))
            .unwrap()
            .with_timestamp_provider(clock.provider()),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bucket = Arc::clone(&bucket);
            tokio::spawn(async move { bucket.take(3).await.unwrap() })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    // 10 tokens / 3 per take
    assert_eq!(admitted, 3);
    let state = storage.snapshot("api:alice").await.unwrap();
    assert_eq!(state.count, 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_takes_exceeding_the_bucket_do_not_both_succeed() {
    for _ in 0..50 {
        let clock = ManualClock::at(0);
        let bucket = Arc::new(
            TokenBucket::new("api:bob", new_bucket_type(5, 1, 1000, Arc::new(MemoryStorage::new())))
                .unwrap()
                .with_timestamp_provider(clock.provider()),
        );

        let (a, b) = tokio::join!(
            tokio::spawn({
                let bucket = Arc::clone(&bucket);
                async move { bucket.take(3).await.unwrap() }
            }),
            tokio::spawn({
                let bucket = Arc::clone(&bucket);
                async move { bucket.take(3).await.unwrap() }
            }),
        );

        assert!(a.unwrap() ^ b.unwrap());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn held_lock_blocks_same_key_only() {
    let clock = ManualClock::at(0);
    let storage = Arc::new(MemoryStorage::new());
    let bucket_type = new_bucket_type(10, 1, 1000, storage.clone());
    let alice = Arc::new(
        TokenBucket::new("api:alice", bucket_type.clone())
            .unwrap()
            .with_timestamp_provider(clock.provider()),
    );
    let bob = TokenBucket::new("api:bob", bucket_type)
        .unwrap()
        .with_timestamp_provider(clock.provider());

    let (_, lock) = storage.get_and_lock("api:alice").await.unwrap();

    // a different key proceeds while alice is locked
    let taken = timeout(Duration::from_secs(1), bob.take(1)).await;
    assert!(taken.expect("bob must not wait on alice's lock").unwrap());

    // alice waits until the lock is released
    let waiting = tokio::spawn({
        let alice = Arc::clone(&alice);
        async move { alice.take(1).await.unwrap() }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    lock.set_and_unlock(None).await.unwrap();
    let allowed = timeout(Duration::from_secs(1), waiting).await.unwrap().unwrap();
    assert!(allowed);
}

#[tokio::test]
async fn dropped_lock_is_released_without_commit() {
    let storage = MemoryStorage::new();

    {
        let (state, _lock) = storage.get_and_lock("api:carol").await.unwrap();
        assert_eq!(state, None);
    }

    let relocked = timeout(Duration::from_secs(1), storage.get_and_lock("api:carol")).await;
    let (state, lock) = relocked.expect("lock was not released on drop").unwrap();
    assert_eq!(state, None);
    lock.set_and_unlock(None).await.unwrap();
}

#[tokio::test]
async fn timed_out_take_releases_its_lock() {
    let clock = ManualClock::at(0);
    let storage = Arc::new(MemoryStorage::new());
    let bucket = TokenBucket::new("api:dave", new_bucket_type(4, 1, 1000, storage.clone()))
        .unwrap()
        .with_timestamp_provider(clock.provider());

    let (_, lock) = storage.get_and_lock("api:dave").await.unwrap();
    assert!(timeout(Duration::from_millis(20), bucket.take(1)).await.is_err());
    lock.set_and_unlock(None).await.unwrap();

    // the abandoned take neither holds the lock nor consumed tokens
    assert!(timeout(Duration::from_secs(1), bucket.take(4)).await.unwrap().unwrap());
}
