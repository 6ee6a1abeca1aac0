// ==============================================
// LFU TTL EXPIRY TESTS (integration, real time)
// ==============================================
//
// These run against the background expiry worker with wall-clock sleeps, so
// assertions leave generous slack around each deadline.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cachegate::error::MissingEntry;
use cachegate::observer::StatsObserver;
use cachegate::policy::lfu::ConcurrentLfuCache;
use cachegate::traits::CacheStore;

const TTL: Duration = Duration::from_millis(300);

/// Polls `check` until it holds or `timeout` passes.
fn eventually(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn untouched_entry_is_purged_by_worker() {
    let cache: ConcurrentLfuCache<u64, String> = ConcurrentLfuCache::with_ttl(8, TTL).unwrap();
    cache.put(1, Arc::new("one".into()));
    assert!(cache.contains(&1));

    assert!(eventually(TTL * 5, || !cache.contains(&1)));
    assert!(cache.is_empty());
    cache.debug_validate_invariants();
}

#[test]
fn hit_at_half_ttl_keeps_entry_alive() {
    let cache: ConcurrentLfuCache<u64, String> = ConcurrentLfuCache::with_ttl(8, TTL).unwrap();
    let start = Instant::now();
    cache.put(1, Arc::new("one".into()));

    thread::sleep(TTL / 2);
    assert!(cache.take(&1).is_ok());

    // Past the original deadline, before the renewed one.
    let check_at = start + TTL + TTL / 6;
    thread::sleep(check_at.saturating_duration_since(Instant::now()));
    assert!(cache.contains(&1));

    assert!(eventually(TTL * 5, || !cache.contains(&1)));
}

#[test]
fn worker_wakes_for_entries_added_while_idle() {
    let cache: ConcurrentLfuCache<u64, u64> = ConcurrentLfuCache::with_ttl(8, TTL).unwrap();

    // Empty store: the worker parks with nothing scheduled.
    thread::sleep(Duration::from_millis(50));
    cache.put(1, Arc::new(1));
    cache.put(2, Arc::new(2));

    assert!(eventually(TTL * 5, || cache.is_empty()));
}

#[test]
fn expirations_reach_observer() {
    let stats = Arc::new(StatsObserver::new());
    let cache: ConcurrentLfuCache<u64, u64> =
        ConcurrentLfuCache::with_ttl_and_observer(8, TTL, stats.clone()).unwrap();
    for key in 0..4 {
        cache.put(key, Arc::new(key));
    }

    assert!(eventually(TTL * 5, || stats.snapshot().expirations == 4));
    assert_eq!(stats.snapshot().evictions, 0);
    assert!(cache.is_empty());
}

#[test]
fn deleted_entry_does_not_expire_later() {
    let stats = Arc::new(StatsObserver::new());
    let cache: ConcurrentLfuCache<u64, u64> =
        ConcurrentLfuCache::with_ttl_and_observer(8, TTL, stats.clone()).unwrap();
    cache.put(1, Arc::new(1));
    cache.put(2, Arc::new(2));
    assert!(cache.delete(&1).is_some());

    assert!(eventually(TTL * 5, || cache.is_empty()));
    assert_eq!(stats.snapshot().expirations, 1);
}

#[test]
fn expired_take_is_missing_entry() {
    let cache: ConcurrentLfuCache<u64, u64> =
        ConcurrentLfuCache::with_ttl(8, Duration::from_millis(20)).unwrap();
    cache.put(1, Arc::new(1));

    // A successful take would push the deadline back, so wait with contains.
    assert!(eventually(Duration::from_secs(2), || !cache.contains(&1)));
    assert_eq!(cache.take(&1), Err(MissingEntry));
}

#[test]
fn unbounded_ttl_keeps_entries() {
    let cache: ConcurrentLfuCache<u64, u64> =
        ConcurrentLfuCache::with_ttl(8, Duration::MAX).unwrap();
    cache.put(1, Arc::new(1));
    assert!(cache.take(&1).is_ok());

    thread::sleep(Duration::from_millis(50));
    assert_eq!(cache.purge_expired(), 0);
    assert!(cache.contains(&1));
    assert_eq!(cache.expires_at(&1), None);
    cache.debug_validate_invariants();
}

#[test]
fn manual_purge_runs_without_waiting_for_worker() {
    let cache: ConcurrentLfuCache<u64, u64> =
        ConcurrentLfuCache::with_ttl(8, Duration::from_millis(1)).unwrap();
    cache.put(1, Arc::new(1));
    thread::sleep(Duration::from_millis(5));

    // Either the worker or this call removes it; never both.
    let purged = cache.purge_expired();
    assert!(purged <= 1);
    assert!(!cache.contains(&1));
}

#[test]
fn dropping_last_handle_stops_worker() {
    let cache: ConcurrentLfuCache<u64, u64> = ConcurrentLfuCache::with_ttl(8, TTL).unwrap();
    let clone = cache.clone();
    cache.put(1, Arc::new(1));
    drop(cache);

    // The clone still has a live worker behind it.
    assert!(eventually(TTL * 5, || clone.is_empty()));
    drop(clone);
}
