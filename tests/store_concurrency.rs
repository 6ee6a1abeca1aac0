// ==============================================
// STORE CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads hammer one store; afterwards the capacity bound and the
// internal index invariants must still hold.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use cachegate::policy::lfu::ConcurrentLfuCache;
use cachegate::policy::lru::ConcurrentLruCache;
use cachegate::traits::CacheStore;

const THREADS: usize = 8;
const OPS_PER_THREAD: usize = 2_000;
const KEY_SPACE: u64 = 64;

/// xorshift64; deterministic per thread.
fn next(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn hammer<C>(store: Arc<C>)
where
    C: CacheStore<u64, u64> + 'static,
{
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut rng = 0x9E37_79B9_7F4A_7C15 ^ (t as u64 + 1);
                barrier.wait();
                for _ in 0..OPS_PER_THREAD {
                    let roll = next(&mut rng);
                    let key = roll % KEY_SPACE;
                    match roll >> 60 {
                        0..=6 => {
                            store.put(key, Arc::new(key));
                        },
                        7..=12 => {
                            if store.contains(&key) {
                                // May lose the race with an eviction.
                                if let Ok(value) = store.take(&key) {
                                    assert_eq!(*value, key);
                                }
                            }
                        },
                        _ => {
                            store.delete(&key);
                        },
                    }
                    assert!(store.len() <= store.capacity());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn lfu_store_survives_contention() {
    let store = Arc::new(ConcurrentLfuCache::<u64, u64>::new(16));
    hammer(Arc::clone(&store));
    assert!(store.len() <= 16);
    store.debug_validate_invariants();
}

#[test]
fn lfu_store_with_ttl_survives_contention() {
    let store = Arc::new(ConcurrentLfuCache::<u64, u64>::with_ttl(16, Duration::from_millis(2)).unwrap());
    hammer(Arc::clone(&store));
    store.debug_validate_invariants();

    thread::sleep(Duration::from_millis(50));
    store.purge_expired();
    assert!(store.is_empty());
}

#[test]
fn lru_store_survives_contention() {
    let store = Arc::new(ConcurrentLruCache::<u64, u64>::new(16));
    hammer(Arc::clone(&store));
    assert!(store.len() <= 16);
    store.validate_invariants();
}

#[test]
fn use_counts_are_not_lost_under_contention() {
    let store = Arc::new(ConcurrentLfuCache::<u64, u64>::new(4));
    store.put(1, Arc::new(1));

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..500 {
                    store.take(&1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.use_count(&1), Some(1 + THREADS as u64 * 500));
}
