//! # Cache Event Observers
//!
//! Stores notify an optional [`CacheObserver`] about every `put`, `take` and
//! `delete`, and about entries leaving through capacity eviction or TTL
//! expiry. Observers are a pass-through hook for logging and monitoring:
//!
//! - notifications are issued after the store lock has been released,
//! - observer methods return nothing, so they cannot alter a result,
//! - a panicking observer is a bug in the observer, not in the store.
//!
//! ## Architecture
//!
//! ```text
//!   ┌────────────────────────┐   on_put / on_take / on_delete
//!   │ Concurrent*Cache       │ ─────────────────────────────────┐
//!   │   (request threads)    │   on_evict                       │
//!   └────────────────────────┘                                  ▼
//!   ┌────────────────────────┐                     ┌──────────────────────────┐
//!   │ ExpiryWorker           │ ──── on_expire ───► │ Arc<dyn CacheObserver>   │
//!   │   (background thread)  │                     │                          │
//!   └────────────────────────┘                     │ NoopObserver    (default)│
//!                                                  │ TracingObserver (logs)   │
//!                                                  │ StatsObserver (counters) │
//!                                                  └──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use cachegate::observer::StatsObserver;
//! use cachegate::policy::lru::ConcurrentLruCache;
//! use cachegate::traits::CacheStore;
//!
//! let stats = Arc::new(StatsObserver::new());
//! let cache: ConcurrentLruCache<u64, &str> = ConcurrentLruCache::with_observer(2, stats.clone());
//!
//! cache.put(1u64, Arc::new("a"));
//! cache.put(2u64, Arc::new("b"));
//! cache.put(3u64, Arc::new("c")); // evicts 1
//! let _ = cache.take(&2);
//!
//! let snapshot = stats.snapshot();
//! assert_eq!(snapshot.puts, 3);
//! assert_eq!(snapshot.takes, 1);
//! assert_eq!(snapshot.evictions, 1);
//! ```

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

/// Receives cache events. Every method defaults to a no-op.
pub trait CacheObserver<K, V>: Send + Sync {
    /// A value was written (new entry or overwrite).
    fn on_put(&self, _key: &K, _value: &V) {}

    /// A resident value was returned by `take`.
    fn on_take(&self, _key: &K, _value: &V) {}

    /// `delete` ran; `removed` is the value if the key was resident.
    fn on_delete(&self, _key: &K, _removed: Option<&V>) {}

    /// An entry was removed to make room for a new key.
    fn on_evict(&self, _key: &K, _value: &V) {}

    /// An entry outlived its TTL.
    fn on_expire(&self, _key: &K, _value: &V) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl<K, V> CacheObserver<K, V> for NoopObserver {}

/// Observer that emits a `tracing` event per cache event.
///
/// Events carry a `cache` field with the configured store name. Keys are
/// rendered with `Debug`; values are not logged.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    name: &'static str,
}

impl TracingObserver {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl<K, V> CacheObserver<K, V> for TracingObserver
where
    K: Debug,
{
    fn on_put(&self, key: &K, _value: &V) {
        trace!(cache = self.name, ?key, "cache put");
    }

    fn on_take(&self, key: &K, _value: &V) {
        trace!(cache = self.name, ?key, "cache take");
    }

    fn on_delete(&self, key: &K, removed: Option<&V>) {
        debug!(cache = self.name, ?key, resident = removed.is_some(), "cache delete");
    }

    fn on_evict(&self, key: &K, _value: &V) {
        debug!(cache = self.name, ?key, "cache eviction");
    }

    fn on_expire(&self, key: &K, _value: &V) {
        debug!(cache = self.name, ?key, "cache entry expired");
    }
}

/// Point-in-time copy of [`StatsObserver`] counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub puts: u64,
    pub takes: u64,
    pub deletes: u64,
    /// Deletes of keys that were not resident.
    pub delete_misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Observer that counts events with relaxed atomics.
#[derive(Debug, Default)]
pub struct StatsObserver {
    puts: AtomicU64,
    takes: AtomicU64,
    deletes: AtomicU64,
    delete_misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            takes: self.takes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            delete_misses: self.delete_misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.puts,
            &self.takes,
            &self.deletes,
            &self.delete_misses,
            &self.evictions,
            &self.expirations,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl<K, V> CacheObserver<K, V> for StatsObserver {
    fn on_put(&self, _key: &K, _value: &V) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    fn on_take(&self, _key: &K, _value: &V) {
        self.takes.fetch_add(1, Ordering::Relaxed);
    }

    fn on_delete(&self, _key: &K, removed: Option<&V>) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        if removed.is_none() {
            self.delete_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn on_evict(&self, _key: &K, _value: &V) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn on_expire(&self, _key: &K, _value: &V) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }
}
