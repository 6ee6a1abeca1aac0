//! # Least Frequently Used (LFU) Store with TTL
//!
//! This module provides the LFU eviction policy: a bounded key/value store
//! that, when full, evicts the entry with the smallest use counter, and that
//! additionally expires every entry a fixed TTL after its last write or hit.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                      ConcurrentLfuCache<K, V>                            │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │  Arc<ExpiryShared<LfuCore>>  (Mutex + Condvar)                     │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │   ┌────────────────────────────────┐  ┌────────────────────────────────┐ │
//!   │   │ Arc<dyn CacheObserver<K, V>>   │  │ Arc<ExpiryWorker> (optional)   │ │
//!   │   └────────────────────────────────┘  └────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//!                                      │
//!                                      ▼
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                           LfuCore<K, V>                                  │
//!   │                                                                          │
//!   │   entries: FxHashMap<K, CacheEntry<K, V>>                                │
//!   │   ┌─────────┬──────────────────────────────────────────┐                 │
//!   │   │  key    │  value, use_count, last_access           │                 │
//!   │   ├─────────┼──────────────────────────────────────────┤                 │
//!   │   │  news:1 │  Arc<Dto>, 3, tick 17                    │                 │
//!   │   │  news:2 │  Arc<Dto>, 1, tick 12                    │                 │
//!   │   │  news:3 │  Arc<Dto>, 1, tick 15                    │                 │
//!   │   └─────────┴──────────────────────────────────────────┘                 │
//!   │                                                                          │
//!   │   order: BTreeSet<Rank>   sorted by (use_count, last_access, key)        │
//!   │   ┌──────────────────────────────────────────────────────────────────┐   │
//!   │   │ (1, 12, news:2)  ← victim                                        │   │
//!   │   │ (1, 15, news:3)                                                  │   │
//!   │   │ (3, 17, news:1)                                                  │   │
//!   │   └──────────────────────────────────────────────────────────────────┘   │
//!   │                                                                          │
//!   │   expiry: ExpiryScheduler<K>  (deadline heap, one deadline per key)      │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Victim Selection
//!
//! The victim is the first element of `order`: the smallest `use_count`;
//! among equals the earliest `last_access`; among equals the smallest key.
//! `last_access` ticks are unique within a store, so the key tie-break only
//! exists to make the order total by construction.
//!
//! ```text
//!   use counts [2, 1, 3]        → evict the entry with count 1
//!   use counts [2, 2], A older  → evict A
//! ```
//!
//! Every hit or overwrite changes an entry's rank, so it is removed from
//! `order` and reinserted at its new position (O(log n)).
//!
//! ## Expiry
//!
//! With a TTL configured, each put or hit (re)schedules the entry one TTL in
//! the future, and removing an entry cancels its deadline. Due entries are
//! removed by [`expire_due`](crate::expiry::Expire::expire_due) (called by the
//! background [`ExpiryWorker`]) or by [`LfuCore::purge_expired`].
//!
//! ## Core Operations
//!
//! | Method           | Complexity | Description                                  |
//! |------------------|------------|----------------------------------------------|
//! | `insert`         | O(log n)   | Insert/overwrite, evicting one victim if full |
//! | `take`           | O(log n)   | Hit: bump counter, re-rank, reschedule       |
//! | `contains`       | O(1)       | Pure lookup                                  |
//! | `peek`           | O(1)       | Value without accounting                     |
//! | `remove`         | O(log n)   | Remove + cancel deadline                     |
//! | `peek_victim`    | O(log n)   | Next entry to be evicted                     |
//! | `pop_victim`     | O(log n)   | Evict now                                    |
//! | `purge_expired`  | O(k log n) | Remove the k entries due at `now`            |
//!
//! ## Thread Safety
//!
//! - `LfuCore` is single-threaded (`&mut self`).
//! - `ConcurrentLfuCache` guards it with a `parking_lot::Mutex`; every
//!   [`CacheStore`] operation is one critical section.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::entry::{CacheEntry, Insertion};
use crate::error::MissingEntry;
use crate::expiry::{Expire, ExpiryScheduler, ExpiryShared, ExpiryWorker};
use crate::observer::{CacheObserver, NoopObserver};
use crate::traits::CacheStore;

/// Position of an entry in the eviction order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Rank<K> {
    use_count: u64,
    last_access: u64,
    key: K,
}

impl<K: Clone> Rank<K> {
    fn of<V>(entry: &CacheEntry<K, V>) -> Self {
        Rank {
            use_count: entry.use_count(),
            last_access: entry.last_access(),
            key: entry.key().clone(),
        }
    }
}

/// Single-threaded LFU store with an ordered eviction index and optional TTL.
pub struct LfuCore<K, V> {
    entries: FxHashMap<K, CacheEntry<K, V>>,
    order: BTreeSet<Rank<K>>,
    expiry: Option<ExpiryScheduler<K>>,
    capacity: usize,
    tick: u64,
    wake_requested: bool,
}

impl<K, V> LfuCore<K, V>
where
    K: Eq + Hash + Ord + Clone,
{
    /// Creates an LFU store without time-based expiry.
    ///
    /// A capacity of 0 creates a store that accepts nothing.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::time::Instant;
    /// use cachegate::policy::lfu::LfuCore;
    ///
    /// let mut core = LfuCore::new(2);
    /// let now = Instant::now();
    /// core.insert("a", Arc::new(1), now);
    /// core.insert("b", Arc::new(2), now);
    /// core.take(&"a", now);
    ///
    /// // "b" has the lower use count.
    /// core.insert("c", Arc::new(3), now);
    /// assert!(!core.contains(&"b"));
    /// ```
    pub fn new(capacity: usize) -> Self {
        LfuCore {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            order: BTreeSet::new(),
            expiry: None,
            capacity,
            tick: 0,
            wake_requested: false,
        }
    }

    /// Creates an LFU store whose entries expire `ttl` after their last
    /// write or hit.
    pub fn with_ttl(capacity: usize, ttl: Duration) -> Self {
        let mut core = Self::new(capacity);
        core.expiry = Some(ExpiryScheduler::with_capacity(ttl, capacity));
        core
    }

    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.expiry.as_ref().map(ExpiryScheduler::ttl)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Value for `key` without access accounting.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&Arc<V>> {
        self.entries.get(key).map(CacheEntry::value)
    }

    #[inline]
    pub fn use_count(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(CacheEntry::use_count)
    }

    /// Logical tick of the last put/take of `key`.
    #[inline]
    pub fn last_access(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(CacheEntry::last_access)
    }

    /// Pending expiry deadline of `key`.
    pub fn expires_at(&self, key: &K) -> Option<Instant> {
        self.expiry.as_ref()?.deadline_of(key)
    }

    /// Inserts or overwrites `key`.
    ///
    /// An overwrite replaces the value in place and counts as an access. A
    /// new key in a full store first evicts the current victim.
    pub fn insert(&mut self, key: K, value: Arc<V>, now: Instant) -> Insertion<K, V> {
        let tick = self.next_tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            let old_rank = Rank::of(entry);
            let previous = entry.replace(value, tick);
            self.order.remove(&old_rank);
            self.order.insert(Rank::of(entry));
            self.reschedule(key, now);

            return Insertion::updated(previous);
        }

        if self.capacity == 0 {
            return Insertion::rejected();
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.pop_victim()
        } else {
            None
        };

        let entry = CacheEntry::new(key.clone(), value, tick);
        self.order.insert(Rank::of(&entry));
        self.entries.insert(key.clone(), entry);
        self.reschedule(key, now);

        Insertion::inserted(evicted)
    }

    /// Returns the value for `key`, recording a hit.
    pub fn take(&mut self, key: &K, now: Instant) -> Option<Arc<V>> {
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;

        let old_rank = Rank::of(entry);
        entry.record_access(tick);
        let value = Arc::clone(entry.value());
        self.order.remove(&old_rank);
        self.order.insert(Rank::of(entry));
        self.reschedule(key.clone(), now);

        Some(value)
    }

    /// Removes `key` and cancels its deadline.
    pub fn remove(&mut self, key: &K) -> Option<Arc<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&Rank::of(&entry));
        if let Some(expiry) = self.expiry.as_mut() {
            expiry.cancel(key);
        }

        Some(entry.into_parts().1)
    }

    /// The entry that would be evicted next.
    pub fn peek_victim(&self) -> Option<(&K, &Arc<V>)> {
        let rank = self.order.first()?;
        let entry = self.entries.get(&rank.key)?;
        Some((entry.key(), entry.value()))
    }

    /// Evicts the current victim.
    pub fn pop_victim(&mut self) -> Option<(K, Arc<V>)> {
        let rank = self.order.pop_first()?;
        let entry = self.entries.remove(&rank.key)?;
        if let Some(expiry) = self.expiry.as_mut() {
            expiry.cancel(&rank.key);
        }
        Some(entry.into_parts())
    }

    /// Removes every entry whose deadline is at or before `now`.
    pub fn purge_expired(&mut self, now: Instant) -> Vec<(K, Arc<V>)> {
        let mut expired = Vec::new();
        self.remove_due(now, &mut expired);
        expired
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        if let Some(expiry) = self.expiry.as_mut() {
            expiry.clear();
        }
    }

    /// Returns and resets the "worker must be woken" flag.
    pub(crate) fn take_wake_request(&mut self) -> bool {
        std::mem::take(&mut self.wake_requested)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    fn reschedule(&mut self, key: K, now: Instant) {
        if let Some(expiry) = self.expiry.as_mut()
            && expiry.schedule(key, now)
        {
            self.wake_requested = true;
        }
    }

    fn remove_due(&mut self, now: Instant, expired: &mut Vec<(K, Arc<V>)>) -> Option<Instant> {
        let expiry = self.expiry.as_mut()?;
        while let Some(key) = expiry.pop_due(now) {
            if let Some(entry) = self.entries.remove(&key) {
                self.order.remove(&Rank::of(&entry));
                expired.push(entry.into_parts());
            }
        }
        expiry.next_deadline()
    }

    /// Checks internal consistency.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    pub fn debug_validate_invariants(&self) {
        assert!(self.entries.len() <= self.capacity);
        assert_eq!(self.order.len(), self.entries.len());
        for (key, entry) in &self.entries {
            assert!(entry.use_count() >= 1);
            assert!(entry.key() == key);
            assert!(self.order.contains(&Rank::of(entry)));
        }
        if let Some(expiry) = &self.expiry {
            // Entries whose TTL overflows `Instant` carry no deadline.
            let scheduled = self
                .entries
                .keys()
                .filter(|key| expiry.deadline_of(key).is_some())
                .count();
            assert_eq!(scheduled, expiry.pending());
        }
    }
}

impl<K, V> Expire for LfuCore<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + 'static,
    V: Send + Sync + 'static,
{
    type Expired = (K, Arc<V>);

    fn expire_due(&mut self, now: Instant, expired: &mut Vec<Self::Expired>) -> Option<Instant> {
        self.remove_due(now, expired)
    }

    fn park(&mut self, until: Option<Instant>) {
        if let Some(expiry) = self.expiry.as_mut() {
            expiry.park(until);
        }
    }

    fn resume(&mut self) {
        if let Some(expiry) = self.expiry.as_mut() {
            expiry.resume();
        }
    }
}

impl<K, V> fmt::Debug for LfuCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCore")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .field("ttl", &self.expiry.as_ref().map(|e| e.ttl()))
            .finish_non_exhaustive()
    }
}

/// Thread-safe LFU store.
///
/// Clones share one store. When built with a TTL, a background
/// [`ExpiryWorker`] purges expired entries; it stops when the last clone is
/// dropped.
pub struct ConcurrentLfuCache<K, V> {
    shared: Arc<ExpiryShared<LfuCore<K, V>>>,
    observer: Arc<dyn CacheObserver<K, V>>,
    worker: Option<Arc<ExpiryWorker<LfuCore<K, V>>>>,
}

impl<K, V> Clone for ConcurrentLfuCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            observer: Arc::clone(&self.observer),
            worker: self.worker.clone(),
        }
    }
}

impl<K, V> ConcurrentLfuCache<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates an LFU store without expiry.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use cachegate::policy::lfu::ConcurrentLfuCache;
    /// use cachegate::traits::CacheStore;
    ///
    /// let cache: ConcurrentLfuCache<u64, String> = ConcurrentLfuCache::new(100);
    /// cache.put(1, Arc::new("one".to_string()));
    /// assert_eq!(cache.use_count(&1), Some(1));
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::with_observer(capacity, Arc::new(NoopObserver))
    }

    /// Creates an LFU store without expiry, reporting to `observer`.
    pub fn with_observer(capacity: usize, observer: Arc<dyn CacheObserver<K, V>>) -> Self {
        Self {
            shared: Arc::new(ExpiryShared::new(LfuCore::new(capacity))),
            observer,
            worker: None,
        }
    }

    /// Creates an LFU store whose entries expire `ttl` after their last
    /// write or hit, and starts its expiry worker.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn with_ttl(capacity: usize, ttl: Duration) -> io::Result<Self> {
        Self::with_ttl_and_observer(capacity, ttl, Arc::new(NoopObserver))
    }

    /// Like [`with_ttl`](Self::with_ttl), reporting to `observer`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the worker thread cannot be spawned.
    pub fn with_ttl_and_observer(
        capacity: usize,
        ttl: Duration,
        observer: Arc<dyn CacheObserver<K, V>>,
    ) -> io::Result<Self> {
        let shared = Arc::new(ExpiryShared::new(LfuCore::with_ttl(capacity, ttl)));
        let sink = Arc::clone(&observer);
        let worker = ExpiryWorker::spawn(
            Arc::clone(&shared),
            "cachegate-lfu-expiry",
            move |batch: Vec<(K, Arc<V>)>| {
                for (key, value) in &batch {
                    sink.on_expire(key, value);
                }
            },
        )?;
        Ok(Self {
            shared,
            observer,
            worker: Some(Arc::new(worker)),
        })
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.shared.lock().ttl()
    }

    pub fn expires_at(&self, key: &K) -> Option<Instant> {
        self.shared.lock().expires_at(key)
    }

    /// The entry that would be evicted next.
    pub fn peek_victim(&self) -> Option<(K, Arc<V>)> {
        let core = self.shared.lock();
        core.peek_victim()
            .map(|(key, value)| (key.clone(), Arc::clone(value)))
    }

    /// Removes every entry already due, without waiting for the worker.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let expired = self.shared.lock().purge_expired(Instant::now());
        for (key, value) in &expired {
            self.observer.on_expire(key, value);
        }
        expired.len()
    }

    /// Checks internal consistency.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    pub fn debug_validate_invariants(&self) {
        self.shared.lock().debug_validate_invariants();
    }
}

impl<K, V> CacheStore<K, V> for ConcurrentLfuCache<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let (insertion, wake) = {
            let mut core = self.shared.lock();
            let insertion = core.insert(key.clone(), Arc::clone(&value), Instant::now());
            (insertion, core.take_wake_request())
        };
        if wake {
            self.shared.notify();
        }

        if let Some((evicted_key, evicted_value)) = &insertion.evicted {
            self.observer.on_evict(evicted_key, evicted_value);
        }
        self.observer.on_put(&key, &value);
        insertion.previous
    }

    fn contains(&self, key: &K) -> bool {
        self.shared.lock().contains(key)
    }

    fn take(&self, key: &K) -> Result<Arc<V>, MissingEntry> {
        let (value, wake) = {
            let mut core = self.shared.lock();
            let value = core.take(key, Instant::now());
            (value, core.take_wake_request())
        };
        if wake {
            self.shared.notify();
        }

        let value = value.ok_or(MissingEntry)?;
        self.observer.on_take(key, &value);
        Ok(value)
    }

    fn delete(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.shared.lock().remove(key);
        self.observer.on_delete(key, removed.as_deref());
        removed
    }

    fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.shared.lock().peek(key).cloned()
    }

    fn use_count(&self, key: &K) -> Option<u64> {
        self.shared.lock().use_count(key)
    }

    fn len(&self) -> usize {
        self.shared.lock().len()
    }

    fn capacity(&self) -> usize {
        self.shared.lock().capacity()
    }

    fn clear(&self) {
        self.shared.lock().clear();
    }
}

impl<K, V> fmt::Debug for ConcurrentLfuCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.lock();
        f.debug_struct("ConcurrentLfuCache")
            .field("len", &core.entries.len())
            .field("capacity", &core.capacity)
            .field("expiry_worker", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}
