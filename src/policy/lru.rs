//! # Least Recently Used (LRU) Store
//!
//! This module provides the LRU eviction policy: a bounded key/value store
//! that, when full, evicts the entry whose last put or hit is the oldest.
//! Entries never expire by time.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                        ConcurrentLruCache<K, V>                          │
//!   │                                                                          │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                    Arc<RwLock<LruCore<K, V>>>                      │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   │   ┌────────────────────────────────────────────────────────────────────┐ │
//!   │   │                    Arc<dyn CacheObserver<K, V>>                    │ │
//!   │   └────────────────────────────────────────────────────────────────────┘ │
//!   └──────────────────────────────────────────────────────────────────────────┘
//!                                      │
//!                                      ▼
//!   ┌──────────────────────────────────────────────────────────────────────────┐
//!   │                            LruCore<K, V>                                 │
//!   │                                                                          │
//!   │   map: FxHashMap<K, NonNull<Node>>                                       │
//!   │   ┌─────────┬──────────────────────────────────────────┐                 │
//!   │   │  news:1 │ ─────────────────────────────────────┐   │                 │
//!   │   │  news:2 │ ───────────────────────────────┐     │   │                 │
//!   │   │  news:3 │ ─────────────────────────┐     │     │   │                 │
//!   │   └─────────┴──────────────────────────┼─────┼─────┼───┘                 │
//!   │                                        ▼     ▼     ▼                     │
//!   │   head ──► ┌────────┐ ◄──► ┌────────┐ ◄──► ┌────────┐ ◄── tail           │
//!   │    (MRU)   │ Node   │      │ Node   │      │ Node   │   (LRU, victim)    │
//!   │            │ entry  │      │ entry  │      │ entry  │                    │
//!   │            └────────┘      └────────┘      └────────┘                    │
//!   └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each node owns a [`CacheEntry`], so the use counter and access tick are
//! maintained exactly as in the LFU store even though only list position
//! decides eviction.
//!
//! ## Operations
//!
//! | Method         | Complexity | Recency update |
//! |----------------|------------|----------------|
//! | `insert`       | O(1)       | moves to MRU   |
//! | `take`         | O(1)       | moves to MRU   |
//! | `touch`        | O(1)       | moves to MRU   |
//! | `peek`         | O(1)       | none           |
//! | `remove`       | O(1)       | n/a            |
//! | `pop_lru`      | O(1)       | n/a            |
//! | `recency_rank` | O(n)       | none           |
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use cachegate::policy::lru::LruCore;
//!
//! let mut cache = LruCore::new(2);
//! cache.insert("a", Arc::new(1));
//! cache.insert("b", Arc::new(2));
//! cache.take(&"a");
//!
//! // "b" is now least recently used.
//! let insertion = cache.insert("c", Arc::new(3));
//! assert_eq!(insertion.evicted.map(|(k, _)| k), Some("b"));
//! ```
//!
//! ## Thread Safety
//!
//! - `LruCore`: **NOT thread-safe**, single-threaded only
//! - `ConcurrentLruCache`: thread-safe via `parking_lot::RwLock`; `contains`,
//!   `peek` and `len` take the read lock, everything that reorders the list
//!   takes the write lock

use std::fmt;
use std::hash::Hash;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::entry::{CacheEntry, Insertion};
use crate::error::MissingEntry;
use crate::observer::{CacheObserver, NoopObserver};
use crate::traits::CacheStore;

/// Node in the recency list.
#[repr(C)]
struct Node<K, V> {
    prev: Option<NonNull<Node<K, V>>>,
    next: Option<NonNull<Node<K, V>>>,
    entry: CacheEntry<K, V>,
}

/// LRU store core: hash index plus a raw-pointer doubly linked list.
///
/// ## Memory Safety
/// - Nodes are heap-allocated and tracked via `NonNull` pointers
/// - `map` holds exactly one pointer per live node
/// - Every node is freed on `remove`, `pop_lru`, `clear` or `Drop`
pub struct LruCore<K, V> {
    map: FxHashMap<K, NonNull<Node<K, V>>>,
    head: Option<NonNull<Node<K, V>>>,
    tail: Option<NonNull<Node<K, V>>>,
    capacity: usize,
    tick: u64,
}

// SAFETY: the raw pointers only reference heap memory owned by the struct.
unsafe impl<K, V> Send for LruCore<K, V>
where
    K: Send,
    V: Send + Sync,
{
}

// SAFETY: shared access never mutates through the pointers.
unsafe impl<K, V> Sync for LruCore<K, V>
where
    K: Sync,
    V: Send + Sync,
{
}

impl<K, V> LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an LRU store with the given capacity.
    ///
    /// A capacity of 0 creates a store that accepts no items.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        LruCore {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            head: None,
            tail: None,
            capacity,
            tick: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or overwrites `key`, moving it to the MRU position.
    ///
    /// A new key in a full store first evicts the LRU entry.
    pub fn insert(&mut self, key: K, value: Arc<V>) -> Insertion<K, V> {
        let tick = self.next_tick();

        if let Some(&node_ptr) = self.map.get(&key) {
            let previous = unsafe { (*node_ptr.as_ptr()).entry.replace(value, tick) };
            self.detach(node_ptr);
            self.attach_front(node_ptr);

            #[cfg(debug_assertions)]
            self.validate_invariants();

            return Insertion::updated(previous);
        }

        if self.capacity == 0 {
            return Insertion::rejected();
        }

        let evicted = if self.map.len() >= self.capacity {
            self.pop_lru()
        } else {
            None
        };

        let node = Box::new(Node {
            prev: None,
            next: None,
            entry: CacheEntry::new(key.clone(), value, tick),
        });
        let node_ptr = NonNull::from(Box::leak(node));
        self.map.insert(key, node_ptr);
        self.attach_front(node_ptr);

        #[cfg(debug_assertions)]
        self.validate_invariants();

        Insertion::inserted(evicted)
    }

    /// Returns the value for `key`, recording a hit and moving it to MRU.
    pub fn take(&mut self, key: &K) -> Option<&Arc<V>> {
        let node_ptr = *self.map.get(key)?;
        let tick = self.next_tick();

        unsafe { (*node_ptr.as_ptr()).entry.record_access(tick) };
        self.detach(node_ptr);
        self.attach_front(node_ptr);

        #[cfg(debug_assertions)]
        self.validate_invariants();

        unsafe { Some((*node_ptr.as_ptr()).entry.value()) }
    }

    /// Value for `key` without changing its recency.
    #[inline]
    pub fn peek(&self, key: &K) -> Option<&Arc<V>> {
        self.entry(key).map(CacheEntry::value)
    }

    #[inline]
    pub fn use_count(&self, key: &K) -> Option<u64> {
        self.entry(key).map(CacheEntry::use_count)
    }

    pub fn remove(&mut self, key: &K) -> Option<Arc<V>> {
        let node_ptr = self.map.remove(key)?;

        self.detach(node_ptr);
        let node = unsafe { Box::from_raw(node_ptr.as_ptr()) };

        #[cfg(debug_assertions)]
        self.validate_invariants();

        Some(node.entry.into_parts().1)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, Arc<V>)> {
        let node = self.pop_tail()?;
        self.map.remove(node.entry.key());
        Some(node.entry.into_parts())
    }

    /// The least recently used entry, without removing it.
    pub fn peek_lru(&self) -> Option<(&K, &Arc<V>)> {
        self.tail.map(|tail_ptr| unsafe {
            let node = tail_ptr.as_ref();
            (node.entry.key(), node.entry.value())
        })
    }

    /// Moves `key` to MRU without counting a use.
    pub fn touch(&mut self, key: &K) -> bool {
        let Some(&node_ptr) = self.map.get(key) else {
            return false;
        };
        self.detach(node_ptr);
        self.attach_front(node_ptr);
        true
    }

    /// Position of `key` counted from the MRU end (0 = most recent).
    pub fn recency_rank(&self, key: &K) -> Option<usize> {
        let &target = self.map.get(key)?;
        let mut rank = 0usize;
        let mut current = self.head;
        while let Some(ptr) = current {
            if ptr == target {
                return Some(rank);
            }
            rank += 1;
            current = unsafe { ptr.as_ref().next };
        }
        None
    }

    pub fn clear(&mut self) {
        while self.pop_tail().is_some() {}
        self.map.clear();
    }

    fn entry(&self, key: &K) -> Option<&CacheEntry<K, V>> {
        self.map
            .get(key)
            .map(|ptr| unsafe { &(*ptr.as_ptr()).entry })
    }

    fn next_tick(&mut self) -> u64 {
        self.tick = self.tick.wrapping_add(1);
        self.tick
    }

    /// Detach a node from the list without removing it from the map.
    #[inline(always)]
    fn detach(&mut self, node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_ref();
            let prev = node.prev;
            let next = node.next;

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }

            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
        }
    }

    /// Attach a node at the MRU position.
    #[inline(always)]
    fn attach_front(&mut self, mut node_ptr: NonNull<Node<K, V>>) {
        unsafe {
            let node = node_ptr.as_mut();
            node.prev = None;
            node.next = self.head;

            match self.head {
                Some(mut h) => h.as_mut().prev = Some(node_ptr),
                None => self.tail = Some(node_ptr),
            }

            self.head = Some(node_ptr);
        }
    }

    /// Unlink the tail node and take ownership of it.
    #[inline(always)]
    fn pop_tail(&mut self) -> Option<Box<Node<K, V>>> {
        self.tail.map(|tail_ptr| unsafe {
            let node = Box::from_raw(tail_ptr.as_ptr());

            self.tail = node.prev;
            match self.tail {
                Some(mut t) => t.as_mut().next = None,
                None => self.head = None,
            }

            node
        })
    }

    /// Checks internal consistency.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    pub fn validate_invariants(&self) {
        assert!(self.map.len() <= self.capacity);

        if self.map.is_empty() {
            assert!(self.head.is_none());
            assert!(self.tail.is_none());
            return;
        }

        let mut count = 0usize;
        let mut prev = None;
        let mut current = self.head;
        while let Some(ptr) = current {
            count += 1;
            assert!(count <= self.map.len(), "cycle detected in recency list");
            unsafe {
                let node = ptr.as_ref();
                assert_eq!(node.prev, prev);
                assert_eq!(self.map.get(node.entry.key()), Some(&ptr));
                assert!(node.entry.use_count() >= 1);
                prev = current;
                current = node.next;
            }
        }

        assert_eq!(self.tail, prev);
        assert_eq!(count, self.map.len());
    }
}

impl<K, V> Drop for LruCore<K, V> {
    fn drop(&mut self) {
        let mut current = self.head.take();
        self.tail = None;
        while let Some(ptr) = current {
            let node = unsafe { Box::from_raw(ptr.as_ptr()) };
            current = node.next;
        }
    }
}

impl<K, V> fmt::Debug for LruCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU store. Clones share one store.
pub struct ConcurrentLruCache<K, V> {
    inner: Arc<RwLock<LruCore<K, V>>>,
    observer: Arc<dyn CacheObserver<K, V>>,
}

impl<K, V> Clone for ConcurrentLruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            observer: Arc::clone(&self.observer),
        }
    }
}

impl<K, V> ConcurrentLruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Creates a thread-safe LRU store with the given capacity.
    ///
    /// # Example
    ///
    /// ```
    /// use cachegate::policy::lru::ConcurrentLruCache;
    /// use cachegate::traits::CacheStore;
    ///
    /// let cache: ConcurrentLruCache<u32, String> = ConcurrentLruCache::new(100);
    /// assert_eq!(cache.capacity(), 100);
    /// assert!(cache.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self
    where
        K: 'static,
        V: 'static,
    {
        Self::with_observer(capacity, Arc::new(NoopObserver))
    }

    /// Creates a thread-safe LRU store reporting to `observer`.
    pub fn with_observer(capacity: usize, observer: Arc<dyn CacheObserver<K, V>>) -> Self {
        ConcurrentLruCache {
            inner: Arc::new(RwLock::new(LruCore::new(capacity))),
            observer,
        }
    }

    /// Moves `key` to MRU without counting a use.
    pub fn touch(&self, key: &K) -> bool {
        self.inner.write().touch(key)
    }

    /// The entry that would be evicted next.
    pub fn peek_lru(&self) -> Option<(K, Arc<V>)> {
        let cache = self.inner.read();
        cache
            .peek_lru()
            .map(|(key, value)| (key.clone(), Arc::clone(value)))
    }

    /// Evicts the least recently used entry now.
    pub fn pop_lru(&self) -> Option<(K, Arc<V>)> {
        let popped = self.inner.write().pop_lru();
        if let Some((key, value)) = &popped {
            self.observer.on_evict(key, value);
        }
        popped
    }

    pub fn recency_rank(&self, key: &K) -> Option<usize> {
        self.inner.read().recency_rank(key)
    }

    /// Checks internal consistency.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    pub fn validate_invariants(&self) {
        self.inner.read().validate_invariants();
    }
}

impl<K, V> CacheStore<K, V> for ConcurrentLruCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let insertion = self.inner.write().insert(key.clone(), Arc::clone(&value));

        if let Some((evicted_key, evicted_value)) = &insertion.evicted {
            self.observer.on_evict(evicted_key, evicted_value);
        }
        self.observer.on_put(&key, &value);
        insertion.previous
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.read().contains(key)
    }

    fn take(&self, key: &K) -> Result<Arc<V>, MissingEntry> {
        let value = self.inner.write().take(key).cloned().ok_or(MissingEntry)?;
        self.observer.on_take(key, &value);
        Ok(value)
    }

    fn delete(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.inner.write().remove(key);
        self.observer.on_delete(key, removed.as_deref());
        removed
    }

    fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.inner.read().peek(key).cloned()
    }

    fn use_count(&self, key: &K) -> Option<u64> {
        self.inner.read().use_count(key)
    }

    fn len(&self) -> usize {
        self.inner.read().len()
    }

    fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }

    fn clear(&self) {
        self.inner.write().clear();
    }
}

impl<K, V> fmt::Debug for ConcurrentLruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.read();
        f.debug_struct("ConcurrentLruCache")
            .field("len", &cache.map.len())
            .field("capacity", &cache.capacity)
            .finish_non_exhaustive()
    }
}
