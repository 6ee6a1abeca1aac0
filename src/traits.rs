//! # Cache Store Traits
//!
//! This module defines the shared-store interface every eviction policy
//! exposes to the rest of the crate. The interceptor, the builder's policy
//! enum, and the integration tests only ever talk to a store through
//! [`CacheStore`], so LFU and LRU are interchangeable behind it.
//!
//! ## Architecture
//!
//! ```text
//!                          ┌─────────────────────────────────────────┐
//!                          │           CacheStore<K, V>              │
//!                          │        (Send + Sync, &self API)         │
//!                          │                                         │
//!                          │  put(K, Arc<V>) → Option<Arc<V>>        │
//!                          │  contains(&K) → bool                    │
//!                          │  take(&K) → Result<Arc<V>, MissingEntry>│
//!                          │  delete(&K) → Option<Arc<V>>            │
//!                          │  peek / use_count / len / capacity      │
//!                          │  clear                                  │
//!                          └──────────────────┬──────────────────────┘
//!                                             │
//!                ┌────────────────────────────┼────────────────────────────┐
//!                │                            │                            │
//!                ▼                            ▼                            ▼
//!   ┌────────────────────────────┐ ┌────────────────────────────┐ ┌──────────────────────┐
//!   │ ConcurrentLfuCache<K, V>   │ │ ConcurrentLruCache<K, V>   │ │   Cache<K, V>        │
//!   │                            │ │                            │ │                      │
//!   │ Mutex<LfuCore> + Condvar   │ │ RwLock<LruCore>            │ │ enum over both,      │
//!   │ ordered index + TTL heap   │ │ recency list               │ │ chosen at startup    │
//!   └────────────────────────────┘ └────────────────────────────┘ └──────────────────────┘
//! ```
//!
//! ## Operation Semantics
//!
//! | Operation  | Access accounting | Notes                                       |
//! |------------|-------------------|---------------------------------------------|
//! | `put`      | yes               | Evicts one victim first if a new key is full |
//! | `contains` | no                | Pure lookup                                 |
//! | `take`     | yes               | Err(`MissingEntry`) if not resident         |
//! | `delete`   | n/a               | Cancels pending expiry; `None` if absent    |
//! | `peek`     | no                | Introspection only                          |
//! | `use_count`| no                | Introspection only                          |
//!
//! "Access accounting" means `use_count += 1`, a fresh `last_access` tick,
//! and (LFU) a rescheduled expiry deadline.
//!
//! ## Thread Safety
//!
//! Every method is individually atomic: each runs inside one critical section
//! of the store's lock. Sequences of calls are not. A key that `contains`
//! reported may be evicted or expire before the following `take`, which is
//! why `take` is fallible rather than panicking.

use std::sync::Arc;

use crate::error::MissingEntry;

/// Thread-safe key/value store with a policy-driven capacity bound.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cachegate::policy::lru::ConcurrentLruCache;
/// use cachegate::traits::CacheStore;
///
/// fn warm<C: CacheStore<u64, String>>(cache: &C, data: &[(u64, &str)]) {
///     for (key, value) in data {
///         cache.put(*key, Arc::new(value.to_string()));
///     }
/// }
///
/// let cache: ConcurrentLruCache<u64, String> = ConcurrentLruCache::new(16);
/// warm(&cache, &[(1, "one"), (2, "two")]);
/// assert_eq!(cache.len(), 2);
/// assert_eq!(*cache.take(&1).unwrap(), "one");
/// ```
pub trait CacheStore<K, V>: Send + Sync {
    /// Inserts or overwrites `key`, returning the previous value.
    ///
    /// When `key` is new and the store is full, exactly one victim chosen by
    /// the policy is removed first.
    fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>>;

    /// Returns `true` if `key` is resident. No access accounting.
    fn contains(&self, key: &K) -> bool;

    /// Returns the value for `key`, recording a hit.
    ///
    /// # Errors
    ///
    /// [`MissingEntry`] if `key` is not resident (never inserted, deleted,
    /// evicted or expired).
    fn take(&self, key: &K) -> Result<Arc<V>, MissingEntry>;

    /// Removes `key`, returning its value if it was resident.
    fn delete(&self, key: &K) -> Option<Arc<V>>;

    /// Returns the value for `key` without recording an access.
    fn peek(&self, key: &K) -> Option<Arc<V>>;

    /// Current use counter for `key`, if resident.
    fn use_count(&self, key: &K) -> Option<u64>;

    /// Number of resident entries.
    fn len(&self) -> usize;

    /// Returns `true` if no entries are resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of resident entries.
    fn capacity(&self) -> usize;

    /// Removes every entry (and every pending expiry).
    fn clear(&self);
}

impl<K, V, C> CacheStore<K, V> for Arc<C>
where
    C: CacheStore<K, V> + ?Sized,
{
    fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        (**self).put(key, value)
    }

    fn contains(&self, key: &K) -> bool {
        (**self).contains(key)
    }

    fn take(&self, key: &K) -> Result<Arc<V>, MissingEntry> {
        (**self).take(key)
    }

    fn delete(&self, key: &K) -> Option<Arc<V>> {
        (**self).delete(key)
    }

    fn peek(&self, key: &K) -> Option<Arc<V>> {
        (**self).peek(key)
    }

    fn use_count(&self, key: &K) -> Option<u64> {
        (**self).use_count(key)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn clear(&self) {
        (**self).clear()
    }
}
