//! Resident cache entries and insertion outcomes.
//!
//! Both policies keep one [`CacheEntry`] per resident key. The entry carries
//! the payload (as `Arc<V>`) plus the bookkeeping the policies order by:
//!
//! | Field         | Meaning                                                  |
//! |---------------|----------------------------------------------------------|
//! | `use_count`   | Starts at 1, +1 on every hit or overwrite                |
//! | `last_access` | Logical tick of the most recent put/take (store-local)   |
//!
//! `last_access` is a tick from the owning store's monotonic counter rather
//! than a wall-clock reading, so "accessed earlier" is a strict order even
//! when two accesses land inside the same clock quantum.

use std::sync::Arc;

/// A resident entry: key, payload and access bookkeeping.
#[derive(Debug)]
pub struct CacheEntry<K, V> {
    key: K,
    value: Arc<V>,
    use_count: u64,
    last_access: u64,
}

impl<K, V> CacheEntry<K, V> {
    /// Creates an entry on first population (`use_count == 1`).
    #[inline]
    pub(crate) fn new(key: K, value: Arc<V>, tick: u64) -> Self {
        Self {
            key,
            value,
            use_count: 1,
            last_access: tick,
        }
    }

    /// Records a hit: bumps the use counter and refreshes the access tick.
    #[inline]
    pub(crate) fn record_access(&mut self, tick: u64) {
        self.use_count = self.use_count.saturating_add(1);
        self.last_access = tick;
    }

    /// Records an overwrite, returning the replaced payload.
    #[inline]
    pub(crate) fn replace(&mut self, value: Arc<V>, tick: u64) -> Arc<V> {
        self.record_access(tick);
        std::mem::replace(&mut self.value, value)
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    #[inline]
    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    #[inline]
    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (K, Arc<V>) {
        (self.key, self.value)
    }
}

/// Outcome of a store `insert`.
///
/// `previous` is the overwritten payload when the key was already resident;
/// `evicted` is the victim removed to make room for a new key.
#[derive(Debug)]
pub struct Insertion<K, V> {
    pub previous: Option<Arc<V>>,
    pub evicted: Option<(K, Arc<V>)>,
}

impl<K, V> Insertion<K, V> {
    pub(crate) fn updated(previous: Arc<V>) -> Self {
        Self {
            previous: Some(previous),
            evicted: None,
        }
    }

    pub(crate) fn inserted(evicted: Option<(K, Arc<V>)>) -> Self {
        Self {
            previous: None,
            evicted,
        }
    }

    pub(crate) fn rejected() -> Self {
        Self {
            previous: None,
            evicted: None,
        }
    }
}
