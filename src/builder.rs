//! Cache store builder.
//!
//! Turns a validated [`CacheConfig`] into a running store. The policy is
//! chosen once, here; afterwards callers hold a [`Cache`] and talk to it
//! through [`CacheStore`] without knowing which policy backs it.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use cachegate::builder::CacheBuilder;
//! use cachegate::config::{CacheConfig, PolicyKind};
//! use cachegate::traits::CacheStore;
//!
//! let cache = CacheBuilder::new(CacheConfig::lfu(100, Duration::from_secs(30)))
//!     .build::<u64, String>()
//!     .unwrap();
//! assert_eq!(cache.policy(), PolicyKind::Lfu);
//!
//! cache.put(1, Arc::new("hello".to_string()));
//! assert_eq!(*cache.take(&1).unwrap(), "hello");
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{CacheConfig, PolicyKind};
use crate::error::{CacheError, MissingEntry};
use crate::observer::{CacheObserver, NoopObserver};
use crate::policy::lfu::ConcurrentLfuCache;
use crate::policy::lru::ConcurrentLruCache;
use crate::traits::CacheStore;

/// A store whose policy was selected from configuration.
///
/// Clones share the same store.
#[derive(Debug)]
pub struct Cache<K, V> {
    inner: CacheInner<K, V>,
}

#[derive(Debug)]
enum CacheInner<K, V> {
    Lfu(ConcurrentLfuCache<K, V>),
    Lru(ConcurrentLruCache<K, V>),
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            CacheInner::Lfu(lfu) => CacheInner::Lfu(lfu.clone()),
            CacheInner::Lru(lru) => CacheInner::Lru(lru.clone()),
        };
        Cache { inner }
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn policy(&self) -> PolicyKind {
        match &self.inner {
            CacheInner::Lfu(_) => PolicyKind::Lfu,
            CacheInner::Lru(_) => PolicyKind::Lru,
        }
    }

    /// Entry TTL; `None` for LRU stores.
    pub fn ttl(&self) -> Option<Duration> {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu.ttl(),
            CacheInner::Lru(_) => None,
        }
    }

    /// The LFU store, if that policy was selected.
    pub fn as_lfu(&self) -> Option<&ConcurrentLfuCache<K, V>> {
        match &self.inner {
            CacheInner::Lfu(lfu) => Some(lfu),
            CacheInner::Lru(_) => None,
        }
    }

    /// The LRU store, if that policy was selected.
    pub fn as_lru(&self) -> Option<&ConcurrentLruCache<K, V>> {
        match &self.inner {
            CacheInner::Lfu(_) => None,
            CacheInner::Lru(lru) => Some(lru),
        }
    }

    fn store(&self) -> &dyn CacheStore<K, V> {
        match &self.inner {
            CacheInner::Lfu(lfu) => lfu,
            CacheInner::Lru(lru) => lru,
        }
    }
}

impl<K, V> CacheStore<K, V> for Cache<K, V>
where
    K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn put(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.store().put(key, value)
    }

    fn contains(&self, key: &K) -> bool {
        self.store().contains(key)
    }

    fn take(&self, key: &K) -> Result<Arc<V>, MissingEntry> {
        self.store().take(key)
    }

    fn delete(&self, key: &K) -> Option<Arc<V>> {
        self.store().delete(key)
    }

    fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.store().peek(key)
    }

    fn use_count(&self, key: &K) -> Option<u64> {
        self.store().use_count(key)
    }

    fn len(&self) -> usize {
        self.store().len()
    }

    fn capacity(&self) -> usize {
        self.store().capacity()
    }

    fn clear(&self) {
        self.store().clear()
    }
}

/// Builder for [`Cache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Validates the configuration and starts the store.
    ///
    /// # Errors
    ///
    /// [`CacheError::Config`] for invalid settings,
    /// [`CacheError::WorkerSpawn`] if the LFU expiry thread cannot start.
    pub fn build<K, V>(&self) -> Result<Cache<K, V>, CacheError>
    where
        K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        self.build_with_observer(Arc::new(NoopObserver))
    }

    /// Like [`build`](Self::build), reporting store events to `observer`.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub fn build_with_observer<K, V>(
        &self,
        observer: Arc<dyn CacheObserver<K, V>>,
    ) -> Result<Cache<K, V>, CacheError>
    where
        K: Eq + Hash + Ord + Clone + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        if let Err(err) = self.config.validate() {
            warn!(error = %err, "rejected cache configuration");
            return Err(err.into());
        }

        let capacity = self.config.capacity;
        let inner = match (self.config.policy, self.config.ttl()) {
            (PolicyKind::Lfu, Some(ttl)) => CacheInner::Lfu(
                ConcurrentLfuCache::with_ttl_and_observer(capacity, ttl, observer)?,
            ),
            (PolicyKind::Lfu, None) => {
                CacheInner::Lfu(ConcurrentLfuCache::with_observer(capacity, observer))
            },
            (PolicyKind::Lru, _) => {
                CacheInner::Lru(ConcurrentLruCache::with_observer(capacity, observer))
            },
        };

        info!(
            policy = %self.config.policy,
            capacity,
            ttl_ms = ?self.config.ttl_ms,
            "cache store ready"
        );
        Ok(Cache { inner })
    }
}

impl From<CacheConfig> for CacheBuilder {
    fn from(config: CacheConfig) -> Self {
        Self::new(config)
    }
}
