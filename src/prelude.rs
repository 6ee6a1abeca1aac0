pub use crate::builder::{Cache, CacheBuilder};
pub use crate::config::{CacheConfig, PolicyKind};
pub use crate::error::{CacheError, ConfigError, MissingEntry};
pub use crate::interceptor::{AnyEntity, CachedService, EntityService, Erased, Identified, Payload, Typed};
pub use crate::key::{CacheKey, Scope};
pub use crate::observer::{CacheObserver, CacheStatsSnapshot, NoopObserver, StatsObserver, TracingObserver};
pub use crate::policy::lfu::ConcurrentLfuCache;
pub use crate::policy::lru::ConcurrentLruCache;
pub use crate::traits::CacheStore;
