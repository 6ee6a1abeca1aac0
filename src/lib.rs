//! cachegate: an embedded read-through / write-through cache layer for
//! request-serving services.
//!
//! A [`CachedService`](interceptor::CachedService) wraps an entity service
//! and routes reads, writes and deletes through a bounded, thread-safe
//! [`CacheStore`](traits::CacheStore). The store's eviction policy (LFU with
//! per-entry TTL, or LRU) is picked once from a
//! [`CacheConfig`](config::CacheConfig) by the [`CacheBuilder`](builder::CacheBuilder).

pub mod builder;
pub mod config;
pub mod ds;
pub mod entry;
pub mod error;
pub mod expiry;
pub mod interceptor;
pub mod key;
pub mod observer;
pub mod policy;
pub mod prelude;
pub mod traits;
