//! Error types for the cachegate library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration is invalid (zero
//!   capacity, unknown policy name, missing or misplaced TTL). Raised at
//!   construction time; no store is created.
//! - [`MissingEntry`]: Returned by [`CacheStore::take`](crate::traits::CacheStore::take)
//!   when the key is not resident. Callers are expected to check
//!   [`contains`](crate::traits::CacheStore::contains) first; under concurrency
//!   the entry may still vanish in between, which the interceptor treats as a
//!   miss.
//! - [`CacheError`]: Returned by [`CacheBuilder::build`](crate::builder::CacheBuilder::build),
//!   wrapping configuration failures and expiry-worker spawn failures.
//!
//! Failures of a wrapped service are never converted: they surface as the
//! service's own error type.
//!
//! ## Example Usage
//!
//! ```
//! use cachegate::config::CacheConfig;
//! use cachegate::error::ConfigError;
//!
//! let err = CacheConfig::lru(0).validate().unwrap_err();
//! assert_eq!(err, ConfigError::ZeroCapacity);
//! assert!(err.to_string().contains("capacity"));
//! ```

use thiserror::Error;

use crate::config::PolicyKind;

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity must be a positive entry count.
    #[error("cache capacity must be > 0")]
    ZeroCapacity,

    /// Policy name did not match any known policy.
    #[error("unknown eviction policy: {0:?} (expected \"LFU\" or \"LRU\")")]
    UnknownPolicy(String),

    /// The LFU policy needs a TTL.
    #[error("the LFU policy requires a ttl")]
    MissingTtl,

    /// A TTL of zero would expire entries immediately.
    #[error("cache ttl must be > 0")]
    ZeroTtl,

    /// A TTL was configured for a policy without time-based expiry.
    #[error("ttl is not supported by the {0} policy")]
    TtlNotSupported(PolicyKind),

    /// A raw configuration value could not be parsed.
    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// `take` was called for a key that is not resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("take called for a key that is not resident")]
pub struct MissingEntry;

/// Error returned while building a cache store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Configuration was rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The background expiry thread could not be started.
    #[error("failed to spawn expiry worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}
