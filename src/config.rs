//! Cache configuration.
//!
//! Read once when a store is built; invalid settings are rejected there with
//! a [`ConfigError`] instead of surfacing on first use.
//!
//! | Field      | Type            | Default | Notes                               |
//! |------------|-----------------|---------|-------------------------------------|
//! | `capacity` | `usize`         | 1000    | Maximum resident entries, > 0       |
//! | `policy`   | [`PolicyKind`]  | `LRU`   | `"LFU"` or `"LRU"`, case-insensitive |
//! | `ttl_ms`   | `Option<u64>`   | none    | Required for LFU, rejected for LRU  |
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use cachegate::config::{CacheConfig, PolicyKind};
//!
//! assert_eq!("lfu".parse::<PolicyKind>(), Ok(PolicyKind::Lfu));
//!
//! let config = CacheConfig::lfu(256, Duration::from_secs(30));
//! assert!(config.validate().is_ok());
//! assert_eq!(config.ttl(), Some(Duration::from_secs(30)));
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Eviction policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyKind {
    /// Least frequently used, with per-entry TTL.
    Lfu,
    /// Least recently used, capacity-only.
    Lru,
}

impl PolicyKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Lfu => "LFU",
            PolicyKind::Lru => "LRU",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            name if name.eq_ignore_ascii_case("lfu") => Ok(PolicyKind::Lfu),
            name if name.eq_ignore_ascii_case("lru") => Ok(PolicyKind::Lru),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyKind {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PolicyKind> for String {
    fn from(kind: PolicyKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Settings for one cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of resident entries
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Eviction policy
    #[serde(default = "default_policy")]
    pub policy: PolicyKind,

    /// Entry time-to-live in milliseconds (LFU only)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

fn default_capacity() -> usize {
    1000
}

fn default_policy() -> PolicyKind {
    PolicyKind::Lru
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            policy: default_policy(),
            ttl_ms: None,
        }
    }
}

impl CacheConfig {
    /// LFU store with the given capacity and entry TTL.
    ///
    /// The TTL is kept in whole milliseconds, rounded up, so any non-zero
    /// duration stays non-zero.
    pub fn lfu(capacity: usize, ttl: Duration) -> Self {
        let ttl_ms = ttl.as_nanos().div_ceil(1_000_000);
        Self {
            capacity,
            policy: PolicyKind::Lfu,
            ttl_ms: Some(u64::try_from(ttl_ms).unwrap_or(u64::MAX)),
        }
    }

    /// LRU store with the given capacity.
    pub fn lru(capacity: usize) -> Self {
        Self {
            capacity,
            policy: PolicyKind::Lru,
            ttl_ms: None,
        }
    }

    /// Configured TTL, if any.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_ms.map(Duration::from_millis)
    }

    /// Reads `{prefix}_CAPACITY`, `{prefix}_POLICY` and `{prefix}_TTL_MS`.
    ///
    /// Unset variables fall back to the defaults; set but unparsable ones are
    /// errors. The result is validated before it is returned.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = env_var(prefix, "CAPACITY") {
            config.capacity = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "capacity",
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = env_var(prefix, "POLICY") {
            config.policy = raw.parse()?;
        }
        if let Some(raw) = env_var(prefix, "TTL_MS") {
            let ttl = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: "ttl_ms",
                value: raw.clone(),
            })?;
            config.ttl_ms = Some(ttl);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the settings, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        match (self.policy, self.ttl_ms) {
            (PolicyKind::Lfu, None) => Err(ConfigError::MissingTtl),
            (PolicyKind::Lfu, Some(0)) => Err(ConfigError::ZeroTtl),
            (PolicyKind::Lru, Some(_)) => Err(ConfigError::TtlNotSupported(PolicyKind::Lru)),
            _ => Ok(()),
        }
    }
}

fn env_var(prefix: &str, name: &str) -> Option<String> {
    std::env::var(format!("{prefix}_{name}")).ok()
}
