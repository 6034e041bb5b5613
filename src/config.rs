//! Registry configuration.
//!
//! ## Environment Variables
//!
//! - `KEYED_LOCK_REGISTRY_KEY`: namespace prefix for lease keys (default: `lock-registry`)
//! - `KEYED_LOCK_LEASE_TTL_MS`: lease lifetime in the store (default: 60000)
//! - `KEYED_LOCK_MAX_IDLE_AGE_MS`: age after which an unused local handle is evicted (default: 60000)
//! - `KEYED_LOCK_SWEEP_INTERVAL_MS`: reaper period (default: 1000)
//! - `KEYED_LOCK_POLL_MIN_MS` / `KEYED_LOCK_POLL_MAX_MS`: acquire retry backoff bounds (default: 10 / 100)
//! - `KEYED_LOCK_STORE`: `in-memory` | `memory` | `redis` (default: `in-memory`)
//! - `KEYED_LOCK_REDIS_URL`: Redis URL (default: `redis://127.0.0.1:6379`)
//!
//! The lease TTL and the idle age pull in opposite directions: short TTLs free
//! abandoned resources sooner at the cost of store traffic, short idle ages
//! keep the registry small at the cost of re-creating handles.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "KEYED_LOCK_";

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: String, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which lease store backs the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StoreConfig {
    #[default]
    InMemory,
    Redis { url: String },
}

/// Tunables for a [`LockRegistry`](crate::LockRegistry) and its reaper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockRegistryConfig {
    pub registry_key: String,
    pub lease_ttl_ms: u64,
    pub max_idle_age_ms: u64,
    pub sweep_interval_ms: u64,
    pub poll_interval_min_ms: u64,
    pub poll_interval_max_ms: u64,
    pub store: StoreConfig,
}

impl Default for LockRegistryConfig {
    fn default() -> Self {
        LockRegistryConfig {
            registry_key: "lock-registry".to_string(),
            lease_ttl_ms: 60_000,
            max_idle_age_ms: 60_000,
            sweep_interval_ms: 1_000,
            poll_interval_min_ms: 10,
            poll_interval_max_ms: 100,
            store: StoreConfig::InMemory,
        }
    }
}

impl LockRegistryConfig {
    /// Read the configuration from `KEYED_LOCK_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let millis = |suffix: &str, default: u64| -> Result<u64, ConfigError> {
            match get(suffix) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                    var: format!("{}{}", ENV_PREFIX, suffix),
                    value: raw,
                }),
            }
        };

        let defaults = Self::default();
        let store = match get("STORE")
            .unwrap_or_else(|| "in-memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "in-memory" | "memory" => StoreConfig::InMemory,
            "redis" => StoreConfig::Redis {
                url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            other => {
                return Err(ConfigError::InvalidEnv {
                    var: format!("{}STORE", ENV_PREFIX),
                    value: other.to_string(),
                })
            }
        };

        let config = LockRegistryConfig {
            registry_key: get("REGISTRY_KEY").unwrap_or(defaults.registry_key),
            lease_ttl_ms: millis("LEASE_TTL_MS", defaults.lease_ttl_ms)?,
            max_idle_age_ms: millis("MAX_IDLE_AGE_MS", defaults.max_idle_age_ms)?,
            sweep_interval_ms: millis("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms)?,
            poll_interval_min_ms: millis("POLL_MIN_MS", defaults.poll_interval_min_ms)?,
            poll_interval_max_ms: millis("POLL_MAX_MS", defaults.poll_interval_max_ms)?,
            store,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_key.is_empty() {
            return Err(ConfigError::Invalid("registry_key must not be empty".into()));
        }
        if self.lease_ttl_ms == 0 {
            return Err(ConfigError::Invalid("lease_ttl_ms must be positive".into()));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::Invalid("sweep_interval_ms must be positive".into()));
        }
        if self.poll_interval_min_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_min_ms must be positive".into(),
            ));
        }
        if self.poll_interval_min_ms > self.poll_interval_max_ms {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_min_ms ({}) exceeds poll_interval_max_ms ({})",
                self.poll_interval_min_ms, self.poll_interval_max_ms
            )));
        }
        Ok(())
    }

    pub fn with_registry_key(mut self, registry_key: impl Into<String>) -> Self {
        self.registry_key = registry_key.into();
        self
    }

    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl_ms = to_millis(ttl);
        self
    }

    pub fn with_max_idle_age(mut self, age: Duration) -> Self {
        self.max_idle_age_ms = to_millis(age);
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = to_millis(interval);
        self
    }

    pub fn with_poll_interval(mut self, min: Duration, max: Duration) -> Self {
        self.poll_interval_min_ms = to_millis(min);
        self.poll_interval_max_ms = to_millis(max);
        self
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    pub fn max_idle_age(&self) -> Duration {
        Duration::from_millis(self.max_idle_age_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn poll_interval_min(&self) -> Duration {
        Duration::from_millis(self.poll_interval_min_ms)
    }

    pub fn poll_interval_max(&self) -> Duration {
        Duration::from_millis(self.poll_interval_max_ms)
    }

    /// Remote key for a resource key: `"{registry_key}:{key}"`.
    pub fn lease_key(&self, key: &str) -> String {
        format!("{}:{}", self.registry_key, key)
    }
}

fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
