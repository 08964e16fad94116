//! Configuration types

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Empty-prefix prediction is on unless explicitly disabled.
pub const DEFAULT_PREDICT_EMPTIES: bool = true;

pub const ENV_MAX_ITEMS: &str = "TERMCACHE_MAX_ITEMS";
pub const ENV_MAX_AGE_MS: &str = "TERMCACHE_MAX_AGE_MS";
pub const ENV_PREDICT_EMPTIES: &str = "TERMCACHE_PREDICT_EMPTIES";

/// Cache configuration.
///
/// Deserializes from the camelCase shape `{ maxItems, maxAge, predictEmpties }`
/// with `maxAge` in milliseconds; any field may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawCacheOptions", into = "RawCacheOptions")]
pub struct CacheOptions {
    /// Maximum number of match-object entries; 0 means unbounded.
    pub max_items: usize,
    /// Entry TTL and idle-clear delay; zero means entries never expire.
    pub max_age: Duration,
    /// Whether to skip queries predicted empty by a shorter empty prefix.
    pub predict_empties: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_items: 0,
            max_age: Duration::ZERO,
            predict_empties: DEFAULT_PREDICT_EMPTIES,
        }
    }
}

impl CacheOptions {
    /// Create cache options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of match-object entries.
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the entry TTL / idle-clear delay.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Enable or disable empty-prefix prediction.
    pub fn with_predict_empties(mut self, enabled: bool) -> Self {
        self.predict_empties = enabled;
        self
    }

    /// Whether the match-object cache has a size cap.
    pub fn is_bounded(&self) -> bool {
        self.max_items > 0
    }

    /// Whether entries expire.
    pub fn expires(&self) -> bool {
        !self.max_age.is_zero()
    }

    /// Load options from environment variables.
    ///
    /// # Environment Variables
    /// - `TERMCACHE_MAX_ITEMS`: entry cap, 0 = unbounded (default: 0)
    /// - `TERMCACHE_MAX_AGE_MS`: TTL in milliseconds, 0 = never (default: 0)
    /// - `TERMCACHE_PREDICT_EMPTIES`: `true`/`false` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load options through an arbitrary variable lookup. Unset variables keep
    /// their defaults; unparsable ones are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(raw) = lookup(ENV_MAX_ITEMS) {
            options.max_items = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_MAX_ITEMS.to_string(),
                value: raw.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?;
        }

        if let Some(raw) = lookup(ENV_MAX_AGE_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_MAX_AGE_MS.to_string(),
                value: raw.clone(),
                reason: "expected milliseconds as a non-negative integer".to_string(),
            })?;
            options.max_age = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup(ENV_PREDICT_EMPTIES) {
            options.predict_empties = match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_PREDICT_EMPTIES.to_string(),
                        value: raw,
                        reason: "expected true or false".to_string(),
                    })
                }
            };
        }

        Ok(options)
    }
}

/// Wire shape of [`CacheOptions`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCacheOptions {
    #[serde(default)]
    max_items: Option<usize>,
    #[serde(default)]
    max_age: Option<u64>,
    #[serde(default)]
    predict_empties: Option<bool>,
}

impl From<RawCacheOptions> for CacheOptions {
    fn from(raw: RawCacheOptions) -> Self {
        Self {
            max_items: raw.max_items.unwrap_or(0),
            max_age: Duration::from_millis(raw.max_age.unwrap_or(0)),
            predict_empties: raw.predict_empties.unwrap_or(DEFAULT_PREDICT_EMPTIES),
        }
    }
}

impl From<CacheOptions> for RawCacheOptions {
    fn from(options: CacheOptions) -> Self {
        Self {
            max_items: Some(options.max_items),
            max_age: Some(u64::try_from(options.max_age.as_millis()).unwrap_or(u64::MAX)),
            predict_empties: Some(options.predict_empties),
        }
    }
}
