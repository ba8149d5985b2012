//! Cache configuration.

use std::time::Duration;

use crate::config::AppEnv;

/// Revalidation window outside production.
pub const DEV_REVALIDATE: Duration = Duration::from_secs(60);

/// Revalidation window in production.
pub const PROD_REVALIDATE: Duration = Duration::from_secs(3600);

/// Configuration for a tagged cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache.
    pub max_capacity: u64,

    /// How long a computed value is served before it is recomputed.
    /// Handed straight to the provider as its time-to-live.
    pub revalidate: Duration,

    /// Time-to-idle for cache entries.
    /// Entries are evicted if not accessed within this duration.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            revalidate: DEV_REVALIDATE,
            tti: None,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..Default::default()
        }
    }

    /// Default config for the given environment.
    /// Short revalidation while developing, long in production.
    pub fn for_environment(env: AppEnv) -> Self {
        let revalidate = match env {
            AppEnv::Production => PROD_REVALIDATE,
            AppEnv::Development => DEV_REVALIDATE,
        };
        Self {
            revalidate,
            ..Default::default()
        }
    }

    /// Set max capacity for cache (builder pattern).
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Set the revalidation window.
    #[must_use]
    pub fn revalidate(mut self, duration: Duration) -> Self {
        self.revalidate = duration;
        self
    }

    /// Set time-to-idle for cache entries.
    #[must_use]
    pub fn tti(mut self, duration: Duration) -> Self {
        self.tti = Some(duration);
        self
    }
}
