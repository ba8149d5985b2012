//! scopecache - Cache plumbing for the study dashboard.
//!
//! ## Architecture
//!
//! - `keys` - Scoped storage keys and invalidation tags
//! - `cache` - Tagged cache-or-compute store with Moka
//! - `ratelimit` - In-memory request rate limiting
//! - `security` - Resource-ownership checks with audit logging
//! - `config` - Environment configuration

pub mod cache;
pub mod config;
pub mod keys;
pub mod ratelimit;
pub mod security;

use cache::CacheStore;
use config::Config;
use keys::CacheKeyRegistry;
use ratelimit::RateLimiter;
use security::SecurityAudit;

/// Everything a request handler needs, built once from [`Config`].
#[derive(Debug, Clone)]
pub struct AppState {
    pub keys: CacheKeyRegistry,
    pub caches: CacheStore,
    pub rate_limiter: RateLimiter,
    pub audit: SecurityAudit,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            keys: CacheKeyRegistry::with_prefixes(config.key_prefixes.clone()),
            caches: CacheStore::new(config.cache.clone()),
            rate_limiter: RateLimiter::new(config.rate_limit),
            audit: SecurityAudit::new(config.audit_suspicious_threshold, config.audit_window),
        }
    }
}
