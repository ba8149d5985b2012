//! Configuration module.
//!
//! Loads configuration from environment variables. Every setting has a
//! default, so an empty environment yields a working development config.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::CacheConfig;
use crate::keys::KeyPrefixes;
use crate::ratelimit::RateLimitConfig;

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub env: AppEnv,

    /// Settings handed to every cache created through the store.
    pub cache: CacheConfig,

    /// Leading key segment per scoping family.
    pub key_prefixes: KeyPrefixes,

    pub rate_limit: RateLimitConfig,

    /// Denials after which an actor is reported as suspicious.
    pub audit_suspicious_threshold: u32,

    /// Window over which denials are counted.
    pub audit_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = lookup("APP_ENV")
            .map(|value| AppEnv::parse(&value))
            .unwrap_or_default();

        let mut cache = CacheConfig::for_environment(env);
        if let Some(secs) = parse_var::<u64>(&lookup, "CACHE_REVALIDATE_SECS").filter(|s| *s > 0) {
            cache = cache.revalidate(Duration::from_secs(secs));
        }
        if let Some(capacity) = parse_var::<u64>(&lookup, "CACHE_MAX_CAPACITY") {
            cache = cache.max_capacity(capacity);
        }

        let defaults = KeyPrefixes::default();
        let key_prefixes = KeyPrefixes {
            subject: non_empty(&lookup, "CACHE_SUBJECT_PREFIX").unwrap_or(defaults.subject),
            group: non_empty(&lookup, "CACHE_GROUP_PREFIX").unwrap_or(defaults.group),
        };

        let mut rate_limit = RateLimitConfig::default();
        if let Some(max) = parse_var::<u32>(&lookup, "RATE_LIMIT_MAX_REQUESTS") {
            rate_limit.max_requests = max;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "RATE_LIMIT_WINDOW_SECS").filter(|s| *s > 0) {
            rate_limit.window = Duration::from_secs(secs);
        }

        let audit_suspicious_threshold =
            parse_var::<u32>(&lookup, "AUDIT_SUSPICIOUS_THRESHOLD").unwrap_or(5);
        let audit_window = parse_var::<u64>(&lookup, "AUDIT_WINDOW_SECS")
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3600));

        Self {
            env,
            cache,
            key_prefixes,
            rate_limit,
            audit_suspicious_threshold,
            audit_window,
        }
    }
}

/// Parse a variable, falling back to `None` (and a warning) on bad input.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
