//! In-memory rate limiter.
//!
//! Sliding-window request log per identifier (client IP, user id, ...).
//! State lives in process memory only, so limits are per instance.
//! Idle identifiers are pruned every few hundred checks; call
//! [`RateLimiter::prune`] from a timer for tighter bounds.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, warn};

/// Checks between opportunistic prunes of idle identifiers.
const PRUNE_EVERY: u64 = 256;

/// Limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window.
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests left in the current window after this one.
    pub remaining: u32,
    /// Time until the oldest recorded request leaves the window.
    pub retry_after: Duration,
}

/// Rate limiter shared across request handlers (clones share state).
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    hits: Arc<DashMap<String, Vec<Instant>>>,
    checks: Arc<AtomicU64>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            hits: Arc::new(DashMap::new()),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Record a request for `identifier` and decide whether it may proceed.
    /// Rejected requests are not recorded.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Instant::now())
    }

    fn check_at(&self, identifier: &str, now: Instant) -> RateLimitDecision {
        let window = self.config.window;
        let max = self.config.max_requests as usize;

        let (allowed, remaining, retry_after) = {
            let mut times = self.hits.entry(identifier.to_string()).or_default();

            // Drop requests that fell out of the window
            times.retain(|&t| now.saturating_duration_since(t) < window);

            let allowed = times.len() < max;
            if allowed {
                times.push(now);
            }

            let retry_after = times
                .first()
                .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or_default();
            let remaining = max.saturating_sub(times.len()) as u32;
            (allowed, remaining, retry_after)
        };

        // Entry guard is released; pruning locks every shard.
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }

        if allowed {
            debug!("Rate limit ok for {} ({} left)", identifier, remaining);
        } else {
            warn!(
                "Rate limit exceeded for {} (retry in {:?})",
                identifier, retry_after
            );
        }

        RateLimitDecision {
            allowed,
            remaining,
            retry_after,
        }
    }

    /// Forget all requests recorded for `identifier`.
    pub fn reset(&self, identifier: &str) {
        self.hits.remove(identifier);
    }

    /// Drop identifiers with no requests inside the window.
    /// Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let window = self.config.window;
        let before = self.hits.len();
        self.hits.retain(|_, times| {
            times.retain(|&t| now.saturating_duration_since(t) < window);
            !times.is_empty()
        });
        let pruned = before.saturating_sub(self.hits.len());
        if pruned > 0 {
            debug!("Pruned {} idle rate limit entries", pruned);
        }
        pruned
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.hits.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
