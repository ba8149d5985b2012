//! Ownership checks with audit logging.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors raised by ownership checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    #[error("No authenticated user")]
    Unauthenticated,

    #[error("User {actor_id} does not own {resource_kind} {resource_id}")]
    AccessDenied {
        actor_id: String,
        resource_kind: String,
        resource_id: String,
    },
}

/// A resource whose owner is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Resource type, e.g. `document` or `folder`.
    pub kind: String,
    pub id: String,
    pub owner_id: String,
}

impl ResourceRef {
    pub fn new(kind: impl Into<String>, id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            owner_id: owner_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    AccessGranted,
    AccessDenied,
    Unauthenticated,
    SuspiciousActivity,
}

/// One audit record, logged as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    pub actor_id: &'a str,
    pub resource: &'a ResourceRef,
    /// Denials recorded for this actor inside the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denials: Option<u32>,
}

impl<'a> AuditEvent<'a> {
    fn new(outcome: AuditOutcome, actor_id: &'a str, resource: &'a ResourceRef) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome,
            actor_id,
            resource,
            denials: None,
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

/// Denials recorded between opportunistic prunes of idle actors.
const PRUNE_EVERY: u64 = 256;

/// Resource-ownership guard.
///
/// Every check is logged under the `security` target. Logging is
/// best-effort and never changes the result of a check.
///
/// Denials are counted over a sliding window per actor. An actor is
/// reported as suspicious each time its count climbs to the threshold, so a
/// fresh burst after a quiet period is reported again.
#[derive(Debug, Clone)]
pub struct SecurityAudit {
    denials: Arc<DashMap<String, Vec<Instant>>>,
    suspicious_threshold: u32,
    window: Duration,
    recorded: Arc<AtomicU64>,
}

impl SecurityAudit {
    /// Create an auditor that flags an actor once it reaches
    /// `suspicious_threshold` denials within `window` (0 disables flagging).
    pub fn new(suspicious_threshold: u32, window: Duration) -> Self {
        Self {
            denials: Arc::new(DashMap::new()),
            suspicious_threshold,
            window,
            recorded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check that `actor_id` owns `resource`.
    pub fn verify_ownership(&self, actor_id: &str, resource: &ResourceRef) -> Result<(), SecurityError> {
        self.verify_ownership_at(actor_id, resource, Instant::now())
    }

    fn verify_ownership_at(
        &self,
        actor_id: &str,
        resource: &ResourceRef,
        now: Instant,
    ) -> Result<(), SecurityError> {
        if actor_id.is_empty() {
            let event = AuditEvent::new(AuditOutcome::Unauthenticated, actor_id, resource);
            warn!(target: "security", event = %event.to_json(), "Unauthenticated access attempt");
            return Err(SecurityError::Unauthenticated);
        }

        if actor_id == resource.owner_id {
            let event = AuditEvent::new(AuditOutcome::AccessGranted, actor_id, resource);
            debug!(target: "security", event = %event.to_json(), "Access granted");
            return Ok(());
        }

        let denials = self.record_denial(actor_id, now);
        let mut event = AuditEvent::new(AuditOutcome::AccessDenied, actor_id, resource);
        event.denials = Some(denials);
        warn!(target: "security", event = %event.to_json(), "Access denied");

        if self.suspicious_threshold > 0 && denials == self.suspicious_threshold {
            event.outcome = AuditOutcome::SuspiciousActivity;
            error!(
                target: "security",
                event = %event.to_json(),
                "Actor reached {} denied ownership checks within {:?}",
                denials,
                self.window
            );
        }

        Err(SecurityError::AccessDenied {
            actor_id: actor_id.to_string(),
            resource_kind: resource.kind.clone(),
            resource_id: resource.id.clone(),
        })
    }

    /// Record a denial and return the actor's count inside the window.
    fn record_denial(&self, actor_id: &str, now: Instant) -> u32 {
        let window = self.window;
        let count = {
            let mut times = self.denials.entry(actor_id.to_string()).or_default();
            times.retain(|&t| now.saturating_duration_since(t) < window);
            times.push(now);
            u32::try_from(times.len()).unwrap_or(u32::MAX)
        };

        // The entry guard is released above; pruning locks every shard.
        if self.recorded.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune_at(now);
        }

        count
    }

    /// Denials recorded for an actor inside the current window.
    pub fn denials(&self, actor_id: &str) -> u32 {
        self.denials_at(actor_id, Instant::now())
    }

    fn denials_at(&self, actor_id: &str, now: Instant) -> u32 {
        self.denials
            .get(actor_id)
            .map(|times| {
                let recent = times
                    .iter()
                    .filter(|&&t| now.saturating_duration_since(t) < self.window)
                    .count();
                u32::try_from(recent).unwrap_or(u32::MAX)
            })
            .unwrap_or(0)
    }

    /// Reset an actor's denial count.
    pub fn clear(&self, actor_id: &str) {
        self.denials.remove(actor_id);
    }

    /// Drop actors with no denials inside the window.
    /// Returns how many were dropped.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let window = self.window;
        let before = self.denials.len();
        self.denials.retain(|_, times| {
            times.retain(|&t| now.saturating_duration_since(t) < window);
            !times.is_empty()
        });
        let pruned = before.saturating_sub(self.denials.len());
        if pruned > 0 {
            debug!(target: "security", "Pruned {} idle audit entries", pruned);
        }
        pruned
    }

    /// Number of actors with recorded denials.
    pub fn tracked(&self) -> usize {
        self.denials.len()
    }
}

impl Default for SecurityAudit {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(3600))
    }
}
