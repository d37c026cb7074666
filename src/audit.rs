//! Audit logging for access resolution.
//!
//! Provides a trait-based audit logging system for the events operators care
//! about after the fact: every fallback the engine took and every synthetic
//! subscription an admin wrote.

use std::fmt;

/// Audit event types for access resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessAuditEvent {
    /// The platform-wide enforcement flag was found switched off.
    GlobalOverrideApplied { subject: String },
    /// The store was unreachable and the outage posture was applied.
    OutageFallback {
        subject: String,
        reason: String,
        granted: bool,
    },
    /// An account record could not be decoded.
    MalformedRecord { key: String, reason: String },
    /// The settings document could not be decoded.
    MalformedSettings { reason: String },
    /// More than one delegated-admin record was registered under one email.
    DuplicateDelegations { email: String, count: usize },
    /// The delegation lookup failed and the principal's own email was used.
    DelegationUnresolved { email: String, reason: String },
    /// A synthetic subscription was written.
    TestSubscriptionGranted { key: String, plan: String },
    /// An account's subscription fields were cleared.
    SubscriptionRevoked { key: String },
}

impl fmt::Display for AccessAuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GlobalOverrideApplied { subject } => {
                write!(f, "Global override applied: subject={}", subject)
            }
            Self::OutageFallback { subject, reason, granted } => {
                write!(
                    f,
                    "Outage fallback: subject={}, granted={}, reason={}",
                    subject, granted, reason
                )
            }
            Self::MalformedRecord { key, reason } => {
                write!(f, "Malformed account record: key={}, reason={}", key, reason)
            }
            Self::MalformedSettings { reason } => {
                write!(f, "Malformed settings document: reason={}", reason)
            }
            Self::DuplicateDelegations { email, count } => {
                write!(f, "Duplicate delegations: email={}, count={}", email, count)
            }
            Self::DelegationUnresolved { email, reason } => {
                write!(f, "Delegation unresolved: email={}, reason={}", email, reason)
            }
            Self::TestSubscriptionGranted { key, plan } => {
                write!(f, "Test subscription granted: key={}, plan={}", key, plan)
            }
            Self::SubscriptionRevoked { key } => {
                write!(f, "Subscription revoked: key={}", key)
            }
        }
    }
}

/// Trait for audit logging backends.
///
/// Implement this trait to integrate with your logging system (e.g., database,
/// external service, file-based logging).
#[allow(async_fn_in_trait)]
pub trait AccessAuditLogger: Send + Sync {
    /// Log an access audit event.
    ///
    /// Implementations should handle failures gracefully (e.g., log to stderr)
    /// to avoid disrupting access checks.
    async fn log(&self, event: AccessAuditEvent);
}

/// No-op audit logger that does nothing.
///
/// Use this when audit logging is not needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAuditLogger;

impl AccessAuditLogger for NoOpAuditLogger {
    async fn log(&self, _event: AccessAuditEvent) {
        // No-op
    }
}

/// Tracing-based audit logger.
///
/// Logs audit events using the `tracing` crate at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLogger;

impl AccessAuditLogger for TracingAuditLogger {
    async fn log(&self, event: AccessAuditEvent) {
        tracing::info!(
            target: "access::audit",
            event_type = %event_kind(&event),
            "{}", event
        );
    }
}

/// Get the event kind as a string for structured logging.
fn event_kind(event: &AccessAuditEvent) -> &'static str {
    match event {
        AccessAuditEvent::GlobalOverrideApplied { .. } => "global_override_applied",
        AccessAuditEvent::OutageFallback { .. } => "outage_fallback",
        AccessAuditEvent::MalformedRecord { .. } => "malformed_record",
        AccessAuditEvent::MalformedSettings { .. } => "malformed_settings",
        AccessAuditEvent::DuplicateDelegations { .. } => "duplicate_delegations",
        AccessAuditEvent::DelegationUnresolved { .. } => "delegation_unresolved",
        AccessAuditEvent::TestSubscriptionGranted { .. } => "test_subscription_granted",
        AccessAuditEvent::SubscriptionRevoked { .. } => "subscription_revoked",
    }
}

/// Test support: an audit logger that records events for inspection.
pub mod test {
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::{AccessAuditEvent, AccessAuditLogger};

    /// Audit logger that records every event it is given.
    ///
    /// Clones share the same event buffer, so keep one handle for
    /// assertions and give another to the component under test.
    #[derive(Clone, Default)]
    pub struct RecordingAuditLogger {
        events: Arc<Mutex<Vec<AccessAuditEvent>>>,
    }

    impl RecordingAuditLogger {
        /// Create an empty recording logger.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Get a copy of every recorded event.
        pub async fn events(&self) -> Vec<AccessAuditEvent> {
            self.events.lock().await.clone()
        }
    }

    impl AccessAuditLogger for RecordingAuditLogger {
        async fn log(&self, event: AccessAuditEvent) {
            self.events.lock().await.push(event);
        }
    }
}
