//! Billing identity resolution for delegated admins.
//!
//! Sub-accounts are registered in a delegated-admins collection; their
//! access bills against the admin who invited them. The resolver redirects a
//! principal's email to that inviter when a delegation exists, and degrades
//! to the principal's own email when the lookup cannot be completed.

use tracing::warn;

use crate::audit::{AccessAuditEvent, AccessAuditLogger, TracingAuditLogger};
use crate::storage::DirectoryStore;

/// How a billing email was arrived at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegationOutcome {
    /// The principal bills under their own email.
    Direct,
    /// The principal is a sub-account billing under their inviter.
    Delegated,
    /// The delegation lookup failed; the principal's own email was used.
    Unresolved,
}

/// The billing identity a principal resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub struct BillingIdentity {
    /// Email whose account record carries the subscription.
    pub email: String,
    /// How the email was arrived at.
    pub outcome: DelegationOutcome,
}

impl BillingIdentity {
    /// Check if the delegation lookup failed.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        self.outcome == DelegationOutcome::Unresolved
    }
}

/// Resolves which email a principal's subscription is billed under.
pub struct BillingIdentityResolver<St: DirectoryStore, L: AccessAuditLogger = TracingAuditLogger> {
    store: St,
    audit: L,
}

impl<St: DirectoryStore> BillingIdentityResolver<St> {
    /// Create a resolver over a directory store.
    #[must_use]
    pub fn new(store: St) -> Self {
        Self {
            store,
            audit: TracingAuditLogger,
        }
    }
}

impl<St: DirectoryStore, L: AccessAuditLogger> BillingIdentityResolver<St, L> {
    /// Swap the audit logger.
    #[must_use]
    pub fn with_audit_logger<L2: AccessAuditLogger>(
        self,
        audit: L2,
    ) -> BillingIdentityResolver<St, L2> {
        BillingIdentityResolver {
            store: self.store,
            audit,
        }
    }

    /// Resolve the billing identity for a principal email.
    ///
    /// Never fails: a store error degrades to the principal's own email,
    /// marked [`DelegationOutcome::Unresolved`] so callers can surface the
    /// partial failure. When several delegation records exist under one
    /// email the first takes effect and the anomaly is audited.
    pub async fn resolve(&self, principal_email: &str) -> BillingIdentity {
        let records = match self.store.delegated_admins_by_email(principal_email).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    target: "access::delegation",
                    email = %principal_email,
                    error = %err,
                    "Delegation lookup failed; continuing with the principal's own email"
                );
                self.audit
                    .log(AccessAuditEvent::DelegationUnresolved {
                        email: principal_email.to_string(),
                        reason: err.to_string(),
                    })
                    .await;
                return BillingIdentity {
                    email: principal_email.to_string(),
                    outcome: DelegationOutcome::Unresolved,
                };
            }
        };

        if records.len() > 1 {
            warn!(
                target: "access::delegation",
                email = %principal_email,
                count = records.len(),
                "Multiple delegated-admin records under one email; using the first"
            );
            self.audit
                .log(AccessAuditEvent::DuplicateDelegations {
                    email: principal_email.to_string(),
                    count: records.len(),
                })
                .await;
        }

        match records.into_iter().next() {
            Some(record) if !record.invited_by.is_empty() => BillingIdentity {
                email: record.invited_by,
                outcome: DelegationOutcome::Delegated,
            },
            _ => BillingIdentity {
                email: principal_email.to_string(),
                outcome: DelegationOutcome::Direct,
            },
        }
    }
}
