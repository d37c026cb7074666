//! Subscription admin utilities.
//!
//! Support tooling for granting and revoking synthetic subscriptions,
//! typically wired to an internal console. Deliberately separate from
//! [`crate::AccessEngine`]: these require a [`SubscriptionAdminStore`] and
//! nothing reachable from a feature check can invoke a write.

use chrono::{Duration, Utc};
use tracing::info;

use crate::audit::{AccessAuditEvent, AccessAuditLogger, TracingAuditLogger};
use crate::catalog::PlanTier;
use crate::error::{AccessError, Result};
use crate::evaluator::FREE_PLAN;
use crate::records::{AccountRecord, SubscriptionKind};
use crate::storage::SubscriptionAdminStore;

/// Default validity window for granted subscriptions, in days.
const DEFAULT_GRANT_DAYS: i64 = 30;

/// Options for [`SubscriptionAdmin::grant_test_subscription`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrantOptions {
    /// Plan to grant.
    pub plan: PlanTier,
    /// Whether the grant is a trial or a paid subscription.
    pub kind: SubscriptionKind,
    /// How long the grant lasts.
    pub duration_days: i64,
}

impl Default for GrantOptions {
    fn default() -> Self {
        Self {
            plan: PlanTier::Professional,
            kind: SubscriptionKind::Paid,
            duration_days: DEFAULT_GRANT_DAYS,
        }
    }
}

impl GrantOptions {
    /// Options for a named plan with the default kind and duration.
    ///
    /// The name is matched case-insensitively; anything outside the known
    /// tiers is an error.
    pub fn plan_named(name: &str) -> Result<Self> {
        let plan = name
            .parse::<PlanTier>()
            .map_err(|_| AccessError::unknown_plan(name))?;
        Ok(Self {
            plan,
            ..Self::default()
        })
    }

    /// Switch the grant to a trial.
    #[must_use]
    pub fn as_trial(mut self) -> Self {
        self.kind = SubscriptionKind::Trial;
        self
    }

    /// Set the validity window.
    #[must_use]
    pub fn lasting_days(mut self, days: i64) -> Self {
        self.duration_days = days;
        self
    }
}

/// Grants and revokes synthetic subscriptions.
pub struct SubscriptionAdmin<St: SubscriptionAdminStore, L: AccessAuditLogger = TracingAuditLogger>
{
    store: St,
    audit: L,
}

impl<St: SubscriptionAdminStore> SubscriptionAdmin<St> {
    /// Create the utility over a writable store.
    #[must_use]
    pub fn new(store: St) -> Self {
        Self {
            store,
            audit: TracingAuditLogger,
        }
    }
}

impl<St: SubscriptionAdminStore, L: AccessAuditLogger> SubscriptionAdmin<St, L> {
    /// Swap the audit logger.
    #[must_use]
    pub fn with_audit_logger<L2: AccessAuditLogger>(self, audit: L2) -> SubscriptionAdmin<St, L2> {
        SubscriptionAdmin {
            store: self.store,
            audit,
        }
    }

    /// Write a synthetic subscription under an account key.
    ///
    /// Overwrites whatever record exists. Granting again refreshes the
    /// validity window, so repeating the call is safe.
    pub async fn grant_test_subscription(
        &self,
        key: &str,
        options: GrantOptions,
    ) -> Result<AccountRecord> {
        let record = AccountRecord {
            plan_type: Some(options.plan.as_str().to_string()),
            is_subscribed: true,
            is_trial_active: options.kind == SubscriptionKind::Trial,
            subscription_type: Some(options.kind),
            subscription_end_date: Some(Utc::now() + Duration::days(options.duration_days)),
            payment_amount: None,
            payment_date: None,
        };
        self.store.upsert_account(key, &record).await?;

        info!(
            target: "access::admin",
            key = %key,
            plan = %options.plan,
            kind = %options.kind,
            days = options.duration_days,
            "Test subscription granted"
        );
        self.audit
            .log(AccessAuditEvent::TestSubscriptionGranted {
                key: key.to_string(),
                plan: options.plan.as_str().to_string(),
            })
            .await;
        Ok(record)
    }

    /// Clear the subscription fields of an account.
    ///
    /// Clears the payment fields too, so the legacy payment rule cannot
    /// resurrect the subscription. Revoking a missing account is a no-op
    /// success and writes nothing; revoking twice is safe.
    pub async fn revoke_subscription(&self, key: &str) -> Result<()> {
        if self.store.account(key).await?.is_none() {
            return Ok(());
        }

        let cleared = AccountRecord {
            plan_type: Some(FREE_PLAN.to_string()),
            is_subscribed: false,
            is_trial_active: false,
            subscription_type: Some(SubscriptionKind::Free),
            subscription_end_date: None,
            payment_amount: None,
            payment_date: None,
        };
        self.store.upsert_account(key, &cleared).await?;

        info!(target: "access::admin", key = %key, "Subscription revoked");
        self.audit
            .log(AccessAuditEvent::SubscriptionRevoked {
                key: key.to_string(),
            })
            .await;
        Ok(())
    }
}
