//! The composed access engine.
//!
//! Wires the delegation resolver, the subscription evaluator, the plan
//! catalog, and the sub-admin overlay into the calls hosts actually make:
//! a boolean feature check and a display snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use floodgate::{AccessEngine, InMemoryDirectory, Principal};
//!
//! let engine = AccessEngine::new(InMemoryDirectory::new());
//! let principal = Principal::new("owner@example.com", "uid-1");
//!
//! if engine.check_access(&principal, "Inventory Tool").await {
//!     // render the inventory module
//! }
//! let snapshot = engine.subscription_snapshot(&principal).await;
//! println!("{} days left", snapshot.days_remaining.unwrap_or(0));
//! ```

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tracing::debug;

use crate::audit::{AccessAuditLogger, TracingAuditLogger};
use crate::catalog::{features, PlanCatalog};
use crate::config::EngineConfig;
use crate::delegation::BillingIdentityResolver;
use crate::evaluator::{
    classify_record, DecisionRule, SubscriptionEvaluator, SubscriptionState,
};
use crate::overlay;
use crate::records::{Principal, SubscriptionKind};
use crate::storage::{DirectoryStore, WatchStore};

/// Feature key denied to trial subscriptions regardless of plan.
const TRIAL_GATED_FEATURE: &str = features::DESIGNS;

/// Display-oriented view of a principal's subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[must_use]
pub struct SubscriptionSnapshot {
    /// Billing email the state was computed for. Differs from the
    /// principal's own email for sub-accounts.
    pub billing_email: String,
    /// Whether access is currently held.
    pub is_subscribed: bool,
    /// Plan label for display.
    pub plan_type: String,
    /// How the account is paying.
    pub subscription_type: SubscriptionKind,
    /// End of the current trial or paid period.
    pub subscription_end_date: Option<DateTime<Utc>>,
    /// Whole days until the period ends. `None` without an end date or once
    /// the end has passed.
    pub days_remaining: Option<i64>,
    /// The guard that produced the state. Lets clients word their banners:
    /// a lapsed trial reads differently from a missing account.
    pub rule: DecisionRule,
}

impl SubscriptionSnapshot {
    fn from_state(billing_email: String, state: SubscriptionState, now: DateTime<Utc>) -> Self {
        let days_remaining = state.subscription_end_date.and_then(|end| {
            if end > now {
                Some(end.signed_duration_since(now).num_days())
            } else {
                None
            }
        });
        Self {
            billing_email,
            is_subscribed: state.is_subscribed,
            plan_type: state.plan_type,
            subscription_type: state.subscription_type,
            subscription_end_date: state.subscription_end_date,
            days_remaining,
            rule: state.rule,
        }
    }
}

/// Access resolution engine.
///
/// Composes the full pipeline behind one question: may this principal use
/// this feature right now? Both entry points are infallible; every store
/// failure resolves through the evaluator's fallback states.
pub struct AccessEngine<St: DirectoryStore, L: AccessAuditLogger = TracingAuditLogger> {
    resolver: BillingIdentityResolver<St, L>,
    evaluator: SubscriptionEvaluator<St, L>,
    catalog: PlanCatalog,
    store: St,
}

impl<St: DirectoryStore + Clone> AccessEngine<St> {
    /// Create an engine with the default fail-open configuration, the
    /// standard plan catalog, and tracing-based audit logging.
    #[must_use]
    pub fn new(store: St) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(store: St, config: EngineConfig) -> Self {
        Self {
            resolver: BillingIdentityResolver::new(store.clone()),
            evaluator: SubscriptionEvaluator::with_config(store.clone(), config),
            catalog: PlanCatalog::default(),
            store,
        }
    }
}

impl<St: DirectoryStore, L: AccessAuditLogger> AccessEngine<St, L> {
    /// Replace the plan catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: PlanCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Swap the audit logger on every component.
    #[must_use]
    pub fn with_audit_logger<L2>(self, logger: L2) -> AccessEngine<St, L2>
    where
        L2: AccessAuditLogger + Clone,
    {
        AccessEngine {
            resolver: self.resolver.with_audit_logger(logger.clone()),
            evaluator: self.evaluator.with_audit_logger(logger),
            catalog: self.catalog,
            store: self.store,
        }
    }

    /// Decide whether a principal may use a feature right now.
    ///
    /// `feature` is normally a display name ("Inventory Tool"); internal
    /// keys are accepted too. Unknown features and unknown plans answer
    /// `false` rather than erroring.
    pub async fn check_access(&self, principal: &Principal, feature: &str) -> bool {
        let identity = self.resolver.resolve(&principal.email).await;
        let state = self
            .evaluator
            .evaluate(&identity.email, Some(&principal.uid))
            .await;

        // Universal-access states skip every later gate, including the
        // sub-admin overlay.
        if state.is_universal() {
            return true;
        }
        if !state.is_subscribed {
            return false;
        }

        // Trial subscriptions never get design management, whatever the
        // plan says.
        if state.subscription_type == SubscriptionKind::Trial
            && self.catalog.resolve_feature_key(feature) == Some(TRIAL_GATED_FEATURE)
        {
            debug!(
                target: "access::engine",
                email = %identity.email,
                feature,
                "Feature gated off for trial subscriptions"
            );
            return false;
        }

        if !self.catalog.plan_allows(&state.plan_type, feature) {
            return false;
        }

        // Sub-accounts clear a second gate: their own grant map.
        if principal.is_sub_account() {
            return overlay::sub_admin_allows(principal, feature);
        }

        true
    }

    /// Build the display snapshot for a principal.
    pub async fn subscription_snapshot(&self, principal: &Principal) -> SubscriptionSnapshot {
        let identity = self.resolver.resolve(&principal.email).await;
        let state = self
            .evaluator
            .evaluate(&identity.email, Some(&principal.uid))
            .await;
        SubscriptionSnapshot::from_state(identity.email, state, Utc::now())
    }
}

impl<St: WatchStore, L: AccessAuditLogger> AccessEngine<St, L> {
    /// Live snapshots of a principal's billing account.
    ///
    /// Resolves the billing identity once, then yields a snapshot for the
    /// record's current state and for every change, each classified from
    /// scratch. Only the record-level rules apply on this path; the global
    /// override and the outage fallback belong to the check path. Dropping
    /// the stream tears the watch down.
    pub async fn watch_snapshot(
        &self,
        principal: &Principal,
    ) -> BoxStream<'static, SubscriptionSnapshot> {
        let identity = self.resolver.resolve(&principal.email).await;
        let email = identity.email;
        let stream = self.store.watch_account(&email);
        Box::pin(stream.map(move |record| {
            let now = Utc::now();
            let state = match &record {
                Some(record) => classify_record(record, now),
                None => SubscriptionState::not_subscribed(DecisionRule::MissingAccount),
            };
            SubscriptionSnapshot::from_state(email.clone(), state, now)
        }))
    }
}
