//! Subscription state evaluation.
//!
//! Turns a billing email's stored account into a [`SubscriptionState`]
//! through a strict priority chain: the platform-wide override first, then
//! the account lookup, then the record-level rules (trial, legacy manual
//! payment, current-period fields, not-subscribed default). The first rule
//! whose guard matches decides; later rules never soften an earlier answer.
//!
//! Evaluation never fails. Outages and undecodable documents each map to a
//! defined state, and every fallback is logged and audited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{AccessAuditEvent, AccessAuditLogger, TracingAuditLogger};
use crate::catalog::{PlanTier, ALL_ACCESS_PLAN};
use crate::config::{EngineConfig, OutagePolicy};
use crate::error::StoreError;
use crate::records::{AccountRecord, SubscriptionKind};
use crate::storage::DirectoryStore;

/// Payment window for the legacy manual-payment rule, in whole days.
/// Elapsed time is truncated to days before the comparison, so the boundary
/// is inclusive.
pub const LEGACY_PAYMENT_WINDOW_DAYS: i64 = 30;

// Amount thresholds for deriving a plan from a manual payment, in minor
// currency units.
const PROFESSIONAL_AMOUNT: f64 = 25_000.0;
const GROWTH_AMOUNT: f64 = 15_000.0;
const STARTER_AMOUNT: f64 = 10_000.0;

/// Plan label for accounts without a subscription. The mixed casing is
/// load-bearing: client display logic matches on it exactly, and the plan
/// catalog holds no such plan, so it grants nothing.
pub const FREE_PLAN: &str = "Free";

/// Plan label assumed when a subscribed record predates the plan field.
/// Mixed casing preserved for the same reason as [`FREE_PLAN`].
pub const DEFAULT_PLAN: &str = "Starter";

/// Which guard in the priority chain produced a subscription state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    /// Platform-wide enforcement is switched off.
    GlobalOverride,
    /// The store was unreachable; the configured outage posture applied.
    OutageFallback,
    /// No account record exists under either key.
    MissingAccount,
    /// An account record exists but could not be decoded.
    MalformedRecord,
    /// A trial with an end date still in the future.
    ActiveTrial,
    /// A trial whose end date has passed.
    LapsedTrial,
    /// A manual payment decided the outcome.
    LegacyPayment,
    /// The subscribed flag with a future end date.
    CurrentPeriod,
    /// No rule matched.
    NoSubscription,
}

impl DecisionRule {
    /// Get the wire representation of the rule.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalOverride => "global_override",
            Self::OutageFallback => "outage_fallback",
            Self::MissingAccount => "missing_account",
            Self::MalformedRecord => "malformed_record",
            Self::ActiveTrial => "active_trial",
            Self::LapsedTrial => "lapsed_trial",
            Self::LegacyPayment => "legacy_payment",
            Self::CurrentPeriod => "current_period",
            Self::NoSubscription => "no_subscription",
        }
    }
}

impl std::fmt::Display for DecisionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of evaluating a billing identity's subscription.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[must_use]
pub struct SubscriptionState {
    /// Whether the identity currently holds access.
    pub is_subscribed: bool,
    /// Plan label. Canonical upper-case for known tiers, plus the literal
    /// labels [`FREE_PLAN`] and [`DEFAULT_PLAN`] where rules produce them.
    pub plan_type: String,
    /// How the account is paying.
    pub subscription_type: SubscriptionKind,
    /// End of the current trial or paid period, when the deciding rule
    /// carries one.
    pub subscription_end_date: Option<DateTime<Utc>>,
    /// The guard that produced this state.
    pub rule: DecisionRule,
}

impl SubscriptionState {
    /// Universal-access state used by the global override and the fail-open
    /// outage branch.
    #[must_use]
    pub fn all_access(rule: DecisionRule) -> Self {
        Self {
            is_subscribed: true,
            plan_type: ALL_ACCESS_PLAN.to_string(),
            subscription_type: SubscriptionKind::Paid,
            subscription_end_date: None,
            rule,
        }
    }

    /// Not-subscribed state with the [`FREE_PLAN`] label.
    #[must_use]
    pub fn not_subscribed(rule: DecisionRule) -> Self {
        Self {
            is_subscribed: false,
            plan_type: FREE_PLAN.to_string(),
            subscription_type: SubscriptionKind::Free,
            subscription_end_date: None,
            rule,
        }
    }

    /// Check if this state grants access without consulting the plan
    /// catalog or the sub-admin overlay.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.is_subscribed
            && matches!(
                self.rule,
                DecisionRule::GlobalOverride | DecisionRule::OutageFallback
            )
    }
}

/// Evaluates the subscription state behind a billing email.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::{InMemoryDirectory, SubscriptionEvaluator};
///
/// let evaluator = SubscriptionEvaluator::new(InMemoryDirectory::new());
/// let state = evaluator.evaluate("owner@example.com", None).await;
/// assert!(!state.is_subscribed);
/// ```
pub struct SubscriptionEvaluator<St: DirectoryStore, L: AccessAuditLogger = TracingAuditLogger> {
    store: St,
    config: EngineConfig,
    audit: L,
}

impl<St: DirectoryStore> SubscriptionEvaluator<St> {
    /// Create an evaluator with the default fail-open configuration.
    #[must_use]
    pub fn new(store: St) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    /// Create an evaluator with an explicit configuration.
    #[must_use]
    pub fn with_config(store: St, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            audit: TracingAuditLogger,
        }
    }
}

impl<St: DirectoryStore, L: AccessAuditLogger> SubscriptionEvaluator<St, L> {
    /// Swap the audit logger.
    #[must_use]
    pub fn with_audit_logger<L2: AccessAuditLogger>(
        self,
        audit: L2,
    ) -> SubscriptionEvaluator<St, L2> {
        SubscriptionEvaluator {
            store: self.store,
            config: self.config,
            audit,
        }
    }

    /// Evaluate the subscription state for a billing email.
    ///
    /// `fallback_id` is tried as a second account key when no record exists
    /// under the email. The settings document is read fresh on every call,
    /// so flipping the enforcement flag takes effect immediately and in both
    /// directions.
    pub async fn evaluate(
        &self,
        billing_email: &str,
        fallback_id: Option<&str>,
    ) -> SubscriptionState {
        match self.store.subscription_settings().await {
            Ok(Some(settings)) if settings.enforcement_disabled() => {
                debug!(
                    target: "access::evaluator",
                    subject = %billing_email,
                    "Subscription enforcement disabled platform-wide"
                );
                self.audit
                    .log(AccessAuditEvent::GlobalOverrideApplied {
                        subject: billing_email.to_string(),
                    })
                    .await;
                return SubscriptionState::all_access(DecisionRule::GlobalOverride);
            }
            Ok(_) => {}
            Err(err @ StoreError::Unavailable { .. }) => {
                return self.outage_state(billing_email, &err).await;
            }
            Err(err) => {
                warn!(
                    target: "access::evaluator",
                    error = %err,
                    "Settings document undecodable; treating enforcement as on"
                );
                self.audit
                    .log(AccessAuditEvent::MalformedSettings {
                        reason: err.to_string(),
                    })
                    .await;
            }
        }

        let record = match self.fetch_account(billing_email, fallback_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return SubscriptionState::not_subscribed(DecisionRule::MissingAccount),
            Err(err @ StoreError::Unavailable { .. }) => {
                return self.outage_state(billing_email, &err).await;
            }
            Err(StoreError::Malformed { key, reason }) => {
                warn!(
                    target: "access::evaluator",
                    key = %key,
                    reason = %reason,
                    "Account record undecodable; treating as not subscribed"
                );
                self.audit
                    .log(AccessAuditEvent::MalformedRecord { key, reason })
                    .await;
                return SubscriptionState::not_subscribed(DecisionRule::MalformedRecord);
            }
        };

        classify_record(&record, Utc::now())
    }

    async fn fetch_account(
        &self,
        email: &str,
        fallback_id: Option<&str>,
    ) -> Result<Option<AccountRecord>, StoreError> {
        if let Some(record) = self.store.account(email).await? {
            return Ok(Some(record));
        }
        match fallback_id {
            Some(id) if !id.is_empty() => self.store.account(id).await,
            _ => Ok(None),
        }
    }

    async fn outage_state(&self, subject: &str, err: &StoreError) -> SubscriptionState {
        let granted = self.config.outage_policy == OutagePolicy::FailOpen;
        warn!(
            target: "access::evaluator",
            subject = %subject,
            error = %err,
            granted,
            "Store unreachable during evaluation; applying outage fallback"
        );
        self.audit
            .log(AccessAuditEvent::OutageFallback {
                subject: subject.to_string(),
                reason: err.to_string(),
                granted,
            })
            .await;
        if granted {
            SubscriptionState::all_access(DecisionRule::OutageFallback)
        } else {
            SubscriptionState::not_subscribed(DecisionRule::OutageFallback)
        }
    }
}

/// Classify an account record at a point in time.
///
/// This is the record-level portion of the rule chain, kept pure so the
/// arithmetic can be pinned down in tests and reused by the watch path.
#[must_use]
pub fn classify_record(record: &AccountRecord, now: DateTime<Utc>) -> SubscriptionState {
    // Trial rule. A started trial with an end date decides the outcome
    // either way: a lapsed trial must not fall through to the payment
    // rules below.
    if record.subscription_type == Some(SubscriptionKind::Trial) && record.is_trial_active {
        if let Some(end) = record.subscription_end_date {
            if end > now {
                return SubscriptionState {
                    is_subscribed: true,
                    plan_type: canonical_plan(record.plan_type.as_deref()),
                    subscription_type: SubscriptionKind::Trial,
                    subscription_end_date: Some(end),
                    rule: DecisionRule::ActiveTrial,
                };
            }
            return SubscriptionState::not_subscribed(DecisionRule::LapsedTrial);
        }
    }

    // Legacy manual-payment rule. Decides from the payment fields alone and
    // outranks the current-period fields: a payment inside the window keeps
    // access even when subscriptionEndDate says expired.
    if let (Some(amount), Some(paid_at)) = (record.payment_amount, record.payment_date) {
        if amount > 0.0 {
            let elapsed_days = now.signed_duration_since(paid_at).num_days();
            return SubscriptionState {
                is_subscribed: elapsed_days <= LEGACY_PAYMENT_WINDOW_DAYS,
                plan_type: plan_from_amount(amount).to_string(),
                subscription_type: SubscriptionKind::Paid,
                subscription_end_date: None,
                rule: DecisionRule::LegacyPayment,
            };
        }
    }

    // Current-period fields.
    if record.is_subscribed {
        if let Some(end) = record.subscription_end_date {
            if end > now {
                return SubscriptionState {
                    is_subscribed: true,
                    plan_type: canonical_plan(record.plan_type.as_deref()),
                    subscription_type: record.subscription_type.unwrap_or(SubscriptionKind::Paid),
                    subscription_end_date: Some(end),
                    rule: DecisionRule::CurrentPeriod,
                };
            }
        }
    }

    SubscriptionState::not_subscribed(DecisionRule::NoSubscription)
}

/// Canonicalize a stored plan label: known tiers render upper-case, an
/// absent or blank label becomes [`DEFAULT_PLAN`], and anything else passes
/// through unchanged for the catalog to reject.
fn canonical_plan(raw: Option<&str>) -> String {
    match raw {
        None => DEFAULT_PLAN.to_string(),
        Some(label) if label.trim().is_empty() => DEFAULT_PLAN.to_string(),
        Some(label) => match label.parse::<PlanTier>() {
            Ok(tier) => tier.as_str().to_string(),
            Err(_) => label.to_string(),
        },
    }
}

/// Derive a plan label from a manual payment amount.
fn plan_from_amount(amount: f64) -> &'static str {
    if amount >= PROFESSIONAL_AMOUNT {
        PlanTier::Professional.as_str()
    } else if amount >= GROWTH_AMOUNT {
        PlanTier::Growth.as_str()
    } else if amount >= STARTER_AMOUNT {
        PlanTier::Starter.as_str()
    } else {
        FREE_PLAN
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::audit::test::RecordingAuditLogger;
    use crate::records::SubscriptionSettings;
    use crate::storage::memory::InMemoryDirectory;

    fn trial_record(plan: Option<&str>, end: DateTime<Utc>) -> AccountRecord {
        AccountRecord {
            plan_type: plan.map(str::to_string),
            subscription_type: Some(SubscriptionKind::Trial),
            is_trial_active: true,
            subscription_end_date: Some(end),
            ..AccountRecord::default()
        }
    }

    fn payment_record(amount: f64, paid_at: DateTime<Utc>) -> AccountRecord {
        AccountRecord {
            payment_amount: Some(amount),
            payment_date: Some(paid_at),
            ..AccountRecord::default()
        }
    }

    // ===== classify_record =====

    #[test]
    fn test_active_trial() {
        let now = Utc::now();
        let state = classify_record(
            &trial_record(Some("professional"), now + Duration::days(7)),
            now,
        );

        assert!(state.is_subscribed);
        assert_eq!(state.plan_type, "PROFESSIONAL");
        assert_eq!(state.subscription_type, SubscriptionKind::Trial);
        assert_eq!(state.rule, DecisionRule::ActiveTrial);
        assert!(state.subscription_end_date.is_some());
    }

    #[test]
    fn test_trial_without_plan_defaults_to_starter_label() {
        let now = Utc::now();
        let state = classify_record(&trial_record(None, now + Duration::days(7)), now);
        assert_eq!(state.plan_type, DEFAULT_PLAN);
    }

    #[test]
    fn test_trial_expired_one_second_ago_is_lapsed() {
        let now = Utc::now();
        let state = classify_record(&trial_record(Some("GROWTH"), now - Duration::seconds(1)), now);

        assert!(!state.is_subscribed);
        assert_eq!(state.plan_type, FREE_PLAN);
        assert_eq!(state.subscription_type, SubscriptionKind::Free);
        assert_eq!(state.rule, DecisionRule::LapsedTrial);
    }

    #[test]
    fn test_trial_end_exactly_now_is_lapsed() {
        let now = Utc::now();
        let state = classify_record(&trial_record(Some("GROWTH"), now), now);
        assert_eq!(state.rule, DecisionRule::LapsedTrial);
    }

    #[test]
    fn test_lapsed_trial_does_not_fall_through_to_payment() {
        let now = Utc::now();
        let mut record = trial_record(Some("GROWTH"), now - Duration::days(1));
        record.payment_amount = Some(30_000.0);
        record.payment_date = Some(now - Duration::days(2));
        record.is_subscribed = true;

        let state = classify_record(&record, now);
        assert_eq!(state.rule, DecisionRule::LapsedTrial);
        assert!(!state.is_subscribed);
    }

    #[test]
    fn test_trial_without_end_date_falls_through() {
        let now = Utc::now();
        let mut record = trial_record(Some("GROWTH"), now);
        record.subscription_end_date = None;
        record.payment_amount = Some(16_000.0);
        record.payment_date = Some(now - Duration::days(3));

        let state = classify_record(&record, now);
        assert_eq!(state.rule, DecisionRule::LegacyPayment);
        assert!(state.is_subscribed);
    }

    #[test]
    fn test_payment_window_is_inclusive_of_day_thirty() {
        let now = Utc::now();

        let state = classify_record(&payment_record(16_000.0, now - Duration::days(30)), now);
        assert!(state.is_subscribed);
        assert_eq!(state.rule, DecisionRule::LegacyPayment);

        // Truncation to whole days keeps day 30 inside the window up to the
        // last hour.
        let state = classify_record(
            &payment_record(16_000.0, now - Duration::days(30) - Duration::hours(23)),
            now,
        );
        assert!(state.is_subscribed);

        let state = classify_record(&payment_record(16_000.0, now - Duration::days(31)), now);
        assert!(!state.is_subscribed);
        assert_eq!(state.rule, DecisionRule::LegacyPayment);
    }

    #[test]
    fn test_payment_amount_thresholds() {
        let now = Utc::now();
        let paid_at = now - Duration::days(1);

        let cases = [
            (25_000.0, "PROFESSIONAL"),
            (40_000.0, "PROFESSIONAL"),
            (24_999.5, "GROWTH"),
            (15_000.0, "GROWTH"),
            (10_000.0, "STARTER"),
            (14_999.0, "STARTER"),
            (9_999.0, FREE_PLAN),
        ];
        for (amount, expected) in cases {
            let state = classify_record(&payment_record(amount, paid_at), now);
            assert_eq!(state.plan_type, expected, "amount {}", amount);
            assert!(state.is_subscribed);
        }
    }

    #[test]
    fn test_payment_outranks_expired_period_fields() {
        let now = Utc::now();
        let mut record = payment_record(16_000.0, now - Duration::days(5));
        record.is_subscribed = true;
        record.subscription_end_date = Some(now - Duration::days(1));
        record.plan_type = Some("PROFESSIONAL".to_string());

        let state = classify_record(&record, now);
        assert_eq!(state.rule, DecisionRule::LegacyPayment);
        assert!(state.is_subscribed);
        assert_eq!(state.plan_type, "GROWTH");
        assert_eq!(state.subscription_end_date, None);
    }

    #[test]
    fn test_zero_amount_payment_is_ignored() {
        let now = Utc::now();
        let state = classify_record(&payment_record(0.0, now - Duration::days(1)), now);
        assert_eq!(state.rule, DecisionRule::NoSubscription);
    }

    #[test]
    fn test_current_period() {
        let now = Utc::now();
        let record = AccountRecord {
            plan_type: Some("growth".to_string()),
            is_subscribed: true,
            subscription_end_date: Some(now + Duration::days(12)),
            ..AccountRecord::default()
        };

        let state = classify_record(&record, now);
        assert!(state.is_subscribed);
        assert_eq!(state.plan_type, "GROWTH");
        assert_eq!(state.subscription_type, SubscriptionKind::Paid);
        assert_eq!(state.rule, DecisionRule::CurrentPeriod);
    }

    #[test]
    fn test_current_period_without_plan_defaults_to_starter_label() {
        let now = Utc::now();
        let record = AccountRecord {
            is_subscribed: true,
            subscription_end_date: Some(now + Duration::days(1)),
            ..AccountRecord::default()
        };
        assert_eq!(classify_record(&record, now).plan_type, DEFAULT_PLAN);
    }

    #[test]
    fn test_unknown_plan_label_passes_through() {
        let now = Utc::now();
        let record = AccountRecord {
            plan_type: Some("LEGACY_GOLD".to_string()),
            is_subscribed: true,
            subscription_end_date: Some(now + Duration::days(1)),
            ..AccountRecord::default()
        };
        assert_eq!(classify_record(&record, now).plan_type, "LEGACY_GOLD");
    }

    #[test]
    fn test_subscribed_flag_without_end_date_is_not_enough() {
        let now = Utc::now();
        let record = AccountRecord {
            is_subscribed: true,
            ..AccountRecord::default()
        };
        assert_eq!(classify_record(&record, now).rule, DecisionRule::NoSubscription);
    }

    #[test]
    fn test_empty_record_is_not_subscribed() {
        let state = classify_record(&AccountRecord::default(), Utc::now());
        assert!(!state.is_subscribed);
        assert_eq!(state.plan_type, FREE_PLAN);
        assert_eq!(state.rule, DecisionRule::NoSubscription);
    }

    // ===== evaluate =====

    #[tokio::test]
    async fn test_kill_switch_grants_all_access() {
        let store = InMemoryDirectory::new();
        store.put_settings(SubscriptionSettings {
            subscriptions_enabled: Some(false),
        });

        let audit = RecordingAuditLogger::new();
        let evaluator = SubscriptionEvaluator::new(store).with_audit_logger(audit.clone());

        let state = evaluator.evaluate("nobody@example.com", None).await;
        assert!(state.is_subscribed);
        assert_eq!(state.plan_type, ALL_ACCESS_PLAN);
        assert_eq!(state.rule, DecisionRule::GlobalOverride);
        assert!(state.is_universal());

        let events = audit.events().await;
        assert!(matches!(
            events[0],
            AccessAuditEvent::GlobalOverrideApplied { .. }
        ));
    }

    #[tokio::test]
    async fn test_enabled_or_absent_settings_proceed_normally() {
        for settings in [
            Some(SubscriptionSettings {
                subscriptions_enabled: Some(true),
            }),
            Some(SubscriptionSettings {
                subscriptions_enabled: None,
            }),
            None,
        ] {
            let store = InMemoryDirectory::new();
            if let Some(settings) = settings {
                store.put_settings(settings);
            }
            let evaluator = SubscriptionEvaluator::new(store);
            let state = evaluator.evaluate("nobody@example.com", None).await;
            assert_eq!(state.rule, DecisionRule::MissingAccount);
            assert!(!state.is_subscribed);
        }
    }

    #[tokio::test]
    async fn test_missing_account_everywhere() {
        let evaluator = SubscriptionEvaluator::new(InMemoryDirectory::new());
        let state = evaluator.evaluate("nobody@example.com", Some("uid-9")).await;

        assert!(!state.is_subscribed);
        assert_eq!(state.plan_type, FREE_PLAN);
        assert_eq!(state.rule, DecisionRule::MissingAccount);
    }

    #[tokio::test]
    async fn test_fallback_id_is_tried_after_email() {
        let store = InMemoryDirectory::new();
        store.insert_account(
            "uid-1",
            AccountRecord {
                is_subscribed: true,
                subscription_end_date: Some(Utc::now() + Duration::days(5)),
                ..AccountRecord::default()
            },
        );

        let evaluator = SubscriptionEvaluator::new(store);
        let state = evaluator.evaluate("owner@example.com", Some("uid-1")).await;
        assert!(state.is_subscribed);
        assert_eq!(state.rule, DecisionRule::CurrentPeriod);
    }

    #[tokio::test]
    async fn test_email_record_wins_over_fallback_id() {
        let store = InMemoryDirectory::new();
        store.insert_account("owner@example.com", AccountRecord::default());
        store.insert_account(
            "uid-1",
            AccountRecord {
                is_subscribed: true,
                subscription_end_date: Some(Utc::now() + Duration::days(5)),
                ..AccountRecord::default()
            },
        );

        let evaluator = SubscriptionEvaluator::new(store);
        let state = evaluator.evaluate("owner@example.com", Some("uid-1")).await;
        assert_eq!(state.rule, DecisionRule::NoSubscription);
    }

    #[tokio::test]
    async fn test_outage_fail_open() {
        let store = InMemoryDirectory::new();
        store.set_unavailable(true);

        let audit = RecordingAuditLogger::new();
        let evaluator = SubscriptionEvaluator::new(store).with_audit_logger(audit.clone());

        let state = evaluator.evaluate("owner@example.com", None).await;
        assert!(state.is_subscribed);
        assert_eq!(state.plan_type, ALL_ACCESS_PLAN);
        assert_eq!(state.rule, DecisionRule::OutageFallback);
        assert!(state.is_universal());

        let events = audit.events().await;
        assert!(matches!(
            events[0],
            AccessAuditEvent::OutageFallback { granted: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_outage_fail_closed() {
        let store = InMemoryDirectory::new();
        store.set_unavailable(true);

        let audit = RecordingAuditLogger::new();
        let evaluator = SubscriptionEvaluator::with_config(store, EngineConfig::fail_closed())
            .with_audit_logger(audit.clone());

        let state = evaluator.evaluate("owner@example.com", None).await;
        assert!(!state.is_subscribed);
        assert_eq!(state.rule, DecisionRule::OutageFallback);
        assert!(!state.is_universal());

        let events = audit.events().await;
        assert!(matches!(
            events[0],
            AccessAuditEvent::OutageFallback { granted: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_malformed_account_is_not_subscribed() {
        let store = InMemoryDirectory::new();
        store.mark_account_malformed("owner@example.com");

        let audit = RecordingAuditLogger::new();
        let evaluator = SubscriptionEvaluator::new(store).with_audit_logger(audit.clone());

        let state = evaluator.evaluate("owner@example.com", None).await;
        assert!(!state.is_subscribed);
        assert_eq!(state.rule, DecisionRule::MalformedRecord);

        let events = audit.events().await;
        assert!(matches!(events[0], AccessAuditEvent::MalformedRecord { .. }));
    }

    #[tokio::test]
    async fn test_kill_switch_outranks_store_record() {
        let store = InMemoryDirectory::new();
        store.put_settings(SubscriptionSettings {
            subscriptions_enabled: Some(false),
        });
        // A lapsed trial that would deny on its own.
        store.insert_account(
            "owner@example.com",
            trial_record(Some("GROWTH"), Utc::now() - Duration::days(1)),
        );

        let evaluator = SubscriptionEvaluator::new(store);
        let state = evaluator.evaluate("owner@example.com", None).await;
        assert_eq!(state.rule, DecisionRule::GlobalOverride);
        assert!(state.is_subscribed);
    }

    #[tokio::test]
    async fn test_evaluation_is_idempotent() {
        let store = InMemoryDirectory::new();
        store.insert_account(
            "owner@example.com",
            AccountRecord {
                plan_type: Some("GROWTH".to_string()),
                is_subscribed: true,
                subscription_end_date: Some(Utc::now() + Duration::days(10)),
                ..AccountRecord::default()
            },
        );

        let evaluator = SubscriptionEvaluator::new(store);
        let first = evaluator.evaluate("owner@example.com", None).await;
        let second = evaluator.evaluate("owner@example.com", None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_kill_switch_is_read_fresh_each_call() {
        let store = InMemoryDirectory::new();
        store.put_settings(SubscriptionSettings {
            subscriptions_enabled: Some(false),
        });

        let evaluator = SubscriptionEvaluator::new(store.clone());
        let state = evaluator.evaluate("owner@example.com", None).await;
        assert_eq!(state.rule, DecisionRule::GlobalOverride);

        store.put_settings(SubscriptionSettings {
            subscriptions_enabled: Some(true),
        });
        let state = evaluator.evaluate("owner@example.com", None).await;
        assert_eq!(state.rule, DecisionRule::MissingAccount);
    }
}
