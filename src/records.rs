//! Identity and document-store record types.
//!
//! These mirror the JSON documents the host application keeps in its
//! document store. Every account field is absent-tolerant: real documents
//! accumulated over years and predate several of the fields, and the
//! evaluator gives each absence a defined meaning instead of rejecting the
//! record.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated caller, as produced by the host's auth layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Principal {
    /// Sign-in email address.
    pub email: String,
    /// Stable internal user id, tried as a fallback account key.
    pub uid: String,
    /// Whether the caller is a platform admin.
    pub is_admin: bool,
    /// Set when this caller is a sub-account created by another admin.
    pub invited_by: Option<String>,
    /// Per-group grants for sub-accounts. Kept as raw JSON so malformed
    /// shapes reach the overlay, which denies on anything but a literal
    /// boolean `true`.
    pub permissions: Option<serde_json::Value>,
}

impl Principal {
    /// Create a principal with just an email and uid.
    #[must_use]
    pub fn new(email: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Check if this principal is a sub-account.
    #[must_use]
    pub fn is_sub_account(&self) -> bool {
        self.invited_by
            .as_deref()
            .map(|email| !email.is_empty())
            .unwrap_or(false)
    }
}

/// How an account is paying for access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    /// Time-boxed evaluation period.
    Trial,
    /// Active paid subscription.
    Paid,
    /// No paid subscription.
    #[default]
    Free,
}

impl SubscriptionKind {
    /// Get the wire representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Paid => "paid",
            Self::Free => "free",
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer account document, keyed by email or by internal user id.
///
/// The two payment fields keep their historical snake_case document keys;
/// everything newer is camelCase. Both spellings are load-bearing because
/// documents written years apart coexist in the same collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountRecord {
    /// Plan identifier as stored, in whatever casing the writer used.
    pub plan_type: Option<String>,
    /// Current-period subscribed flag.
    pub is_subscribed: bool,
    /// Whether a trial has been started and not consumed.
    pub is_trial_active: bool,
    /// How the account is paying.
    pub subscription_type: Option<SubscriptionKind>,
    /// End of the current trial or paid period.
    pub subscription_end_date: Option<DateTime<Utc>>,
    /// Amount of the last manual payment, in minor currency units.
    #[serde(rename = "payment_amount")]
    pub payment_amount: Option<f64>,
    /// When the last manual payment was recorded.
    #[serde(rename = "payment_date")]
    pub payment_date: Option<DateTime<Utc>>,
}

/// Lifecycle state of a delegated-admin record.
///
/// Managed by external admin workflows; the resolver follows the delegation
/// regardless of status and leaves lifecycle enforcement to those workflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminStatus {
    #[default]
    Active,
    Inactive,
}

impl AdminStatus {
    /// Get the wire representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AdminStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A sub-account's delegation document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelegatedAdminRecord {
    /// The sub-account's own sign-in email.
    pub email: String,
    /// Email of the admin whose subscription this account bills against.
    pub invited_by: String,
    /// Permission-group grants, raw JSON (see [`Principal::permissions`]).
    pub permissions: serde_json::Value,
    /// Lifecycle state.
    pub status: AdminStatus,
}

/// The subscription section of the system settings document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionSettings {
    /// Platform-wide enforcement flag. Only an explicit `false` disables
    /// enforcement; absent means enforcement stays on.
    pub subscriptions_enabled: Option<bool>,
}

impl SubscriptionSettings {
    /// Check if the platform-wide flag disables subscription enforcement.
    #[must_use]
    pub fn enforcement_disabled(&self) -> bool {
        self.subscriptions_enabled == Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_record_mixed_casing() {
        let record: AccountRecord = serde_json::from_value(json!({
            "planType": "GROWTH",
            "isSubscribed": true,
            "subscriptionType": "paid",
            "subscriptionEndDate": "2026-09-01T00:00:00Z",
            "payment_amount": 16000.0,
            "payment_date": "2026-08-01T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(record.plan_type.as_deref(), Some("GROWTH"));
        assert!(record.is_subscribed);
        assert_eq!(record.subscription_type, Some(SubscriptionKind::Paid));
        assert_eq!(record.payment_amount, Some(16000.0));
        assert!(record.payment_date.is_some());
    }

    #[test]
    fn test_account_record_tolerates_absent_fields() {
        let record: AccountRecord = serde_json::from_value(json!({})).unwrap();

        assert_eq!(record.plan_type, None);
        assert!(!record.is_subscribed);
        assert!(!record.is_trial_active);
        assert_eq!(record.subscription_type, None);
        assert_eq!(record.subscription_end_date, None);
        assert_eq!(record.payment_amount, None);
        assert_eq!(record.payment_date, None);
    }

    #[test]
    fn test_unknown_subscription_type_is_rejected() {
        let result = serde_json::from_value::<AccountRecord>(json!({
            "subscriptionType": "comped"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_is_sub_account() {
        let mut principal = Principal::new("sub@example.com", "uid-1");
        assert!(!principal.is_sub_account());

        principal.invited_by = Some(String::new());
        assert!(!principal.is_sub_account());

        principal.invited_by = Some("owner@example.com".to_string());
        assert!(principal.is_sub_account());
    }

    #[test]
    fn test_enforcement_disabled_only_on_explicit_false() {
        let absent = SubscriptionSettings {
            subscriptions_enabled: None,
        };
        assert!(!absent.enforcement_disabled());

        let on = SubscriptionSettings {
            subscriptions_enabled: Some(true),
        };
        assert!(!on.enforcement_disabled());

        let off = SubscriptionSettings {
            subscriptions_enabled: Some(false),
        };
        assert!(off.enforcement_disabled());
    }

    #[test]
    fn test_delegated_admin_record_defaults() {
        let record: DelegatedAdminRecord = serde_json::from_value(json!({
            "email": "sub@example.com",
            "invitedBy": "owner@example.com"
        }))
        .unwrap();

        assert_eq!(record.status, AdminStatus::Active);
        assert!(record.permissions.is_null());
    }

    #[test]
    fn test_subscription_kind_display() {
        assert_eq!(SubscriptionKind::Trial.to_string(), "trial");
        assert_eq!(SubscriptionKind::Paid.to_string(), "paid");
        assert_eq!(SubscriptionKind::Free.to_string(), "free");
    }
}
