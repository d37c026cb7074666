//! Sub-admin permission overlay.
//!
//! Sub-accounts inherit their inviter's plan but not their inviter's reach:
//! each carries a per-principal grant map keyed by permission group, and a
//! feature is only usable when its group is granted with a literal boolean
//! `true`. The overlay can only restrict what the plan already allows, never
//! expand it.
//!
//! The display-name table here is deliberately not the plan catalog's: a
//! permission group can cover several catalog features ("Inventory Tool" and
//! "Inventory Management" both land on `inventory`), while "Custom Orders"
//! and "Order Management" stay separate groups.

use serde_json::Value;

use crate::records::Principal;

/// Permission-group keys for sub-account grant maps.
pub mod groups {
    pub const DASHBOARD: &str = "dashboard";
    pub const CRM: &str = "crm";
    pub const INVENTORY: &str = "inventory";
    pub const CUSTOM_ORDERS: &str = "customorders";
    pub const ORDER_MANAGEMENT: &str = "ordermanagement";
    pub const DESIGNS: &str = "designs";
    pub const ANALYTICS: &str = "analytics";
    pub const PRIORITY_SUPPORT: &str = "prioritysupport";
}

/// Map a feature display name to its permission group.
///
/// Returns `None` for anything outside the fixed table, which the caller
/// must treat as a denial.
#[must_use]
pub fn permission_group(feature_display_name: &str) -> Option<&'static str> {
    match feature_display_name {
        "Dashboard" => Some(groups::DASHBOARD),
        "CRM Tools" => Some(groups::CRM),
        "Inventory Tool" | "Inventory Management" => Some(groups::INVENTORY),
        "Custom Orders" => Some(groups::CUSTOM_ORDERS),
        "Order Management" => Some(groups::ORDER_MANAGEMENT),
        "Design Management" => Some(groups::DESIGNS),
        "Analytics" => Some(groups::ANALYTICS),
        "Priority Support" => Some(groups::PRIORITY_SUPPORT),
        _ => None,
    }
}

/// Decide whether a sub-account's grant map allows a feature.
///
/// Denies unless the display name maps to a group and the principal's
/// permissions hold a literal `true` under that group. A missing map, an
/// unmapped name, a missing key, and every non-boolean value all deny.
#[must_use]
pub fn sub_admin_allows(principal: &Principal, feature_display_name: &str) -> bool {
    let group = match permission_group(feature_display_name) {
        Some(group) => group,
        None => return false,
    };
    permission_granted(principal.permissions.as_ref(), group)
}

/// Strict grant check against a raw permissions value.
#[must_use]
pub fn permission_granted(permissions: Option<&Value>, group: &str) -> bool {
    permissions
        .and_then(|map| map.get(group))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
