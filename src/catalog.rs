//! Plan catalog and the feature access decision.
//!
//! Defines the public plan tiers, which feature keys each plan includes, and
//! the display-name lookup used when a caller passes a feature's UI name
//! instead of its internal key. The decision function is total: any pair of
//! strings gets an answer, and everything unknown answers `false`.
//!
//! # Example
//!
//! ```rust,ignore
//! use floodgate::PlanCatalog;
//!
//! let catalog = PlanCatalog::default();
//! assert!(catalog.plan_allows("GROWTH", "Inventory Tool"));
//! assert!(!catalog.plan_allows("STARTER", "Analytics"));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Internal feature keys.
pub mod features {
    /// Home dashboard and summary widgets.
    pub const DASHBOARD: &str = "dashboard";
    /// Customer relationship tools.
    pub const CRM: &str = "crm";
    /// Stock levels and materials tracking.
    pub const INVENTORY: &str = "inventory";
    /// Bespoke order intake.
    pub const CUSTOM_ORDERS: &str = "customorders";
    /// Order pipeline views.
    pub const ORDER_MANAGEMENT: &str = "ordermanagement";
    /// Design upload and management.
    pub const DESIGNS: &str = "designs";
    /// Sales and traffic reporting.
    pub const ANALYTICS: &str = "analytics";
    /// Priority support channel.
    pub const PRIORITY_SUPPORT: &str = "prioritysupport";
    /// Sub-account management.
    pub const TEAM: &str = "team";
}

/// The distinguished plan label carried by the global-override and fail-open
/// outage states. Includes every feature in the catalog.
pub const ALL_ACCESS_PLAN: &str = "ALL_ACCESS";

/// Public plan tiers, smallest feature set first.
///
/// Each tier includes every feature of the tier below it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanTier {
    #[default]
    Starter,
    Growth,
    Professional,
}

impl PlanTier {
    /// All tiers, smallest feature set first.
    pub const ALL: [PlanTier; 3] = [Self::Starter, Self::Growth, Self::Professional];

    /// Get the canonical upper-case identifier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "STARTER",
            Self::Growth => "GROWTH",
            Self::Professional => "PROFESSIONAL",
        }
    }

    /// Get the tier rank. Higher rank means a larger feature set.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Starter => 1,
            Self::Growth => 2,
            Self::Professional => 3,
        }
    }

    /// Check if this tier includes at least another tier's features.
    #[must_use]
    pub fn includes(&self, other: &PlanTier) -> bool {
        self.rank() >= other.rank()
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing a plan tier from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePlanTierError {
    /// The value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for ParsePlanTierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid plan tier: '{}' (expected: STARTER, GROWTH, or PROFESSIONAL)",
            self.invalid_value
        )
    }
}

impl std::error::Error for ParsePlanTierError {}

impl FromStr for PlanTier {
    type Err = ParsePlanTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STARTER" => Ok(Self::Starter),
            "GROWTH" => Ok(Self::Growth),
            "PROFESSIONAL" => Ok(Self::Professional),
            _ => Err(ParsePlanTierError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

/// The plan catalog.
///
/// Maps plan labels to feature-key sets and carries the display-name table
/// consulted when a feature reference is not a key. [`PlanCatalog::default`]
/// builds the standard three-tier catalog plus [`ALL_ACCESS_PLAN`]; use
/// [`PlanCatalog::builder`] for a custom one.
#[derive(Clone, Debug)]
pub struct PlanCatalog {
    plans: HashMap<String, HashSet<String>>,
    display_names: HashMap<String, String>,
}

impl Default for PlanCatalog {
    fn default() -> Self {
        // Each tier extends the one below it, which keeps the superset
        // chain intact when a feature is added to a lower tier.
        let starter: HashSet<String> = [
            features::DASHBOARD,
            features::CRM,
            features::INVENTORY,
            features::CUSTOM_ORDERS,
        ]
        .iter()
        .map(|key| key.to_string())
        .collect();

        let mut growth = starter.clone();
        growth.extend(
            [
                features::ORDER_MANAGEMENT,
                features::DESIGNS,
                features::ANALYTICS,
            ]
            .iter()
            .map(|key| key.to_string()),
        );

        let mut professional = growth.clone();
        professional.extend(
            [features::PRIORITY_SUPPORT, features::TEAM]
                .iter()
                .map(|key| key.to_string()),
        );

        let mut plans = HashMap::new();
        plans.insert(ALL_ACCESS_PLAN.to_string(), professional.clone());
        plans.insert(PlanTier::Starter.as_str().to_string(), starter);
        plans.insert(PlanTier::Growth.as_str().to_string(), growth);
        plans.insert(PlanTier::Professional.as_str().to_string(), professional);

        Self {
            plans,
            display_names: builtin_display_names(),
        }
    }
}

fn builtin_display_names() -> HashMap<String, String> {
    [
        ("Dashboard", features::DASHBOARD),
        ("CRM Tools", features::CRM),
        ("Inventory Tool", features::INVENTORY),
        ("Custom Orders", features::CUSTOM_ORDERS),
        ("Order Management", features::ORDER_MANAGEMENT),
        ("Design Management", features::DESIGNS),
        ("Analytics", features::ANALYTICS),
        ("Priority Support", features::PRIORITY_SUPPORT),
        ("Team Accounts", features::TEAM),
    ]
    .into_iter()
    .map(|(name, key)| (name.to_string(), key.to_string()))
    .collect()
}

impl PlanCatalog {
    /// Create the standard catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for a custom catalog.
    #[must_use]
    pub fn builder() -> PlanCatalogBuilder {
        PlanCatalogBuilder::new()
    }

    /// Decide whether a plan includes a feature.
    ///
    /// `plan` is matched case-insensitively. `feature` is tried verbatim as
    /// a key first, then through the display-name table. Unknown plans,
    /// unknown features, and untranslatable references all answer `false`.
    #[must_use]
    pub fn plan_allows(&self, plan: &str, feature: &str) -> bool {
        let feature_set = match self.plans.get(plan.to_uppercase().as_str()) {
            Some(set) => set,
            None => return false,
        };
        if feature_set.contains(feature) {
            return true;
        }
        match self.display_names.get(feature) {
            Some(key) => feature_set.contains(key.as_str()),
            None => false,
        }
    }

    /// Resolve a feature reference to an internal key.
    ///
    /// Returns the reference itself when it is already a known key,
    /// otherwise its display-name translation, otherwise `None`.
    #[must_use]
    pub fn resolve_feature_key<'a>(&'a self, feature: &'a str) -> Option<&'a str> {
        if self.is_known_key(feature) {
            return Some(feature);
        }
        self.display_names.get(feature).map(String::as_str)
    }

    /// Get the feature keys of a plan, matched case-insensitively.
    #[must_use]
    pub fn features_of(&self, plan: &str) -> Option<&HashSet<String>> {
        self.plans.get(plan.to_uppercase().as_str())
    }

    /// Check if a plan label is in the catalog.
    #[must_use]
    pub fn contains_plan(&self, plan: &str) -> bool {
        self.plans.contains_key(plan.to_uppercase().as_str())
    }

    fn is_known_key(&self, key: &str) -> bool {
        self.plans.values().any(|set| set.contains(key))
    }
}

/// Builder for a custom [`PlanCatalog`].
#[derive(Debug, Default)]
pub struct PlanCatalogBuilder {
    plans: HashMap<String, HashSet<String>>,
    display_names: HashMap<String, String>,
}

impl PlanCatalogBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining a plan. Labels are stored upper-case.
    #[must_use]
    pub fn plan(self, label: &str) -> CatalogPlanBuilder {
        CatalogPlanBuilder {
            parent: self,
            label: label.to_uppercase(),
            features: HashSet::new(),
        }
    }

    /// Register a display-name translation.
    #[must_use]
    pub fn display_name(mut self, name: &str, key: &str) -> Self {
        self.display_names
            .insert(name.to_string(), key.to_string());
        self
    }

    /// Build the catalog.
    ///
    /// If no plan named [`ALL_ACCESS_PLAN`] was defined, one is added
    /// holding the union of every defined plan's features.
    #[must_use]
    pub fn build(mut self) -> PlanCatalog {
        if !self.plans.contains_key(ALL_ACCESS_PLAN) {
            let union: HashSet<String> = self.plans.values().flatten().cloned().collect();
            self.plans.insert(ALL_ACCESS_PLAN.to_string(), union);
        }
        PlanCatalog {
            plans: self.plans,
            display_names: self.display_names,
        }
    }
}

/// Builder for a single plan inside a [`PlanCatalogBuilder`].
#[derive(Debug)]
pub struct CatalogPlanBuilder {
    parent: PlanCatalogBuilder,
    label: String,
    features: HashSet<String>,
}

impl CatalogPlanBuilder {
    /// Add a feature key to the plan.
    #[must_use]
    pub fn feature(mut self, key: &str) -> Self {
        self.features.insert(key.to_string());
        self
    }

    /// Add several feature keys to the plan.
    #[must_use]
    pub fn features<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Copy every feature of an already-defined plan into this one.
    ///
    /// # Panics
    ///
    /// Panics if the named plan has not been defined yet.
    #[must_use]
    pub fn inherits(mut self, label: &str) -> Self {
        let inherited = self
            .parent
            .plans
            .get(label.to_uppercase().as_str())
            .expect("inherited plan must be defined before it is inherited");
        self.features.extend(inherited.iter().cloned());
        self
    }

    /// Finish this plan and return to the catalog builder.
    #[must_use]
    pub fn done(mut self) -> PlanCatalogBuilder {
        self.parent.plans.insert(self.label, self.features);
        self.parent
    }
}
