//! Floodgate - plan-aware feature access resolution
//!
//! Floodgate answers one question for a SaaS application: may this principal
//! use this feature right now? It resolves who pays for a principal
//! (sub-accounts bill under the admin who invited them), classifies the
//! payer's stored account through a strict priority rule chain, and decides
//! feature access from the plan catalog, with a stricter per-principal
//! overlay for sub-accounts.
//!
//! # Features
//!
//! - **Delegation**: sub-accounts resolve to their inviter's subscription
//! - **Subscription evaluation**: platform kill-switch, trials, legacy
//!   manual payments, and current-period fields in one ordered rule chain
//! - **Feature gating**: a total plan-and-feature decision with display-name
//!   lookup; unknown inputs deny instead of erroring
//! - **Sub-admin overlay**: per-principal grant maps that only restrict
//! - **Pluggable storage**: async document-store traits with an in-memory
//!   implementation for tests and local development
//! - **Audit logging**: every fallback and admin write goes through a
//!   pluggable audit trait
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use floodgate::{AccessEngine, InMemoryDirectory, Principal};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize logging
//!     floodgate::init_tracing();
//!
//!     let store = InMemoryDirectory::new();
//!     let engine = AccessEngine::new(store);
//!
//!     let principal = Principal::new("owner@example.com", "uid-1");
//!     if engine.check_access(&principal, "Inventory Tool").await {
//!         // render the inventory module
//!     }
//! }
//! ```

#![allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds properly

pub mod admin;
pub mod audit;
pub mod catalog;
mod config;
pub mod delegation;
mod engine;
mod error;
pub mod evaluator;
pub mod overlay;
pub mod records;
pub mod storage;

// Re-exports for public API
pub use admin::{GrantOptions, SubscriptionAdmin};
pub use audit::{AccessAuditEvent, AccessAuditLogger, NoOpAuditLogger, TracingAuditLogger};
pub use catalog::{
    ParsePlanTierError, PlanCatalog, PlanCatalogBuilder, PlanTier, ALL_ACCESS_PLAN,
};
pub use config::{EngineConfig, LoggingConfig, OutagePolicy};
pub use delegation::{BillingIdentity, BillingIdentityResolver, DelegationOutcome};
pub use engine::{AccessEngine, SubscriptionSnapshot};
pub use error::{AccessError, Result, StoreError};
pub use evaluator::{
    classify_record, DecisionRule, SubscriptionEvaluator, SubscriptionState, DEFAULT_PLAN,
    FREE_PLAN, LEGACY_PAYMENT_WINDOW_DAYS,
};
pub use records::{
    AccountRecord, AdminStatus, DelegatedAdminRecord, Principal, SubscriptionKind,
    SubscriptionSettings,
};
pub use storage::memory::InMemoryDirectory;
pub use storage::{DirectoryStore, SubscriptionAdminStore, WatchStore};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before creating the engine.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "floodgate=debug")
/// - `FLOODGATE_LOG_JSON`: Set to "true" for JSON formatted logs
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     floodgate::init_tracing();
///     // ... rest of your app
/// }
/// ```
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("FLOODGATE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &LoggingConfig) {
    let env_filter = EnvFilter::new(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
