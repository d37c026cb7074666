//! Error types for access resolution.

use thiserror::Error;

/// Errors surfaced by the document store.
///
/// `Ok(None)` from a lookup is the not-found case and is not an error; these
/// variants cover the two failure classes the engine tells apart.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or timed out.
    #[error("document store unavailable: {reason}")]
    Unavailable {
        /// Driver-level description of the failure.
        reason: String,
    },

    /// A document was read but could not be decoded.
    #[error("malformed document at '{key}': {reason}")]
    Malformed {
        /// The document key that failed to decode.
        key: String,
        /// What was wrong with the document.
        reason: String,
    },
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Create a malformed-document error.
    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is an outage rather than bad data.
    #[must_use]
    pub fn is_outage(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Errors returned by the subscription admin utilities.
///
/// The gating path never returns these: `check_access` and
/// `subscription_snapshot` absorb store failures into defined fallback
/// states instead of propagating them.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A plan identifier could not be parsed.
    #[error("unknown plan: '{plan}' (expected: STARTER, GROWTH, or PROFESSIONAL)")]
    UnknownPlan {
        /// The identifier that failed to parse.
        plan: String,
    },

    /// The document store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessError {
    /// Create an unknown-plan error.
    pub fn unknown_plan(plan: impl Into<String>) -> Self {
        Self::UnknownPlan { plan: plan.into() }
    }

    /// Check if retrying the operation might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Unavailable { .. }))
    }
}

/// Result type alias for access resolution operations.
pub type Result<T> = std::result::Result<T, AccessError>;
