//! Engine configuration.

use serde::{Deserialize, Serialize};

/// How the engine behaves when the document store cannot be reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutagePolicy {
    /// Grant universal access for the duration of the outage.
    ///
    /// Every fallback is logged and audited. No retries happen inside the
    /// engine; the outage window ends when the store recovers.
    #[default]
    FailOpen,
    /// Deny access for the duration of the outage.
    FailClosed,
}

/// Configuration for the access engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Behavior when the store is unreachable.
    pub outage_policy: OutagePolicy,
}

impl EngineConfig {
    /// Config with the default fail-open outage posture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that denies access during store outages.
    #[must_use]
    pub fn fail_closed() -> Self {
        Self {
            outage_policy: OutagePolicy::FailClosed,
        }
    }
}

/// Logging configuration consumed by [`crate::init_tracing_with_config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "floodgate=debug").
    pub level: String,
    /// Use JSON formatted logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_fail_open() {
        assert_eq!(EngineConfig::new().outage_policy, OutagePolicy::FailOpen);
    }

    #[test]
    fn test_fail_closed_constructor() {
        assert_eq!(
            EngineConfig::fail_closed().outage_policy,
            OutagePolicy::FailClosed
        );
    }

    #[test]
    fn test_outage_policy_from_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"outage_policy": "fail_closed"}"#).unwrap();
        assert_eq!(config.outage_policy, OutagePolicy::FailClosed);

        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.outage_policy, OutagePolicy::FailOpen);
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
    }
}
