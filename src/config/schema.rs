//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! authorization service. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};

/// Free-form controller settings, decoded per controller kind.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Root configuration for the authorization service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthzConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Verdict aggregation and failure policy.
    pub decision: DecisionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Analysis controllers, run in order before matching.
    pub analysis: Vec<ControllerConfig>,

    /// Match controllers, run in order after analysis.
    pub matchers: Vec<ControllerConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9001").
    pub bind_address: String,

    /// Largest request body the check endpoint will buffer.
    pub max_body_bytes: usize,

    /// Trusted proxies that append to `x-forwarded-for` in front of this one.
    /// 0 uses the rightmost entry, the hop the edge proxy appended itself.
    pub xff_trusted_hops: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9001".to_string(),
            max_body_bytes: 64 * 1024,
            xff_trusted_hops: 0,
        }
    }
}

/// How per-controller verdicts are combined.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// A matching deny controller wins regardless of order.
    #[default]
    DenyOverrides,
    /// The first matching controller in configured order decides.
    FirstDecisive,
}

/// What a controller match (or the absence of one) means for the request.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchAction {
    #[default]
    Allow,
    Deny,
}

/// Outcome applied when a match controller fails hard.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Deny the request.
    #[default]
    FailClosed,
    /// Allow the request.
    FailOpen,
}

/// Decision engine policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DecisionConfig {
    /// Aggregation mode across match controllers.
    pub mode: AggregationMode,

    /// Action taken when no match controller matched.
    pub default_action: MatchAction,

    /// Policy for backing-store and deadline failures.
    pub failure_mode: FailureMode,

    /// Upper bound on the time spent deciding one request, in milliseconds.
    pub deadline_ms: u64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::DenyOverrides,
            default_action: MatchAction::Deny,
            failure_mode: FailureMode::FailClosed,
            deadline_ms: 200,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One entry in the analysis or match controller chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Controller identifier, unique within its list.
    pub name: String,

    /// Registered controller kind (e.g. "cidr_list").
    #[serde(rename = "type")]
    pub kind: String,

    /// What a match means. Ignored for analysis controllers.
    #[serde(default)]
    pub action: MatchAction,

    /// Kind-specific settings.
    #[serde(default)]
    pub settings: Settings,
}

impl ControllerConfig {
    /// Build a config entry with an allow action.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, settings: Settings) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            action: MatchAction::Allow,
            settings,
        }
    }

    /// Override the match action.
    pub fn with_action(mut self, action: MatchAction) -> Self {
        self.action = action;
        self
    }
}
