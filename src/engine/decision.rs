//! Final decisions and verdict aggregation.
//!
//! # Responsibilities
//! - Hold the per-deployment policy (mode, default action, failure mode, deadline)
//! - Fold verdicts into an outcome, signalling when evaluation can stop early
//! - Map hard controller failures onto the failure policy

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{AggregationMode, DecisionConfig, FailureMode, MatchAction};
use crate::context::{DenyCode, MatchVerdict};
use crate::controllers::ControllerError;

/// Terminal state of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    /// `DenyCode::Ok` when allowed.
    pub code: DenyCode,
    pub description: String,
    pub injected_headers: BTreeMap<String, String>,
    /// Every verdict produced before the decision, in evaluation order.
    pub verdicts: Vec<MatchVerdict>,
}

/// Allow/deny and reason, before headers and verdicts are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub allowed: bool,
    pub code: DenyCode,
    pub description: String,
}

impl Outcome {
    pub fn allow(description: impl Into<String>) -> Self {
        Self {
            allowed: true,
            code: DenyCode::Ok,
            description: description.into(),
        }
    }

    pub fn deny(code: DenyCode, description: impl Into<String>) -> Self {
        Self {
            allowed: false,
            code,
            description: description.into(),
        }
    }

    pub(crate) fn into_decision(
        self,
        injected_headers: BTreeMap<String, String>,
        verdicts: Vec<MatchVerdict>,
    ) -> Decision {
        // Denied requests are not forwarded, so nothing is injected.
        let injected_headers = if self.allowed {
            injected_headers
        } else {
            BTreeMap::new()
        };
        Decision {
            allowed: self.allowed,
            code: self.code,
            description: self.description,
            injected_headers,
            verdicts,
        }
    }
}

/// Policy applied by the engine to every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionPolicy {
    pub mode: AggregationMode,
    pub default_action: MatchAction,
    pub failure_mode: FailureMode,
    pub deadline: Duration,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::from(&DecisionConfig::default())
    }
}

impl From<&DecisionConfig> for DecisionPolicy {
    fn from(config: &DecisionConfig) -> Self {
        Self {
            mode: config.mode,
            default_action: config.default_action,
            failure_mode: config.failure_mode,
            deadline: Duration::from_millis(config.deadline_ms),
        }
    }
}

impl DecisionPolicy {
    /// Outcome for a hard controller failure that aborted matching.
    pub fn on_failure(&self, controller: &str, error: &ControllerError) -> Outcome {
        match self.failure_mode {
            FailureMode::FailClosed => Outcome::deny(
                error.deny_code(),
                format!("controller '{}' failed: {}", controller, error),
            ),
            FailureMode::FailOpen => Outcome::allow(format!(
                "allowed despite failure of controller '{}': {}",
                controller, error
            )),
        }
    }

    /// Outcome when evaluation finishes without a decisive verdict.
    fn on_no_decision(&self) -> Outcome {
        match self.default_action {
            MatchAction::Allow => Outcome::allow("no controller matched"),
            MatchAction::Deny => Outcome::deny(DenyCode::PermissionDenied, "no controller matched"),
        }
    }
}

/// Incremental verdict aggregation for one request.
#[derive(Debug)]
pub struct Aggregator {
    policy: DecisionPolicy,
    allow: Option<Outcome>,
}

impl Aggregator {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self {
            policy,
            allow: None,
        }
    }

    /// Feed one verdict. Returns an outcome when no later verdict can change it.
    pub fn observe(&mut self, verdict: &MatchVerdict, action: MatchAction) -> Option<Outcome> {
        if !verdict.is_match {
            return None;
        }

        let outcome = match action {
            MatchAction::Allow => Outcome::allow(verdict.description.clone()),
            MatchAction::Deny => Outcome::deny(verdict.deny_code, verdict.description.clone()),
        };

        match (self.policy.mode, action) {
            (AggregationMode::FirstDecisive, _) | (AggregationMode::DenyOverrides, MatchAction::Deny) => {
                Some(outcome)
            }
            (AggregationMode::DenyOverrides, MatchAction::Allow) => {
                self.allow.get_or_insert(outcome);
                None
            }
        }
    }

    /// Outcome once every controller has run.
    pub fn finish(self) -> Outcome {
        match self.allow {
            Some(outcome) => outcome,
            None => self.policy.on_no_decision(),
        }
    }
}
