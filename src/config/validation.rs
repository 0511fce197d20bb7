//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Controller names unique within each list
//! - Controller types known to the registry
//! - Validate value ranges (deadline > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AuthzConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{AuthzConfig, ControllerConfig};
use crate::controllers::registry::{ANALYSIS_KINDS, MATCH_KINDS};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DuplicateController { list: &'static str, name: String },
    UnknownControllerType { list: &'static str, name: String, kind: String },
    EmptyControllerName { list: &'static str },
    InvalidAddress { field: &'static str, value: String },
    ZeroDeadline,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateController { list, name } => {
                write!(f, "duplicate controller name '{}' in {}", name, list)
            }
            ValidationError::UnknownControllerType { list, name, kind } => {
                write!(f, "controller '{}' in {} has unknown type '{}'", name, list, kind)
            }
            ValidationError::EmptyControllerName { list } => {
                write!(f, "controller in {} has an empty name", list)
            }
            ValidationError::InvalidAddress { field, value } => {
                write!(f, "{} '{}' is not a socket address", field, value)
            }
            ValidationError::ZeroDeadline => write!(f, "decision.deadline_ms must be > 0"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &AuthzConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_controllers("analysis", &config.analysis, ANALYSIS_KINDS, &mut errors);
    check_controllers("matchers", &config.matchers, MATCH_KINDS, &mut errors);

    if config.decision.deadline_ms == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_controllers(
    list: &'static str,
    controllers: &[ControllerConfig],
    known: &[&str],
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for controller in controllers {
        if controller.name.trim().is_empty() {
            errors.push(ValidationError::EmptyControllerName { list });
        } else if !seen.insert(controller.name.as_str()) {
            errors.push(ValidationError::DuplicateController {
                list,
                name: controller.name.clone(),
            });
        }

        if !known.contains(&controller.kind.as_str()) {
            errors.push(ValidationError::UnknownControllerType {
                list,
                name: controller.name.clone(),
                kind: controller.kind.clone(),
            });
        }
    }
}
