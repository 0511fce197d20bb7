//! Analysis and match controllers.
//!
//! # Data Flow
//! ```text
//! ControllerConfig { name, type, settings }
//!     → registry.rs (type string → constructor, fails fast on unknown types)
//!     → settings.rs (typed access, missing/invalid settings are fatal)
//!     → Arc<dyn AnalysisController> / Arc<dyn MatchController>
//!
//! Per request:
//!     analysis/*  → AnalysisReport (never fails the request)
//!     matchers/*  → MatchVerdict, or ControllerError for hard failures
//! ```
//!
//! # Design Decisions
//! - One trait per stage, one implementation per controller kind
//! - Controllers are long-lived shared singletons; caches live inside each instance
//! - Construction-time state (CIDR sets, polygon indexes) is read-only while serving

use async_trait::async_trait;

use crate::context::{AnalysisReport, DenyCode, MatchVerdict, RequestContext};
use crate::geo::GeoError;
use crate::geofence::GeofenceError;
use crate::store::StoreError;

pub mod analysis;
pub mod cache;
pub mod matchers;
pub mod registry;
pub mod settings;

pub use cache::ControllerCache;
pub use registry::{BuildContext, ControllerRegistry};

/// Enriches a request with derived facts. Never decides allow/deny.
#[async_trait]
pub trait AnalysisController: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    async fn analyze(&self, ctx: &RequestContext) -> Result<AnalysisReport, ControllerError>;
}

/// Evaluates an enriched request against a policy source.
#[async_trait]
pub trait MatchController: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// `prior` holds the verdicts of controllers that ran earlier for this request.
    async fn evaluate(
        &self,
        ctx: &RequestContext,
        prior: &[MatchVerdict],
    ) -> Result<MatchVerdict, ControllerError>;
}

/// Configuration errors raised while constructing a controller. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("controller '{controller}': missing required setting '{key}'")]
    MissingSetting { controller: String, key: String },

    #[error("controller '{controller}': invalid setting '{key}': {reason}")]
    InvalidSetting {
        controller: String,
        key: String,
        reason: String,
    },

    #[error("controller '{controller}': unknown type '{kind}'")]
    UnknownType { controller: String, kind: String },

    #[error("controller '{controller}': {source}")]
    Store {
        controller: String,
        #[source]
        source: StoreError,
    },

    #[error("controller '{controller}': {source}")]
    Geo {
        controller: String,
        #[source]
        source: GeoError,
    },

    #[error("controller '{controller}': {source}")]
    Geofence {
        controller: String,
        #[source]
        source: GeofenceError,
    },
}

/// Hard per-request failures that the engine turns into a policy decision.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("backing store {store} failed: {source}")]
    Store {
        store: String,
        #[source]
        source: StoreError,
    },

    #[error("geo lookup failed: {0}")]
    Geo(#[from] GeoError),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl ControllerError {
    /// Status reported when this error closes the request.
    pub fn deny_code(&self) -> DenyCode {
        match self {
            ControllerError::Store {
                source: StoreError::Timeout(_),
                ..
            }
            | ControllerError::DeadlineExceeded => DenyCode::DeadlineExceeded,
            ControllerError::Store { .. } => DenyCode::Unavailable,
            ControllerError::Geo(_) => DenyCode::Internal,
        }
    }

    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            ControllerError::Store { .. } => "store",
            ControllerError::Geo(_) => "geo",
            ControllerError::DeadlineExceeded => "deadline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_codes() {
        let timeout = ControllerError::Store {
            store: "redis:trusted:*".to_string(),
            source: StoreError::Timeout(Duration::from_millis(50)),
        };
        assert_eq!(timeout.deny_code(), DenyCode::DeadlineExceeded);

        let unavailable = ControllerError::Store {
            store: "redis:trusted:*".to_string(),
            source: StoreError::InvalidSetting("x".to_string()),
        };
        assert_eq!(unavailable.deny_code(), DenyCode::Unavailable);
        assert_eq!(unavailable.kind(), "store");
        assert_eq!(ControllerError::DeadlineExceeded.deny_code(), DenyCode::DeadlineExceeded);
    }

    #[test]
    fn test_build_error_messages() {
        let err = BuildError::MissingSetting {
            controller: "office".to_string(),
            key: "path".to_string(),
        };
        assert_eq!(err.to_string(), "controller 'office': missing required setting 'path'");
    }
}
