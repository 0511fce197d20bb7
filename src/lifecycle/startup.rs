//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every controller and the decision engine
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Controllers build in configured order, not concurrently
//! - The listener binds last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::{AuthzConfig, ConfigError, ListenerConfig};
use crate::controllers::{BuildContext, BuildError, ControllerRegistry};
use crate::engine::DecisionEngine;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the engine with the built-in controller kinds.
pub fn build_engine(config: &AuthzConfig) -> Result<DecisionEngine, StartupError> {
    build_engine_with(config, &ControllerRegistry::builtin(), BuildContext::new())
}

/// Build the engine with a custom registry or pre-opened resources.
pub fn build_engine_with(
    config: &AuthzConfig,
    registry: &ControllerRegistry,
    mut ctx: BuildContext,
) -> Result<DecisionEngine, StartupError> {
    let engine = DecisionEngine::from_config(config, registry, &mut ctx).map_err(|e| {
        tracing::error!(error = %e, "Controller construction failed");
        e
    })?;
    Ok(engine)
}

pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })
}
