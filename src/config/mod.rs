//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AuthzConfig (validated, immutable)
//!     → lifecycle::startup builds the controller chain from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Controller settings stay untyped here; each controller kind decodes its own
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AggregationMode, AuthzConfig, ControllerConfig, DecisionConfig, FailureMode, ListenerConfig,
    LogFormat, MatchAction, ObservabilityConfig, Settings,
};
