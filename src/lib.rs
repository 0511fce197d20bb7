//! Geo-aware external authorization service.
//!
//! A reverse proxy asks this service about every inbound request. Analysis
//! controllers enrich the request (geolocation, ASN), match controllers test it
//! against CIDR lists, ASN lists, geofences and dynamic stores, and the decision
//! engine folds their verdicts into allow or deny.

// Core pipeline
pub mod context;
pub mod controllers;
pub mod engine;

// Policy sources
pub mod geo;
pub mod geofence;
pub mod store;

// Service
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AuthzConfig;
pub use context::{CheckRequest, RequestContext};
pub use engine::{Decision, DecisionEngine};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
