//! HTTP external-authorization adapter.
//!
//! # Data Flow
//! ```text
//! Proxy check request (any method, any path)
//!     → server.rs   (Axum fallback handler, tracing/timeout/body-limit layers)
//!     → request.rs  (source address, request ID, deadline → CheckRequest)
//!     → DecisionEngine::decide
//!     → response.rs (200 + injected headers, or mapped deny status + reason)
//!     → Proxy forwards or rejects the original request
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
