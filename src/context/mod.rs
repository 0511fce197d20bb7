//! Request context subsystem.
//!
//! # Data Flow
//! ```text
//! Transport message (HTTP check, gRPC check, test)
//!     → CheckRequest (wire-neutral attributes)
//!     → RequestContext (parsed source IP, lowercased headers, deadline)
//!     → analysis controllers return AnalysisReport
//!     → engine merges reports into the context's enrichment
//!     → match controllers read the enriched context, return MatchVerdict
//! ```
//!
//! # Design Decisions
//! - One context per request, owned by the engine, never shared
//! - Controllers get `&RequestContext`; only the engine mutates it
//! - Unparseable source addresses are kept verbatim so matchers can report them

pub mod report;
pub mod request;

pub use report::{AnalysisReport, Coordinates, DenyCode, MatchVerdict};
pub use request::{CheckRequest, RequestContext};
