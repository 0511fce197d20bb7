//! Decision engine.
//!
//! # Data Flow
//! ```text
//! RequestContext (+ deadline)
//!     → Analyzing: each analysis controller in order
//!         → report merged into the context (errors/timeouts: logged, skipped)
//!     → Matching: each match controller in order, given prior verdicts
//!         → Aggregator::observe (may decide early)
//!         → hard error / timeout → failure policy, matching aborted
//!     → Decided: Decision { allowed, code, description, injected_headers }
//! ```
//!
//! # Design Decisions
//! - `deny_overrides` by default: a matching deny controller ends evaluation
//!   with a deny; otherwise the first matching allow controller allows
//! - `first_decisive`: the first matching controller in order decides
//! - No match at all falls back to `default_action`
//! - Store failures deny by default (`fail_closed`); `fail_open` is opt-in
//! - Every controller call is bounded by the request deadline

pub mod decision;
pub mod pipeline;

pub use decision::{Aggregator, Decision, DecisionPolicy, Outcome};
pub use pipeline::DecisionEngine;
