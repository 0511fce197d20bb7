//! Geo database subsystem.
//!
//! # Data Flow
//! ```text
//! MMDB file (City / Country / ASN edition)
//!     → database.rs (opened once at startup, shared via Arc)
//!     → GeoDatabase::lookup(ip)
//!         → Ok(Some(GeoRecord))  found
//!         → Ok(None)             address not in database (not an error)
//!         → Err(GeoError)        corrupt data / decode failure
//! ```
//!
//! # Design Decisions
//! - Lookups are synchronous; the database is an in-memory tree
//! - Callers log misses and errors; only errors are escalated
//! - `GeoDatabase` is a trait so tests can substitute fixed records

pub mod database;
pub mod record;

pub use database::{GeoDatabase, GeoError, MaxmindDatabase};
pub use record::GeoRecord;
