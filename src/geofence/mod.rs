//! Geofence subsystem.
//!
//! # Data Flow
//! ```text
//! GeoJSON FeatureCollection (file)
//!     → geojson.rs (decode, check names / closure / bounds)
//!     → polygon.rs (rings, bounding boxes, crossing-number test)
//!     → index.rs   (PolygonIndex, built once, read-only while serving)
//!
//! Per request:
//!     coordinates → PolygonIndex::matches → names of containing polygons
//!                                         → per-name match counters
//! ```
//!
//! # Design Decisions
//! - Invalid data fails construction; nothing is served from a partial set
//! - Even-odd rule per polygon; a multi-polygon matches if any part does
//! - Points on an edge or vertex are inside

pub mod geojson;
pub mod index;
pub mod polygon;

pub use geojson::FeatureViolation;
pub use index::{GeofenceError, PolygonIndex};
pub use polygon::{NamedPolygon, Polygon, Ring};
