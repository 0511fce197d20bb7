//! Analysis controller implementations.

pub mod geo_enrichment;

pub use geo_enrichment::GeoEnrichment;
