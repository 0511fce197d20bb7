//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define authorization metrics (decisions, latency, controller errors, caches)
//! - Expose Prometheus-compatible metrics endpoint
//! - Count geofence matches per polygon name
//!
//! # Metrics
//! - `authz_decisions_total` (counter): decisions by allowed, code
//! - `authz_decision_duration_seconds` (histogram): time spent per decision
//! - `authz_controller_errors_total` (counter): hard errors by controller, kind
//! - `authz_cache_lookups_total` (counter): cache hits/misses by controller
//! - `geofence_matches_total` (counter): matches by polygon
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Labels are bounded by configuration (controller and polygon names)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a final decision.
pub fn record_decision(allowed: bool, code: &'static str, start: Instant) {
    counter!(
        "authz_decisions_total",
        "allowed" => if allowed { "true" } else { "false" },
        "code" => code
    )
    .increment(1);
    histogram!("authz_decision_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record a hard error from a controller.
pub fn record_controller_error(controller: &str, kind: &'static str) {
    counter!(
        "authz_controller_errors_total",
        "controller" => controller.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// Record a controller cache lookup.
pub fn record_cache_lookup(controller: &str, hit: bool) {
    counter!(
        "authz_cache_lookups_total",
        "controller" => controller.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

/// Record one geofence match.
pub fn record_geofence_match(polygon: &str) {
    counter!("geofence_matches_total", "polygon" => polygon.to_string()).increment(1);
}
