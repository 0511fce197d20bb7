//! Check request extraction.
//!
//! # Responsibilities
//! - Resolve the original client address behind the proxy
//! - Take or generate the request ID
//! - Derive the decision deadline from the proxy's own timeout
//! - Build the wire-neutral `CheckRequest`
//!
//! # Design Decisions
//! - `x-envoy-external-address` is trusted first; the proxy sets it from its
//!   own view of the downstream peer
//! - Only the first `x-forwarded-for` hop is used
//! - A proxy timeout can shorten the deadline but never extend it

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{HeaderMap, Method, Uri};

use crate::context::CheckRequest;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_ENVOY_EXTERNAL_ADDRESS: &str = "x-envoy-external-address";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_ENVOY_EXPECTED_RQ_TIMEOUT_MS: &str = "x-envoy-expected-rq-timeout-ms";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Request ID from the proxy, or a fresh UUID v4.
pub fn request_id(headers: &HeaderMap) -> String {
    header(headers, X_REQUEST_ID)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// The client address the decision is about.
///
/// `x-forwarded-for` is read from the right: clients can prepend anything,
/// so the entry `trusted_hops` places left of the last one is the first hop
/// a trusted proxy wrote. A chain shorter than that falls back to the peer.
pub fn source_address(headers: &HeaderMap, peer: SocketAddr, trusted_hops: usize) -> String {
    if let Some(external) = header(headers, X_ENVOY_EXTERNAL_ADDRESS) {
        return external.to_string();
    }
    let hops: Vec<&str> = header(headers, X_FORWARDED_FOR)
        .map(|chain| chain.split(',').map(str::trim).collect())
        .unwrap_or_default();
    if let Some(hop) = hops.iter().rev().nth(trusted_hops).filter(|hop| !hop.is_empty()) {
        return hop.to_string();
    }
    peer.ip().to_string()
}

/// Time budget for this check: the configured deadline, shortened by the proxy's.
pub fn decision_budget(headers: &HeaderMap, configured: Duration) -> Duration {
    header(headers, X_ENVOY_EXPECTED_RQ_TIMEOUT_MS)
        .and_then(|ms| ms.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(|ms| configured.min(Duration::from_millis(ms)))
        .unwrap_or(configured)
}

/// Build the engine input from an HTTP check request.
pub fn check_request(
    request_id: String,
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    peer: SocketAddr,
    trusted_hops: usize,
) -> CheckRequest {
    let mut flat: HashMap<String, String> = HashMap::with_capacity(headers.len());
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            flat.entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }
    }

    CheckRequest {
        request_id,
        source_address: source_address(headers, peer, trusted_hops),
        method: method.to_string(),
        path: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers: flat,
    }
}
