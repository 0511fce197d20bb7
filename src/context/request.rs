//! Per-request attributes and enrichment accumulator.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use tokio::time::Instant;

use crate::context::report::{AnalysisReport, Coordinates};

/// Wire-neutral description of one authorization check.
///
/// Transport adapters fill this from their protocol message and hand it to
/// [`RequestContext::new`].
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    /// Caller-supplied or generated correlation id.
    pub request_id: String,
    /// Source address as seen by the proxy. May be empty or malformed.
    pub source_address: String,
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
}

/// Snapshot of one inbound request plus the facts analysis controllers derived for it.
///
/// The request attributes are read-only. Only the engine merges analysis
/// reports into the enrichment side, between the analysis and matching phases.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    source_address: String,
    source_ip: Option<IpAddr>,
    method: String,
    path: String,
    headers: HashMap<String, String>,
    deadline: Option<Instant>,
    injected: BTreeMap<String, String>,
    coordinates: Option<Coordinates>,
    asn: Option<u32>,
}

impl RequestContext {
    /// Build a context from a check request. Header names are lowercased.
    pub fn new(request: CheckRequest) -> Self {
        let source_address = request.source_address.trim().to_string();
        let source_ip = parse_source_ip(&source_address);
        let headers = request
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();

        Self {
            request_id: request.request_id,
            source_address,
            source_ip,
            method: request.method,
            path: request.path,
            headers,
            deadline: None,
            injected: BTreeMap::new(),
            coordinates: None,
            asn: None,
        }
    }

    /// Attach the point in time by which a decision must be produced.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// The literal source address, trimmed. Used as the cache key by IP controllers.
    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    /// The parsed source address, if it was a valid IPv4/IPv6 literal.
    pub fn source_ip(&self) -> Option<IpAddr> {
        self.source_ip
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up an inbound header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Headers accumulated for injection upstream.
    pub fn injected_headers(&self) -> &BTreeMap<String, String> {
        &self.injected
    }

    /// Coordinates contributed by an analysis controller, if any.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Autonomous system number contributed by an analysis controller, if any.
    pub fn asn(&self) -> Option<u32> {
        self.asn
    }

    /// Add a header to inject upstream. The last writer for a name wins.
    pub fn inject_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.injected
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Fold an analysis report into the enrichment accumulator.
    pub fn merge_report(&mut self, report: AnalysisReport) {
        for (name, value) in report.headers {
            self.inject_header(name, value);
        }
        if report.coordinates.is_some() {
            self.coordinates = report.coordinates;
        }
        if report.asn.is_some() {
            self.asn = report.asn;
        }
    }

    /// Consume the context, returning the headers to inject.
    pub fn into_injected_headers(self) -> BTreeMap<String, String> {
        self.injected
    }
}

/// Parse a source address that may carry a port (`1.2.3.4:80`, `[::1]:80`).
///
/// IPv4-mapped IPv6 addresses (`::ffff:10.1.2.3`) come back in IPv4 form.
fn parse_source_ip(raw: &str) -> Option<IpAddr> {
    if raw.is_empty() {
        return None;
    }
    let ip = match raw.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => raw.parse::<std::net::SocketAddr>().ok()?.ip(),
    };
    Some(ip.to_canonical())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str) -> CheckRequest {
        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), "curl/8.0".to_string());
        CheckRequest {
            request_id: "req-1".to_string(),
            source_address: source.to_string(),
            method: "GET".to_string(),
            path: "/api".to_string(),
            headers,
        }
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!(
            RequestContext::new(request("10.0.0.1")).source_ip(),
            Some("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            RequestContext::new(request(" 10.0.0.1:8080 ")).source_ip(),
            Some("10.0.0.1".parse().unwrap())
        );
        assert_eq!(
            RequestContext::new(request("[2001:db8::1]:443")).source_ip(),
            Some("2001:db8::1".parse().unwrap())
        );
        assert_eq!(
            RequestContext::new(request("::ffff:10.1.2.3")).source_ip(),
            Some("10.1.2.3".parse().unwrap())
        );
        assert_eq!(
            RequestContext::new(request("[::ffff:10.1.2.3]:443")).source_ip(),
            Some("10.1.2.3".parse().unwrap())
        );
        assert_eq!(RequestContext::new(request("not-an-ip")).source_ip(), None);
        assert_eq!(RequestContext::new(request("")).source_ip(), None);
    }

    #[test]
    fn test_headers_case_insensitive() {
        let ctx = RequestContext::new(request("10.0.0.1"));
        assert_eq!(ctx.header("user-agent"), Some("curl/8.0"));
        assert_eq!(ctx.header("USER-AGENT"), Some("curl/8.0"));
        assert_eq!(ctx.method(), "GET");
        assert_eq!(ctx.path(), "/api");
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut ctx = RequestContext::new(request("10.0.0.1"));
        let mut first = AnalysisReport::default();
        first.headers.insert("X-Geo-Country".to_string(), "DE".to_string());
        first.coordinates = Some(Coordinates::new(52.5, 13.4));
        ctx.merge_report(first);

        let mut second = AnalysisReport::default();
        second.headers.insert("x-geo-country".to_string(), "FR".to_string());
        ctx.merge_report(second);

        assert_eq!(ctx.injected_headers().get("x-geo-country").map(String::as_str), Some("FR"));
        // An empty report does not clear earlier coordinates.
        assert_eq!(ctx.coordinates(), Some(Coordinates::new(52.5, 13.4)));
    }
}
