//! HTTP external-authorization adapter tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use geo_authz::config::{ControllerConfig, MatchAction};
use geo_authz::context::{MatchVerdict, RequestContext};
use geo_authz::controllers::analysis::GeoEnrichment;
use geo_authz::controllers::matchers::{CidrListMatcher, DynamicStoreMatcher};
use geo_authz::controllers::{ControllerError, MatchController};
use geo_authz::engine::{DecisionEngine, DecisionPolicy};
use geo_authz::store::{BackingStore, StoreError};
use serde_json::json;

mod common;

use common::{located, start_server, FixedGeo};

fn office_engine() -> DecisionEngine {
    let geo = Arc::new(FixedGeo::new().with("10.1.2.3", located("DE", 52.5, 13.4)));
    let cidr = CidrListMatcher::from_config(&ControllerConfig::new(
        "office",
        "cidr_list",
        json!({ "cidrs": ["10.0.0.0/8"] }).as_object().cloned().unwrap(),
    ))
    .unwrap();

    DecisionEngine::new(DecisionPolicy::default())
        .with_analysis(Arc::new(GeoEnrichment::new("geo", geo, "x-geo-", None)))
        .with_matcher(Arc::new(cidr), MatchAction::Allow)
}

#[tokio::test]
async fn test_allowed_check_returns_injected_headers() {
    let (addr, shutdown) = start_server(office_engine()).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("http://{}/orders/42", addr))
        .header("x-forwarded-for", "198.51.100.20, 10.1.2.3")
        .header("x-request-id", "check-1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert_eq!(res.headers()["x-geo-country-code"], "DE");
    assert_eq!(res.headers()["x-request-id"], "check-1");

    shutdown.trigger();
}

#[tokio::test]
async fn test_denied_check_returns_reason() {
    let (addr, shutdown) = start_server(office_engine()).await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("http://{}/login", addr))
        .header("x-envoy-external-address", "203.0.113.1")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::FORBIDDEN);
    assert!(res.headers().contains_key("x-request-id"));
    assert!(res.headers().get("x-geo-country-code").is_none());
    assert_eq!(res.text().await.unwrap(), "no controller matched");

    shutdown.trigger();
}

#[tokio::test]
async fn test_peer_address_is_the_fallback_source() {
    // The test client connects from 127.0.0.1.
    let cidr = CidrListMatcher::from_config(&ControllerConfig::new(
        "loopback",
        "cidr_list",
        json!({ "cidrs": ["127.0.0.0/8"] }).as_object().cloned().unwrap(),
    ))
    .unwrap();
    let engine = DecisionEngine::new(DecisionPolicy::default()).with_matcher(Arc::new(cidr), MatchAction::Allow);
    let (addr, shutdown) = start_server(engine).await;

    let res = reqwest::get(format!("http://{}/", addr)).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    shutdown.trigger();
}

#[derive(Debug)]
struct Unreachable;

#[async_trait]
impl BackingStore for Unreachable {
    async fn contains(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::InvalidSetting("connection refused".to_string()))
    }

    fn describe(&self) -> String {
        "redis:trusted:*".to_string()
    }
}

#[tokio::test]
async fn test_store_failure_maps_to_unavailable() {
    let engine = DecisionEngine::new(DecisionPolicy::default()).with_matcher(
        Arc::new(DynamicStoreMatcher::new("trusted", Arc::new(Unreachable))),
        MatchAction::Allow,
    );
    let (addr, shutdown) = start_server(engine).await;

    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .header("x-forwarded-for", "198.51.100.7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert!(res.text().await.unwrap().contains("trusted"));

    shutdown.trigger();
}

struct Stalled;

#[async_trait]
impl MatchController for Stalled {
    fn name(&self) -> &str {
        "stalled"
    }

    fn kind(&self) -> &'static str {
        "dynamic_store"
    }

    async fn evaluate(
        &self,
        _ctx: &RequestContext,
        _prior: &[MatchVerdict],
    ) -> Result<MatchVerdict, ControllerError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(MatchVerdict::matched("stalled", "dynamic_store", "too late"))
    }
}

#[tokio::test]
async fn test_proxy_timeout_shortens_deadline() {
    let engine = DecisionEngine::new(DecisionPolicy::default()).with_matcher(Arc::new(Stalled), MatchAction::Allow);
    let (addr, shutdown) = start_server(engine).await;

    let started = std::time::Instant::now();
    let res = reqwest::Client::new()
        .get(format!("http://{}/", addr))
        .header("x-envoy-expected-rq-timeout-ms", "20")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(2));

    shutdown.trigger();
}
