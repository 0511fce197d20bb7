//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every method and path is a check
//! - Wire up middleware (tracing, timeout, body limit)
//! - Bind server to listener and drain on shutdown
//! - Hand each check to the decision engine

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ListenerConfig;
use crate::context::RequestContext;
use crate::engine::DecisionEngine;
use crate::http::{request, response};

/// Headroom on top of the decision deadline before the transport gives up.
const TIMEOUT_SLACK: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub xff_trusted_hops: usize,
}

/// HTTP external-authorization server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(engine: Arc<DecisionEngine>, config: &ListenerConfig) -> Self {
        let deadline = engine.policy().deadline;
        let state = AppState {
            engine,
            xff_trusted_hops: config.xff_trusted_hops,
        };
        Self {
            router: Self::build_router(config, deadline, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ListenerConfig, deadline: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(check_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
            .layer(TimeoutLayer::new(deadline + TIMEOUT_SLACK))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve checks until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Authorization server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight checks");
            })
            .await?;

        tracing::info!("Authorization server stopped");
        Ok(())
    }
}

/// One authorization check.
async fn check_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request<Body>,
) -> Response {
    let (parts, _body) = req.into_parts();
    let request_id = request::request_id(&parts.headers);
    let budget = request::decision_budget(&parts.headers, state.engine.policy().deadline);
    let check = request::check_request(
        request_id.clone(),
        &parts.method,
        &parts.uri,
        &parts.headers,
        peer,
        state.xff_trusted_hops,
    );

    tracing::debug!(
        request_id = %request_id,
        source = %check.source_address,
        method = %check.method,
        path = %check.path,
        budget_ms = budget.as_millis() as u64,
        "Check received"
    );

    let ctx = RequestContext::new(check).with_deadline(tokio::time::Instant::now() + budget);
    let decision = state.engine.decide(ctx).await;
    response::decision_response(&decision, &request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchAction;
    use crate::controllers::matchers::CidrListMatcher;
    use crate::engine::DecisionPolicy;
    use crate::store::FileStore;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app(max_body_bytes: usize) -> Router {
        let office = FileStore::from_entries("office", ["10.0.0.0/8"]).unwrap();
        let engine = DecisionEngine::new(DecisionPolicy::default()).with_matcher(
            Arc::new(CidrListMatcher::new("office", office, None)),
            MatchAction::Allow,
        );
        let config = ListenerConfig {
            max_body_bytes,
            ..ListenerConfig::default()
        };
        HttpServer::new(Arc::new(engine), &config)
            .router
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, 9], 40000))))
    }

    #[tokio::test]
    async fn test_any_path_is_a_check() {
        for uri in ["/", "/api/v1/orders", "/static/app.js?v=3"] {
            let response = app(1024)
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_forwarded_source_overrides_peer() {
        let response = app(1024)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "203.0.113.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_client_prepended_hop_cannot_claim_allowlisted_source() {
        let response = app(1024)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-forwarded-for", "10.0.0.1, 203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let response = app(16)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .header("content-length", "1024")
                    .body(Body::from(vec![0u8; 1024]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
