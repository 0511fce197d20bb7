//! Decision to HTTP response mapping.
//!
//! # Responsibilities
//! - Allowed: `200` carrying the headers to inject upstream
//! - Denied: status from the deny code, description as the body
//! - Echo `x-request-id` on every response
//!
//! # Design Decisions
//! - Injected headers that are not valid HTTP are dropped with a warning
//!   instead of failing the whole check

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::engine::Decision;
use crate::http::request::X_REQUEST_ID;

pub fn decision_response(decision: &Decision, request_id: &str) -> Response {
    let status = StatusCode::from_u16(decision.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let body = if decision.allowed {
        Body::empty()
    } else {
        Body::from(decision.description.clone())
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();

    if !decision.allowed {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
    }

    for (name, value) in &decision.injected_headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => {
                tracing::warn!(request_id = %request_id, header = %name, "Dropping invalid injected header");
            }
        }
    }

    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(X_REQUEST_ID, value);
    }

    response
}
