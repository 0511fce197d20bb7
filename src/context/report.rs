//! Analysis output and match verdict types.

use std::collections::BTreeMap;
use std::fmt;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// True when both components are finite and within WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Facts derived by one analysis controller for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    /// Header name → value to inject upstream.
    pub headers: BTreeMap<String, String>,
    pub coordinates: Option<Coordinates>,
    pub asn: Option<u32>,
}

impl AnalysisReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.coordinates.is_none() && self.asn.is_none()
    }
}

/// Status code attached to a verdict or final decision.
///
/// Mirrors the subset of gRPC status codes the proxy's authorization
/// protocol understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyCode {
    Ok,
    PermissionDenied,
    Unauthenticated,
    Unavailable,
    DeadlineExceeded,
    Internal,
}

impl DenyCode {
    /// Numeric gRPC status code.
    pub fn grpc_code(self) -> i32 {
        match self {
            DenyCode::Ok => 0,
            DenyCode::DeadlineExceeded => 4,
            DenyCode::PermissionDenied => 7,
            DenyCode::Internal => 13,
            DenyCode::Unavailable => 14,
            DenyCode::Unauthenticated => 16,
        }
    }

    /// HTTP status used by the HTTP authorization adapter.
    pub fn http_status(self) -> u16 {
        match self {
            DenyCode::Ok => 200,
            DenyCode::PermissionDenied => 403,
            DenyCode::Unauthenticated => 401,
            DenyCode::Unavailable => 503,
            DenyCode::DeadlineExceeded => 504,
            DenyCode::Internal => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DenyCode::Ok => "ok",
            DenyCode::PermissionDenied => "permission_denied",
            DenyCode::Unauthenticated => "unauthenticated",
            DenyCode::Unavailable => "unavailable",
            DenyCode::DeadlineExceeded => "deadline_exceeded",
            DenyCode::Internal => "internal",
        }
    }
}

impl fmt::Display for DenyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one match controller invocation. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchVerdict {
    pub is_match: bool,
    pub deny_code: DenyCode,
    pub description: String,
    pub controller_name: String,
    pub controller_type: String,
}

impl MatchVerdict {
    pub fn matched(
        controller_name: &str,
        controller_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            is_match: true,
            deny_code: DenyCode::PermissionDenied,
            description: description.into(),
            controller_name: controller_name.to_string(),
            controller_type: controller_type.to_string(),
        }
    }

    pub fn not_matched(
        controller_name: &str,
        controller_type: &str,
        description: impl Into<String>,
    ) -> Self {
        Self {
            is_match: false,
            ..Self::matched(controller_name, controller_type, description)
        }
    }
}
