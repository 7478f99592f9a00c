//! Liveness probe against the origin.

use http::StatusCode;
use s3relay_core::OriginEndpoint;
use serde_json::json;
use tracing::warn;

use crate::body::RelayBody;
use crate::forward::OriginClient;
use crate::response::json_response;

/// Status reported when the origin is not healthy.
pub const ORIGIN_DOWN: u16 = 521;

/// Result of probing the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginHealth {
    /// The origin answered with a 2xx status.
    Healthy,
    /// The origin answered with another status.
    BadStatus(StatusCode),
    /// The origin could not be reached.
    Unreachable(String),
}

/// Whether `method` and `path` address the reserved liveness path.
#[must_use]
pub fn is_health_request(method: &http::Method, path: &str, health_path: &str) -> bool {
    (*method == http::Method::GET || *method == http::Method::HEAD) && path == health_path
}

/// Send an unauthenticated `HEAD {origin}/`.
pub async fn probe<O: OriginClient>(origin: &O, endpoint: &OriginEndpoint) -> OriginHealth {
    let url = format!("{}/", endpoint.base_url());
    let request = match http::Request::head(url).body(None) {
        Ok(request) => request,
        Err(err) => return OriginHealth::Unreachable(err.to_string()),
    };

    match origin.send(request).await {
        Ok(response) if response.status().is_success() => OriginHealth::Healthy,
        Ok(response) => OriginHealth::BadStatus(response.status()),
        Err(err) => OriginHealth::Unreachable(err.to_string()),
    }
}

/// Liveness response for a probe result.
#[must_use]
pub fn health_response(
    health: &OriginHealth,
    endpoint: &OriginEndpoint,
    request_id: &str,
) -> http::Response<RelayBody> {
    let down = StatusCode::from_u16(ORIGIN_DOWN).expect("521 is a valid status code");
    let origin = endpoint.to_string();
    match health {
        OriginHealth::Healthy => json_response(
            StatusCode::OK,
            &json!({ "status": "healthy", "origin": origin }),
            request_id,
        ),
        OriginHealth::BadStatus(status) => {
            warn!(%status, request_id, "origin liveness probe returned non-success");
            json_response(
                down,
                &json!({
                    "status": "unhealthy",
                    "origin": origin,
                    "error": format!("origin returned {}", status.as_u16()),
                }),
                request_id,
            )
        }
        OriginHealth::Unreachable(reason) => {
            warn!(error = %reason, request_id, "origin liveness probe failed");
            json_response(
                down,
                &json!({ "status": "unhealthy", "origin": origin, "error": reason }),
                request_id,
            )
        }
    }
}
