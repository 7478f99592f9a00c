//! Locally generated responses: JSON errors and the request id header.

use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use s3relay_auth::{AuthError, ErrorKind};
use serde_json::json;

use crate::body::RelayBody;
use crate::error::ForwardError;

/// Header carrying the relay-assigned request id on local responses.
pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

/// HTTP status for a rejection family.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Classification | ErrorKind::Path => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication => StatusCode::FORBIDDEN,
    }
}

/// JSON response with `value` as body.
#[must_use]
pub fn json_response(
    status: StatusCode,
    value: &serde_json::Value,
    request_id: &str,
) -> http::Response<RelayBody> {
    let mut response = http::Response::new(RelayBody::from_bytes(value.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// `{"error": message}` with `status`.
#[must_use]
pub fn error_response(
    status: StatusCode,
    message: &str,
    request_id: &str,
) -> http::Response<RelayBody> {
    json_response(status, &json!({ "error": message }), request_id)
}

/// Rejection of an inbound request.
#[must_use]
pub fn auth_error_response(err: &AuthError, request_id: &str) -> http::Response<RelayBody> {
    error_response(status_for(err.kind()), &err.to_string(), request_id)
}

/// Failure to reach the origin.
#[must_use]
pub fn forward_error_response(err: &ForwardError, request_id: &str) -> http::Response<RelayBody> {
    error_response(StatusCode::BAD_GATEWAY, &err.to_string(), request_id)
}
