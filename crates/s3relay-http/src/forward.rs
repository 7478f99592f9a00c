//! Forwarding of relayed requests to the origin.
//!
//! [`OriginClient`] is the seam between the relay pipeline and the network.
//! [`HttpOrigin`] implements it with `reqwest`: redirects are returned to the
//! caller instead of followed, and bodies stream in both directions.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;
use s3relay_core::OriginEndpoint;

use crate::body::{BoxError, RelayBody};
use crate::error::ForwardError;

/// Request body handed to an [`OriginClient`].
pub type OutboundBody = UnsyncBoxBody<Bytes, BoxError>;

/// Future returned by [`OriginClient::send`].
pub type ForwardFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<RelayBody>, ForwardError>> + Send>>;

/// Sends requests to the origin.
///
/// The request URI is absolute. A `None` body means none is sent.
pub trait OriginClient: Send + Sync + 'static {
    /// Send `request` and return the origin response, status untouched.
    fn send(&self, request: http::Request<Option<OutboundBody>>) -> ForwardFuture;
}

/// Headers that describe a single connection and are never relayed.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Whether requests with `method` carry their body to the origin.
#[must_use]
pub fn forwards_body(method: &http::Method) -> bool {
    matches!(
        *method,
        http::Method::POST | http::Method::PUT | http::Method::PATCH
    )
}

/// Absolute origin URL for `raw_path` and an optional query string.
///
/// # Examples
///
/// ```
/// use s3relay_core::OriginEndpoint;
/// use s3relay_http::forward::outbound_url;
///
/// let endpoint = OriginEndpoint::parse("http://localhost:9000").unwrap();
/// assert_eq!(
///     outbound_url(&endpoint, "/b/k", Some("x=1")),
///     "http://localhost:9000/b/k?x=1"
/// );
/// assert_eq!(outbound_url(&endpoint, "/b/k", None), "http://localhost:9000/b/k");
/// ```
#[must_use]
pub fn outbound_url(endpoint: &OriginEndpoint, raw_path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) => format!("{}{raw_path}?{query}", endpoint.base_url()),
        None => format!("{}{raw_path}", endpoint.base_url()),
    }
}

/// Inbound headers minus `Host`, `Content-Length` and hop-by-hop headers.
#[must_use]
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(inbound);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers
}

/// Copy of `headers` without hop-by-hop headers, including any named in `Connection`.
#[must_use]
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    let mut out = headers.clone();
    for name in HOP_BY_HOP.iter().chain(listed.iter()) {
        out.remove(name);
    }
    out
}

/// `reqwest`-backed [`OriginClient`].
#[derive(Debug, Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    /// Create a client that does not follow redirects.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::InvalidRequest`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, ForwardError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| ForwardError::InvalidRequest(err.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl OriginClient for HttpOrigin {
    fn send(&self, request: http::Request<Option<OutboundBody>>) -> ForwardFuture {
        let client = self.client.clone();
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let mut builder = client
                .request(parts.method, parts.uri.to_string())
                .headers(parts.headers);
            if let Some(body) = body {
                builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }

            // The URL carries a signature; keep it out of error messages.
            let response = builder
                .send()
                .await
                .map_err(|err| ForwardError::Transport(err.without_url().to_string()))?;

            let mut relayed = http::Response::new(RelayBody::empty());
            *relayed.status_mut() = response.status();
            *relayed.headers_mut() = strip_hop_by_hop(response.headers());
            *relayed.body_mut() = RelayBody::from_stream(response.bytes_stream());
            Ok(relayed)
        })
    }
}
