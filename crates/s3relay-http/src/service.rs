//! The relay HTTP service implementing hyper's `Service` trait.
//!
//! [`RelayHttpService`] runs every inbound request through the relay pipeline:
//!
//! 1. Liveness interception (`GET`/`HEAD` on the health path)
//! 2. Scheme detection and object path resolution
//! 3. Signature verification with the client credentials
//! 4. Query regeneration with the origin credentials (signed requests only)
//! 5. Forwarding to the origin and relaying its response
//!
//! Rejections and transport failures become JSON error responses.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CONTENT_LENGTH, HeaderValue};
use http_body::Body;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use s3relay_auth::{Resigner, SignatureContext, Verifier};
use s3relay_core::ProxyConfig;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::{BoxError, RelayBody};
use crate::error::ForwardError;
use crate::forward::{OriginClient, OutboundBody, forwarded_headers, forwards_body, outbound_url};
use crate::health::{health_response, is_health_request, probe};
use crate::response::{auth_error_response, forward_error_response};

/// Source of the current time used for verification and re-signing.
pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug)]
struct RelayState {
    verifier: Verifier,
    resigner: Resigner,
    health_path: String,
    clock: Clock,
}

/// The relay service, generic over how the origin is reached.
///
/// # Type Parameters
///
/// - `O`: The origin transport implementing [`OriginClient`].
#[derive(Debug)]
pub struct RelayHttpService<O: OriginClient> {
    origin: Arc<O>,
    state: Arc<RelayState>,
}

impl<O: OriginClient> RelayHttpService<O> {
    /// Create a service from the relay configuration.
    #[must_use]
    pub fn new(origin: O, config: &ProxyConfig) -> Self {
        Self::from_shared(Arc::new(origin), config)
    }

    /// Create a service around a shared origin client.
    #[must_use]
    pub fn from_shared(origin: Arc<O>, config: &ProxyConfig) -> Self {
        Self {
            origin,
            state: Arc::new(RelayState {
                verifier: Verifier::from_config(config),
                resigner: Resigner::from_config(config),
                health_path: config.health_path.clone(),
                clock: Utc::now,
            }),
        }
    }

    /// Replace the clock, for deterministic re-signing.
    #[must_use]
    pub fn with_clock(self, clock: Clock) -> Self {
        let state = RelayState {
            verifier: self.state.verifier.clone(),
            resigner: self.state.resigner.clone(),
            health_path: self.state.health_path.clone(),
            clock,
        };
        Self {
            origin: self.origin,
            state: Arc::new(state),
        }
    }

    /// Run one request through the relay pipeline.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<RelayBody>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let request_id = Uuid::new_v4().to_string();
        process_request(req, self.origin.as_ref(), &self.state, &request_id).await
    }
}

impl<O: OriginClient> Clone for RelayHttpService<O> {
    fn clone(&self) -> Self {
        Self {
            origin: Arc::clone(&self.origin),
            state: Arc::clone(&self.state),
        }
    }
}

impl<O: OriginClient> Service<http::Request<Incoming>> for RelayHttpService<O> {
    type Response = http::Response<RelayBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<O, B>(
    req: http::Request<B>,
    origin: &O,
    state: &RelayState,
    request_id: &str,
) -> http::Response<RelayBody>
where
    O: OriginClient,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (parts, body) = req.into_parts();
    let endpoint = state.resigner.endpoint();

    if is_health_request(&parts.method, parts.uri.path(), &state.health_path) {
        let health = probe(origin, endpoint).await;
        return health_response(&health, endpoint, request_id);
    }

    let context = match SignatureContext::from_parts(&parts) {
        Ok(context) => context,
        Err(err) => {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                error = %err,
                request_id,
                "rejected request"
            );
            return auth_error_response(&err, request_id);
        }
    };

    info!(
        method = %parts.method,
        path = %context.path(),
        scheme = %context.scheme(),
        request_id,
        "routed request"
    );

    let now = (state.clock)();
    let verified = match state.verifier.verify(&context, now) {
        Ok(verified) => verified,
        Err(err) => {
            warn!(
                scheme = %context.scheme(),
                error = %err,
                request_id,
                "signature verification failed"
            );
            return auth_error_response(&err, request_id);
        }
    };

    let query = state
        .resigner
        .resign(&verified, now)
        .or_else(|| parts.uri.query().map(ToOwned::to_owned));
    let url = outbound_url(endpoint, parts.uri.path(), query.as_deref());

    let mut headers = forwarded_headers(&parts.headers);
    let outbound_body = if forwards_body(&parts.method) {
        // Restored from the body so the origin gets a sized upload, not a chunked one.
        if let Some(len) = body.size_hint().exact() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        }
        Some(to_outbound(body))
    } else {
        None
    };

    let mut outbound = http::Request::new(outbound_body);
    *outbound.method_mut() = parts.method.clone();
    *outbound.headers_mut() = headers;
    match url.parse() {
        Ok(uri) => *outbound.uri_mut() = uri,
        Err(err) => {
            let err = ForwardError::InvalidRequest(err.to_string());
            warn!(error = %err, request_id, "failed to build outbound request");
            return forward_error_response(&err, request_id);
        }
    }

    match origin.send(outbound).await {
        Ok(response) => {
            debug!(status = %response.status(), request_id, "relaying origin response");
            response
        }
        Err(err) => {
            warn!(error = %err, request_id, "failed to forward request");
            forward_error_response(&err, request_id)
        }
    }
}

fn to_outbound<B>(body: B) -> OutboundBody
where
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::into).boxed_unsync()
}
