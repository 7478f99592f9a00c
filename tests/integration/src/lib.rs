//! End-to-end tests for the s3relay server.
//!
//! Each test binds a mock origin and a relay on ephemeral loopback ports and
//! drives the relay with `reqwest`. The mock origin verifies incoming
//! presigned requests with the origin credentials, so a `200` from the relay
//! means both signature hops were valid.
//!
//! Run them with:
//! ```text
//! cargo test -p s3relay-integration
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};

use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use s3relay_auth::{SignatureContext, Verifier};
use s3relay_core::{CredentialPair, OriginEndpoint, OriginScheme, ProxyConfig};
use s3relay_http::{HttpOrigin, RelayHttpService};
use tokio::net::TcpListener;
use tracing::debug;

/// Access key clients sign with.
pub const CLIENT_ACCESS_KEY: &str = "RELAYCLIENTKEY";
/// Secret key clients sign with.
pub const CLIENT_SECRET_KEY: &str = "relay-client-secret";
/// Access key the relay signs with toward the origin.
pub const ORIGIN_ACCESS_KEY: &str = "ORIGINADMINKEY";
/// Secret key the relay signs with toward the origin.
pub const ORIGIN_SECRET_KEY: &str = "origin-admin-secret";

/// Path on the mock origin that answers with a redirect.
pub const REDIRECT_PATH: &str = "/bucket/redirect-me";

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Client-facing credentials.
#[must_use]
pub fn client_credentials() -> CredentialPair {
    CredentialPair::new(CLIENT_ACCESS_KEY, CLIENT_SECRET_KEY)
}

/// Origin-facing credentials.
#[must_use]
pub fn origin_credentials() -> CredentialPair {
    CredentialPair::new(ORIGIN_ACCESS_KEY, ORIGIN_SECRET_KEY)
}

/// A request as the mock origin received it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// Method.
    pub method: http::Method,
    /// Raw path.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// Headers.
    pub headers: http::HeaderMap,
    /// Collected body.
    pub body: Bytes,
    /// Status the origin answered with.
    pub status: http::StatusCode,
}

/// A running mock origin.
#[derive(Debug, Clone)]
pub struct MockOrigin {
    /// Bound address.
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockOrigin {
    /// Requests received so far.
    #[must_use]
    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    /// Endpoint the relay should forward to.
    #[must_use]
    pub fn endpoint(&self) -> OriginEndpoint {
        OriginEndpoint::new(OriginScheme::Http, self.addr.to_string())
    }
}

/// Start a mock origin that only accepts requests signed with the origin credentials.
pub async fn start_origin() -> anyhow::Result<MockOrigin> {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let verifier = Arc::new(Verifier::new(origin_credentials()));

    let seen_by_server = Arc::clone(&seen);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = Arc::clone(&seen_by_server);
            let verifier = Arc::clone(&verifier);
            let service = service_fn(move |req| {
                handle_origin(req, Arc::clone(&verifier), Arc::clone(&seen))
            });
            tokio::spawn(async move {
                let _ = HttpConnBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    Ok(MockOrigin { addr, seen })
}

async fn handle_origin(
    req: http::Request<Incoming>,
    verifier: Arc<Verifier>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .unwrap_or_default();

    let status = match SignatureContext::from_parts(&parts) {
        Ok(context) => match verifier.verify(&context, Utc::now()) {
            Ok(_) => http::StatusCode::OK,
            Err(err) => {
                debug!(error = %err, "mock origin rejected request");
                http::StatusCode::FORBIDDEN
            }
        },
        Err(_) => http::StatusCode::BAD_REQUEST,
    };

    if let Ok(mut seen) = seen.lock() {
        seen.push(SeenRequest {
            method: parts.method.clone(),
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(ToOwned::to_owned),
            headers: parts.headers.clone(),
            body,
            status,
        });
    }

    let mut response = http::Response::new(Full::new(Bytes::from(format!(
        "{} {}",
        parts.method,
        parts.uri.path()
    ))));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert("x-origin", http::HeaderValue::from_static("mock"));
    if status.is_success() && parts.uri.path() == REDIRECT_PATH {
        *response.status_mut() = http::StatusCode::TEMPORARY_REDIRECT;
        response.headers_mut().insert(
            http::header::LOCATION,
            http::HeaderValue::from_static("http://elsewhere.invalid/"),
        );
    }
    Ok(response)
}

/// Relay configuration pointing at `origin`.
#[must_use]
pub fn relay_config(origin: OriginEndpoint) -> ProxyConfig {
    ProxyConfig::builder()
        .client(client_credentials())
        .origin_credentials(origin_credentials())
        .origin(origin)
        .build()
}

/// Start a relay for `config` on an ephemeral loopback port.
pub async fn start_relay(config: ProxyConfig) -> anyhow::Result<SocketAddr> {
    init_tracing();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let service = RelayHttpService::new(HttpOrigin::new()?, &config);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let service = service.clone();
            tokio::spawn(async move {
                let _ = HttpConnBuilder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    Ok(addr)
}

/// Start a mock origin and a relay in front of it.
pub async fn start_pair() -> anyhow::Result<(MockOrigin, SocketAddr)> {
    let origin = start_origin().await?;
    let relay = start_relay(relay_config(origin.endpoint())).await?;
    Ok((origin, relay))
}

/// HTTP client that does not follow redirects.
#[must_use]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("reqwest client should build")
}

#[cfg(test)]
mod test_errors;
#[cfg(test)]
mod test_passthrough;
#[cfg(test)]
mod test_sigv2;
#[cfg(test)]
mod test_sigv4;
