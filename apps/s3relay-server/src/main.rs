//! s3relay server - presigned S3 URL relay.
//!
//! Accepts requests presigned with the client-facing credentials, verifies
//! them, re-signs them with the origin-facing credentials and streams them to
//! the origin.
//!
//! # Usage
//!
//! ```text
//! CLIENT_ACCESS_KEY=... CLIENT_SECRET_KEY=... \
//! ORIGIN_ACCESS_KEY=... ORIGIN_SECRET_KEY=... \
//! ORIGIN_DOMAIN=minio.internal:9000 ORIGIN_SCHEME=http s3relay-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLIENT_ACCESS_KEY` / `CLIENT_SECRET_KEY` | `AWS_ACCESS_KEY` / `AWS_SECRET_KEY` | Pair clients sign with |
//! | `ORIGIN_ACCESS_KEY` / `ORIGIN_SECRET_KEY` | `AWS_ACCESS_KEY` / `AWS_SECRET_KEY` | Pair used toward the origin |
//! | `ORIGIN_DOMAIN` | *(required)* | Origin host, optionally with port or scheme |
//! | `ORIGIN_SCHEME` | `https` | `http` or `https` |
//! | `ORIGIN_REGION` | `AWS_REGION`, else `us-east-1` | Region for re-signed SigV4 URLs |
//! | `CLIENT_REGION` | *(unset)* | Only accept SigV4 scopes for this region |
//! | `ENFORCE_EXPIRY` | `false` | Reject expired presigned URLs |
//! | `LISTEN_HOST` | `0.0.0.0` | Bind host |
//! | `PORT` | `8000` | Bind port |
//! | `HEALTH_PATH` | `/health` | Liveness path |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use s3relay_core::ProxyConfig;
use s3relay_http::{HttpOrigin, OriginClient, RelayHttpService};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<O: OriginClient>(listener: TcpListener, service: RelayHttpService<O>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Local address the health check connects to.
fn probe_addr(config: &ProxyConfig) -> String {
    config.listen_addr().replace("0.0.0.0", "127.0.0.1")
}

/// Request the relay's own liveness path; succeeds only on `200`.
async fn run_health_check(addr: &str, path: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.starts_with("HTTP/1.1 200") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ProxyConfig::from_env().context("invalid relay configuration")?;

    // Handle --health-check flag for container health checks.
    if std::env::args().any(|a| a == "--health-check") {
        let healthy = run_health_check(&probe_addr(&config), &config.health_path)
            .await
            .is_ok();
        std::process::exit(i32::from(!healthy));
    }

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen_addr(),
        origin = %config.origin,
        origin_region = %config.origin_region,
        client_access_key = %config.client.access_key,
        client_region = ?config.client_region,
        enforce_expiry = config.enforce_expiry,
        version = VERSION,
        "starting s3relay server",
    );

    let origin = HttpOrigin::new().context("failed to build origin client")?;
    let service = RelayHttpService::new(origin, &config);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}

#[cfg(test)]
mod tests {
    use s3relay_core::{CredentialPair, OriginEndpoint};

    use super::*;

    #[test]
    fn test_should_probe_loopback_when_bound_to_all_interfaces() {
        let config = ProxyConfig::builder()
            .client(CredentialPair::new("c", "cs"))
            .origin_credentials(CredentialPair::new("o", "os"))
            .origin(OriginEndpoint::parse("s3.example.com").unwrap())
            .port(9100)
            .build();
        assert_eq!(probe_addr(&config), "127.0.0.1:9100");
    }

    #[tokio::test]
    async fn test_should_fail_health_check_without_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(run_health_check(&addr, "/health").await.is_err());
    }
}
