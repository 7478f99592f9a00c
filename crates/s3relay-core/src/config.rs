//! Relay configuration.
//!
//! Provides [`ProxyConfig`], the immutable value handed to the verifier, the
//! re-signer and the HTTP service at construction time. The binary loads it
//! from environment variables via [`ProxyConfig::from_env`]; tests build it
//! with the typed builder or feed [`ProxyConfig::from_lookup`] a closure.

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;
use crate::types::{CredentialPair, OriginEndpoint, OriginScheme};

/// Relay configuration.
///
/// # Examples
///
/// ```
/// use s3relay_core::{CredentialPair, OriginEndpoint, OriginScheme, ProxyConfig};
///
/// let config = ProxyConfig::builder()
///     .client(CredentialPair::new("client-key", "client-secret"))
///     .origin_credentials(CredentialPair::new("origin-key", "origin-secret"))
///     .origin(OriginEndpoint::new(OriginScheme::Https, "s3.example.com"))
///     .build();
///
/// assert_eq!(config.port, 8000);
/// assert_eq!(config.health_path, "/health");
/// assert_eq!(config.listen_addr(), "0.0.0.0:8000");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Credentials clients sign their requests with.
    pub client: CredentialPair,

    /// Credentials the relay signs forwarded requests with.
    pub origin_credentials: CredentialPair,

    /// Where forwarded requests go.
    pub origin: OriginEndpoint,

    /// Region placed in the V4 scope of re-signed requests. May be empty for
    /// origins without region semantics.
    #[builder(default = String::from("us-east-1"))]
    pub origin_region: String,

    /// When set, V4 requests must carry exactly this region in their scope.
    #[builder(default)]
    pub client_region: Option<String>,

    /// Reject presigned requests whose validity window has passed.
    #[builder(default = false)]
    pub enforce_expiry: bool,

    /// Host part of the bind address.
    #[builder(default = String::from("0.0.0.0"))]
    pub listen_host: String,

    /// Port part of the bind address.
    #[builder(default = 8000)]
    pub port: u16,

    /// Reserved liveness path; never forwarded.
    #[builder(default = String::from("/health"))]
    pub health_path: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl ProxyConfig {
    /// Load configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `CLIENT_ACCESS_KEY` / `CLIENT_SECRET_KEY` | `AWS_ACCESS_KEY` / `AWS_SECRET_KEY` |
    /// | `ORIGIN_ACCESS_KEY` / `ORIGIN_SECRET_KEY` | `AWS_ACCESS_KEY` / `AWS_SECRET_KEY` |
    /// | `ORIGIN_DOMAIN` | *(required)* |
    /// | `ORIGIN_SCHEME` | `https` |
    /// | `ORIGIN_REGION` | `AWS_REGION`, then `us-east-1` |
    /// | `CLIENT_REGION` | *(unset)* |
    /// | `ENFORCE_EXPIRY` | `false` |
    /// | `LISTEN_HOST` | `0.0.0.0` |
    /// | `PORT` | `8000` |
    /// | `HEALTH_PATH` | `/health` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a credential or the origin domain is
    /// missing, or when a value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset, except for `ORIGIN_REGION` and
    /// `AWS_REGION` where an empty string selects region-less signing.
    ///
    /// # Errors
    ///
    /// See [`ProxyConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |primary: &str, fallback: &str| {
            non_empty(primary)
                .or_else(|| non_empty(fallback))
                .ok_or_else(|| ConfigError::Missing(format!("{primary} (or {fallback})")))
        };

        let client = CredentialPair::new(
            required("CLIENT_ACCESS_KEY", "AWS_ACCESS_KEY")?,
            required("CLIENT_SECRET_KEY", "AWS_SECRET_KEY")?,
        );
        let origin_credentials = CredentialPair::new(
            required("ORIGIN_ACCESS_KEY", "AWS_ACCESS_KEY")?,
            required("ORIGIN_SECRET_KEY", "AWS_SECRET_KEY")?,
        );

        let domain =
            non_empty("ORIGIN_DOMAIN").ok_or_else(|| ConfigError::Missing("ORIGIN_DOMAIN".into()))?;
        let mut origin = OriginEndpoint::parse(&domain)?;
        if let Some(v) = non_empty("ORIGIN_SCHEME") {
            origin.scheme = v.parse::<OriginScheme>()?;
        }

        let mut config = Self::builder()
            .client(client)
            .origin_credentials(origin_credentials)
            .origin(origin)
            .build();

        if let Some(v) = lookup("ORIGIN_REGION").or_else(|| lookup("AWS_REGION")) {
            config.origin_region = v;
        }
        config.client_region = non_empty("CLIENT_REGION");
        if let Some(v) = non_empty("ENFORCE_EXPIRY") {
            config.enforce_expiry = parse_bool(&v);
        }
        if let Some(v) = non_empty("LISTEN_HOST") {
            config.listen_host = v;
        }
        if let Some(v) = non_empty("PORT") {
            config.port = v
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", format!("not a port number: {v:?}")))?;
        }
        if let Some(v) = non_empty("HEALTH_PATH") {
            if !v.starts_with('/') {
                return Err(ConfigError::invalid("HEALTH_PATH", "must start with '/'"));
            }
            config.health_path = v;
        }
        if let Some(v) = non_empty("LOG_LEVEL") {
            config.log_level = v;
        }

        debug!(
            origin = %config.origin,
            origin_region = %config.origin_region,
            port = config.port,
            "loaded relay configuration"
        );

        Ok(config)
    }

    /// The `host:port` string the server binds to.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }
}

/// Parse a string as a boolean, accepting `"1"` and `"true"` (case-insensitive).
fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
