//! Credential and endpoint types shared across s3relay.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// An access key / secret key pair.
///
/// Two instances live for the whole process: the pair clients sign with and
/// the pair the relay signs with toward the origin. The secret is redacted
/// from `Debug` output and never serialized.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    /// Public access key identifier.
    pub access_key: String,
    /// Secret key used as HMAC key material.
    #[serde(skip_serializing)]
    pub secret_key: String,
}

impl CredentialPair {
    /// Create a credential pair.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

/// URL scheme used to reach the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginScheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    #[default]
    Https,
}

impl OriginScheme {
    /// The scheme as it appears in a URL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for OriginScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OriginScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Self::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Self::Https)
        } else {
            Err(ConfigError::invalid(
                "ORIGIN_SCHEME",
                format!("expected http or https, got {s:?}"),
            ))
        }
    }
}

/// Scheme plus authority (`host[:port]`) of an S3-compatible endpoint.
///
/// # Examples
///
/// ```
/// use s3relay_core::{OriginEndpoint, OriginScheme};
///
/// let endpoint = OriginEndpoint::parse("minio.example.com:9000").unwrap();
/// assert_eq!(endpoint.scheme, OriginScheme::Https);
/// assert_eq!(endpoint.host, "minio.example.com:9000");
/// assert_eq!(endpoint.base_url(), "https://minio.example.com:9000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginEndpoint {
    /// Scheme used for outbound requests.
    pub scheme: OriginScheme,
    /// Host and optional port, exactly as signed in the `host` header.
    pub host: String,
}

impl OriginEndpoint {
    /// Create an endpoint from its parts.
    pub fn new(scheme: OriginScheme, host: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into(),
        }
    }

    /// Parse `host`, `host:port` or a full `scheme://host[:port][/...]` string.
    ///
    /// A value without a scheme is treated as HTTPS. Any path after the
    /// authority is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the scheme is unknown or the host is empty.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        let (scheme, rest) = match value.split_once("://") {
            Some((scheme, rest)) => (scheme.parse::<OriginScheme>()?, rest),
            None => (OriginScheme::Https, value),
        };

        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(ConfigError::invalid("endpoint", "host must not be empty"));
        }

        Ok(Self::new(scheme, host))
    }

    /// `scheme://host` without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

impl fmt::Display for OriginEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)
    }
}
