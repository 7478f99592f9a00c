//! Regeneration of the outbound query string for a verified request.
//!
//! The inbound signature never travels upstream: a fresh query string is
//! built from scratch with the origin credentials, addressed at the origin
//! host, for the same object and an explicit "now".

use chrono::{DateTime, Utc};
use s3relay_core::{CredentialPair, OriginEndpoint, ProxyConfig};
use tracing::debug;

use crate::object::ObjectPath;
use crate::presign::{PresignRequest, presign_v2, presign_v4};
use crate::scheme::SignatureScheme;
use crate::verify::VerifiedRequest;

/// Shortest validity a regenerated SigV2 URL is given, in seconds.
pub const MIN_V2_VALIDITY_SECS: i64 = 60;

/// Signs outbound requests with the origin-facing credentials.
#[derive(Debug, Clone)]
pub struct Resigner {
    credentials: CredentialPair,
    endpoint: OriginEndpoint,
    region: String,
}

impl Resigner {
    /// Create a re-signer for `endpoint`.
    pub fn new(
        credentials: CredentialPair,
        endpoint: OriginEndpoint,
        region: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            endpoint,
            region: region.into(),
        }
    }

    /// Re-signer configured from the relay configuration.
    #[must_use]
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.origin_credentials.clone(),
            config.origin.clone(),
            config.origin_region.clone(),
        )
    }

    /// The origin this re-signer addresses.
    #[must_use]
    pub fn endpoint(&self) -> &OriginEndpoint {
        &self.endpoint
    }

    /// Regenerated query string for `verified`, or `None` for unsigned requests.
    ///
    /// SigV4 keeps the client's method and `X-Amz-Expires`. SigV2 keeps the remaining
    /// validity of the client's `Expires`, but never less than
    /// [`MIN_V2_VALIDITY_SECS`].
    #[must_use]
    pub fn resign(&self, verified: &VerifiedRequest<'_>, now: DateTime<Utc>) -> Option<String> {
        let context = verified.context();
        let object = context.object()?;

        let (expires_in, url) = match context.scheme() {
            SignatureScheme::Unsigned => return None,
            SignatureScheme::V4(params) => {
                let request = self.request(context.method().as_str(), object, params.expires);
                (params.expires, presign_v4(&request, now))
            }
            SignatureScheme::V2(params) => {
                let remaining = params
                    .expires
                    .saturating_sub(now.timestamp())
                    .max(MIN_V2_VALIDITY_SECS);
                let expires_in = u64::try_from(remaining).unwrap_or(u64::MAX);
                let request = self.request("GET", object, expires_in);
                (expires_in, presign_v2(&request, now))
            }
        };

        debug!(
            scheme = %context.scheme(),
            object = %object,
            expires_in,
            "regenerated outbound query"
        );
        Some(url.query)
    }

    fn request<'a>(
        &'a self,
        method: &'a str,
        object: &'a ObjectPath,
        expires_in: u64,
    ) -> PresignRequest<'a> {
        PresignRequest {
            method,
            endpoint: &self.endpoint,
            credentials: &self.credentials,
            object,
            expires_in,
            region: &self.region,
        }
    }
}
