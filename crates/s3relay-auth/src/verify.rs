//! Verification of inbound presigned requests against the client credentials.
//!
//! A [`SignatureContext`] captures everything the signature depends on. The
//! [`Verifier`] checks it and hands back a [`VerifiedRequest`], the only
//! input the re-signer accepts.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use s3relay_core::{CredentialPair, ProxyConfig};
use tracing::debug;

use crate::canonical::{build_canonical_headers, build_canonical_query, build_canonical_request};
use crate::error::AuthError;
use crate::object::ObjectPath;
use crate::query::{QueryParams, decode};
use crate::scheme::{AccessKeyMatch, SignatureScheme, V2Params, V4Params};
use crate::signing::{
    credential_scope, derive_signing_key, sign_v2, sign_v4, signatures_match, string_to_sign_v2,
    string_to_sign_v4,
};

/// Everything about an inbound request that its signature covers.
///
/// Only built through [`SignatureContext::new`], so a signed context always
/// carries its object path.
#[derive(Debug, Clone)]
pub struct SignatureContext {
    method: http::Method,
    host: String,
    path: String,
    query: QueryParams,
    headers: HeaderMap,
    scheme: SignatureScheme,
    object: Option<ObjectPath>,
}

impl SignatureContext {
    /// Build a context from request parts.
    ///
    /// The host comes from the `Host` header, falling back to the URI authority.
    ///
    /// # Errors
    ///
    /// See [`SignatureContext::new`].
    pub fn from_parts(parts: &http::request::Parts) -> Result<Self, AuthError> {
        let host = parts
            .headers
            .get(http::header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
            .or_else(|| parts.uri.authority().map(ToString::to_string))
            .unwrap_or_default();

        Self::new(
            parts.method.clone(),
            host,
            parts.uri.path(),
            parts.uri.query().unwrap_or_default(),
            parts.headers.clone(),
        )
    }

    /// Classify a request and, when signed, resolve its object path.
    ///
    /// # Errors
    ///
    /// Returns a classification [`AuthError`] when signature fields are
    /// malformed and [`AuthError::InvalidPath`] when a signed request does not
    /// address an object.
    pub fn new(
        method: http::Method,
        host: impl Into<String>,
        raw_path: &str,
        raw_query: &str,
        headers: HeaderMap,
    ) -> Result<Self, AuthError> {
        let query = QueryParams::parse(raw_query);
        let scheme = SignatureScheme::detect(&query)?;
        let path = decode(raw_path);
        let object = if scheme.is_signed() {
            Some(ObjectPath::from_path(&path)?)
        } else {
            None
        };

        Ok(Self {
            method,
            host: host.into(),
            path,
            query,
            headers,
            scheme,
            object,
        })
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// Inbound `Host` value.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Percent-decoded request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query parameters.
    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    /// Inbound headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Detected scheme.
    #[must_use]
    pub fn scheme(&self) -> &SignatureScheme {
        &self.scheme
    }

    /// Bucket and key; `None` only for unsigned requests.
    #[must_use]
    pub fn object(&self) -> Option<&ObjectPath> {
        self.object.as_ref()
    }
}

/// Proof that a context passed verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifiedRequest<'a> {
    context: &'a SignatureContext,
}

impl<'a> VerifiedRequest<'a> {
    /// The verified context.
    #[must_use]
    pub fn context(&self) -> &'a SignatureContext {
        self.context
    }
}

/// Checks presigned requests against the client-facing credentials.
#[derive(Debug, Clone)]
pub struct Verifier {
    client: CredentialPair,
    pinned_region: Option<String>,
    enforce_expiry: bool,
}

impl Verifier {
    /// Verifier that accepts any scope region and ignores expiry.
    #[must_use]
    pub fn new(client: CredentialPair) -> Self {
        Self {
            client,
            pinned_region: None,
            enforce_expiry: false,
        }
    }

    /// Only accept V4 credential scopes naming `region`.
    #[must_use]
    pub fn with_pinned_region(mut self, region: Option<String>) -> Self {
        self.pinned_region = region;
        self
    }

    /// Reject requests whose validity window has passed.
    #[must_use]
    pub fn with_expiry_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_expiry = enforce;
        self
    }

    /// Verifier configured from the relay configuration.
    #[must_use]
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.client.clone())
            .with_pinned_region(config.client_region.clone())
            .with_expiry_enforcement(config.enforce_expiry)
    }

    /// Verify `context` as of `now`.
    ///
    /// Unsigned contexts pass unchanged.
    ///
    /// # Errors
    ///
    /// Returns an authentication [`AuthError`] on access key, region, expiry
    /// or signature mismatch.
    pub fn verify<'a>(
        &self,
        context: &'a SignatureContext,
        now: DateTime<Utc>,
    ) -> Result<VerifiedRequest<'a>, AuthError> {
        match (&context.scheme, &context.object) {
            (SignatureScheme::Unsigned, _) => {}
            (SignatureScheme::V4(params), _) => self.verify_v4(context, params, now)?,
            (SignatureScheme::V2(params), Some(object)) => self.verify_v2(object, params, now)?,
            (SignatureScheme::V2(_), None) => {
                return Err(AuthError::InvalidPath(context.path.clone()));
            }
        }
        Ok(VerifiedRequest { context })
    }

    fn verify_v4(
        &self,
        context: &SignatureContext,
        params: &V4Params,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if !AccessKeyMatch::Prefix.matches(&self.client.access_key, &params.credential) {
            return Err(AuthError::AccessKeyMismatch);
        }

        if let Some(pinned) = &self.pinned_region {
            if *pinned != params.region {
                return Err(AuthError::RegionMismatch(params.region.clone()));
            }
        }

        if self.enforce_expiry {
            check_v4_expiry(params, now)?;
        }

        let canonical_headers =
            build_canonical_headers(&params.signed_headers, &context.host, &context.headers);
        let canonical_request = build_canonical_request(
            context.method.as_str(),
            &context.path,
            &build_canonical_query(&context.query),
            &canonical_headers,
            &params.signed_headers,
        );
        debug!(canonical_request = %canonical_request, "built v4 canonical request");

        let scope = credential_scope(params.datestamp(), &params.region);
        let string_to_sign = string_to_sign_v4(&params.timestamp, &scope, &canonical_request);
        debug!(string_to_sign = %string_to_sign, "built v4 string to sign");

        let key = derive_signing_key(&self.client.secret_key, params.datestamp(), &params.region);
        let expected = sign_v4(&key, &string_to_sign);

        if signatures_match(&params.signature, &expected) {
            debug!(region = %params.region, "v4 signature verified");
            Ok(())
        } else {
            Err(AuthError::SignatureDoesNotMatch)
        }
    }

    fn verify_v2(
        &self,
        object: &ObjectPath,
        params: &V2Params,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        if !AccessKeyMatch::Exact.matches(&self.client.access_key, &params.access_key_id) {
            return Err(AuthError::AccessKeyMismatch);
        }

        if self.enforce_expiry && params.expires < now.timestamp() {
            return Err(AuthError::RequestExpired);
        }

        let string_to_sign = string_to_sign_v2(&params.expires_raw, &object.bucket, &object.key);
        debug!(string_to_sign = ?string_to_sign, "built v2 string to sign");
        let expected = sign_v2(&self.client.secret_key, &string_to_sign);

        if signatures_match(&params.signature, &expected) {
            debug!(object = %object, "v2 signature verified");
            Ok(())
        } else {
            Err(AuthError::SignatureDoesNotMatch)
        }
    }
}

fn check_v4_expiry(params: &V4Params, now: DateTime<Utc>) -> Result<(), AuthError> {
    let signed_at = NaiveDateTime::parse_from_str(&params.timestamp, "%Y%m%dT%H%M%SZ")
        .map_err(|_| AuthError::invalid_param("X-Amz-Date", "expected YYYYMMDDTHHMMSSZ"))?
        .and_utc();
    let window = i64::try_from(params.expires).unwrap_or(i64::MAX);
    if now.timestamp() > signed_at.timestamp().saturating_add(window) {
        return Err(AuthError::RequestExpired);
    }
    Ok(())
}
