//! Signature scheme detection and presigned parameter parsing.
//!
//! Detection looks only at which marker parameters are present:
//!
//! - `X-Amz-Signature` means SigV4 query auth.
//! - `Signature` together with `AWSAccessKeyId` means SigV2 query auth.
//! - Anything else is an unsigned request.
//!
//! SigV4 wins when both marker sets are present. Once a scheme is detected,
//! its remaining fields are parsed eagerly; malformed fields fail closed and
//! never fall back to the unsigned path.

use std::fmt;

use crate::error::AuthError;
use crate::query::QueryParams;
use crate::signing::V4_ALGORITHM;

/// Validity window assumed when `X-Amz-Expires` is absent.
pub const DEFAULT_V4_EXPIRES: u64 = 3600;

/// SigV4 parameter names.
pub mod v4 {
    /// `X-Amz-Algorithm`.
    pub const ALGORITHM: &str = "X-Amz-Algorithm";
    /// `X-Amz-Credential`.
    pub const CREDENTIAL: &str = "X-Amz-Credential";
    /// `X-Amz-Date`.
    pub const DATE: &str = "X-Amz-Date";
    /// `X-Amz-Expires`.
    pub const EXPIRES: &str = "X-Amz-Expires";
    /// `X-Amz-SignedHeaders`.
    pub const SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
    /// `X-Amz-Signature`.
    pub const SIGNATURE: &str = "X-Amz-Signature";
}

/// SigV2 parameter names.
pub mod v2 {
    /// `AWSAccessKeyId`.
    pub const ACCESS_KEY_ID: &str = "AWSAccessKeyId";
    /// `Expires`.
    pub const EXPIRES: &str = "Expires";
    /// `Signature`.
    pub const SIGNATURE: &str = "Signature";
}

/// How the presented access key is compared with the configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKeyMatch {
    /// The presented value starts with the key, followed by `/` or nothing.
    /// Used for `X-Amz-Credential`, which carries the scope after the key.
    Prefix,
    /// The presented value equals the key.
    Exact,
}

impl AccessKeyMatch {
    /// Whether `presented` carries `configured` under this rule.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3relay_auth::AccessKeyMatch;
    ///
    /// let cred = "AKID/20240101/us-east-1/s3/aws4_request";
    /// assert!(AccessKeyMatch::Prefix.matches("AKID", cred));
    /// assert!(!AccessKeyMatch::Prefix.matches("AK", cred));
    /// assert!(!AccessKeyMatch::Exact.matches("AKID", cred));
    /// ```
    #[must_use]
    pub fn matches(self, configured: &str, presented: &str) -> bool {
        match self {
            Self::Exact => presented == configured,
            Self::Prefix => presented
                .strip_prefix(configured)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

/// Parsed SigV4 presigned parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V4Params {
    /// Raw `X-Amz-Credential` (`AKID/date/region/s3/aws4_request`), empty if absent.
    pub credential: String,
    /// `X-Amz-Date` (`YYYYMMDDTHHMMSSZ`).
    pub timestamp: String,
    /// Region from the credential scope, empty when the scope has none.
    pub region: String,
    /// `X-Amz-SignedHeaders` as presented.
    pub signed_headers: String,
    /// Validity window in seconds.
    pub expires: u64,
    /// Presented hex signature.
    pub signature: String,
}

impl V4Params {
    /// First eight characters of the timestamp.
    #[must_use]
    pub fn datestamp(&self) -> &str {
        // `parse` guarantees at least eight ASCII characters.
        &self.timestamp[..8]
    }

    fn parse(params: &QueryParams) -> Result<Self, AuthError> {
        let algorithm = params
            .non_empty(v4::ALGORITHM)
            .ok_or_else(|| AuthError::MissingQueryParam(v4::ALGORITHM.to_owned()))?;
        if algorithm != V4_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
        }

        let signature = required(params, v4::SIGNATURE)?;
        let timestamp = required(params, v4::DATE)?;
        if timestamp.len() < 8 || !timestamp.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
            return Err(AuthError::invalid_param(
                v4::DATE,
                "expected YYYYMMDDTHHMMSSZ",
            ));
        }

        let expires = match params.first(v4::EXPIRES) {
            None => DEFAULT_V4_EXPIRES,
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| AuthError::invalid_param(v4::EXPIRES, "expected seconds"))?,
        };

        let credential = params.first(v4::CREDENTIAL).unwrap_or_default().to_owned();
        let region = credential.split('/').nth(2).unwrap_or_default().to_owned();
        let signed_headers = params
            .non_empty(v4::SIGNED_HEADERS)
            .unwrap_or("host")
            .to_owned();

        Ok(Self {
            credential,
            timestamp,
            region,
            signed_headers,
            expires,
            signature,
        })
    }
}

/// Parsed SigV2 presigned parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V2Params {
    /// `AWSAccessKeyId`.
    pub access_key_id: String,
    /// `Expires` exactly as presented; this is what the client signed.
    pub expires_raw: String,
    /// `Expires` as epoch seconds.
    pub expires: i64,
    /// Presented base64 signature.
    pub signature: String,
}

impl V2Params {
    fn parse(params: &QueryParams) -> Result<Self, AuthError> {
        let access_key_id = params.first(v2::ACCESS_KEY_ID).unwrap_or_default().to_owned();
        let signature = required(params, v2::SIGNATURE)?;
        let expires_raw = required(params, v2::EXPIRES)?;
        let expires = expires_raw
            .parse::<i64>()
            .map_err(|_| AuthError::invalid_param(v2::EXPIRES, "expected epoch seconds"))?;

        Ok(Self {
            access_key_id,
            expires_raw,
            expires,
            signature,
        })
    }
}

/// The authentication scheme of an inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureScheme {
    /// No signature markers; forwarded untouched.
    Unsigned,
    /// SigV2 query-string auth.
    V2(V2Params),
    /// SigV4 presigned URL.
    V4(V4Params),
}

impl SignatureScheme {
    /// Detect the scheme from marker parameters and parse its fields.
    ///
    /// # Errors
    ///
    /// Returns a classification [`AuthError`] when markers are present but a
    /// required field is missing or malformed, or the algorithm is unsupported.
    pub fn detect(params: &QueryParams) -> Result<Self, AuthError> {
        if params.contains(v4::SIGNATURE) {
            V4Params::parse(params).map(Self::V4)
        } else if params.contains(v2::SIGNATURE) && params.contains(v2::ACCESS_KEY_ID) {
            V2Params::parse(params).map(Self::V2)
        } else {
            Ok(Self::Unsigned)
        }
    }

    /// Whether the request carries a signature.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        !matches!(self, Self::Unsigned)
    }

    /// Short label for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsigned => "unsigned",
            Self::V2(_) => "v2",
            Self::V4(_) => "v4",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn required(params: &QueryParams, name: &str) -> Result<String, AuthError> {
    params
        .non_empty(name)
        .map(ToOwned::to_owned)
        .ok_or_else(|| AuthError::MissingQueryParam(name.to_owned()))
}
