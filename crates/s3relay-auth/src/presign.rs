//! Presigned GET URL generation.
//!
//! Used by the re-signer to address the origin and by the standalone signer
//! CLI. Both versions sign `/{bucket}/{key}` for a caller-supplied "now", so
//! output is deterministic. SigV4 signs the requested method; SigV2 always
//! signs `GET`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use s3relay_core::{CredentialPair, OriginEndpoint};

use crate::canonical::{build_canonical_headers, build_canonical_query, build_canonical_request};
use crate::object::ObjectPath;
use crate::query::QueryParams;
use crate::scheme::{v2, v4};
use crate::signing::{
    V4_ALGORITHM, credential_scope, derive_signing_key, sign_v2, sign_v4, string_to_sign_v2,
    string_to_sign_v4,
};

/// Signature version to presign with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureVersion {
    /// HMAC-SHA1 query auth.
    #[default]
    V2,
    /// AWS4-HMAC-SHA256 query auth.
    V4,
}

impl FromStr for SignatureVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2" | "v2" => Ok(Self::V2),
            "4" | "v4" => Ok(Self::V4),
            other => Err(format!("unsupported signature version {other:?}, expected 2 or 4")),
        }
    }
}

/// Inputs for a presigned URL.
#[derive(Debug, Clone, Copy)]
pub struct PresignRequest<'a> {
    /// HTTP method the SigV4 URL is valid for; SigV2 always signs `GET`.
    pub method: &'a str,
    /// Where the URL points.
    pub endpoint: &'a OriginEndpoint,
    /// Credentials to sign with.
    pub credentials: &'a CredentialPair,
    /// Object to address.
    pub object: &'a ObjectPath,
    /// Validity window in seconds.
    pub expires_in: u64,
    /// SigV4 scope region; ignored by V2.
    pub region: &'a str,
}

/// A generated presigned URL, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// `scheme://host`.
    pub base_url: String,
    /// Encoded `/{bucket}/{key}`.
    pub path: String,
    /// Encoded query string, without `?`.
    pub query: String,
}

impl fmt::Display for PresignedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}?{}", self.base_url, self.path, self.query)
    }
}

/// Presign with the requested version.
#[must_use]
pub fn presign(
    version: SignatureVersion,
    request: &PresignRequest<'_>,
    now: DateTime<Utc>,
) -> PresignedUrl {
    match version {
        SignatureVersion::V2 => presign_v2(request, now),
        SignatureVersion::V4 => presign_v4(request, now),
    }
}

/// SigV4 presigned URL for `request.method`, signing only the `host` header.
#[must_use]
pub fn presign_v4(request: &PresignRequest<'_>, now: DateTime<Utc>) -> PresignedUrl {
    let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    let datestamp = &timestamp[..8];
    let scope = credential_scope(datestamp, request.region);
    let credential = format!("{}/{scope}", request.credentials.access_key);

    let mut params: QueryParams = [
        (v4::ALGORITHM, V4_ALGORITHM.to_owned()),
        (v4::CREDENTIAL, credential),
        (v4::DATE, timestamp.clone()),
        (v4::EXPIRES, request.expires_in.to_string()),
        (v4::SIGNED_HEADERS, "host".to_owned()),
    ]
    .into_iter()
    .collect();

    let canonical_request = build_canonical_request(
        request.method,
        &request.object.decoded_path(),
        &build_canonical_query(&params),
        &build_canonical_headers("host", &request.endpoint.host, &http::HeaderMap::new()),
        "host",
    );
    let string_to_sign = string_to_sign_v4(&timestamp, &scope, &canonical_request);
    let key = derive_signing_key(&request.credentials.secret_key, datestamp, request.region);
    params.insert(v4::SIGNATURE, sign_v4(&key, &string_to_sign));

    PresignedUrl {
        base_url: request.endpoint.base_url(),
        path: request.object.encoded_path(),
        query: params.encode(),
    }
}

/// SigV2 presigned GET expiring `expires_in` seconds after `now`.
#[must_use]
pub fn presign_v2(request: &PresignRequest<'_>, now: DateTime<Utc>) -> PresignedUrl {
    let expires_in = i64::try_from(request.expires_in).unwrap_or(i64::MAX);
    let expires = now.timestamp().saturating_add(expires_in).to_string();
    let string_to_sign = string_to_sign_v2(&expires, &request.object.bucket, &request.object.key);
    let signature = sign_v2(&request.credentials.secret_key, &string_to_sign);

    let params: QueryParams = [
        (v2::ACCESS_KEY_ID, request.credentials.access_key.clone()),
        (v2::EXPIRES, expires),
        (v2::SIGNATURE, signature),
    ]
    .into_iter()
    .collect();

    PresignedUrl {
        base_url: request.endpoint.base_url(),
        path: request.object.encoded_path(),
        query: params.encode(),
    }
}
