//! HMAC primitives for both signature versions.
//!
//! ```text
//! SigV4:
//!   DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
//!   DateRegionKey        = HMAC-SHA256(DateKey, region)
//!   DateRegionServiceKey = HMAC-SHA256(DateRegionKey, "s3")
//!   SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
//!   Signature            = hex(HMAC-SHA256(SigningKey, StringToSign))
//!
//! SigV2 (query string):
//!   StringToSign = "GET\n\n\n" + Expires + "\n/" + bucket + "/" + key
//!   Signature    = base64(HMAC-SHA1(secret_key, StringToSign))
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// The only SigV4 algorithm S3 presigned URLs use.
pub const V4_ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name in every credential scope this relay builds or accepts.
pub const SERVICE: &str = "s3";

/// Terminator of a SigV4 credential scope.
pub const SCOPE_TERMINATOR: &str = "aws4_request";

/// `{date}/{region}/s3/aws4_request`.
///
/// `region` may be empty, which yields `{date}//s3/aws4_request`.
#[must_use]
pub fn credential_scope(datestamp: &str, region: &str) -> String {
    format!("{datestamp}/{region}/{SERVICE}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign from the raw canonical request.
///
/// # Examples
///
/// ```
/// use s3relay_auth::signing::string_to_sign_v4;
///
/// let sts = string_to_sign_v4("20130524T000000Z", "20130524/us-east-1/s3/aws4_request", "");
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n20130524/"));
/// ```
#[must_use]
pub fn string_to_sign_v4(timestamp: &str, scope: &str, canonical_request: &str) -> String {
    let hashed = sha256_hex(canonical_request.as_bytes());
    format!("{V4_ALGORITHM}\n{timestamp}\n{scope}\n{hashed}")
}

/// Derive the 32-byte SigV4 signing key.
#[must_use]
pub fn derive_signing_key(secret_key: &str, datestamp: &str, region: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), datestamp.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, SERVICE.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Lowercase hex HMAC-SHA256 of `string_to_sign` under `signing_key`.
#[must_use]
pub fn sign_v4(signing_key: &[u8], string_to_sign: &str) -> String {
    hex::encode(hmac_sha256(signing_key, string_to_sign.as_bytes()))
}

/// SigV2 string to sign for a presigned GET of `/{bucket}/{key}`.
///
/// `expires` is used verbatim, as the client sent it.
#[must_use]
pub fn string_to_sign_v2(expires: &str, bucket: &str, key: &str) -> String {
    format!("GET\n\n\n{expires}\n/{bucket}/{key}")
}

/// Standard base64 (with padding) HMAC-SHA1 of `string_to_sign` under `secret_key`.
#[must_use]
pub fn sign_v2(secret_key: &str, string_to_sign: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can accept keys of any length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Lowercase hex SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare two signatures in constant time.
#[must_use]
pub fn signatures_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
