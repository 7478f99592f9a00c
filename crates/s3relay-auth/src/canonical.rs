//! Canonical request construction for presigned SigV4 URLs.
//!
//! ```text
//! HTTPRequestMethod\n
//! Path\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n
//! SignedHeaders\n
//! UNSIGNED-PAYLOAD
//! ```
//!
//! The path is the decoded request path used as-is. Every canonical header
//! line ends with `\n`, so the header block is followed by one blank line.

use http::HeaderMap;

use crate::query::QueryParams;

/// Payload hash for presigned URLs.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Query parameter that carries the SigV4 signature and is never signed itself.
pub const SIGNATURE_PARAM: &str = "X-Amz-Signature";

/// Build the canonical headers block for the `;`-separated `signed_headers`.
///
/// Names are sorted; each contributes `{name}:{trimmed value}\n`. `host` takes
/// its value from `host` rather than from `headers`. A name absent from the
/// request contributes nothing.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use s3relay_auth::canonical::build_canonical_headers;
///
/// let block = build_canonical_headers("host", "bucket.example.com", &HeaderMap::new());
/// assert_eq!(block, "host:bucket.example.com\n");
/// ```
#[must_use]
pub fn build_canonical_headers(signed_headers: &str, host: &str, headers: &HeaderMap) -> String {
    let mut names: Vec<&str> = signed_headers
        .split(';')
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_unstable();

    names
        .into_iter()
        .filter_map(|name| {
            let value = if name.eq_ignore_ascii_case("host") {
                host
            } else {
                headers
                    .get(name.to_ascii_lowercase().as_str())?
                    .to_str()
                    .ok()?
            };
            Some(format!("{name}:{}\n", value.trim()))
        })
        .collect()
}

/// Canonical query string: every parameter but the signature, canonically encoded.
#[must_use]
pub fn build_canonical_query(params: &QueryParams) -> String {
    params.encode_excluding(SIGNATURE_PARAM)
}

/// Join the components into the canonical request.
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
) -> String {
    format!(
        "{method}\n{path}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{UNSIGNED_PAYLOAD}"
    )
}
