//! Error types for signature verification.
//!
//! Every rejection is an [`AuthError`]; [`AuthError::kind`] sorts it into the
//! three rejection families the HTTP layer maps to status codes.

/// Rejection family of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A signature scheme was detected but its fields are missing or malformed.
    Classification,
    /// The fields are well formed but do not authenticate the request.
    Authentication,
    /// The path does not name an object (`/bucket/key`).
    Path,
}

/// Errors that can occur while verifying a signed request.
///
/// Messages may name structural details but never carry key material or
/// computed signatures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A query parameter required by the detected scheme is missing or empty.
    #[error("missing required query parameter: {0}")]
    MissingQueryParam(String),

    /// A query parameter is present but cannot be parsed.
    #[error("invalid query parameter {name}: {reason}")]
    InvalidQueryParam {
        /// Parameter name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// `X-Amz-Algorithm` is not `AWS4-HMAC-SHA256`.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The presented access key is not the client access key.
    #[error("access key mismatch")]
    AccessKeyMismatch,

    /// The credential scope names a region other than the pinned one.
    #[error("credential scope region {0:?} is not accepted")]
    RegionMismatch(String),

    /// The presigned validity window has passed.
    #[error("request has expired")]
    RequestExpired,

    /// The recomputed signature differs from the presented one.
    #[error("signature does not match")]
    SignatureDoesNotMatch,

    /// The request path does not contain both a bucket and an object key.
    #[error("invalid S3 path: {0}")]
    InvalidPath(String),
}

impl AuthError {
    /// The rejection family this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingQueryParam(_)
            | Self::InvalidQueryParam { .. }
            | Self::UnsupportedAlgorithm(_) => ErrorKind::Classification,
            Self::AccessKeyMismatch
            | Self::RegionMismatch(_)
            | Self::RequestExpired
            | Self::SignatureDoesNotMatch => ErrorKind::Authentication,
            Self::InvalidPath(_) => ErrorKind::Path,
        }
    }

    pub(crate) fn invalid_param(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidQueryParam {
            name: name.to_owned(),
            reason: reason.into(),
        }
    }
}
