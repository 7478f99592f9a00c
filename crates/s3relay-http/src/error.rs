//! Error types for the relay HTTP layer.

/// Errors raised before any origin response is available.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The outbound request could not be built.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
    /// The origin could not be reached or the exchange failed.
    #[error("origin request failed: {0}")]
    Transport(String),
}
