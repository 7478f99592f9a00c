//! Error types for s3relay configuration.

/// Errors raised while assembling a [`ProxyConfig`](crate::ProxyConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting has no value.
    #[error("missing required setting: {0}")]
    Missing(String),

    /// A setting is present but cannot be used.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
