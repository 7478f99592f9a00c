//! Path-style object addressing.

use std::fmt;

use crate::error::AuthError;
use crate::query::encode_path;

/// Bucket and key parsed from a decoded `/{bucket}/{key}` path.
///
/// The key keeps any further `/` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
}

impl ObjectPath {
    /// Create an object path from its parts.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Split a decoded request path into bucket and key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPath`] if the bucket or the key is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3relay_auth::ObjectPath;
    ///
    /// let object = ObjectPath::from_path("/photos/2024/cat.jpg").unwrap();
    /// assert_eq!(object.bucket, "photos");
    /// assert_eq!(object.key, "2024/cat.jpg");
    /// assert!(ObjectPath::from_path("/photos").is_err());
    /// ```
    pub fn from_path(path: &str) -> Result<Self, AuthError> {
        let trimmed = path.trim_start_matches('/');
        match trimmed.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(Self::new(bucket, key))
            }
            _ => Err(AuthError::InvalidPath(path.to_owned())),
        }
    }

    /// The decoded `/{bucket}/{key}` form used in canonical requests.
    #[must_use]
    pub fn decoded_path(&self) -> String {
        format!("/{}/{}", self.bucket, self.key)
    }

    /// The percent-encoded `/{bucket}/{key}` form used on the wire.
    #[must_use]
    pub fn encoded_path(&self) -> String {
        format!("/{}/{}", encode_path(&self.bucket), encode_path(&self.key))
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
