//! Query-string decoding and canonical re-encoding.
//!
//! Parsing splits on `&`, keeps only `key=value` segments and percent-decodes
//! both sides. `+` is left as a literal plus. Encoding sorts by key, keeps the
//! original order of repeated keys and percent-encodes everything outside the
//! RFC 3986 unreserved set (`A-Z a-z 0-9 - _ . ~`), which is the encoding S3
//! expects in a canonical query string.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Characters percent-encoded in query keys and values.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as [`URI_ENCODE_SET`] but keeps `/` literal, for object paths.
const PATH_ENCODE_SET: &AsciiSet = &URI_ENCODE_SET.remove(b'/');

/// Decoded query parameters, keyed in sorted order.
///
/// Repeated keys keep every value in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    inner: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Decode a raw query string (without the leading `?`).
    ///
    /// Segments without `=` are dropped, so `?acl` yields no parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3relay_auth::query::QueryParams;
    ///
    /// let params = QueryParams::parse("b=2&a=x%2Fy&flag&a=z");
    /// assert_eq!(params.first("a"), Some("x/y"));
    /// assert_eq!(params.get_all("a"), ["x/y", "z"]);
    /// assert!(!params.contains("flag"));
    /// ```
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        raw.split('&')
            .filter_map(|segment| segment.split_once('='))
            .map(|(key, value)| (decode(key), decode(value)))
            .collect()
    }

    /// First value of `key`, if any.
    #[must_use]
    pub fn first(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// First value of `key` when present and non-empty.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.first(key).filter(|value| !value.is_empty())
    }

    /// All values of `key` in arrival order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.inner.get(key).map_or(&[], Vec::as_slice)
    }

    /// Whether `key` appeared at least once.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Whether no parameters were decoded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Append a value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.entry(key.into()).or_default().push(value.into());
    }

    /// Iterate `(key, value)` pairs, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().flat_map(|(key, values)| {
            values
                .iter()
                .map(move |value| (key.as_str(), value.as_str()))
        })
    }

    /// Canonical encoding of every parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3relay_auth::query::QueryParams;
    ///
    /// let params = QueryParams::parse("b=2&a=x%2Fy");
    /// assert_eq!(params.encode(), "a=x%2Fy&b=2");
    /// ```
    #[must_use]
    pub fn encode(&self) -> String {
        self.encode_filtered(|_| true)
    }

    /// Canonical encoding of every parameter except `excluded`.
    #[must_use]
    pub fn encode_excluding(&self, excluded: &str) -> String {
        self.encode_filtered(|key| key != excluded)
    }

    fn encode_filtered(&self, keep: impl Fn(&str) -> bool) -> String {
        self.iter()
            .filter(|(key, _)| keep(key))
            .map(|(key, value)| format!("{}={}", uri_encode(key), uri_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::default();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// Percent-encode everything outside the unreserved set.
#[must_use]
pub fn uri_encode(value: &str) -> String {
    utf8_percent_encode(value, URI_ENCODE_SET).to_string()
}

/// Percent-encode a path, keeping `/` as a separator.
///
/// # Examples
///
/// ```
/// use s3relay_auth::query::encode_path;
///
/// assert_eq!(encode_path("dir/my file.txt"), "dir/my%20file.txt");
/// ```
#[must_use]
pub fn encode_path(value: &str) -> String {
    utf8_percent_encode(value, PATH_ENCODE_SET).to_string()
}

/// Percent-decode, replacing invalid UTF-8 sequences.
#[must_use]
pub fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}
