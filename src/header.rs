//! Header multimap.
//!
//! [`HeaderMap`] is a case-insensitive, insertion-ordered multimap from header name to a list
//! of values. It wraps [`http::HeaderMap`], which is the source of truth, and adds only the
//! ordering and injection-guard semantics the data model calls for.

use http::{HeaderName, HeaderValue};

/// Error returned when a header name or value contains a carriage return or line feed.
///
/// `http::HeaderName`/`http::HeaderValue` already reject raw CR/LF bytes during parsing, so
/// this type exists mainly to give that rejection a name specific to our data model rather
/// than leaking `http::header::InvalidHeaderValue` at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidHeader;

impl std::fmt::Display for InvalidHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("header name or value contains a forbidden CR or LF byte")
    }
}

impl std::error::Error for InvalidHeader {}

/// A case-insensitive, ordered multimap of HTTP headers.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    inner: http::HeaderMap,
}

impl HeaderMap {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self {
            inner: http::HeaderMap::new(),
        }
    }

    /// Creates an empty header map with room for `capacity` distinct names.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: http::HeaderMap::with_capacity(capacity),
        }
    }

    /// Appends a value, keeping any existing values under the same name.
    pub fn append<N>(&mut self, name: N, value: &str) -> Result<(), InvalidHeader>
    where
        N: TryInto<HeaderName>,
    {
        let name = name.try_into().map_err(|_| InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| InvalidHeader)?;
        self.inner.append(name, value);
        Ok(())
    }

    /// Replaces all existing values under `name` with a single value.
    pub fn insert<N>(&mut self, name: N, value: &str) -> Result<(), InvalidHeader>
    where
        N: TryInto<HeaderName>,
    {
        let name = name.try_into().map_err(|_| InvalidHeader)?;
        let value = HeaderValue::from_str(value).map_err(|_| InvalidHeader)?;
        self.inner.insert(name, value);
        Ok(())
    }

    /// Returns the first value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns every value stored under `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.inner.get_all(name).iter().filter_map(|v| v.to_str().ok())
    }

    /// Whether any value is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    /// Removes all values under `name`, returning whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.inner.remove(name).is_some()
    }

    /// Total number of values stored (not distinct names).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the map holds no values at all.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over every (name, value) pair, in insertion order, with repeats for
    /// multi-valued names.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.inner.iter().filter_map(|(n, v)| v.to_str().ok().map(|v| (n, v)))
    }

    /// Borrow the underlying `http::HeaderMap`, e.g. to hand to an H/1 or H/2 wire encoder.
    pub fn as_http_map(&self) -> &http::HeaderMap {
        &self.inner
    }

    /// Consume self, returning the underlying `http::HeaderMap`.
    pub fn into_http_map(self) -> http::HeaderMap {
        self.inner
    }
}

impl From<http::HeaderMap> for HeaderMap {
    fn from(inner: http::HeaderMap) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Test", "1").unwrap();
        assert_eq!(headers.get("x-test"), Some("1"));
        assert_eq!(headers.get("X-TEST"), Some("1"));
    }

    #[test]
    fn append_preserves_all_values_in_order() {
        let mut headers = HeaderMap::new();
        headers.append("Cookie", "a=1").unwrap();
        headers.append("Cookie", "b=2").unwrap();
        let values: Vec<_> = headers.get_all("cookie").collect();
        assert_eq!(values, vec!["a=1", "b=2"]);
    }

    #[test]
    fn rejects_crlf_in_value() {
        let mut headers = HeaderMap::new();
        assert!(headers.append("X-Evil", "value\r\nInjected: true").is_err());
    }

    #[test]
    fn rejects_crlf_in_name() {
        let mut headers = HeaderMap::new();
        assert!(headers.append("X-Evil\r\nInjected", "value").is_err());
    }

    #[test]
    fn clone_is_independent() {
        let mut a = HeaderMap::new();
        a.insert("X-A", "1").unwrap();
        let mut b = a.clone();
        b.insert("X-A", "2").unwrap();
        assert_eq!(a.get("x-a"), Some("1"));
        assert_eq!(b.get("x-a"), Some("2"));
    }
}
