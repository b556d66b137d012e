//! Immutable request descriptors.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Uri};

use crate::header::HeaderMap;

/// An immutable HTTP request descriptor.
///
/// Once built, a `Request` is never mutated in place; middleware that needs to change
/// headers or the target constructs a new `Request` and installs it on the
/// [`crate::RequestContext`] via [`crate::RequestContext::set_request`].
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl Request {
    /// Creates a new request with no headers, no body, and no per-request timeout.
    ///
    /// # Panics
    ///
    /// Panics if `uri` does not carry an `http` or `https` scheme, or lacks a host — this is
    /// an input-validation failure (programmer bug), not a transport error, matching the
    /// error-handling design's exception boundary for invalid arguments.
    pub fn new(method: Method, uri: Uri) -> Self {
        let scheme = uri.scheme_str();
        assert!(
            matches!(scheme, Some("http") | Some("https")),
            "request URI scheme must be http or https, got {scheme:?}"
        );
        assert!(uri.host().is_some(), "request URI must carry a host");
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request's target URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Whether the URI scheme requires TLS.
    pub fn is_secure(&self) -> bool {
        self.uri.scheme_str() == Some("https")
    }

    /// The target port, defaulting to 80/443 per scheme when absent from the URI.
    pub fn port(&self) -> u16 {
        self.uri
            .port_u16()
            .unwrap_or(if self.is_secure() { 443 } else { 80 })
    }

    /// The target host.
    pub fn host(&self) -> &str {
        self.uri.host().expect("validated at construction")
    }

    /// The request's headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request's headers, for use while building the request.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The request body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Sets the request body.
    pub fn set_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    /// The per-request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets the per-request timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Whether repeated invocation of this method is semantically equivalent to a single one.
    ///
    /// `GET`, `HEAD`, `PUT`, `DELETE`, `OPTIONS`, and `TRACE` are idempotent; `POST` and
    /// `PATCH` are not, matching `Retry`'s default idempotent-only policy.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self.method,
            Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
        )
    }

    /// Produces a copy of this request with a merged-in header, replacing any existing value
    /// under `name` only if `override_existing` is set or the header was absent.
    ///
    /// Never mutates `self` — this is how `DefaultHeaders` satisfies the header-immutability
    /// invariant: the original request's header map is bit-identical before and after the call.
    pub fn with_merged_header(&self, name: &str, value: &str, override_existing: bool) -> Self {
        let mut clone = self.clone();
        if override_existing || !clone.headers.contains(name) {
            let _ = clone.headers.insert(name, value);
        }
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> Request {
        Request::new(Method::GET, "https://example.test:8443/a".parse().unwrap())
    }

    #[test]
    fn port_defaults_follow_scheme() {
        let http = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let https = Request::new(Method::GET, "https://example.test/".parse().unwrap());
        assert_eq!(http.port(), 80);
        assert_eq!(https.port(), 443);
    }

    #[test]
    fn explicit_port_is_honored() {
        assert_eq!(req().port(), 8443);
    }

    #[test]
    fn idempotent_methods() {
        assert!(Request::new(Method::GET, "http://e.test/".parse().unwrap()).is_idempotent());
        assert!(!Request::new(Method::POST, "http://e.test/".parse().unwrap()).is_idempotent());
        assert!(!Request::new(Method::PATCH, "http://e.test/".parse().unwrap()).is_idempotent());
    }

    #[test]
    fn with_merged_header_does_not_mutate_original() {
        let original = req();
        let mut original_snapshot = original.clone();
        let _ = original_snapshot.headers_mut().insert("X-Marker", "unused");
        // the snapshot was only used to prove the original's headers len below
        let merged = original.with_merged_header("Authorization", "Bearer t", false);
        assert_eq!(original.headers().len(), 0);
        assert_eq!(merged.headers().get("authorization"), Some("Bearer t"));
    }

    #[test]
    fn merge_skips_when_present_by_default() {
        let mut base = req();
        base.headers_mut().insert("X-Foo", "1").unwrap();
        let merged = base.with_merged_header("X-Foo", "2", false);
        assert_eq!(merged.headers().get("x-foo"), Some("1"));
        let overridden = base.with_merged_header("X-Foo", "2", true);
        assert_eq!(overridden.headers().get("x-foo"), Some("2"));
    }

    #[test]
    #[should_panic(expected = "scheme must be http or https")]
    fn rejects_non_http_scheme() {
        Request::new(Method::GET, "ftp://example.test/".parse().unwrap());
    }
}
