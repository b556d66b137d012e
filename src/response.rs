//! Response objects.

use std::time::Duration;

use bytes::Bytes;

use crate::{Error, Request, header::HeaderMap};

/// An HTTP response, or the record of a failed attempt to get one.
///
/// A `Response` always exists after dispatch, even on failure: transport-level failures
/// populate `error` with a synthetic status rather than surfacing as a thrown exception,
/// matching the error-handling design's propagation rule.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    elapsed: Duration,
    request: Request,
    error: Option<Error>,
}

impl Response {
    /// Constructs a successful (or server-error, but wire-complete) response.
    pub fn new(status: u16, headers: HeaderMap, body: Bytes, elapsed: Duration, request: Request) -> Self {
        Self {
            status,
            headers,
            body,
            elapsed,
            request,
            error: None,
        }
    }

    /// Constructs a response representing a failed attempt: `status` is the synthetic status
    /// (408 for `Timeout`; callers of lower-level transports may use 0 or a 502-class code for
    /// other kinds), and `error` records the cause.
    pub fn from_error(status: u16, request: Request, elapsed: Duration, error: Error) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            elapsed,
            request,
            error: Some(error),
        }
    }

    /// The numeric status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether `200 <= status < 300`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Wall-clock time elapsed for this attempt.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The request that produced this response.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The structured error, if this response represents a failed attempt.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Consumes self, returning `Ok` if `error` is unset, else `Err`.
    ///
    /// This is the one place a caller opts into treating a non-exceptional response as a
    /// thrown error, per the error-handling design's exception boundary (b).
    pub fn ensure_success(self) -> Result<Self, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.is_success() {
            let status = self.status;
            return Err(Error::status(format!("unsuccessful status {status}"))
                .with_uri(self.request.uri().clone()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use http::Method;

    fn req() -> Request {
        Request::new(Method::GET, "http://example.test/".parse().unwrap())
    }

    #[test]
    fn success_range_is_200_to_299() {
        let ok = Response::new(204, HeaderMap::new(), Bytes::new(), Duration::ZERO, req());
        assert!(ok.is_success());
        let redirect = Response::new(301, HeaderMap::new(), Bytes::new(), Duration::ZERO, req());
        assert!(!redirect.is_success());
    }

    #[test]
    fn timeout_response_carries_synthetic_408() {
        let resp = Response::from_error(408, req(), Duration::ZERO, Error::timeout("slow"));
        assert_eq!(resp.status(), 408);
        assert_eq!(resp.error().unwrap().kind(), ErrorKind::Timeout);
        assert!(!resp.is_success());
    }

    #[test]
    fn ensure_success_passes_through_2xx() {
        let resp = Response::new(200, HeaderMap::new(), Bytes::new(), Duration::ZERO, req());
        assert!(resp.ensure_success().is_ok());
    }

    #[test]
    fn ensure_success_rejects_5xx_without_prior_error() {
        let resp = Response::new(500, HeaderMap::new(), Bytes::new(), Duration::ZERO, req());
        assert!(resp.ensure_success().is_err());
    }
}
