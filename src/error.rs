//! Error taxonomy shared across the transport core.
//!
//! Transport failures surface as a populated [`Error`] on a [`Response`](crate::Response),
//! not as a thrown exception, unless a caller explicitly opts into one (e.g. by calling
//! [`crate::Response::error_for_status`]).

use std::{error::Error as StdError, fmt, io};

use http::Uri;

/// A `Result` alias where the `Err` case is [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A boxed error type used for dynamic error handling at module seams.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The taxonomy of errors a request attempt can fail with.
///
/// Each kind has a fixed retryability, queried via [`ErrorKind::is_retryable`]. `Retry`
/// middleware consults this instead of re-deriving it from the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A transport-level I/O failure: connection reset, broken pipe, EOF before headers.
    NetworkError,
    /// A configured timeout elapsed (connect, DNS, or the request's overall deadline).
    Timeout,
    /// The TLS handshake failed, or ALPN negotiation could not agree on a protocol.
    TlsError,
    /// A well-formed but invalid wire message: bad framing, HPACK violation, GOAWAY reason.
    ProtocolError,
    /// Name resolution failed.
    DnsError,
    /// A cancellation token fired and interrupted the attempt.
    Cancelled,
    /// The response completed successfully on the wire, but carried a non-2xx status that a
    /// caller chose to treat as an error.
    HttpStatusError,
}

impl ErrorKind {
    /// Whether an error of this kind may be retried by `Retry` middleware.
    ///
    /// `NetworkError`, `Timeout`, and `DnsError` are transient by nature. `TlsError` and
    /// `ProtocolError` imply the peer cannot currently complete the handshake or speak the
    /// protocol correctly, and retrying verbatim would reproduce the same failure.
    /// `HttpStatusError` is a judgment call left to the caller's classifier, not automatic.
    /// `Cancelled` is never retried: the caller asked for the attempt to stop.
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkError | ErrorKind::Timeout | ErrorKind::DnsError
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::NetworkError => "network error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::TlsError => "tls error",
            ErrorKind::ProtocolError => "protocol error",
            ErrorKind::DnsError => "dns error",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::HttpStatusError => "http status error",
        })
    }
}

/// An error produced while dispatching a request through the transport core.
///
/// Mirrors a URI for diagnostics and carries an optional `source` error chain, matching
/// `std::error::Error`'s conventions rather than flattening everything to a string.
pub struct Error {
    inner: Box<Inner>,
}

struct Inner {
    kind: ErrorKind,
    source: Option<BoxError>,
    uri: Option<Uri>,
}

impl Error {
    /// Construct a new error of the given kind, wrapping an optional source error.
    pub fn new<E>(kind: ErrorKind, source: Option<E>) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            inner: Box::new(Inner {
                kind,
                source: source.map(Into::into),
                uri: None,
            }),
        }
    }

    pub(crate) fn network<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::NetworkError, Some(e))
    }

    pub(crate) fn timeout<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::Timeout, Some(e))
    }

    pub(crate) fn tls<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::TlsError, Some(e))
    }

    pub(crate) fn protocol<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::ProtocolError, Some(e))
    }

    pub(crate) fn dns<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::DnsError, Some(e))
    }

    /// Construct a `Cancelled` error. There is never a wrapped source: the cause is simply
    /// that the cancellation token fired.
    pub fn cancelled() -> Error {
        Error::new(ErrorKind::Cancelled, None::<Infallible>)
    }

    pub(crate) fn status<E: Into<BoxError>>(e: E) -> Error {
        Error::new(ErrorKind::HttpStatusError, Some(e))
    }

    /// Attach a request URI to this error for diagnostics (overwrites any existing one).
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.inner.uri = Some(uri);
        self
    }

    /// Strip a previously-attached URI, e.g. because it carries a sensitive query string.
    pub fn without_uri(mut self) -> Self {
        self.inner.uri = None;
        self
    }

    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    /// Whether this error is safe for `Retry` middleware to retry.
    pub fn is_retryable(&self) -> bool {
        self.inner.kind.is_retryable()
    }

    /// The URI associated with this error, if one was attached.
    pub fn uri(&self) -> Option<&Uri> {
        self.inner.uri.as_ref()
    }

    /// Shorthand for `self.kind() == ErrorKind::Cancelled`.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Cancelled)
    }

    /// Shorthand for `self.kind() == ErrorKind::Timeout`.
    pub fn is_timeout(&self) -> bool {
        matches!(self.inner.kind, ErrorKind::Timeout)
    }

    /// Walks the `source()` chain looking for an `io::Error` with `ErrorKind::ConnectionReset`.
    pub fn is_connection_reset(&self) -> bool {
        let mut source = self.source();
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>() {
                if io.kind() == io::ErrorKind::ConnectionReset {
                    return true;
                }
            }
            source = err.source();
        }
        false
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("Error");
        builder.field("kind", &self.inner.kind);
        if let Some(ref uri) = self.inner.uri {
            builder.field("uri", uri);
        }
        if let Some(ref source) = self.inner.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.kind)?;
        if let Some(uri) = &self.inner.uri {
            write!(f, " for uri ({uri})")?;
        }
        if let Some(e) = &self.inner.source {
            write!(f, ": {e}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source.as_ref().map(|e| &**e as _)
    }
}

/// Uninhabited placeholder used where `Error::new` needs a concrete `E` but has no source.
#[derive(Debug)]
enum Infallible {}
impl fmt::Display for Infallible {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        unreachable!()
    }
}
impl StdError for Infallible {}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn retryability_matches_taxonomy() {
        assert!(ErrorKind::NetworkError.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::DnsError.is_retryable());
        assert!(!ErrorKind::TlsError.is_retryable());
        assert!(!ErrorKind::ProtocolError.is_retryable());
        assert!(!ErrorKind::HttpStatusError.is_retryable());
        assert!(!ErrorKind::Cancelled.is_retryable());
    }

    #[test]
    fn source_chain_walks_through_wrapping() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err = Error::network(io_err);
        assert!(err.is_connection_reset());
    }

    #[test]
    fn send_and_sync() {
        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn cancelled_is_never_retryable_even_with_uri() {
        let err = Error::cancelled().with_uri(Uri::from_static("http://example.test/"));
        assert!(!err.is_retryable());
        assert!(err.is_cancelled());
    }
}
