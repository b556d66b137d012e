//! TLS wrapper: negotiates a secure channel over an already-connected stream and reports the
//! ALPN protocol the peer agreed to.
//!
//! BoringSSL fingerprint impersonation is out of scope here (see `SPEC_FULL.md`). The wrapping
//! pattern itself — take a connected `AsyncRead + AsyncWrite`, hand it to a connector, get back
//! a stream plus the negotiated protocol — is grounded on the rustls-based pool connector in
//! `other_examples/e5ca8f94_vishalbelsare-agentgateway__crates-hbone-src-pool.rs.rs`.

#[cfg(feature = "native-tls")]
pub mod platform;
#[cfg(feature = "rustls-tls")]
pub mod pure;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// The application protocol negotiated via ALPN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlpnProtocol {
    /// `http/1.1`, or no ALPN extension / no agreement reached.
    Http1,
    /// `h2`.
    Http2,
}

impl AlpnProtocol {
    /// Maps a raw ALPN wire identifier to a protocol, defaulting unknown values to HTTP/1.1.
    pub fn from_wire(id: &[u8]) -> Self {
        match id {
            b"h2" => AlpnProtocol::Http2,
            _ => AlpnProtocol::Http1,
        }
    }

    /// The ALPN wire identifiers to offer, in preference order, h2 first.
    pub fn offer_both() -> &'static [&'static [u8]] {
        &[b"h2", b"http/1.1"]
    }
}

/// A TLS-wrapped, already-handshaken connection, type-erased over the concrete stream type so
/// engines above this layer don't need to know whether native-tls or rustls produced it.
pub trait TlsStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// The protocol negotiated via ALPN during the handshake.
    fn negotiated_alpn(&self) -> AlpnProtocol;
}

/// Wraps a plain connected stream in TLS.
///
/// Implementations enforce TLS 1.2 as a floor and offer both `h2` and `http/1.1` via ALPN,
/// letting the caller dispatch on [`TlsStream::negotiated_alpn`] afterward.
#[async_trait]
pub trait TlsWrapper: Send + Sync {
    /// Performs the TLS handshake against `server_name` over `stream`.
    async fn wrap(
        &self,
        server_name: &str,
        stream: Box<dyn AsyncReadWriteUnpinSend>,
    ) -> Result<Box<dyn TlsStream>>;
}

/// Object-safe shorthand for a boxable bidirectional async stream.
pub trait AsyncReadWriteUnpinSend: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncReadWriteUnpinSend for T {}

/// Which TLS backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsBackend {
    /// Prefer the platform-native backend if compiled in, else fall back to the pure one.
    #[default]
    Auto,
    /// Require the platform-native backend (schannel / Secure Transport / OpenSSL).
    ForcePlatform,
    /// Require the pure in-process backend (rustls).
    ForcePure,
}

/// Builds the [`TlsWrapper`] selected by `backend`.
///
/// # Panics
///
/// Panics if `backend` requires a backend whose Cargo feature is not compiled in — this is a
/// build configuration error, not a runtime condition callers should handle.
pub fn build_wrapper(backend: TlsBackend) -> std::sync::Arc<dyn TlsWrapper> {
    match backend {
        TlsBackend::Auto => {
            #[cfg(feature = "native-tls")]
            {
                std::sync::Arc::new(platform::PlatformTls::new())
            }
            #[cfg(all(not(feature = "native-tls"), feature = "rustls-tls"))]
            {
                std::sync::Arc::new(pure::PureTls::new())
            }
            #[cfg(all(not(feature = "native-tls"), not(feature = "rustls-tls")))]
            {
                panic!("no TLS backend compiled in: enable the `native-tls` or `rustls-tls` feature")
            }
        }
        #[cfg(feature = "native-tls")]
        TlsBackend::ForcePlatform => std::sync::Arc::new(platform::PlatformTls::new()),
        #[cfg(not(feature = "native-tls"))]
        TlsBackend::ForcePlatform => panic!("the `native-tls` feature is not enabled"),
        #[cfg(feature = "rustls-tls")]
        TlsBackend::ForcePure => std::sync::Arc::new(pure::PureTls::new()),
        #[cfg(not(feature = "rustls-tls"))]
        TlsBackend::ForcePure => panic!("the `rustls-tls` feature is not enabled"),
    }
}
