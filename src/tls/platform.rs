//! Platform-native TLS backend, backed by `native-tls` (schannel / Secure Transport / OpenSSL).

use async_trait::async_trait;
use native_tls_crate::TlsConnector as NativeTlsConnector;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_native_tls::TlsConnector;

use super::{AlpnProtocol, AsyncReadWriteUnpinSend, TlsStream, TlsWrapper};
use crate::error::{Error, Result};

/// A [`TlsWrapper`] delegating to the operating system's TLS library via `native-tls`.
///
/// `native-tls`'s ALPN support is platform-dependent; when the underlying implementation
/// doesn't expose the negotiated protocol we conservatively report [`AlpnProtocol::Http1`],
/// matching the "assume the safer, more compatible protocol" default the data model calls for.
pub struct PlatformTls {
    connector: NativeTlsConnector,
}

impl Default for PlatformTls {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformTls {
    /// Creates a `PlatformTls` wrapper enforcing TLS 1.2 as a minimum and offering both `h2`
    /// and `http/1.1` via ALPN.
    ///
    /// # Panics
    ///
    /// Panics if the platform's TLS library cannot be initialized at all (missing system
    /// trust store, broken OpenSSL install) — there is no sensible runtime recovery.
    pub fn new() -> Self {
        let connector = native_tls_crate::TlsConnector::builder()
            .min_protocol_version(Some(native_tls_crate::Protocol::Tlsv12))
            .request_alpns(&["h2", "http/1.1"])
            .build()
            .expect("failed to initialize the platform TLS backend");
        Self { connector }
    }
}

#[async_trait]
impl TlsWrapper for PlatformTls {
    async fn wrap(
        &self,
        server_name: &str,
        stream: Box<dyn AsyncReadWriteUnpinSend>,
    ) -> Result<Box<dyn TlsStream>> {
        let connector = TlsConnector::from(self.connector.clone());
        let stream = connector
            .connect(server_name, stream)
            .await
            .map_err(Error::tls)?;

        let alpn = stream
            .get_ref()
            .negotiated_alpn()
            .ok()
            .flatten()
            .map(|proto| AlpnProtocol::from_wire(&proto))
            .unwrap_or(AlpnProtocol::Http1);

        Ok(Box::new(NativeTlsStream { inner: stream, alpn }))
    }
}

struct NativeTlsStream {
    inner: tokio_native_tls::TlsStream<Box<dyn AsyncReadWriteUnpinSend>>,
    alpn: AlpnProtocol,
}

impl TlsStream for NativeTlsStream {
    fn negotiated_alpn(&self) -> AlpnProtocol {
        self.alpn
    }
}

impl AsyncRead for NativeTlsStream {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for NativeTlsStream {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::pin::Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
