//! Pure in-process TLS backend, backed by `rustls`.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_rustls::TlsConnector;

use super::{AlpnProtocol, AsyncReadWriteUnpinSend, TlsStream, TlsWrapper};
use crate::error::{Error, Result};

fn default_client_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = AlpnProtocol::offer_both().iter().map(|p| p.to_vec()).collect();
    Arc::new(config)
}

/// A [`TlsWrapper`] using `rustls` with the Mozilla root store shipped by `webpki-roots`.
///
/// Grounded on the rustls connector pattern in
/// `other_examples/e5ca8f94_vishalbelsare-agentgateway__crates-hbone-src-pool.rs.rs`: build a
/// `ClientConfig` once, wrap it in a `TlsConnector`, and hand the connected stream through.
pub struct PureTls {
    config: Arc<ClientConfig>,
}

impl Default for PureTls {
    fn default() -> Self {
        Self::new()
    }
}

impl PureTls {
    /// Creates a `PureTls` wrapper using the default Mozilla root store.
    pub fn new() -> Self {
        Self {
            config: default_client_config(),
        }
    }

    /// Creates a `PureTls` wrapper using a caller-supplied `rustls::ClientConfig`.
    ///
    /// The caller is responsible for setting `alpn_protocols` if ALPN negotiation is desired.
    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TlsWrapper for PureTls {
    async fn wrap(
        &self,
        server_name: &str,
        stream: Box<dyn AsyncReadWriteUnpinSend>,
    ) -> Result<Box<dyn TlsStream>> {
        let connector = TlsConnector::from(self.config.clone());
        let name = rustls::pki_types::ServerName::try_from(server_name.to_owned())
            .map_err(|e| Error::tls(format!("invalid server name {server_name:?}: {e}")))?;
        let stream = connector
            .connect(name, stream)
            .await
            .map_err(|e| Error::tls(e))?;

        let alpn = stream
            .get_ref()
            .1
            .alpn_protocol()
            .map(AlpnProtocol::from_wire)
            .unwrap_or(AlpnProtocol::Http1);

        Ok(Box::new(RustlsStream { inner: stream, alpn }))
    }
}

struct RustlsStream {
    inner: tokio_rustls::client::TlsStream<Box<dyn AsyncReadWriteUnpinSend>>,
    alpn: AlpnProtocol,
}

impl TlsStream for RustlsStream {
    fn negotiated_alpn(&self) -> AlpnProtocol {
        self.alpn
    }
}

impl AsyncRead for RustlsStream {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for RustlsStream {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_offers_h2_then_http1() {
        let config = default_client_config();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn alpn_wire_mapping() {
        assert_eq!(AlpnProtocol::from_wire(b"h2"), AlpnProtocol::Http2);
        assert_eq!(AlpnProtocol::from_wire(b"http/1.1"), AlpnProtocol::Http1);
        assert_eq!(AlpnProtocol::from_wire(b"spdy/3"), AlpnProtocol::Http1);
    }
}
