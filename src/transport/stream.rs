//! A connected byte stream, plain or TLS-wrapped, unified behind one `AsyncRead`/`AsyncWrite`
//! type so neither engine needs a generic parameter over the concrete socket type.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};

use crate::tls::TlsStream;

/// Either a plain TCP stream or a TLS-wrapped one.
pub(crate) enum Stream {
    Plain(TcpStream),
    Tls(Box<dyn TlsStream>),
}

impl AsyncRead for Stream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Stream::Tls(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Stream::Tls(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_flush(cx),
            Stream::Tls(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Stream::Tls(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl Stream {
    /// The protocol negotiated via ALPN, or `Http1` for a plain (non-TLS) stream — matching
    /// `h2c` being out of scope: H/2 is only ever reached via ALPN in this crate.
    pub(crate) fn negotiated_alpn(&self) -> crate::tls::AlpnProtocol {
        match self {
            Stream::Plain(_) => crate::tls::AlpnProtocol::Http1,
            Stream::Tls(s) => s.negotiated_alpn(),
        }
    }
}
