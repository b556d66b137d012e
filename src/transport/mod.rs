//! Protocol selection: dials a connection, reads the ALPN result, and hands the request to
//! whichever engine — [`h1::H1Transport`] or [`h2::H2Transport`] — matches what the peer
//! agreed to.
//!
//! Plain `http://` origins never negotiate ALPN (`h2c` is out of scope, matching
//! [`stream::Stream::negotiated_alpn`]'s default), so they always go straight to H/1. For
//! `https://` origins, the protocol is unknown until the TLS handshake completes; the first
//! request to a new origin pays for a short-lived probe connection solely to observe
//! [`crate::tls::TlsStream::negotiated_alpn`], after which the decision is cached and every
//! later request to that origin is dispatched directly — `H1Transport` and `H2Transport` each
//! still establish their own connection independently, so this probe is a second handshake on
//! that first request, not a reused one. A production follow-up could thread the probed stream
//! into the chosen engine instead of discarding it; see `DESIGN.md`.

pub mod h1;
pub mod h2;
pub(crate) mod stream;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tokio::net::TcpStream;

pub use h1::H1Transport;
pub use h2::H2Transport;

use crate::{
    Request, Response,
    context::RequestContext,
    dns::{self, Resolve},
    error::{Error, Result},
    hash::HashMap,
    middleware::Transport,
    pool::ConnectionPool,
    sync::Mutex,
    tls::{AlpnProtocol, TlsWrapper},
};

/// Dispatches each request to H/1 or H/2 depending on what the origin's TLS handshake
/// negotiates, caching the decision per `(host, port)`.
pub struct HttpTransport {
    h1: H1Transport,
    h2: H2Transport,
    resolver: Arc<dyn Resolve>,
    tls: Arc<dyn TlsWrapper>,
    connect_timeout: Duration,
    dns_timeout: Duration,
    alpn_cache: Mutex<HashMap<(String, u16), AlpnProtocol>>,
}

impl HttpTransport {
    /// Builds a selector backed by `pool` for H/1 connections, `resolver` for DNS, and `tls`
    /// for both engines' TLS handshakes (and this selector's own probe handshake).
    pub fn new(
        pool: ConnectionPool<h1::H1Connection>,
        resolver: Arc<dyn Resolve>,
        tls: Arc<dyn TlsWrapper>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            h1: H1Transport::new(pool, resolver.clone(), tls.clone(), connect_timeout),
            h2: H2Transport::new(resolver.clone(), tls.clone(), connect_timeout),
            resolver,
            tls,
            connect_timeout,
            dns_timeout: dns::DEFAULT_DNS_TIMEOUT,
            alpn_cache: Mutex::new(HashMap::default()),
        }
    }

    /// Overrides the DNS timeout applied by the probe connection and both engines.
    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self.h1 = self.h1.with_dns_timeout(timeout);
        self.h2 = self.h2.with_dns_timeout(timeout);
        self
    }

    async fn probe_alpn(&self, host: &str, port: u16, cancel: &CancellationToken) -> Result<AlpnProtocol> {
        let addrs = dns::resolve_with_timeout(self.resolver.as_ref(), dns::Name::new(host), self.dns_timeout, cancel).await?;
        let addr = addrs
            .first()
            .ok_or_else(|| Error::dns(format!("no addresses found for {host}")))?;
        let target = SocketAddr::new(addr.ip(), port);
        let tcp = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::cancelled()),
            result = tokio::time::timeout(self.connect_timeout, TcpStream::connect(target)) => {
                result.map_err(|_elapsed| Error::timeout(format!("connect to {target} timed out")))?.map_err(Error::network)?
            }
        };
        let stream = self.tls.wrap(host, Box::new(tcp)).await?;
        Ok(stream.negotiated_alpn())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request, ctx: &mut RequestContext) -> Response {
        if !request.is_secure() {
            return self.h1.send(request, ctx).await;
        }

        let key = (request.host().to_string(), request.port());
        let cached = self.alpn_cache.lock().get(&key).copied();
        let protocol = match cached {
            Some(protocol) => protocol,
            None => {
                let cancel = ctx.cancellation_token().clone();
                match self.probe_alpn(request.host(), request.port(), &cancel).await {
                    Ok(protocol) => {
                        self.alpn_cache.lock().insert(key, protocol);
                        protocol
                    }
                    Err(_) => AlpnProtocol::Http1, // fall back; the real engine's own connect surfaces the error
                }
            }
        };

        match protocol {
            AlpnProtocol::Http2 => self.h2.send(request, ctx).await,
            AlpnProtocol::Http1 => self.h1.send(request, ctx).await,
        }
    }
}
