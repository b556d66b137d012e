//! A single HTTP/1.1 connection: request serialization, response head parsing, and the
//! framing decision, wired into the pool and the middleware pipeline.
//!
//! Our `Request` always carries a fully-buffered `Bytes` body, so the request side never needs
//! a chunked-encoding path: every request with a body is sent with an exact `Content-Length`.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tokio_util::sync::CancellationToken;

use super::body::{BodyFraming, read_body};
use crate::{
    Request, Response,
    context::RequestContext,
    dns::{self, Resolve},
    error::{Error, Result},
    header::HeaderMap,
    middleware::Transport,
    pool::{ConnectionIdentity, ConnectionPool, PooledConnection},
    tls::TlsWrapper,
    transport::stream::Stream,
};

const MAX_INFORMATIONAL_RESPONSES: u32 = 16;

/// A single HTTP/1.1 connection held by the pool.
///
/// `closed` is flipped once an I/O error occurs or the peer (or an HTTP/1.0 response lacking
/// a keep-alive signal) indicates the connection must not be reused; [`PooledConnection::is_open`]
/// reads it to decide whether a dropped lease goes back into the idle queue.
pub struct H1Connection {
    stream: Stream,
    closed: AtomicBool,
}

impl H1Connection {
    fn new(stream: Stream) -> Self {
        Self {
            stream,
            closed: AtomicBool::new(false),
        }
    }
}

impl PooledConnection for H1Connection {
    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }
}

/// The HTTP/1.1 [`Transport`]: owns the per-origin pool and the resolver/TLS wrapper needed
/// to grow it, and speaks one request/response exchange per `send` call.
pub struct H1Transport {
    pool: ConnectionPool<H1Connection>,
    resolver: Arc<dyn Resolve>,
    tls: Arc<dyn TlsWrapper>,
    connect_timeout: Duration,
    dns_timeout: Duration,
    max_head_bytes: usize,
    max_body_bytes: usize,
}

impl H1Transport {
    /// Creates a transport backed by `pool`, resolving names through `resolver` and
    /// establishing TLS (for `https://` origins) through `tls`.
    pub fn new(
        pool: ConnectionPool<H1Connection>,
        resolver: Arc<dyn Resolve>,
        tls: Arc<dyn TlsWrapper>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            resolver,
            tls,
            connect_timeout,
            dns_timeout: dns::DEFAULT_DNS_TIMEOUT,
            max_head_bytes: 64 * 1024,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }

    /// Overrides the DNS timeout applied to each connect (default [`dns::DEFAULT_DNS_TIMEOUT`]).
    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    /// Overrides the response body size cap (default 64 MiB).
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    async fn connect(&self, identity: ConnectionIdentity, cancel: &CancellationToken) -> Result<H1Connection> {
        let addrs = dns::resolve_with_timeout(
            self.resolver.as_ref(),
            dns::Name::new(identity.host()),
            self.dns_timeout,
            cancel,
        )
        .await?;
        if addrs.is_empty() {
            return Err(Error::dns(format!("no addresses found for {}", identity.host())));
        }

        let mut last_err = None;
        let mut tcp = None;
        for addr in &addrs {
            let target = SocketAddr::new(addr.ip(), identity.port());
            let attempt = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::cancelled()),
                result = tokio::time::timeout(self.connect_timeout, TcpStream::connect(target)) => result,
            };
            match attempt {
                Ok(Ok(stream)) => {
                    tcp = Some(stream);
                    break;
                }
                Ok(Err(err)) => last_err = Some(Error::network(err)),
                Err(_elapsed) => {
                    last_err = Some(Error::timeout(format!("connect to {target} timed out after {:?}", self.connect_timeout)));
                }
            }
        }
        let tcp = tcp.ok_or_else(|| last_err.unwrap_or_else(|| Error::network(io::Error::new(io::ErrorKind::Other, "no reachable address"))))?;
        let _ = tcp.set_nodelay(true);

        let stream = if identity.is_secure() {
            let tls_stream = self.tls.wrap(identity.host(), Box::new(tcp)).await?;
            Stream::Tls(tls_stream)
        } else {
            Stream::Plain(tcp)
        };
        Ok(H1Connection::new(stream))
    }

    /// Runs one request/response exchange over a pool-acquired connection.
    ///
    /// Returns `Err((error, retryable_stale))` where `retryable_stale` is set when the
    /// connection was reused from the idle queue and failed with a network error before a
    /// response was exchanged — the signature a peer silently closing a keep-alive connection
    /// leaves, as opposed to a genuine failure of this particular request.
    async fn try_once(&self, request: &Request, ctx: &mut RequestContext) -> std::result::Result<Response, (Error, bool)> {
        let started = Instant::now();
        let identity = ConnectionIdentity::new(request.host(), request.port(), request.is_secure());
        let cancel = ctx.cancellation_token().clone();

        let mut lease = {
            let connect_identity = identity.clone();
            let connect_cancel = cancel.clone();
            self.pool
                .acquire(identity, &cancel, move || async move {
                    self.connect(connect_identity, &connect_cancel).await
                })
                .await
                .map_err(|err| (err, false))?
        };
        let reused = lease.is_reused();

        let outcome = async {
            let wire = serialize_request(request);
            let stream = &mut lease.stream;
            stream.write_all(&wire).await.map_err(Error::network)?;
            stream.flush().await.map_err(Error::network)?;

            let mut attempts_left = MAX_INFORMATIONAL_RESPONSES;
            let (status, headers, keep_alive, framing) = loop {
                let head = read_response_head(stream, self.max_head_bytes).await?;
                if is_informational(head.status) {
                    attempts_left -= 1;
                    if attempts_left == 0 {
                        return Err(Error::protocol("too many informational (1xx) responses"));
                    }
                    continue;
                }
                if head.status == 101 {
                    return Err(Error::protocol("101 Switching Protocols is not supported"));
                }
                let framing = framing_of(head.status, request.method(), &head.headers)?;
                let keep_alive = should_keep_alive(head.http_10, &head.headers);
                break (head.status, head.headers, keep_alive, framing);
            };
            let body = read_body(stream, framing, self.max_body_bytes).await?;
            Ok::<_, Error>((status, headers, body, keep_alive))
        }
        .await;

        match outcome {
            Ok((status, headers, body, keep_alive)) => {
                if !keep_alive {
                    lease.dispose();
                }
                Ok(Response::new(status, headers, body, started.elapsed(), request.clone()))
            }
            Err(err) => {
                let retryable_stale = reused && matches!(err.kind(), crate::error::ErrorKind::NetworkError);
                lease.dispose();
                Err((err, retryable_stale))
            }
        }
    }

    async fn attempt(&self, request: &Request, ctx: &mut RequestContext) -> Result<Response> {
        match self.try_once(request, ctx).await {
            Ok(response) => Ok(response),
            Err((err, retryable_stale)) => {
                if retryable_stale {
                    self.try_once(request, ctx).await.map_err(|(err, _)| err)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[async_trait]
impl Transport for H1Transport {
    async fn send(&self, request: Request, ctx: &mut RequestContext) -> Response {
        let started = Instant::now();
        match self.attempt(&request, ctx).await {
            Ok(response) => response,
            Err(err) => Response::from_error(0, request, started.elapsed(), err),
        }
    }
}

fn serialize_request(request: &Request) -> Vec<u8> {
    let mut dst = Vec::with_capacity(256);
    dst.extend_from_slice(request.method().as_str().as_bytes());
    dst.push(b' ');
    let path = request.uri().path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    dst.extend_from_slice(path.as_bytes());
    dst.extend_from_slice(b" HTTP/1.1\r\n");

    if !request.headers().contains("host") {
        let default_port = if request.is_secure() { 443 } else { 80 };
        if request.port() == default_port {
            dst.extend_from_slice(format!("host: {}\r\n", request.host()).as_bytes());
        } else {
            dst.extend_from_slice(format!("host: {}:{}\r\n", request.host(), request.port()).as_bytes());
        }
    }

    let body_len = request.body().map(Bytes::len).unwrap_or(0);
    if !request.headers().contains("content-length") {
        dst.extend_from_slice(format!("content-length: {body_len}\r\n").as_bytes());
    }
    if !request.headers().contains("connection") {
        dst.extend_from_slice(b"connection: keep-alive\r\n");
    }

    for (name, value) in request.headers().iter() {
        dst.extend_from_slice(name.as_str().as_bytes());
        dst.extend_from_slice(b": ");
        dst.extend_from_slice(value.as_bytes());
        dst.extend_from_slice(b"\r\n");
    }
    dst.extend_from_slice(b"\r\n");

    if let Some(body) = request.body() {
        dst.extend_from_slice(body);
    }
    dst
}

struct RawHead {
    status: u16,
    headers: HeaderMap,
    http_10: bool,
}

async fn read_response_head<R>(reader: &mut R, max_head_bytes: usize) -> Result<RawHead>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = reader.read(&mut byte).await.map_err(Error::network)?;
        if n == 0 {
            return Err(Error::network(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before response headers were complete",
            )));
        }
        buf.push(byte[0]);
        if buf.len() > max_head_bytes {
            return Err(Error::protocol(format!(
                "response head exceeded the {max_head_bytes} byte cap"
            )));
        }
        if buf.ends_with(b"\r\n\r\n") {
            break;
        }
    }

    let mut raw_headers = [httparse::EMPTY_HEADER; 64];
    let mut parsed = httparse::Response::new(&mut raw_headers);
    match parsed.parse(&buf) {
        Ok(httparse::Status::Complete(_)) => {}
        Ok(httparse::Status::Partial) => return Err(Error::protocol("incomplete response head")),
        Err(e) => return Err(Error::protocol(format!("malformed response head: {e}"))),
    }

    let status = parsed.code.ok_or_else(|| Error::protocol("response head missing a status code"))?;
    let http_10 = parsed.version == Some(0);

    let mut headers = HeaderMap::with_capacity(parsed.headers.len());
    for header in parsed.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| Error::protocol("non-UTF-8 response header value"))?;
        let _ = headers.append(header.name, value);
    }

    Ok(RawHead { status, headers, http_10 })
}

/// Whether `status` is a 1xx response other than 101 (Switching Protocols), which the caller
/// discards and waits for the real response head behind it.
fn is_informational(status: u16) -> bool {
    matches!(status, 100 | 102..=199)
}

/// Maps a parsed, non-informational response head to the body framing, per RFC 7230 §3.3.3:
/// HEAD/204/304/CONNECT-2xx carry no body, chunked Transfer-Encoding wins over Content-Length,
/// and an unframed response reads to EOF.
fn framing_of(status: u16, method: &Method, headers: &HeaderMap) -> Result<BodyFraming> {
    if matches!(status, 204 | 304) {
        return Ok(BodyFraming::Empty);
    }
    if *method == Method::HEAD {
        return Ok(BodyFraming::Empty);
    }
    if *method == Method::CONNECT && (200..300).contains(&status) {
        return Ok(BodyFraming::Empty);
    }
    if headers.contains("transfer-encoding") {
        return if transfer_encoding_is_chunked(headers) {
            Ok(BodyFraming::Chunked)
        } else {
            Ok(BodyFraming::CloseDelimited)
        };
    }
    match content_length(headers)? {
        Some(len) => Ok(BodyFraming::Length(len)),
        None => Ok(BodyFraming::CloseDelimited),
    }
}

fn transfer_encoding_is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all("transfer-encoding")
        .last()
        .and_then(|value| value.rsplit(',').next())
        .map(|token| token.trim().eq_ignore_ascii_case("chunked"))
        .unwrap_or(false)
}

fn content_length(headers: &HeaderMap) -> Result<Option<u64>> {
    let mut found = None;
    for value in headers.get_all("content-length") {
        for part in value.split(',') {
            let part = part.trim();
            let parsed: u64 = part
                .parse()
                .map_err(|_| Error::protocol(format!("invalid content-length {part:?}")))?;
            match found {
                Some(existing) if existing != parsed => {
                    return Err(Error::protocol("conflicting content-length values"));
                }
                _ => found = Some(parsed),
            }
        }
    }
    Ok(found)
}

fn should_keep_alive(http_10: bool, headers: &HeaderMap) -> bool {
    let connection = headers.get_all("connection").any(|v| v.eq_ignore_ascii_case("close"));
    if connection {
        return false;
    }
    if http_10 {
        return headers.get_all("connection").any(|v| v.eq_ignore_ascii_case("keep-alive"));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn req() -> Request {
        Request::new(Method::GET, "http://example.test/a/b?x=1".parse().unwrap())
    }

    #[test]
    fn serializes_request_line_host_and_length() {
        let mut request = req();
        request.set_body(Bytes::from_static(b"hi"));
        let wire = serialize_request(&request);
        let text = String::from_utf8(wire).unwrap();
        assert!(text.starts_with("GET /a/b?x=1 HTTP/1.1\r\n"));
        assert!(text.contains("host: example.test\r\n"));
        assert!(text.contains("content-length: 2\r\n"));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn non_default_port_is_included_in_host_header() {
        let request = Request::new(Method::GET, "https://example.test:8443/".parse().unwrap());
        let wire = serialize_request(&request);
        let text = String::from_utf8(wire).unwrap();
        assert!(text.contains("host: example.test:8443\r\n"));
    }

    #[test]
    fn framing_skips_body_for_head_and_204() {
        let headers = HeaderMap::new();
        assert_eq!(framing_of(204, &Method::GET, &headers).unwrap(), BodyFraming::Empty);
        assert_eq!(framing_of(200, &Method::HEAD, &headers).unwrap(), BodyFraming::Empty);
    }

    #[test]
    fn framing_prefers_chunked_over_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert("transfer-encoding", "chunked").unwrap();
        headers.insert("content-length", "10").unwrap();
        assert_eq!(framing_of(200, &Method::GET, &headers).unwrap(), BodyFraming::Chunked);
    }

    #[test]
    fn conflicting_content_length_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.append("content-length", "5").unwrap();
        headers.append("content-length", "6").unwrap();
        assert!(content_length(&headers).is_err());
    }

    #[test]
    fn connection_close_disables_keep_alive() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "close").unwrap();
        assert!(!should_keep_alive(false, &headers));
        assert!(should_keep_alive(false, &HeaderMap::new()));
    }

    #[test]
    fn http_10_requires_explicit_keep_alive() {
        let mut headers = HeaderMap::new();
        assert!(!should_keep_alive(true, &headers));
        headers.insert("connection", "keep-alive").unwrap();
        assert!(should_keep_alive(true, &headers));
    }

    #[test]
    fn informational_statuses_are_recognized() {
        assert!(is_informational(100));
        assert!(is_informational(103));
        assert!(!is_informational(101));
        assert!(!is_informational(200));
    }
}
