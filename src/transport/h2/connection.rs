//! The H/2 connection actor: one task per physical connection, multiplexing every in-flight
//! request over it as its own stream.
//!
//! Grounded on `examples/carllerche-h2/src/proto/connection.rs` (a single task owning the
//! socket and driving both the read side and the write side through one `poll`-style loop)
//! and `proto/streams.rs` (a stream table keyed by id, admitted against a concurrency cap).
//! Settings negotiation follows `client.rs`'s handshake: send the client preface and an
//! initial SETTINGS frame, then treat the peer's first frame as their SETTINGS per RFC 7540
//! §3.5.

use std::{
    collections::{HashMap as StdHashMap, VecDeque},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::{Mutex as AsyncMutex, mpsc, oneshot},
};
use tokio_util::sync::CancellationToken;

use crate::{
    Request, Response,
    context::RequestContext,
    dns::{self, Resolve},
    error::{Error, Result},
    middleware::Transport,
    sync::Mutex,
    tls::TlsWrapper,
    transport::stream::Stream,
};

use super::{
    flow::{DEFAULT_INITIAL_WINDOW_SIZE, FlowWindow},
    frame::{self, CLIENT_PREFACE, DEFAULT_MAX_FRAME_SIZE, ErrorCode, Frame, SettingId},
    hpack::{self, Decoder, Encoder, Field},
    stream::StreamHandle,
};

const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 100;
const PING_INTERVAL: Duration = Duration::from_secs(30);
/// Local guard on accumulated response body size per stream (default: 100 MiB).
const DEFAULT_MAX_RESPONSE_BODY_BYTES: usize = 100 * 1024 * 1024;
/// RFC 7540 §5.1.1: stream identifiers are 31 bits; this is the largest odd id a client may use.
const MAX_STREAM_ID: u32 = 0x7fff_ffff;

struct StreamRequest {
    request: Request,
    respond: oneshot::Sender<Response>,
    started: Instant,
}

/// A handle to a running connection actor: submitting through `sender` fails once the actor
/// has torn the connection down, which is how [`H2Transport`] notices it needs to reconnect.
struct ConnectionHandle {
    sender: mpsc::Sender<StreamRequest>,
}

/// The H/2 [`Transport`]: keeps at most one multiplexed connection open per origin and fans
/// every request for that origin onto it.
pub struct H2Transport {
    connections: Mutex<StdHashMap<(String, u16), Arc<ConnectionHandle>>>,
    resolver: Arc<dyn Resolve>,
    tls: Arc<dyn TlsWrapper>,
    connect_timeout: Duration,
    dns_timeout: Duration,
    max_header_list_size: usize,
    max_response_body_bytes: usize,
}

impl H2Transport {
    pub fn new(resolver: Arc<dyn Resolve>, tls: Arc<dyn TlsWrapper>, connect_timeout: Duration) -> Self {
        Self {
            connections: Mutex::new(StdHashMap::new()),
            resolver,
            tls,
            connect_timeout,
            dns_timeout: dns::DEFAULT_DNS_TIMEOUT,
            max_header_list_size: hpack::DEFAULT_MAX_HEADER_LIST_SIZE,
            max_response_body_bytes: DEFAULT_MAX_RESPONSE_BODY_BYTES,
        }
    }

    pub fn with_dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = timeout;
        self
    }

    pub fn with_max_header_list_size(mut self, max_header_list_size: usize) -> Self {
        self.max_header_list_size = max_header_list_size;
        self
    }

    pub fn with_max_response_body_bytes(mut self, max_response_body_bytes: usize) -> Self {
        self.max_response_body_bytes = max_response_body_bytes;
        self
    }

    async fn connect(&self, host: &str, port: u16, cancel: &CancellationToken) -> Result<Stream> {
        let addrs = dns::resolve_with_timeout(self.resolver.as_ref(), dns::Name::new(host), self.dns_timeout, cancel).await?;
        if addrs.is_empty() {
            return Err(Error::dns(format!("no addresses found for {host}")));
        }
        let mut last_err = None;
        let mut tcp = None;
        for addr in &addrs {
            let target = SocketAddr::new(addr.ip(), port);
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
                    last_err = Some(Error::timeout(format!(
                        "connect to {target} timed out after {:?}",
                        self.connect_timeout
                    )));
                }
            }
        }
        let tcp = tcp.ok_or_else(|| {
            last_err.unwrap_or_else(|| Error::network(std::io::Error::other("no reachable address")))
        })?;
        let _ = tcp.set_nodelay(true);
        let tls_stream = self.tls.wrap(host, Box::new(tcp)).await?;
        Ok(Stream::Tls(tls_stream))
    }

    /// Returns a handle to a live connection for `(host, port)`, establishing and spawning a
    /// new one if none is cached or the cached one's actor has exited.
    async fn handle_for(&self, host: &str, port: u16, cancel: &CancellationToken) -> Result<Arc<ConnectionHandle>> {
        let key = (host.to_string(), port);
        if let Some(existing) = self.connections.lock().get(&key).cloned() {
            if !existing.sender.is_closed() {
                return Ok(existing);
            }
        }

        let stream = self.connect(host, port, cancel).await?;
        let (sender, receiver) = mpsc::channel(64);
        let handle = Arc::new(ConnectionHandle { sender });
        tokio::spawn(run_connection(stream, receiver, self.max_header_list_size, self.max_response_body_bytes));
        self.connections.lock().insert(key, handle.clone());
        Ok(handle)
    }
}

#[async_trait]
impl Transport for H2Transport {
    async fn send(&self, request: Request, ctx: &mut RequestContext) -> Response {
        let started = Instant::now();
        let cancel = ctx.cancellation_token().clone();
        let handle = match self.handle_for(request.host(), request.port(), &cancel).await {
            Ok(handle) => handle,
            Err(err) => return Response::from_error(0, request, started.elapsed(), err),
        };

        let (respond_tx, respond_rx) = oneshot::channel();
        let submission = StreamRequest {
            request: request.clone(),
            respond: respond_tx,
            started,
        };
        if handle.sender.send(submission).await.is_err() {
            return Response::from_error(0, request, started.elapsed(), Error::network(std::io::Error::other("h2 connection closed before the request was admitted")));
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Response::from_error(0, request, started.elapsed(), Error::cancelled()),
            result = respond_rx => result.unwrap_or_else(|_| {
                Response::from_error(0, request, started.elapsed(), Error::network(std::io::Error::other("h2 connection actor exited without responding")))
            }),
        }
    }
}

struct ConnState {
    streams: StdHashMap<u32, StreamHandle>,
    pending: VecDeque<StreamRequest>,
    header_blocks: StdHashMap<u32, bytes::BytesMut>,
    next_stream_id: u32,
    peer_max_frame_size: u32,
    peer_max_concurrent_streams: u32,
    peer_initial_window_size: u32,
    connection_send_window: FlowWindow,
    connection_recv_window: FlowWindow,
    /// Request bodies that couldn't be fully sent because a stream's or the connection's send
    /// window was exhausted; retried from [`flush_pending_data`] once a `WINDOW_UPDATE` grows
    /// the relevant window back open.
    pending_data: StdHashMap<u32, Bytes>,
    encoder: Encoder,
    decoder: Decoder,
    max_header_list_size: usize,
    max_response_body_bytes: usize,
    going_away: bool,
}

impl ConnState {
    fn new(max_header_list_size: usize, max_response_body_bytes: usize) -> Self {
        Self {
            streams: StdHashMap::new(),
            pending: VecDeque::new(),
            header_blocks: StdHashMap::new(),
            next_stream_id: 1,
            peer_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            peer_max_concurrent_streams: DEFAULT_MAX_CONCURRENT_STREAMS,
            peer_initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            connection_send_window: FlowWindow::new(DEFAULT_INITIAL_WINDOW_SIZE),
            connection_recv_window: FlowWindow::new(DEFAULT_INITIAL_WINDOW_SIZE),
            pending_data: StdHashMap::new(),
            encoder: Encoder::new(),
            decoder: Decoder::new().with_max_header_list_size(max_header_list_size),
            max_header_list_size,
            max_response_body_bytes,
            going_away: false,
        }
    }

    fn admit_one_pending(&mut self) -> Option<StreamRequest> {
        if self.going_away {
            return None;
        }
        if self.streams.len() as u32 >= self.peer_max_concurrent_streams {
            return None;
        }
        self.pending.pop_front()
    }
}

async fn run_connection(
    stream: Stream,
    mut requests: mpsc::Receiver<StreamRequest>,
    max_header_list_size: usize,
    max_response_body_bytes: usize,
) {
    let (mut read_half, write_half) = tokio::io::split(stream);
    let write_half = Arc::new(AsyncMutex::new(write_half));
    let mut state = ConnState::new(max_header_list_size, max_response_body_bytes);

    if let Err(err) = handshake(&mut read_half, &write_half, &mut state).await {
        fail_pending_and_incoming(&mut state, &mut requests, err).await;
        return;
    }

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            biased;
            frame = frame::read_frame(&mut read_half, state.peer_max_frame_size) => {
                match frame {
                    Ok(frame) => {
                        if let Err(err) = handle_frame(frame, &mut state, &write_half).await {
                            fail_all_streams(&mut state, err).await;
                            break;
                        }
                        if state.going_away && state.streams.is_empty() {
                            break;
                        }
                    }
                    Err(err) => {
                        fail_all_streams(&mut state, err).await;
                        break;
                    }
                }
            }
            submission = requests.recv(), if !state.going_away => {
                match submission {
                    Some(submission) => {
                        if state.streams.len() as u32 >= state.peer_max_concurrent_streams {
                            state.pending.push_back(submission);
                        } else if let Err(err) = open_stream(submission, &mut state, &write_half).await {
                            tracing::debug!(error = %err, "failed to open h2 stream");
                        }
                    }
                    None => break,
                }
            }
            _ = ping_interval.tick() => {
                let _ = frame::write_frame(&mut *write_half.lock().await, &Frame::Ping { ack: false, payload: *b"wreqping" }).await;
            }
        }
    }
}

async fn fail_pending_and_incoming(state: &mut ConnState, requests: &mut mpsc::Receiver<StreamRequest>, err: Error) {
    let message = err.to_string();
    while let Some(pending) = state.pending.pop_front() {
        respond_with_error(pending, &message);
    }
    while let Ok(submission) = requests.try_recv() {
        respond_with_error(submission, &message);
    }
}

fn respond_with_error(submission: StreamRequest, message: &str) {
    let response = Response::from_error(0, submission.request, submission.started.elapsed(), Error::network(message.to_string()));
    let _ = submission.respond.send(response);
}

async fn fail_all_streams(state: &mut ConnState, err: Error) {
    let message = err.to_string();
    for (_, mut stream) in state.streams.drain() {
        stream.fail(Error::network(message.clone()));
    }
    while let Some(pending) = state.pending.pop_front() {
        respond_with_error(pending, &message);
    }
}

async fn handshake<R>(read_half: &mut R, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>, state: &mut ConnState) -> Result<()>
where
    R: AsyncReadExt + Unpin,
{
    let mut writer = write_half.lock().await;
    writer.write_all(CLIENT_PREFACE).await.map_err(Error::network)?;
    frame::write_frame(
        &mut *writer,
        &Frame::Settings {
            ack: false,
            params: vec![
                (SettingId::EnablePush, 0),
                (SettingId::InitialWindowSize, DEFAULT_INITIAL_WINDOW_SIZE),
                (SettingId::MaxHeaderListSize, state.max_header_list_size as u32),
            ],
        },
    )
    .await?;
    drop(writer);

    // RFC 7540 §3.5: the first frame from the peer must be a SETTINGS frame.
    let first = frame::read_frame(read_half, state.peer_max_frame_size).await?;
    match first {
        Frame::Settings { ack: false, params } => {
            apply_peer_settings(state, &params);
            let mut writer = write_half.lock().await;
            frame::write_frame(&mut *writer, &Frame::Settings { ack: true, params: vec![] }).await?;
        }
        _ => return Err(Error::protocol("peer's first frame was not SETTINGS")),
    }
    Ok(())
}

fn apply_peer_settings(state: &mut ConnState, params: &[(SettingId, u32)]) {
    for &(id, value) in params {
        match id {
            SettingId::MaxFrameSize => state.peer_max_frame_size = value.max(DEFAULT_MAX_FRAME_SIZE),
            SettingId::MaxConcurrentStreams => state.peer_max_concurrent_streams = value,
            SettingId::InitialWindowSize => {
                let delta_applies_to: Vec<u32> = state.streams.keys().copied().collect();
                for id in delta_applies_to {
                    if let Some(stream) = state.streams.get_mut(&id) {
                        stream.send_window.apply_initial_window_change(value);
                    }
                }
                state.peer_initial_window_size = value;
            }
            SettingId::HeaderTableSize | SettingId::EnablePush | SettingId::MaxHeaderListSize => {}
        }
    }
}

async fn handle_frame(frame: Frame, state: &mut ConnState, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>) -> Result<()> {
    match frame {
        Frame::Settings { ack, params } => {
            if !ack {
                apply_peer_settings(state, &params);
                frame::write_frame(&mut *write_half.lock().await, &Frame::Settings { ack: true, params: vec![] }).await?;
            }
        }
        Frame::Ping { ack, payload } => {
            if !ack {
                frame::write_frame(&mut *write_half.lock().await, &Frame::Ping { ack: true, payload }).await?;
            }
        }
        Frame::WindowUpdate { stream_id, increment } => {
            if stream_id == 0 {
                state.connection_send_window.increment(increment);
            } else if let Some(stream) = state.streams.get_mut(&stream_id) {
                stream.send_window.increment(increment);
            }
            flush_pending_data(state, write_half).await?;
        }
        Frame::Headers {
            stream_id,
            end_stream,
            end_headers,
            block,
        } => {
            let mut buf = state.header_blocks.remove(&stream_id).unwrap_or_default();
            buf.extend_from_slice(&block);
            if end_headers {
                apply_header_block(state, stream_id, &buf)?;
                if end_stream {
                    finish_stream(state, stream_id);
                    admit_pending(state, write_half).await?;
                }
            } else {
                state.header_blocks.insert(stream_id, buf);
            }
        }
        Frame::Continuation { stream_id, end_headers, block } => {
            let mut buf = state.header_blocks.remove(&stream_id).unwrap_or_default();
            buf.extend_from_slice(&block);
            if end_headers {
                apply_header_block(state, stream_id, &buf)?;
            } else {
                state.header_blocks.insert(stream_id, buf);
            }
        }
        Frame::Data { stream_id, end_stream, data } => {
            let len = data.len() as u32;
            if let Some(increment) = state.connection_recv_window.on_received(len) {
                frame::write_frame(&mut *write_half.lock().await, &Frame::WindowUpdate { stream_id: 0, increment }).await?;
            }
            let over_cap = state
                .streams
                .get(&stream_id)
                .is_some_and(|stream| stream.body.len() + data.len() > state.max_response_body_bytes);
            if over_cap {
                frame::write_frame(
                    &mut *write_half.lock().await,
                    &Frame::RstStream { stream_id, error_code: ErrorCode::EnhanceYourCalm },
                )
                .await?;
                if let Some(mut stream) = state.streams.remove(&stream_id) {
                    stream.fail(Error::protocol(format!(
                        "response body exceeded {} bytes",
                        state.max_response_body_bytes
                    )));
                }
                admit_pending(state, write_half).await?;
            } else if let Some(stream) = state.streams.get_mut(&stream_id) {
                stream.body.extend_from_slice(&data);
                if let Some(increment) = stream.recv_window.on_received(len) {
                    frame::write_frame(&mut *write_half.lock().await, &Frame::WindowUpdate { stream_id, increment }).await?;
                }
                if end_stream {
                    finish_stream(state, stream_id);
                    admit_pending(state, write_half).await?;
                }
            }
        }
        Frame::RstStream { stream_id, error_code } => {
            if let Some(mut stream) = state.streams.remove(&stream_id) {
                stream.fail(Error::protocol(format!("stream reset by peer: {error_code:?}")));
            }
            admit_pending(state, write_half).await?;
        }
        Frame::GoAway {
            last_stream_id,
            error_code,
            ..
        } => {
            state.going_away = true;
            let stuck: Vec<u32> = state
                .streams
                .keys()
                .copied()
                .filter(|id| *id > last_stream_id)
                .collect();
            for id in stuck {
                if let Some(mut stream) = state.streams.remove(&id) {
                    stream.fail(Error::network(format!("connection going away: {error_code:?}")));
                }
            }
        }
        Frame::Ignored => {}
    }
    Ok(())
}

fn apply_header_block(state: &mut ConnState, stream_id: u32, block: &[u8]) -> Result<()> {
    let fields = state.decoder.decode(block)?;
    let Some(stream) = state.streams.get_mut(&stream_id) else {
        return Ok(());
    };
    for field in fields {
        match field {
            Field::Pseudo { name: ":status", value } => {
                stream.status = value.parse().ok();
            }
            Field::Pseudo { .. } => {}
            Field::Header { name, value } => {
                let _ = stream.headers.append(name.as_str(), &value);
            }
        }
    }
    Ok(())
}

fn finish_stream(state: &mut ConnState, stream_id: u32) {
    if let Some(mut stream) = state.streams.remove(&stream_id) {
        let body = Bytes::from(stream.body.split().freeze());
        stream.complete(body);
    }
    state.header_blocks.remove(&stream_id);
}

async fn admit_pending(state: &mut ConnState, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>) -> Result<()> {
    while let Some(submission) = state.admit_one_pending() {
        open_stream(submission, state, write_half).await?;
    }
    Ok(())
}

/// Forbidden per RFC 7540 §8.1.2.2: connection-specific fields have no meaning once multiplexed.
fn is_connection_specific(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "connection" | "keep-alive" | "proxy-connection" | "transfer-encoding" | "upgrade" | "host"
    )
}

async fn open_stream(submission: StreamRequest, state: &mut ConnState, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>) -> Result<()> {
    if state.next_stream_id > MAX_STREAM_ID {
        state.going_away = true;
        let last_stream_id = state.next_stream_id.saturating_sub(2);
        frame::write_frame(
            &mut *write_half.lock().await,
            &Frame::GoAway {
                last_stream_id,
                error_code: ErrorCode::NoError,
                debug_data: Bytes::new(),
            },
        )
        .await?;
        respond_with_error(submission, "stream id space exhausted; connection is going away");
        return Ok(());
    }
    let stream_id = state.next_stream_id;
    state.next_stream_id += 2;

    let request = submission.request;
    let authority = if (request.is_secure() && request.port() == 443) || (!request.is_secure() && request.port() == 80) {
        request.host().to_string()
    } else {
        format!("{}:{}", request.host(), request.port())
    };
    let path = request.uri().path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_else(|| "/".to_string());

    let mut fields: Vec<(&str, &str)> = vec![
        (":method", request.method().as_str()),
        (":scheme", if request.is_secure() { "https" } else { "http" }),
        (":authority", authority.as_str()),
        (":path", path.as_str()),
    ];
    for (name, value) in request.headers().iter() {
        if !is_connection_specific(name.as_str()) {
            fields.push((name.as_str(), value));
        }
    }
    let block = state.encoder.encode(fields);

    let has_body = request.body().is_some_and(|b| !b.is_empty());
    let handle = StreamHandle::new(
        request.clone(),
        submission.respond,
        state.peer_initial_window_size,
        DEFAULT_INITIAL_WINDOW_SIZE,
        submission.started,
    );
    state.streams.insert(stream_id, handle);

    {
        let mut writer = write_half.lock().await;
        frame::write_frame(
            &mut *writer,
            &Frame::Headers {
                stream_id,
                end_stream: !has_body,
                end_headers: true,
                block,
            },
        )
        .await?;
    }

    if has_body {
        send_data(state, stream_id, request.body().cloned().unwrap_or_default(), write_half).await?;
    }
    Ok(())
}

/// Sends as much of `data` as the stream's and connection's send windows currently allow,
/// chunked to `peer_max_frame_size`; whatever can't be sent yet is retried from
/// `flush_pending_data` once a `WINDOW_UPDATE` arrives.
async fn send_data(state: &mut ConnState, stream_id: u32, data: Bytes, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>) -> Result<()> {
    let mut remaining = data;
    while !remaining.is_empty() {
        let send_budget = match state.streams.get(&stream_id) {
            Some(stream) => stream.send_window.available().min(state.connection_send_window.available()),
            None => return Ok(()),
        };
        if send_budget <= 0 {
            state.pending_data_mut().insert(stream_id, remaining);
            return Ok(());
        }
        let chunk_len = (remaining.len() as i64).min(send_budget).min(state.peer_max_frame_size as i64) as usize;
        let chunk = remaining.split_to(chunk_len);
        if let Some(stream) = state.streams.get_mut(&stream_id) {
            stream.send_window.deduct(chunk_len as u32);
        }
        state.connection_send_window.deduct(chunk_len as u32);
        let end_stream = remaining.is_empty();
        frame::write_frame(
            &mut *write_half.lock().await,
            &Frame::Data {
                stream_id,
                end_stream,
                data: chunk,
            },
        )
        .await?;
    }
    Ok(())
}

async fn flush_pending_data(state: &mut ConnState, write_half: &Arc<AsyncMutex<WriteHalf<Stream>>>) -> Result<()> {
    let stalled: Vec<u32> = state.pending_data_mut().keys().copied().collect();
    for stream_id in stalled {
        if let Some(data) = state.pending_data_mut().remove(&stream_id) {
            send_data(state, stream_id, data, write_half).await?;
        }
    }
    Ok(())
}

impl ConnState {
    fn pending_data_mut(&mut self) -> &mut StdHashMap<u32, Bytes> {
        &mut self.pending_data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use tokio::net::{TcpListener, TcpStream};

    async fn loopback_pair() -> (Arc<AsyncMutex<WriteHalf<Stream>>>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let accept = listener.accept();
        let (client, (server, _)) = tokio::join!(connect, accept);
        let client = client.unwrap();
        let (_read_half, write_half) = tokio::io::split(Stream::Plain(client));
        (Arc::new(AsyncMutex::new(write_half)), server.unwrap())
    }

    fn submission(method: Method) -> (StreamRequest, oneshot::Receiver<Response>) {
        let (tx, rx) = oneshot::channel();
        let request = Request::new(method, "http://example.test/".parse().unwrap());
        (
            StreamRequest {
                request,
                respond: tx,
                started: Instant::now(),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn data_exceeding_the_body_cap_resets_the_stream_without_killing_the_connection() {
        let (write_half, mut server) = loopback_pair().await;
        let mut state = ConnState::new(hpack::DEFAULT_MAX_HEADER_LIST_SIZE, 16);
        let (tx, rx) = oneshot::channel();
        let handle = StreamHandle::new(
            Request::new(Method::GET, "http://example.test/".parse().unwrap()),
            tx,
            DEFAULT_INITIAL_WINDOW_SIZE,
            DEFAULT_INITIAL_WINDOW_SIZE,
            Instant::now(),
        );
        state.streams.insert(1, handle);

        let oversized = Bytes::from(vec![0u8; 32]);
        handle_frame(
            Frame::Data {
                stream_id: 1,
                end_stream: false,
                data: oversized,
            },
            &mut state,
            &write_half,
        )
        .await
        .unwrap();

        assert!(!state.streams.contains_key(&1), "the oversized stream should have been removed");
        let resp = rx.await.unwrap();
        assert_eq!(resp.error().unwrap().kind(), crate::error::ErrorKind::ProtocolError);

        let written = frame::read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        match written {
            Frame::RstStream { stream_id, error_code } => {
                assert_eq!(stream_id, 1);
                assert_eq!(error_code, ErrorCode::EnhanceYourCalm);
            }
            other => panic!("expected RST_STREAM, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_id_overflow_sends_goaway_and_refuses_further_streams() {
        let (write_half, mut server) = loopback_pair().await;
        let mut state = ConnState::new(hpack::DEFAULT_MAX_HEADER_LIST_SIZE, DEFAULT_MAX_RESPONSE_BODY_BYTES);
        state.next_stream_id = MAX_STREAM_ID + 2;

        let (submission, respond_rx) = submission(Method::GET);
        open_stream(submission, &mut state, &write_half).await.unwrap();

        assert!(state.going_away);
        assert!(state.streams.is_empty());
        let resp = respond_rx.await.unwrap();
        assert!(resp.error().is_some());

        let written = frame::read_frame(&mut server, DEFAULT_MAX_FRAME_SIZE).await.unwrap();
        assert!(matches!(written, Frame::GoAway { .. }), "expected GOAWAY, got {written:?}");
    }
}
