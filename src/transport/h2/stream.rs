//! Per-stream bookkeeping for the H/2 connection actor.
//!
//! A stream's lifecycle here is narrower than RFC 7540's full state machine: this client
//! always finishes sending its (fully-buffered) request before it starts reading, so a stream
//! only ever needs to distinguish "still waiting for the peer's END_STREAM" from "closed" —
//! grounded on the same simplification `H1Connection` makes for request bodies, applied to
//! the H/2 side.

use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tokio::sync::oneshot;

use crate::{Request, Response, header::HeaderMap};

use super::flow::FlowWindow;

pub(super) struct StreamHandle {
    pub(super) send_window: FlowWindow,
    pub(super) recv_window: FlowWindow,
    pub(super) status: Option<u16>,
    pub(super) headers: HeaderMap,
    pub(super) body: BytesMut,
    pub(super) end_stream_received: bool,
    pub(super) respond: Option<oneshot::Sender<Response>>,
    pub(super) request: Request,
    pub(super) started: Instant,
}

impl StreamHandle {
    pub(super) fn new(
        request: Request,
        respond: oneshot::Sender<Response>,
        initial_send_window: u32,
        initial_recv_window: u32,
        started: Instant,
    ) -> Self {
        Self {
            send_window: FlowWindow::new(initial_send_window),
            recv_window: FlowWindow::new(initial_recv_window),
            status: None,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            end_stream_received: false,
            respond: Some(respond),
            request,
            started,
        }
    }

    /// Completes the stream, building a `Response` from what's been accumulated and sending it
    /// to whoever is awaiting this request. A no-op if already completed (e.g. RST_STREAM
    /// arriving after END_STREAM was already processed).
    pub(super) fn complete(&mut self, body: Bytes) {
        let Some(respond) = self.respond.take() else { return };
        let status = self.status.unwrap_or(0);
        let response = Response::new(status, self.headers.clone(), body, self.started.elapsed(), self.request.clone());
        let _ = respond.send(response);
    }

    pub(super) fn fail(&mut self, error: crate::error::Error) {
        let Some(respond) = self.respond.take() else { return };
        let response = Response::from_error(0, self.request.clone(), self.started.elapsed(), error);
        let _ = respond.send(response);
    }
}
