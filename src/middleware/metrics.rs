//! In-process request metrics middleware.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Middleware, Next};
use crate::{Response, context::RequestContext};

#[derive(Debug, Default)]
struct Inner {
    total_requests: AtomicU64,
    total_successes: AtomicU64,
    total_errors: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    total_elapsed_nanos: AtomicU64,
    by_host: DashMap<String, AtomicU64, ahash::RandomState>,
    by_status: DashMap<u16, AtomicU64, ahash::RandomState>,
}

/// A point-in-time read of accumulated request metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Total number of dispatches observed by this middleware instance.
    pub total_requests: u64,
    /// Number of dispatches that completed with no transport-level error.
    pub total_successes: u64,
    /// Number of dispatches that carried a transport-level error.
    pub total_errors: u64,
    /// Total request body bytes sent across all observed dispatches.
    pub bytes_sent: u64,
    /// Total response body bytes received across all observed dispatches.
    pub bytes_received: u64,
    /// Count of responses seen per request host.
    pub by_host: std::collections::HashMap<String, u64>,
    /// Count of responses seen per status code (synthetic statuses included).
    pub by_status: std::collections::HashMap<u16, u64>,
    /// Mean elapsed time across all observed dispatches.
    pub mean_elapsed: Duration,
}

/// Accumulates counters across every request passing through it.
///
/// Scalar counters (`total_requests`, `total_successes`, `total_errors`, `bytes_sent`,
/// `bytes_received`, `total_elapsed_nanos`) are plain atomics; the per-host and per-status
/// breakdowns use a sharded concurrent map ([`dashmap`]) so a burst of concurrent requests
/// against different hosts or statuses doesn't serialize on a single lock. Cheaply cloneable:
/// clones share the same underlying counters via the `Arc`-wrapped inner state.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Creates a fresh, empty `Metrics` middleware.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    /// Reads a consistent-enough snapshot of the accumulated counters. Individual fields are
    /// read independently, so a snapshot taken while requests are actively completing may show
    /// e.g. `total_requests` incremented slightly ahead of `by_status`'s matching entry — this
    /// is the same eventual-consistency tradeoff any lock-free counter set makes.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total_requests = self.inner.total_requests.load(Ordering::Relaxed);
        let total_elapsed_nanos = self.inner.total_elapsed_nanos.load(Ordering::Relaxed);
        let mean_elapsed = if total_requests > 0 {
            Duration::from_nanos(total_elapsed_nanos / total_requests)
        } else {
            Duration::ZERO
        };
        MetricsSnapshot {
            total_requests,
            total_successes: self.inner.total_successes.load(Ordering::Relaxed),
            total_errors: self.inner.total_errors.load(Ordering::Relaxed),
            bytes_sent: self.inner.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.inner.bytes_received.load(Ordering::Relaxed),
            by_host: self
                .inner
                .by_host
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            by_status: self
                .inner
                .by_status
                .iter()
                .map(|entry| (*entry.key(), entry.value().load(Ordering::Relaxed)))
                .collect(),
            mean_elapsed,
        }
    }

    /// Resets every counter to zero.
    ///
    /// Quiescent-only: this does not synchronize with in-flight requests still incrementing
    /// counters. Call it only when no request is concurrently passing through this instance
    /// (e.g. between test cases), or the reset counters may be clobbered by a request that
    /// read its pre-reset state before the reset ran.
    pub fn reset(&self) {
        self.inner.total_requests.store(0, Ordering::Relaxed);
        self.inner.total_successes.store(0, Ordering::Relaxed);
        self.inner.total_errors.store(0, Ordering::Relaxed);
        self.inner.bytes_sent.store(0, Ordering::Relaxed);
        self.inner.bytes_received.store(0, Ordering::Relaxed);
        self.inner.total_elapsed_nanos.store(0, Ordering::Relaxed);
        self.inner.by_host.clear();
        self.inner.by_status.clear();
    }
}

#[async_trait]
impl Middleware for Metrics {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let host = ctx.request().host().to_string();
        let bytes_sent = ctx.request().body().map_or(0, |b| b.len() as u64);

        let resp = next.run(ctx).await;

        self.inner.total_requests.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_elapsed_nanos
            .fetch_add(resp.elapsed().as_nanos() as u64, Ordering::Relaxed);
        self.inner.bytes_sent.fetch_add(bytes_sent, Ordering::Relaxed);
        self.inner
            .bytes_received
            .fetch_add(resp.body().len() as u64, Ordering::Relaxed);
        if resp.error().is_some() {
            self.inner.total_errors.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.total_successes.fetch_add(1, Ordering::Relaxed);
        }

        self.inner
            .by_host
            .entry(host)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
        self.inner
            .by_status
            .entry(resp.status())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);

        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Request,
        middleware::{Pipeline, Transport},
    };
    use http::Method;

    struct FixedStatusTransport(u16);

    #[async_trait]
    impl Transport for FixedStatusTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            Response::new(self.0, crate::header::HeaderMap::new(), bytes::Bytes::new(), Duration::from_millis(10), request)
        }
    }

    #[tokio::test]
    async fn counts_requests_and_statuses() {
        let metrics = Metrics::new();
        let transport: Arc<dyn Transport> = Arc::new(FixedStatusTransport(200));
        let pipeline = Pipeline::new(vec![Arc::new(metrics.clone())], transport);

        for _ in 0..3 {
            let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
            pipeline.dispatch(request).await;
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.total_successes, 3);
        assert_eq!(snap.total_errors, 0);
        assert_eq!(snap.by_status.get(&200), Some(&3));
        assert_eq!(snap.by_host.get("example.test"), Some(&3));
    }

    #[tokio::test]
    async fn tracks_bytes_sent_and_received() {
        let metrics = Metrics::new();
        let transport: Arc<dyn Transport> = Arc::new(FixedStatusTransport(200));
        let pipeline = Pipeline::new(vec![Arc::new(metrics.clone())], transport);

        let mut request = Request::new(Method::POST, "http://example.test/".parse().unwrap());
        request.set_body(bytes::Bytes::from_static(b"hello"));
        pipeline.dispatch(request).await;

        let snap = metrics.snapshot();
        assert_eq!(snap.bytes_sent, 5);
    }

    #[tokio::test]
    async fn reset_clears_every_counter() {
        let metrics = Metrics::new();
        let transport: Arc<dyn Transport> = Arc::new(FixedStatusTransport(503));
        let pipeline = Pipeline::new(vec![Arc::new(metrics.clone())], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        pipeline.dispatch(request).await;
        assert_eq!(metrics.snapshot().total_requests, 1);

        metrics.reset();

        let snap = metrics.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.total_errors, 0);
        assert!(snap.by_status.is_empty());
        assert!(snap.by_host.is_empty());
    }
}
