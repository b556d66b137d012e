//! Bounded ring-buffer event monitor middleware.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::{Response, context::RequestContext, sync::Mutex};

/// One recorded observation, handed to any [`MonitorListener`]s and kept in the ring buffer.
#[derive(Debug, Clone)]
pub struct MonitorEvent {
    /// The request method, e.g. `GET`.
    pub method: http::Method,
    /// The request's target URI.
    pub uri: http::Uri,
    /// The resulting status code.
    pub status: u16,
    /// Whether the attempt carried a transport-level error.
    pub is_error: bool,
    /// Wall-clock elapsed time for the attempt.
    pub elapsed: Duration,
}

/// A callback notified synchronously for every event the monitor observes.
///
/// Kept deliberately simple (`Fn`, not `async`): a listener that needs to do async work
/// should hand the event off to a channel rather than block the pipeline.
pub trait MonitorListener: Send + Sync {
    /// Called once per dispatch, after the response is known.
    fn on_event(&self, event: &MonitorEvent);
}

struct Inner {
    ring: VecDeque<MonitorEvent>,
    capacity: usize,
    listeners: Vec<Arc<dyn MonitorListener>>,
}

/// Observes every request passing through, keeping the most recent `capacity` events in a
/// bounded ring buffer and notifying any registered listeners.
///
/// The bound matters: an unbounded log of every request this process has ever made is a
/// memory leak by another name, matching the data model's explicit ring-buffer requirement
/// for the monitor component.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<Mutex<Inner>>,
}

impl Monitor {
    /// Creates a `Monitor` retaining at most `capacity` recent events.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                ring: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers a listener notified for every subsequent event.
    pub fn add_listener(&self, listener: Arc<dyn MonitorListener>) {
        self.inner.lock().listeners.push(listener);
    }

    /// Returns the events currently retained, oldest first.
    pub fn recent(&self) -> Vec<MonitorEvent> {
        self.inner.lock().ring.iter().cloned().collect()
    }
}

#[async_trait]
impl Middleware for Monitor {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let method = ctx.request().method().clone();
        let uri = ctx.request().uri().clone();
        let resp = next.run(ctx).await;

        let event = MonitorEvent {
            method,
            uri,
            status: resp.status(),
            is_error: resp.error().is_some(),
            elapsed: resp.elapsed(),
        };

        let mut inner = self.inner.lock();
        if inner.ring.len() == inner.capacity {
            inner.ring.pop_front();
        }
        inner.ring.push_back(event.clone());
        let listeners = inner.listeners.clone();
        drop(inner);
        for listener in &listeners {
            listener.on_event(&event);
        }

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

    struct OkTransport;

    #[async_trait]
    impl Transport for OkTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            Response::new(200, crate::header::HeaderMap::new(), bytes::Bytes::new(), Duration::ZERO, request)
        }
    }

    #[tokio::test]
    async fn ring_buffer_stays_bounded() {
        let monitor = Monitor::new(2);
        let transport: Arc<dyn Transport> = Arc::new(OkTransport);
        let pipeline = Pipeline::new(vec![Arc::new(monitor.clone())], transport);

        for _ in 0..5 {
            let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
            pipeline.dispatch(request).await;
        }

        assert_eq!(monitor.recent().len(), 2);
    }

    struct CountingListener(Arc<std::sync::atomic::AtomicU32>);

    impl MonitorListener for CountingListener {
        fn on_event(&self, _event: &MonitorEvent) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn listeners_are_notified() {
        let monitor = Monitor::new(10);
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
        monitor.add_listener(Arc::new(CountingListener(counter.clone())));

        let transport: Arc<dyn Transport> = Arc::new(OkTransport);
        let pipeline = Pipeline::new(vec![Arc::new(monitor)], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        pipeline.dispatch(request).await;

        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
