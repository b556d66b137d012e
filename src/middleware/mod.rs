//! The middleware pipeline: an ordered chain of interceptors terminated by the transport.
//!
//! A middleware observes `(context, next)`, may replace the request, short-circuit by not
//! calling `next`, or call `next` more than once to retry.

mod default_headers;
mod logging;
mod metrics;
mod monitor;
mod retry;
mod timeout;

use std::sync::Arc;

use async_trait::async_trait;

pub use default_headers::DefaultHeaders;
pub use logging::Logging;
pub use metrics::{Metrics, MetricsSnapshot};
pub use monitor::{Monitor, MonitorEvent, MonitorListener};
pub use retry::Retry;
pub use timeout::Timeout;

use crate::{Request, Response, context::RequestContext};

/// The transport: the innermost handler every pipeline terminates at.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the resulting response. Never panics on a transport
    /// failure — those surface as a populated [`crate::Error`] on the returned [`Response`].
    async fn send(&self, request: Request, ctx: &mut RequestContext) -> Response;
}

/// A pipeline interceptor.
///
/// Implementations may rewrite the request on the context (never mutating the original in
/// place — see [`RequestContext::set_request`]), short-circuit by returning without calling
/// `next.run()`, or call `next.run()` more than once to retry.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handles one pass through this link of the chain.
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response;
}

/// A handle to the remainder of the pipeline, passed to [`Middleware::handle`].
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    transport: &'a (dyn Transport + 'a),
}

impl<'a> Next<'a> {
    fn new(rest: &'a [Arc<dyn Middleware>], transport: &'a (dyn Transport + 'a)) -> Self {
        Self { rest, transport }
    }

    /// Invokes the next link in the chain, or the transport if this was the last middleware.
    pub async fn run(self, ctx: &mut RequestContext) -> Response {
        match self.rest.split_first() {
            Some((mw, rest)) => {
                let next = Next {
                    rest,
                    transport: self.transport,
                };
                mw.handle(ctx, next).await
            }
            None => self.transport.send(ctx.request().clone(), ctx).await,
        }
    }
}

/// A fully built pipeline: an ordered middleware chain wrapping a transport.
///
/// Built once per client at construction. `middlewares[0]` is outermost; the transport is
/// always innermost. Middlewares are conceptually wrapped starting from the transport and
/// working backward through the list, which is what produces that outermost-at-index-0
/// ordering — in the slice-driven [`Next`] above this falls out of popping the list
/// front-to-back as the call proceeds inward.
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn Transport>,
}

impl Pipeline {
    /// Builds a pipeline from an ordered middleware list (outermost first) and a transport.
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>, transport: Arc<dyn Transport>) -> Self {
        Self {
            middlewares,
            transport,
        }
    }

    /// Dispatches `request` through the full chain, returning the final response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let mut ctx = RequestContext::new(request);
        self.dispatch_with_context(&mut ctx).await
    }

    /// Dispatches using a caller-supplied context, e.g. so the caller can inspect the
    /// timeline or state bag afterward.
    pub async fn dispatch_with_context(&self, ctx: &mut RequestContext) -> Response {
        let next = Next::new(&self.middlewares, self.transport.as_ref());
        next.run(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::Mutex;
    use http::Method;
    use std::sync::Arc as StdArc;

    struct RecordingTransport(StdArc<Mutex<Vec<&'static str>>>);

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            self.0.lock().push("T");
            Response::new(
                200,
                crate::header::HeaderMap::new(),
                bytes::Bytes::new(),
                std::time::Duration::ZERO,
                request,
            )
        }
    }

    struct Recorder {
        name: &'static str,
        log: StdArc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
            self.log.lock().push(self.name);
            let resp = next.run(ctx).await;
            self.log.lock().push(self.name);
            resp
        }
    }

    #[tokio::test]
    async fn ordering_matches_a_b_c_t_then_t_c_b_a() {
        let log = StdArc::new(Mutex::new(Vec::new()));
        let transport: Arc<dyn Transport> = StdArc::new(RecordingTransport(log.clone()));
        let middlewares: Vec<Arc<dyn Middleware>> = vec![
            StdArc::new(Recorder {
                name: "A",
                log: log.clone(),
            }),
            StdArc::new(Recorder {
                name: "B",
                log: log.clone(),
            }),
            StdArc::new(Recorder {
                name: "C",
                log: log.clone(),
            }),
        ];
        let pipeline = Pipeline::new(middlewares, transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            log.lock().clone(),
            vec!["A", "B", "C", "T", "C", "B", "A"]
        );
    }
}
