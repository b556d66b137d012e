//! Timeout enforcement middleware.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::{Response, context::RequestContext, error::Error};

/// Enforces a deadline on the remainder of the pipeline.
///
/// Resolves to the request's own [`crate::Request::timeout`] if set, falling back to
/// `default`. Firing the deadline cancels a *child* of the context's cancellation token
/// (see [`RequestContext::child_cancel`]) rather than the context's own token, so a single
/// `Timeout` instance wrapping several retried attempts (when nested inside [`super::Retry`])
/// never leaves the outer token poisoned for attempts after the one that timed out.
pub struct Timeout {
    default: Duration,
}

impl Timeout {
    /// Creates a `Timeout` middleware using `default` when a request carries no explicit
    /// per-request timeout.
    pub fn new(default: Duration) -> Self {
        Self { default }
    }
}

#[async_trait]
impl Middleware for Timeout {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let deadline = ctx.request().timeout().unwrap_or(self.default);
        let started = Instant::now();
        let child = ctx.child_cancel();
        let request = ctx.request().clone();

        tokio::select! {
            resp = next.run(ctx) => resp,
            () = tokio::time::sleep(deadline) => {
                child.cancel();
                // `next.run(ctx)`'s future is dropped here, releasing its borrow of `ctx`,
                // before this handler runs — checking the token now reflects a cancel that
                // raced with the deadline, not a stale pre-select snapshot.
                if ctx.cancellation_token().is_cancelled() {
                    Response::from_error(408, request, started.elapsed(), Error::cancelled())
                } else {
                    Response::from_error(
                        408,
                        request,
                        started.elapsed(),
                        Error::timeout(format!("exceeded timeout of {deadline:?}")),
                    )
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, middleware::{Pipeline, Transport}};
    use http::Method;
    use std::sync::Arc;

    struct SlowTransport(Duration);

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            tokio::time::sleep(self.0).await;
            Response::new(200, crate::header::HeaderMap::new(), bytes::Bytes::new(), self.0, request)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_before_slow_transport_completes() {
        let transport: Arc<dyn Transport> = Arc::new(SlowTransport(Duration::from_secs(10)));
        let pipeline = Pipeline::new(
            vec![Arc::new(Timeout::new(Duration::from_millis(50)))],
            transport,
        );
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 408);
        assert_eq!(resp.error().unwrap().kind(), crate::error::ErrorKind::Timeout);
    }

    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn send(&self, _request: Request, _ctx: &mut RequestContext) -> Response {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn user_cancel_wins_over_a_coincident_timeout() {
        let transport: Arc<dyn Transport> = Arc::new(HangingTransport);
        let pipeline = Pipeline::new(
            vec![Arc::new(Timeout::new(Duration::from_millis(50)))],
            transport,
        );
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let mut ctx = RequestContext::new(request);
        ctx.cancellation_token().cancel();

        let resp = pipeline.dispatch_with_context(&mut ctx).await;
        assert_eq!(resp.status(), 408);
        assert!(resp.error().unwrap().is_cancelled());
    }

    #[tokio::test]
    async fn fast_transport_wins() {
        let transport: Arc<dyn Transport> = Arc::new(SlowTransport(Duration::from_millis(1)));
        let pipeline = Pipeline::new(
            vec![Arc::new(Timeout::new(Duration::from_secs(5)))],
            transport,
        );
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert!(resp.error().is_none());
        assert_eq!(resp.status(), 200);
    }
}
