//! Bounded retry middleware with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::{Response, context::RequestContext};

/// Retries idempotent requests that fail with a retryable error or a 5xx status.
///
/// Bounded by `max_attempts` total attempts (the original plus `max_attempts - 1` retries).
/// Between attempts, sleeps `min(delay, max_delay)` and then multiplies `delay` by
/// `backoff_multiplier` for the next round, starting from `initial_delay`. By default only
/// retries idempotent requests (see [`crate::Request::is_idempotent`]); `idempotent_only(false)`
/// lifts that restriction. Never retries once the context's cancellation token has fired, and
/// never sleeps past a cancellation either — a user cancel always wins over a scheduled retry.
///
/// Each attempt is recorded on the context's state bag under `"retry_attempt"` so downstream
/// middleware (logging, metrics) can tell attempt 1 from a retry.
pub struct Retry {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Duration,
    idempotent_only: bool,
}

impl Retry {
    /// Creates a `Retry` middleware allowing up to `max_attempts` total tries, with a 100ms
    /// initial delay, a 2x backoff multiplier, and a 10s delay cap — restricted to idempotent
    /// requests by default.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero.
    pub fn new(max_attempts: u32) -> Self {
        assert!(max_attempts > 0, "max_attempts must be at least 1");
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(10),
            idempotent_only: true,
        }
    }

    /// Sets the delay before the first retry (subsequent delays grow from this by
    /// `backoff_multiplier`).
    pub fn initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Sets the factor `delay` is multiplied by after each attempt.
    pub fn backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    /// Sets the ceiling `delay` is clamped to before each sleep.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets whether only idempotent requests are retried (`true`, the default) or any request
    /// regardless of method (`false`).
    pub fn idempotent_only(mut self, idempotent_only: bool) -> Self {
        self.idempotent_only = idempotent_only;
        self
    }
}

fn should_retry(resp: &Response, request_is_retryable: bool) -> bool {
    if !request_is_retryable {
        return false;
    }
    if let Some(err) = resp.error() {
        return err.is_retryable();
    }
    (500..600).contains(&resp.status())
}

#[async_trait]
impl Middleware for Retry {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let retryable = !self.idempotent_only || ctx.request().is_idempotent();
        let mut attempt = 1u32;
        let mut delay = self.initial_delay;
        ctx.set_state("retry_attempt", attempt.to_string());

        loop {
            // `next.run` consumes `Next`; rebuild a fresh handle into the same remaining
            // chain for each attempt.
            let attempt_next = Next {
                rest: next.rest,
                transport: next.transport,
            };
            let resp = attempt_next.run(ctx).await;

            if ctx.cancellation_token().is_cancelled() {
                return resp;
            }
            if attempt >= self.max_attempts || !should_retry(&resp, retryable) {
                return resp;
            }

            let sleep_for = delay.min(self.max_delay);
            tokio::select! {
                () = ctx.cancellation_token().cancelled() => return resp,
                () = tokio::time::sleep(sleep_for) => {}
            }
            delay = delay.mul_f64(self.backoff_multiplier);

            attempt += 1;
            ctx.set_state("retry_attempt", attempt.to_string());
            ctx.record("retry_attempt");
        }
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
    use std::sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    };

    struct FlakyTransport {
        fail_times: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times {
                Response::new(503, crate::header::HeaderMap::new(), bytes::Bytes::new(), std::time::Duration::ZERO, request)
            } else {
                Response::new(200, crate::header::HeaderMap::new(), bytes::Bytes::new(), std::time::Duration::ZERO, request)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_idempotent_up_to_bound() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 2,
            calls: AtomicU32::new(0),
        });
        let pipeline = Pipeline::new(vec![Arc::new(Retry::new(3))], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_bound() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 10,
            calls: AtomicU32::new(0),
        });
        let pipeline = Pipeline::new(vec![Arc::new(Retry::new(3))], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test(start_paused = true)]
    async fn never_retries_non_idempotent() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 10,
            calls: AtomicU32::new(0),
        });
        let pipeline = Pipeline::new(vec![Arc::new(Retry::new(3))], transport);
        let request = Request::new(Method::POST, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn idempotent_only_false_retries_a_post() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 1,
            calls: AtomicU32::new(0),
        });
        let retry = Retry::new(3)
            .idempotent_only(false)
            .initial_delay(Duration::from_millis(1));
        let pipeline = Pipeline::new(vec![Arc::new(retry)], transport);
        let request = Request::new(Method::POST, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts_with_growing_delay() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 2,
            calls: AtomicU32::new(0),
        });
        let retry = Retry::new(3)
            .initial_delay(Duration::from_millis(100))
            .backoff_multiplier(2.0)
            .max_delay(Duration::from_secs(10));
        let pipeline = Pipeline::new(vec![Arc::new(retry)], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());

        let handle = tokio::spawn(async move { pipeline.dispatch(request).await });
        tokio::time::sleep(Duration::from_millis(90)).await;
        assert!(!handle.is_finished(), "should still be waiting out the first 100ms delay");
        tokio::time::sleep(Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(190)).await;
        assert!(!handle.is_finished(), "should still be waiting out the second 200ms delay");
        tokio::time::sleep(Duration::from_millis(20)).await;
        let resp = handle.await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_sleep_short_circuits() {
        let transport: Arc<dyn Transport> = Arc::new(FlakyTransport {
            fail_times: 10,
            calls: AtomicU32::new(0),
        });
        let retry = Retry::new(5).initial_delay(Duration::from_secs(30));
        let pipeline = Pipeline::new(vec![Arc::new(retry)], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let mut ctx = RequestContext::new(request);
        let token = ctx.cancellation_token().clone();

        let handle = tokio::spawn(async move {
            let resp = pipeline.dispatch_with_context(&mut ctx).await;
            (resp, ctx)
        });
        tokio::task::yield_now().await;
        token.cancel();
        let (resp, ctx) = handle.await.unwrap();
        assert_eq!(resp.status(), 503);
        assert_eq!(ctx.get_state("retry_attempt"), Some("1"));
    }
}
