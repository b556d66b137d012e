//! Structured request/response logging middleware.

use async_trait::async_trait;
use tracing::{Level, event, span};

use super::{Middleware, Next};
use crate::{Response, context::RequestContext, hash::HashSet};

const DEFAULT_REDACTED_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "proxy-authorization"];

/// Emits a `tracing` span per request and a completion event carrying method, URI, status,
/// attempt count, elapsed time, and a redacted header summary.
///
/// Independent of which transport engine eventually serves the request — the span wraps the
/// whole pipeline, not just the wire-level connection. A failed request is always logged at
/// `WARN` regardless of `verbosity`, which only controls the level of the routine
/// "request completed" event on success.
pub struct Logging {
    verbosity: Level,
    redact: HashSet<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self::new()
    }
}

impl Logging {
    /// Creates a `Logging` middleware at `DEBUG` verbosity, redacting the usual
    /// credential-bearing headers (`authorization`, `cookie`, `set-cookie`,
    /// `proxy-authorization`).
    pub fn new() -> Self {
        Self {
            verbosity: Level::DEBUG,
            redact: DEFAULT_REDACTED_HEADERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Sets the level the "request completed" event is emitted at on success.
    pub fn verbosity(mut self, verbosity: Level) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Replaces the set of header names (case-insensitive) whose values are masked in logs.
    pub fn redact_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.redact = headers.into_iter().map(|s| s.into().to_ascii_lowercase()).collect();
        self
    }

    fn header_summary(&self, ctx: &RequestContext) -> String {
        ctx.request()
            .headers()
            .iter()
            .map(|(name, value)| {
                let name = name.as_str();
                if self.redact.contains(&name.to_ascii_lowercase()) {
                    format!("{name}=[redacted]")
                } else {
                    format!("{name}={value}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl Middleware for Logging {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let method = ctx.request().method().clone();
        let uri = ctx.request().uri().clone();
        let headers = self.header_summary(ctx);
        let span = span!(Level::DEBUG, "http_request", %method, %uri);
        let _guard = span.enter();

        let resp = next.run(ctx).await;

        let attempt = ctx.get_state("retry_attempt").unwrap_or("1").to_string();
        if let Some(err) = resp.error() {
            event!(
                Level::WARN,
                %method,
                %uri,
                status = resp.status(),
                attempt = %attempt,
                elapsed_ms = resp.elapsed().as_millis() as u64,
                %headers,
                error = %err,
                "request failed"
            );
            return resp;
        }

        macro_rules! completed_event {
            ($level:expr) => {
                event!(
                    $level,
                    %method,
                    %uri,
                    status = resp.status(),
                    attempt = %attempt,
                    elapsed_ms = resp.elapsed().as_millis() as u64,
                    %headers,
                    "request completed"
                )
            };
        }
        match self.verbosity {
            Level::ERROR => completed_event!(Level::ERROR),
            Level::WARN => completed_event!(Level::WARN),
            Level::INFO => completed_event!(Level::INFO),
            Level::DEBUG => completed_event!(Level::DEBUG),
            Level::TRACE => completed_event!(Level::TRACE),
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
    use std::sync::Arc;

    struct OkTransport;

    #[async_trait]
    impl Transport for OkTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            Response::new(200, crate::header::HeaderMap::new(), bytes::Bytes::new(), std::time::Duration::ZERO, request)
        }
    }

    #[tokio::test]
    async fn passes_response_through_unchanged() {
        let transport: Arc<dyn Transport> = Arc::new(OkTransport);
        let pipeline = Pipeline::new(vec![Arc::new(Logging::new())], transport);
        let request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn redacts_configured_headers_in_summary() {
        let logging = Logging::new();
        let mut request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        request.headers_mut().insert("Authorization", "Bearer secret").unwrap();
        request.headers_mut().insert("X-Trace-Id", "abc123").unwrap();
        let ctx = RequestContext::new(request);

        let summary = logging.header_summary(&ctx);
        assert!(summary.contains("authorization=[redacted]"));
        assert!(!summary.contains("secret"));
        assert!(summary.contains("x-trace-id=abc123"));
    }

    #[test]
    fn custom_redaction_set_replaces_the_default() {
        let logging = Logging::new().redact_headers(["x-api-key"]);
        let mut request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        request.headers_mut().insert("Authorization", "Bearer secret").unwrap();
        request.headers_mut().insert("X-Api-Key", "topsecret").unwrap();
        let ctx = RequestContext::new(request);

        let summary = logging.header_summary(&ctx);
        assert!(summary.contains("authorization=Bearer secret"));
        assert!(summary.contains("x-api-key=[redacted]"));
    }
}
