//! Default-header injection middleware.

use async_trait::async_trait;

use super::{Middleware, Next};
use crate::{Response, context::RequestContext};

/// Merges a fixed set of headers into every request passing through.
///
/// Builds a new [`crate::Request`] via [`crate::Request::with_merged_header`] and installs it
/// on the context rather than mutating the original — the original `Request` handed to
/// [`Pipeline::dispatch`](super::Pipeline::dispatch) is never changed.
pub struct DefaultHeaders {
    headers: Vec<(String, String)>,
    override_existing: bool,
}

impl DefaultHeaders {
    /// Creates a `DefaultHeaders` middleware applying `headers` in order, skipping any header
    /// the request already set (the default policy).
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self {
            headers,
            override_existing: false,
        }
    }

    /// Sets whether a configured header overrides one the request already carries.
    /// `false` (the default) skips headers already present; `true` replaces them
    /// unconditionally.
    pub fn override_existing(mut self, override_existing: bool) -> Self {
        self.override_existing = override_existing;
        self
    }
}

#[async_trait]
impl Middleware for DefaultHeaders {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        let mut request = ctx.request().clone();
        for (name, value) in &self.headers {
            request = request.with_merged_header(name, value, self.override_existing);
        }
        ctx.set_request(request);
        next.run(ctx).await
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

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            Response::new(200, request.headers().clone(), bytes::Bytes::new(), std::time::Duration::ZERO, request)
        }
    }

    #[tokio::test]
    async fn injects_without_overriding_existing() {
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport);
        let mw = DefaultHeaders::new(vec![
            ("User-Agent".into(), "wreq-core/0.1".into()),
            ("X-Custom".into(), "default".into()),
        ]);
        let pipeline = Pipeline::new(vec![Arc::new(mw)], transport);

        let mut request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        request.headers_mut().insert("X-Custom", "caller-set").unwrap();

        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.headers().get("user-agent"), Some("wreq-core/0.1"));
        assert_eq!(resp.headers().get("x-custom"), Some("caller-set"));
    }

    #[tokio::test]
    async fn override_existing_policy_replaces_caller_value() {
        let transport: Arc<dyn Transport> = Arc::new(EchoTransport);
        let mw = DefaultHeaders::new(vec![("X-Custom".into(), "default".into())])
            .override_existing(true);
        let pipeline = Pipeline::new(vec![Arc::new(mw)], transport);

        let mut request = Request::new(Method::GET, "http://example.test/".parse().unwrap());
        request.headers_mut().insert("X-Custom", "caller-set").unwrap();

        let resp = pipeline.dispatch(request).await;
        assert_eq!(resp.headers().get("x-custom"), Some("default"));
    }
}
