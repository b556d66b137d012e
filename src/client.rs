//! The public client surface: [`Client`] and [`ClientBuilder`] assemble the connection pool,
//! transport selector, and middleware pipeline defined elsewhere in this crate into the one
//! handle application code holds.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{Method, Uri};

use crate::{
    Request, Response,
    dns::{HickoryDnsResolver, Resolve},
    error::{Error, Result},
    middleware::{DefaultHeaders, Logging, Metrics, MetricsSnapshot, Middleware, Monitor, MonitorListener, Pipeline, Retry, Timeout, Transport},
    pool::{ConnectionPool, PoolConfig},
    tls::{self, TlsBackend},
    transport::{HttpTransport, h1::H1Connection},
};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MONITOR_CAPACITY: usize = 256;

/// Builds a [`Client`].
///
/// Every knob has a working default, so `ClientBuilder::new().build()` (equivalently
/// [`Client::new`]) is always valid.
pub struct ClientBuilder {
    base_url: Option<Uri>,
    default_timeout: Duration,
    connect_timeout: Duration,
    dns_timeout: Option<Duration>,
    default_headers: Vec<(String, String)>,
    max_retries: u32,
    pool_config: PoolConfig,
    tls_backend: TlsBackend,
    resolver: Option<Arc<dyn Resolve>>,
    transport_override: Option<Arc<dyn Transport>>,
    monitor_capacity: usize,
    #[cfg(feature = "cookies")]
    cookie_store: bool,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Creates a builder with every knob at its default.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            dns_timeout: None,
            default_headers: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            pool_config: PoolConfig::default(),
            tls_backend: TlsBackend::default(),
            resolver: None,
            transport_override: None,
            monitor_capacity: DEFAULT_MONITOR_CAPACITY,
            #[cfg(feature = "cookies")]
            cookie_store: false,
        }
    }

    /// Resolves every relative request URL against `base_url`.
    pub fn base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Some(base_url.parse().map_err(Error::protocol)?);
        Ok(self)
    }

    /// Overrides the per-request timeout applied when a request carries none of its own
    /// (default 30s).
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Overrides the TCP connect timeout applied by both transport engines (default 10s).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the DNS resolution timeout (default [`crate::dns::DEFAULT_DNS_TIMEOUT`]).
    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout = Some(timeout);
        self
    }

    /// Merges a header into every request that doesn't already set it.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Overrides the maximum total attempts (including the first) [`Retry`] allows for an
    /// idempotent request (default 3).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Overrides the connection pool's tunables (default [`PoolConfig::default`]).
    pub fn pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = pool_config;
        self
    }

    /// Selects which TLS backend builds the wrapper handed to both transport engines.
    pub fn tls_backend(mut self, backend: TlsBackend) -> Self {
        self.tls_backend = backend;
        self
    }

    /// Overrides the DNS resolver (default [`HickoryDnsResolver`]).
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Replaces the transport entirely, bypassing the pool/H1/H2/TLS stack this builder would
    /// otherwise assemble — e.g. to install a [`crate::testing::CassetteTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport_override = Some(transport);
        self
    }

    /// Overrides the number of recent requests [`Monitor`] retains (default 256).
    pub fn monitor_capacity(mut self, capacity: usize) -> Self {
        self.monitor_capacity = capacity;
        self
    }

    /// Enables the cookie jar: requests receive a `Cookie` header built from previously
    /// stored `Set-Cookie` responses, and responses are fed back into the jar.
    #[cfg(feature = "cookies")]
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Assembles the configured pipeline into a [`Client`].
    pub fn build(self) -> Result<Client> {
        let resolver = self.resolver.unwrap_or_else(|| Arc::new(HickoryDnsResolver::new()) as Arc<dyn Resolve>);
        let tls_wrapper = tls::build_wrapper(self.tls_backend);

        let transport: Arc<dyn Transport> = match self.transport_override {
            Some(transport) => transport,
            None => {
                let pool: ConnectionPool<H1Connection> = ConnectionPool::new(self.pool_config);
                let mut http_transport = HttpTransport::new(pool, resolver, tls_wrapper, self.connect_timeout);
                if let Some(dns_timeout) = self.dns_timeout {
                    http_transport = http_transport.with_dns_timeout(dns_timeout);
                }
                Arc::new(http_transport)
            }
        };

        let metrics = Metrics::new();
        let monitor = Monitor::new(self.monitor_capacity);

        let mut middlewares: Vec<Arc<dyn Middleware>> = Vec::new();
        if !self.default_headers.is_empty() {
            middlewares.push(Arc::new(DefaultHeaders::new(self.default_headers)));
        }
        #[cfg(feature = "cookies")]
        let cookie_jar = if self.cookie_store {
            let jar = Arc::new(crate::cookie::CookieJar::new());
            middlewares.push(Arc::new(crate::cookie::CookieMiddleware::new(jar.clone())));
            Some(jar)
        } else {
            None
        };
        middlewares.push(Arc::new(Logging::new()));
        middlewares.push(Arc::new(metrics.clone()));
        middlewares.push(Arc::new(monitor.clone()));
        middlewares.push(Arc::new(Timeout::new(self.default_timeout)));
        middlewares.push(Arc::new(Retry::new(self.max_retries)));

        Ok(Client {
            pipeline: Arc::new(Pipeline::new(middlewares, transport)),
            base_url: self.base_url,
            metrics,
            monitor,
            #[cfg(feature = "cookies")]
            cookie_jar,
        })
    }
}

/// The assembled client: a middleware pipeline terminated by a transport (or, in tests, a
/// [`crate::testing::CassetteTransport`]).
///
/// Cheaply cloneable — cloning shares the same pool, pipeline, and metrics/monitor state.
#[derive(Clone)]
pub struct Client {
    pipeline: Arc<Pipeline>,
    base_url: Option<Uri>,
    metrics: Metrics,
    monitor: Monitor,
    #[cfg(feature = "cookies")]
    cookie_jar: Option<Arc<crate::cookie::CookieJar>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// A client with every default: `rustls` (or whatever TLS feature is enabled), Hickory
    /// DNS, a 6-connection-per-host pool, and a 3-attempt retry policy.
    ///
    /// # Panics
    ///
    /// Panics if no TLS backend feature is compiled in — see [`tls::build_wrapper`].
    pub fn new() -> Self {
        ClientBuilder::new().build().expect("default client configuration is always valid")
    }

    /// Starts building a client with non-default configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn resolve_uri(&self, url: &str) -> Result<Uri> {
        if let Ok(uri) = url.parse::<Uri>() {
            if uri.scheme().is_some() {
                return Ok(uri);
            }
        }
        let base = self.base_url.as_ref().ok_or_else(|| Error::protocol(format!("'{url}' is not an absolute URL and no base_url is configured")))?;
        let joined = url::Url::parse(&base.to_string())
            .and_then(|base_url| base_url.join(url))
            .map_err(Error::protocol)?;
        joined.as_str().parse().map_err(Error::protocol)
    }

    /// Starts building a request for `method` against `url` (absolute, or relative to this
    /// client's configured base URL).
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder<'_>> {
        let uri = self.resolve_uri(url)?;
        Ok(RequestBuilder {
            client: self,
            request: Request::new(method, uri),
        })
    }

    /// Shorthand for `self.request(Method::GET, url)`.
    pub fn get(&self, url: &str) -> Result<RequestBuilder<'_>> {
        self.request(Method::GET, url)
    }

    /// Shorthand for `self.request(Method::POST, url)`.
    pub fn post(&self, url: &str) -> Result<RequestBuilder<'_>> {
        self.request(Method::POST, url)
    }

    /// Dispatches an already-built [`Request`] through this client's pipeline directly.
    pub async fn send(&self, request: Request) -> Response {
        self.pipeline.dispatch(request).await
    }

    /// A snapshot of the accumulated [`Metrics`] for this client.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Registers a listener notified synchronously on every request this client completes.
    pub fn subscribe(&self, listener: Arc<dyn MonitorListener>) {
        self.monitor.add_listener(listener);
    }

    /// The cookie jar backing this client, if [`ClientBuilder::cookie_store`] was enabled.
    #[cfg(feature = "cookies")]
    pub fn cookie_jar(&self) -> Option<&Arc<crate::cookie::CookieJar>> {
        self.cookie_jar.as_ref()
    }
}

/// An in-progress request, built with a fluent API before [`RequestBuilder::send`] dispatches
/// it through the owning [`Client`]'s pipeline.
pub struct RequestBuilder<'a> {
    client: &'a Client,
    request: Request,
}

impl RequestBuilder<'_> {
    /// Sets a header, replacing any existing value under the same name.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        self.request.headers_mut().insert(name, value).map_err(|_| Error::protocol("invalid header name or value"))?;
        Ok(self)
    }

    /// Sets the request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.request.set_body(body.into());
        self
    }

    /// Overrides this request's timeout, bypassing the client's default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.request.set_timeout(timeout);
        self
    }

    /// The request built so far, for inspection before sending.
    pub fn build(self) -> Request {
        self.request
    }

    /// Dispatches the built request through the owning client's pipeline.
    pub async fn send(self) -> Response {
        self.client.send(self.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderMap;
    use async_trait::async_trait;

    struct EchoTransport;

    #[async_trait]
    impl Transport for EchoTransport {
        async fn send(&self, request: Request, _ctx: &mut crate::context::RequestContext) -> Response {
            Response::new(200, HeaderMap::new(), bytes::Bytes::new(), Duration::ZERO, request)
        }
    }

    #[tokio::test]
    async fn a_transport_override_bypasses_the_pool_entirely() {
        let client = Client::builder().transport(Arc::new(EchoTransport)).build().unwrap();
        let resp = client.get("http://example.test/").unwrap().send().await;
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn relative_urls_resolve_against_base_url() {
        let client = Client::builder()
            .base_url("http://example.test/api/")
            .unwrap()
            .transport(Arc::new(EchoTransport))
            .build()
            .unwrap();
        let resp = client.get("widgets/1").unwrap().send().await;
        assert_eq!(resp.request().uri().to_string(), "http://example.test/api/widgets/1");
    }

    #[tokio::test]
    async fn relative_url_without_base_errors() {
        let client = Client::builder().transport(Arc::new(EchoTransport)).build().unwrap();
        assert!(client.get("widgets/1").is_err());
    }

    #[tokio::test]
    async fn metrics_accumulate_across_requests() {
        let client = Client::builder().transport(Arc::new(EchoTransport)).build().unwrap();
        let _ = client.get("http://example.test/").unwrap().send().await;
        let _ = client.get("http://example.test/").unwrap().send().await;
        assert_eq!(client.metrics().total_requests, 2);
    }
}
