//! An RFC 6265 cookie jar, bounded the way a long-lived client needs it to be, and the
//! middleware that wires it into the pipeline.
//!
//! Cookie parsing and attribute handling are delegated to the `cookie` crate; what's custom
//! here is the storage policy: a fixed total capacity and a fixed per-domain capacity, evicted
//! oldest-first, matching a long-running process that must not let a chatty origin's
//! `Set-Cookie` traffic grow the jar without bound. `cookie_store` has no such caps, so it
//! isn't used here — see `DESIGN.md`.

use std::time::SystemTime;

use async_trait::async_trait;
use http::{Uri, header::SET_COOKIE};

use crate::{Response, context::RequestContext, header::HeaderMap, middleware::{Middleware, Next}, sync::Mutex};

/// Maximum number of cookies the jar holds across all domains combined.
pub const MAX_TOTAL_COOKIES: usize = 3000;
/// Maximum number of cookies the jar holds for a single domain.
pub const MAX_COOKIES_PER_DOMAIN: usize = 50;

struct StoredCookie {
    name: String,
    value: String,
    path: String,
    secure: bool,
    expires: Option<SystemTime>,
    inserted_at: SystemTime,
}

impl StoredCookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires, Some(expires) if expires <= now)
    }

    fn matches_path(&self, request_path: &str) -> bool {
        request_path.starts_with(&self.path)
    }
}

/// A capacity-bounded cookie store, keyed by the request's host.
///
/// Expired cookies are purged lazily (skipped on lookup, dropped the next time that domain is
/// written to) and eagerly once a domain or the jar as a whole crosses its cap: the oldest
/// cookie (by insertion time, regardless of expiry) is evicted to make room.
pub struct CookieJar {
    domains: Mutex<crate::hash::HashMap<String, Vec<StoredCookie>>>,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl CookieJar {
    /// Creates an empty jar.
    pub fn new() -> Self {
        Self {
            domains: Mutex::new(crate::hash::HashMap::default()),
        }
    }

    /// Records every `Set-Cookie` header in `headers` as issued by `uri`'s host.
    pub fn store(&self, uri: &Uri, headers: &HeaderMap) {
        let Some(host) = uri.host() else { return };
        let now = SystemTime::now();
        let mut domains = self.domains.lock();
        let bucket = domains.entry(host.to_ascii_lowercase()).or_default();
        bucket.retain(|c| !c.is_expired(now));

        for raw in headers.get_all(SET_COOKIE.as_str()) {
            let Ok(parsed) = cookie_crate::Cookie::parse(raw.to_string()) else { continue };
            let expires = match parsed.expires() {
                Some(cookie_crate::Expiration::DateTime(offset)) => Some(SystemTime::from(offset)),
                Some(cookie_crate::Expiration::Session) | None => None,
            };
            let name = parsed.name().to_string();
            let stored = StoredCookie {
                name: name.clone(),
                value: parsed.value().to_string(),
                path: parsed.path().unwrap_or("/").to_string(),
                secure: parsed.secure().unwrap_or(false),
                expires,
                inserted_at: now,
            };
            bucket.retain(|c| c.name != name);
            bucket.push(stored);
        }

        while bucket.len() > MAX_COOKIES_PER_DOMAIN {
            evict_oldest(bucket);
        }
        drop(bucket);

        let total: usize = domains.values().map(Vec::len).sum();
        if total > MAX_TOTAL_COOKIES {
            evict_oldest_globally(&mut domains, total - MAX_TOTAL_COOKIES);
        }
    }

    /// Builds the `Cookie` header value to send for a request to `uri`, or `None` if there's
    /// nothing stored for its host (or every stored cookie has expired / doesn't match).
    pub fn header_for(&self, uri: &Uri) -> Option<String> {
        let host = uri.host()?.to_ascii_lowercase();
        let path = uri.path();
        let secure = uri.scheme_str() == Some("https");
        let now = SystemTime::now();

        let domains = self.domains.lock();
        let bucket = domains.get(&host)?;
        let mut parts = Vec::new();
        for cookie in bucket {
            if cookie.is_expired(now) || (cookie.secure && !secure) || !cookie.matches_path(path) {
                continue;
            }
            parts.push(format!("{}={}", cookie.name, cookie.value));
        }
        if parts.is_empty() {
            return None;
        }
        Some(parts.join("; "))
    }
}

fn evict_oldest(bucket: &mut Vec<StoredCookie>) {
    if let Some((index, _)) = bucket
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| c.inserted_at)
    {
        bucket.remove(index);
    }
}

fn evict_oldest_globally(domains: &mut crate::hash::HashMap<String, Vec<StoredCookie>>, mut to_evict: usize) {
    while to_evict > 0 {
        let oldest = domains
            .iter()
            .flat_map(|(host, bucket)| bucket.iter().enumerate().map(move |(i, c)| (host.clone(), i, c.inserted_at)))
            .min_by_key(|(_, _, inserted_at)| *inserted_at);
        let Some((host, index, _)) = oldest else { break };
        if let Some(bucket) = domains.get_mut(&host) {
            bucket.remove(index);
        }
        to_evict -= 1;
    }
}

/// Injects a `Cookie` header from the jar before each request, and records any `Set-Cookie`
/// headers the response carries back into it.
pub struct CookieMiddleware {
    jar: std::sync::Arc<CookieJar>,
}

impl CookieMiddleware {
    /// Creates a middleware backed by `jar`, shared with whatever else needs direct access
    /// to it (e.g. for pre-seeding or inspection).
    pub fn new(jar: std::sync::Arc<CookieJar>) -> Self {
        Self { jar }
    }
}

#[async_trait]
impl Middleware for CookieMiddleware {
    async fn handle(&self, ctx: &mut RequestContext, next: Next<'_>) -> Response {
        if !ctx.request().headers().contains("cookie") {
            if let Some(cookie_header) = self.jar.header_for(ctx.request().uri()) {
                let mut request = ctx.request().clone();
                let _ = request.headers_mut().insert("Cookie", &cookie_header);
                ctx.set_request(request);
            }
        }

        let response = next.run(ctx).await;
        self.jar.store(response.request().uri(), response.headers());
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, middleware::{Pipeline, Transport}};
    use http::Method;
    use std::sync::Arc;

    struct SetCookieTransport;

    #[async_trait]
    impl Transport for SetCookieTransport {
        async fn send(&self, request: Request, _ctx: &mut RequestContext) -> Response {
            let mut headers = HeaderMap::new();
            headers.append("Set-Cookie", "session=abc123; Path=/").unwrap();
            Response::new(200, headers, bytes::Bytes::new(), std::time::Duration::ZERO, request)
        }
    }

    fn req() -> Request {
        Request::new(Method::GET, "https://example.test/a".parse().unwrap())
    }

    #[tokio::test]
    async fn stores_set_cookie_and_replays_it_on_next_request() {
        let jar = Arc::new(CookieJar::new());
        let transport: Arc<dyn Transport> = Arc::new(SetCookieTransport);
        let pipeline = Pipeline::new(vec![Arc::new(CookieMiddleware::new(jar.clone()))], transport);

        let _ = pipeline.dispatch(req()).await;
        assert_eq!(jar.header_for(&"https://example.test/a".parse::<Uri>().unwrap()), Some("session=abc123".to_string()));
    }

    #[test]
    fn secure_cookies_are_withheld_from_plain_http() {
        let jar = CookieJar::new();
        let mut headers = HeaderMap::new();
        headers.append("Set-Cookie", "id=1; Secure; Path=/").unwrap();
        jar.store(&"https://example.test/".parse().unwrap(), &headers);
        assert_eq!(jar.header_for(&"http://example.test/".parse().unwrap()), None);
        assert!(jar.header_for(&"https://example.test/".parse().unwrap()).is_some());
    }

    #[test]
    fn per_domain_cap_evicts_oldest() {
        let jar = CookieJar::new();
        for i in 0..(MAX_COOKIES_PER_DOMAIN + 5) {
            let mut headers = HeaderMap::new();
            headers.append("Set-Cookie", &format!("c{i}=v; Path=/")).unwrap();
            jar.store(&"https://example.test/".parse().unwrap(), &headers);
        }
        let domains = jar.domains.lock();
        assert_eq!(domains.get("example.test").unwrap().len(), MAX_COOKIES_PER_DOMAIN);
    }

    #[test]
    fn same_name_cookie_replaces_rather_than_duplicates() {
        let jar = CookieJar::new();
        let mut first = HeaderMap::new();
        first.append("Set-Cookie", "id=1; Path=/").unwrap();
        jar.store(&"https://example.test/".parse().unwrap(), &first);
        let mut second = HeaderMap::new();
        second.append("Set-Cookie", "id=2; Path=/").unwrap();
        jar.store(&"https://example.test/".parse().unwrap(), &second);
        assert_eq!(jar.header_for(&"https://example.test/".parse().unwrap()), Some("id=2".to_string()));
    }
}
