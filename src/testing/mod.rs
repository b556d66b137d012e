//! Record/replay transport for deterministic tests against this crate's pipeline.
//!
//! Wrap a real [`crate::middleware::Transport`] in [`CassetteTransport::record`] to capture a
//! cassette while exercising a suite against a live (or test-double) server, persist it with
//! [`CassetteTransport::save`], then swap to [`CassetteTransport::replay`] so the same suite
//! runs deterministically and offline. The on-disk cassette schema is defined from scratch for
//! this crate.

use std::{
    collections::HashSet,
    io,
    path::Path,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    Error, Request, Response,
    context::RequestContext,
    header::HeaderMap,
    middleware::Transport,
    sync::Mutex,
};

const LARGE_BODY_THRESHOLD: usize = 1024 * 1024;
const EDGE_SAMPLE: usize = 64 * 1024;
const CASSETTE_VERSION: u32 = 1;

/// Request headers never considered part of a cassette entry's match key (or diffed under a
/// lenient [`MismatchPolicy`]) unless the caller opts them back in via
/// [`CassetteTransport::include_header`].
const VOLATILE_HEADERS: &[&str] = &[
    "date",
    "age",
    "x-request-id",
    "x-trace-id",
    "traceparent",
    "tracestate",
    "authorization",
    "cookie",
];

/// How strictly a replayed request must match its recorded counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Method, normalized URL, non-volatile headers, and body hash must all match exactly; no
    /// match means a synthetic [`crate::error::ErrorKind::ProtocolError`] response.
    #[default]
    Strict,
    /// Only method, normalized URL, and body hash must match; header differences are logged via
    /// `tracing` but do not prevent a replay.
    Warn,
    /// Only method and normalized URL must match.
    Relaxed,
}

/// One recorded request/response exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CassetteEntry {
    /// The request method, as its canonical string (`"GET"`, `"POST"`, ...).
    pub method: String,
    /// The request's normalized URL (lowercased scheme/host, default port stripped, query
    /// parameters sorted).
    pub normalized_url: String,
    /// Non-volatile request headers, in insertion order, duplicates preserved.
    pub request_headers: Vec<(String, String)>,
    /// SHA-256 hash of the request body — see [`hash_body`] for the >1 MiB sampling rule.
    pub request_body_hash: Option<String>,
    /// The recorded response status.
    pub status: u16,
    /// Response headers, in insertion order, duplicates preserved.
    pub response_headers: Vec<(String, String)>,
    /// The recorded response body, verbatim.
    pub response_body: Vec<u8>,
    /// Seconds since the Unix epoch at which this exchange was recorded.
    pub timestamp: u64,
}

/// A versioned collection of recorded exchanges — the unit this module reads and writes to
/// disk as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cassette {
    /// Schema version, bumped if the entry shape ever changes incompatibly.
    pub version: u32,
    /// The recorded exchanges, in recording order.
    pub entries: Vec<CassetteEntry>,
}

impl Cassette {
    /// An empty cassette at the current schema version.
    pub fn new() -> Self {
        Self {
            version: CASSETTE_VERSION,
            entries: Vec::new(),
        }
    }

    /// Reads a cassette from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(file).map_err(io::Error::other)
    }

    /// Writes this cassette to a JSON file, pretty-printed for reviewable diffs.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }
}

enum Mode {
    Record { inner: Arc<dyn Transport> },
    Replay,
}

struct State {
    cassette: Cassette,
    next_index: crate::hash::HashMap<String, usize>,
}

/// A [`Transport`] that either delegates to a real transport while recording every exchange,
/// or answers purely from a previously recorded [`Cassette`].
pub struct CassetteTransport {
    mode: Mode,
    policy: MismatchPolicy,
    include_headers: HashSet<String>,
    state: Mutex<State>,
}

impl CassetteTransport {
    /// Records every exchange passed through `inner`, accumulating them in memory for a
    /// later [`Cassette::save`] via [`CassetteTransport::cassette`].
    pub fn record(inner: Arc<dyn Transport>) -> Self {
        Self {
            mode: Mode::Record { inner },
            policy: MismatchPolicy::default(),
            include_headers: HashSet::new(),
            state: Mutex::new(State {
                cassette: Cassette::new(),
                next_index: crate::hash::HashMap::default(),
            }),
        }
    }

    /// Answers every request purely from `cassette`, matching requests in recorded order
    /// (a cassette may record the same request shape more than once — e.g. a retried call —
    /// and replay returns them in the order they were recorded).
    pub fn replay(cassette: Cassette) -> Self {
        Self {
            mode: Mode::Replay,
            policy: MismatchPolicy::default(),
            include_headers: HashSet::new(),
            state: Mutex::new(State {
                cassette,
                next_index: crate::hash::HashMap::default(),
            }),
        }
    }

    /// Overrides the default [`MismatchPolicy::Strict`] match policy.
    pub fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Opts a header back into the match key / diff despite it appearing in
    /// [`VOLATILE_HEADERS`].
    pub fn include_header(mut self, name: impl Into<String>) -> Self {
        self.include_headers.insert(name.into().to_ascii_lowercase());
        self
    }

    /// A snapshot of the cassette accumulated (in record mode) or loaded (in replay mode) so
    /// far, for persisting with [`Cassette::save`].
    pub fn cassette(&self) -> Cassette {
        self.state.lock().cassette.clone()
    }

    fn is_volatile(&self, name: &str) -> bool {
        VOLATILE_HEADERS.contains(&name) && !self.include_headers.contains(name)
    }

    fn match_fields(&self, request: &Request) -> (String, String, Vec<(String, String)>, Option<String>) {
        let method = request.method().as_str().to_string();
        let url = normalize_url(request.uri());
        let headers = match self.policy {
            MismatchPolicy::Relaxed => Vec::new(),
            _ => non_volatile_headers(request.headers(), |name| self.is_volatile(name)),
        };
        let body_hash = match self.policy {
            MismatchPolicy::Relaxed => None,
            _ => request.body().map(|body| hash_body(body)),
        };
        (method, url, headers, body_hash)
    }

    fn match_key(&self, request: &Request) -> String {
        let (method, url, headers, body_hash) = self.match_fields(request);
        format!("{method} {url} {headers:?} {body_hash:?}")
    }
}

#[async_trait]
impl Transport for CassetteTransport {
    async fn send(&self, request: Request, ctx: &mut RequestContext) -> Response {
        match &self.mode {
            Mode::Record { inner } => {
                let response = inner.send(request.clone(), ctx).await;
                let entry = record_entry(&request, &response, |name| self.is_volatile(name));
                self.state.lock().cassette.entries.push(entry);
                response
            }
            Mode::Replay => self.replay_one(request),
        }
    }
}

impl CassetteTransport {
    fn replay_one(&self, request: Request) -> Response {
        let key = self.match_key(&request);
        let mut state = self.state.lock();
        let offset = *state.next_index.get(&key).unwrap_or(&0);
        let found = state
            .cassette
            .entries
            .iter()
            .filter(|entry| entry_matches(entry, &self.policy, &request, |name| self.is_volatile(name)))
            .nth(offset)
            .cloned();

        match found {
            Some(entry) => {
                state.next_index.insert(key, offset + 1);
                drop(state);
                if self.policy == MismatchPolicy::Warn {
                    warn_on_header_mismatch(&entry, &request, |name| self.is_volatile(name));
                }
                let mut headers = HeaderMap::new();
                for (name, value) in &entry.response_headers {
                    let _ = headers.append(name.as_str(), value);
                }
                Response::new(entry.status, headers, Bytes::from(entry.response_body), Duration::ZERO, request)
            }
            None => {
                drop(state);
                Response::from_error(
                    0,
                    request,
                    Duration::ZERO,
                    Error::protocol(format!("no cassette entry matches request (key: {key})")),
                )
            }
        }
    }
}

fn entry_matches(entry: &CassetteEntry, policy: &MismatchPolicy, request: &Request, is_volatile: impl Fn(&str) -> bool) -> bool {
    if entry.method != request.method().as_str() || entry.normalized_url != normalize_url(request.uri()) {
        return false;
    }
    if *policy == MismatchPolicy::Relaxed {
        return true;
    }
    let body_hash = request.body().map(|body| hash_body(body));
    if entry.request_body_hash != body_hash {
        return false;
    }
    if *policy == MismatchPolicy::Warn {
        return true;
    }
    entry.request_headers == non_volatile_headers(request.headers(), is_volatile)
}

fn warn_on_header_mismatch(entry: &CassetteEntry, request: &Request, is_volatile: impl Fn(&str) -> bool) {
    let actual = non_volatile_headers(request.headers(), is_volatile);
    if entry.request_headers != actual {
        tracing::warn!(
            expected = ?entry.request_headers,
            actual = ?actual,
            "replayed request's headers differ from the recorded cassette entry"
        );
    }
}

fn record_entry(request: &Request, response: &Response, is_volatile: impl Fn(&str) -> bool) -> CassetteEntry {
    CassetteEntry {
        method: request.method().as_str().to_string(),
        normalized_url: normalize_url(request.uri()),
        request_headers: non_volatile_headers(request.headers(), is_volatile),
        request_body_hash: request.body().map(|body| hash_body(body)),
        status: response.status(),
        response_headers: response.headers().iter().map(|(n, v)| (n.as_str().to_string(), v.to_string())).collect(),
        response_body: response.body().to_vec(),
        timestamp: SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
    }
}

fn non_volatile_headers(headers: &HeaderMap, is_volatile: impl Fn(&str) -> bool) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !is_volatile(name.as_str()))
        .map(|(name, value)| (name.as_str().to_string(), value.to_string()))
        .collect()
}

/// SHA-256 of `body`, or — for bodies over 1 MiB — of `first_64KiB ++ last_64KiB ++
/// total_length_be_bytes`, so a large body's hash can be computed without buffering the whole
/// thing twice in a caller that streams it.
pub fn hash_body(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    if body.len() <= LARGE_BODY_THRESHOLD {
        hasher.update(body);
    } else {
        hasher.update(&body[..EDGE_SAMPLE]);
        hasher.update(&body[body.len() - EDGE_SAMPLE..]);
        hasher.update((body.len() as u64).to_be_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Lowercases scheme and host, strips a port matching the scheme default, and sorts query
/// parameters so semantically identical requests compare equal regardless of incidental
/// ordering or casing differences between a test run and its recording.
pub fn normalize_url(uri: &Uri) -> String {
    let scheme = uri.scheme_str().unwrap_or("http").to_ascii_lowercase();
    let host = uri.host().unwrap_or("").to_ascii_lowercase();
    let default_port = if scheme == "https" { 443 } else { 80 };
    let port = uri.port_u16().filter(|p| *p != default_port);
    let mut query_pairs: Vec<&str> = uri.query().map(|q| q.split('&').collect()).unwrap_or_default();
    query_pairs.sort_unstable();

    let mut normalized = format!("{scheme}://{host}");
    if let Some(port) = port {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(uri.path());
    if !query_pairs.is_empty() {
        normalized.push('?');
        normalized.push_str(&query_pairs.join("&"));
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn req(uri: &str) -> Request {
        Request::new(Method::GET, uri.parse().unwrap())
    }

    #[test]
    fn normalize_lowercases_scheme_host_and_sorts_query() {
        assert_eq!(
            normalize_url(&"HTTPS://Example.TEST:443/a?b=2&a=1".parse().unwrap()),
            "https://example.test/a?a=1&b=2"
        );
    }

    #[test]
    fn non_default_port_is_preserved() {
        assert_eq!(normalize_url(&"https://example.test:8443/a".parse().unwrap()), "https://example.test:8443/a");
    }

    #[test]
    fn small_and_large_body_hashes_differ_in_strategy() {
        let small = vec![7u8; 10];
        let large = vec![7u8; LARGE_BODY_THRESHOLD + 1];
        assert_ne!(hash_body(&small), hash_body(&large));
        // identical edges and length hash identically regardless of the (differing) middle
        let mut large2 = large.clone();
        large2[LARGE_BODY_THRESHOLD / 2] = 9;
        assert_eq!(hash_body(&large), hash_body(&large2));
    }

    #[tokio::test]
    async fn replay_returns_the_recorded_response_for_a_matching_request() {
        let mut entry_headers = Vec::new();
        entry_headers.push(("content-type".to_string(), "text/plain".to_string()));
        let cassette = Cassette {
            version: CASSETTE_VERSION,
            entries: vec![CassetteEntry {
                method: "GET".to_string(),
                normalized_url: "http://example.test/a".to_string(),
                request_headers: Vec::new(),
                request_body_hash: None,
                status: 200,
                response_headers: entry_headers,
                response_body: b"hello".to_vec(),
                timestamp: 0,
            }],
        };
        let transport = CassetteTransport::replay(cassette);
        let mut ctx = RequestContext::new(req("http://example.test/a"));
        let response = transport.send(req("http://example.test/a"), &mut ctx).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn replay_fails_closed_when_no_entry_matches() {
        let transport = CassetteTransport::replay(Cassette::new());
        let mut ctx = RequestContext::new(req("http://example.test/missing"));
        let response = transport.send(req("http://example.test/missing"), &mut ctx).await;
        assert!(response.error().is_some());
    }
}
