//! Per-request mutable sidecar: stopwatch, timeline, state bag, and cancellation.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio_util::sync::CancellationToken;

use crate::Request;

/// One entry in a [`RequestContext`]'s timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Event name, e.g. `"dns_start"`, `"connect_end"`, `"retry_attempt"`.
    pub name: &'static str,
    /// Time elapsed since the context's stopwatch started.
    pub elapsed: Duration,
    /// Time elapsed since the previous timeline event (or since start, for the first event).
    pub delta: Duration,
    /// Optional free-form string data attached to the event.
    pub data: Option<HashMap<String, String>>,
}

/// Per-request mutable state threaded through the middleware pipeline and into the transport.
///
/// Owns a monotonic stopwatch started at construction, an ordered timeline, a string-keyed
/// state bag scoped to this one request, and the cancellation token that every suspension
/// point in the pool and engines honors.
#[derive(Debug, Clone)]
pub struct RequestContext {
    start: Instant,
    timeline: Vec<TimelineEvent>,
    state: HashMap<String, String>,
    cancel: CancellationToken,
    request: Arc<Request>,
}

impl RequestContext {
    /// Creates a new context for `request`, starting the stopwatch now.
    pub fn new(request: Request) -> Self {
        Self {
            start: Instant::now(),
            timeline: Vec::new(),
            state: HashMap::new(),
            cancel: CancellationToken::new(),
            request: Arc::new(request),
        }
    }

    /// Creates a context that is a child of `parent`'s cancellation token: cancelling the
    /// parent also cancels this context, but not vice versa. Used when a middleware (e.g.
    /// `Timeout`) needs to fire its own cancellation without affecting sibling attempts.
    pub fn child_cancel(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Duration elapsed since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Records a timeline event with no attached data.
    pub fn record(&mut self, name: &'static str) {
        self.record_with(name, None);
    }

    /// Records a timeline event with attached string data.
    pub fn record_with(&mut self, name: &'static str, data: Option<HashMap<String, String>>) {
        let elapsed = self.elapsed();
        let delta = match self.timeline.last() {
            Some(prev) => elapsed.saturating_sub(prev.elapsed),
            None => elapsed,
        };
        self.timeline.push(TimelineEvent {
            name,
            elapsed,
            delta,
            data,
        });
    }

    /// The full timeline recorded so far, in order.
    pub fn timeline(&self) -> &[TimelineEvent] {
        &self.timeline
    }

    /// Reads a value from the state bag.
    pub fn get_state(&self, key: &str) -> Option<&str> {
        self.state.get(key).map(String::as_str)
    }

    /// Writes a value into the state bag, returning the previous value if any.
    pub fn set_state(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.state.insert(key.into(), value.into())
    }

    /// The cancellation token flowing through this request's attempt.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The current request. Middleware that rewrites headers replaces this with
    /// [`RequestContext::set_request`] rather than mutating the original in place.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Replaces the current request, e.g. after `DefaultHeaders` merges in configured headers.
    pub fn set_request(&mut self, request: Request) {
        self.request = Arc::new(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Request;
    use http::Method;

    fn dummy_request() -> Request {
        Request::new(Method::GET, "http://example.test/".parse().unwrap())
    }

    #[test]
    fn timeline_deltas_accumulate() {
        let mut ctx = RequestContext::new(dummy_request());
        ctx.record("a");
        std::thread::sleep(Duration::from_millis(5));
        ctx.record("b");
        let timeline = ctx.timeline();
        assert_eq!(timeline.len(), 2);
        assert!(timeline[1].delta >= Duration::from_millis(1));
    }

    #[test]
    fn state_bag_round_trips() {
        let mut ctx = RequestContext::new(dummy_request());
        assert_eq!(ctx.set_state("RetryAttempt", "1"), None);
        assert_eq!(ctx.get_state("RetryAttempt"), Some("1"));
        assert_eq!(ctx.set_state("RetryAttempt", "2"), Some("1".to_string()));
    }

    #[test]
    fn child_cancel_is_independent_of_parent_cancelling_back() {
        let ctx = RequestContext::new(dummy_request());
        let child = ctx.child_cancel();
        child.cancel();
        assert!(!ctx.cancellation_token().is_cancelled());
    }

    #[test]
    fn parent_cancel_propagates_to_child() {
        let ctx = RequestContext::new(dummy_request());
        let child = ctx.child_cancel();
        ctx.cancellation_token().cancel();
        assert!(child.is_cancelled());
    }
}
