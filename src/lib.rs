#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(test, deny(warnings))]

//! `wreq-core`: the transport core underneath an HTTP client — connection pooling, an H/1.1
//! and H/2 engine selected by ALPN, TLS, a middleware pipeline, and request/response recording
//! for tests.
//!
//! This crate does not itself expose a fluent `Client::get("...")` builder API; see
//! [`client::Client`] for the thin public surface that assembles the pieces below into one.
//!
//! ## Layout
//!
//! - [`Request`] / [`Response`] — immutable request descriptors and response values.
//! - [`context`] — the per-attempt mutable sidecar (stopwatch, timeline, cancellation).
//! - [`middleware`] — the `Transport`/`Middleware` traits and the pipeline built from them.
//! - [`pool`] — a keyed, idle-timeout-evicting connection pool.
//! - [`transport`] — the H/1.1 and H/2 engines, and the ALPN-based selector between them.
//! - [`tls`] — the TLS wrapper trait and its rustls/native-tls backends.
//! - [`dns`] — pluggable DNS resolution with Happy Eyeballs address ordering.
//! - [`cookie`] — an RFC 6265 cookie jar and its middleware.
//! - [`testing`] — a record/replay `Transport` for deterministic tests against this crate.

pub mod client;
pub mod context;
#[cfg(feature = "cookies")]
pub mod cookie;
pub mod dns;
pub mod error;
mod hash;
pub mod header;
pub mod middleware;
pub mod pool;
mod request;
mod response;
mod sync;
#[cfg(feature = "testing")]
pub mod testing;
pub mod tls;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use header::HeaderMap;
pub use request::Request;
pub use response::Response;

fn _assert_impls() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<Client>();
    assert_sync::<Client>();
    assert_send::<Request>();
    assert_send::<Response>();
    assert_send::<Error>();
    assert_sync::<Error>();
}
