//! HTTP/1.1 transport engine: request serialization, response parsing, chunked decoding, and
//! keep-alive accounting over a single connection.
//!
//! Request-line/header serialization and the chunked-vs-content-length decision follow RFC
//! 7230 §3.3; response parsing uses `httparse`.

mod body;
mod connection;

pub use connection::{H1Connection, H1Transport};

pub(crate) use body::read_body;
