//! HTTP connection handling
//!
//! [`HttpConnection`] reads requests off a stream, calls the handler for each of them in order
//! and writes the responses back. The connection is kept alive until the peer closes it, asks
//! for `Connection: close` (or speaks HTTP/1.0 without keep-alive), or sends a malformed request.

mod http_connection;

pub use http_connection::HttpConnection;
