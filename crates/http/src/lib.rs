//! A small asynchronous HTTP/1.1 transport for the gateway
//!
//! This crate turns a byte stream into fully buffered `http::Request<Bytes>` values, hands them
//! to a [`handler::Handler`] and writes the returned `http::Response<Bytes>` back. It is the
//! transport collaborator of `micro-gateway`: the gateway only needs a readable request body
//! and a writable response sink, so request bodies are framed by `Content-Length` and kept in
//! memory up to a configurable limit.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, warn};
//! use micro_gateway_http::connection::HttpConnection;
//! use micro_gateway_http::handler::make_handler;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let handler = Arc::new(make_handler(echo));
//!
//!     loop {
//!         let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer).peer_addr(remote_addr);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!("service has error, cause {}, connection shutdown", e);
//!             }
//!         });
//!     }
//! }
//!
//! async fn echo(request: Request<Bytes>) -> Result<Response<Bytes>, Infallible> {
//!     Ok(Response::new(request.into_body()))
//! }
//! ```
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Request bodies must carry `Content-Length`; chunked uploads are rejected
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
