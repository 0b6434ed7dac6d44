//! HTTP codec for request decoding and response encoding.
//!
//! - [`RequestDecoder`]: decodes a request head with [`HeaderDecoder`] and then buffers the
//!   `Content-Length` framed body, yielding one `Request<Bytes>` per message
//! - [`ResponseEncoder`]: writes the status line, headers and the buffered body of a
//!   `Response<Bytes>`
//!
//! Both sides plug into `tokio_util::codec::{FramedRead, FramedWrite}`.

mod header_decoder;
mod request_decoder;
mod response_encoder;

pub use header_decoder::HeaderDecoder;
pub use request_decoder::RequestDecoder;
pub use request_decoder::DEFAULT_MAX_BODY_SIZE;
pub use response_encoder::ResponseEncoder;
