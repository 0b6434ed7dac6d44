//! HTTP request decoder
//!
//! Works in two phases: the head is decoded by [`HeaderDecoder`], then the decoder waits until
//! the whole `Content-Length` body is buffered and yields a complete `Request<Bytes>`.
//!
//! # Example
//!
//! ```
//! use micro_gateway_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
//! let request = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(request.body().as_ref(), b"hi");
//! ```

use crate::codec::HeaderDecoder;
use crate::ensure;
use crate::protocol::ParseError;
use bytes::{Bytes, BytesMut};
use http::Request;
use tokio_util::codec::Decoder;

/// Default limit for a buffered request body: 4 MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// A decoder for complete HTTP requests
///
/// # State Machine
///
/// - `pending` is `None`: currently parsing the head
/// - `pending` is `Some((head, length))`: waiting for `length` body bytes
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    pending: Option<(Request<()>, usize)>,
    max_body_size: usize,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` with [`DEFAULT_MAX_BODY_SIZE`]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_body_size(max_body_size: usize) -> Self {
        Self { max_body_size, ..Self::default() }
    }

    pub fn set_max_body_size(&mut self, max_body_size: usize) {
        self.max_body_size = max_body_size;
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, pending: None, max_body_size: DEFAULT_MAX_BODY_SIZE }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<Bytes>;
    type Error = ParseError;

    /// Attempts to decode a complete request from the buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(request))`: head and body are both available
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the head is malformed or the body exceeds the limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            match self.header_decoder.decode(src)? {
                Some((header, length)) => {
                    ensure!(length <= self.max_body_size, ParseError::too_large_body(length, self.max_body_size));
                    self.pending = Some((header, length));
                }
                None => return Ok(None),
            }
        }

        let length = match &self.pending {
            Some((_, length)) => *length,
            None => return Ok(None),
        };

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let body = src.split_to(length).freeze();
        Ok(self.pending.take().map(|(header, _)| header.map(|()| body)))
    }
}
