//! HTTP request head decoder.
//!
//! Parses the request line and the header fields with `httparse`, converts them into an
//! `http::Request<()>` and works out how many body bytes follow.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1
//! - Bodies are framed by `Content-Length` only; any `Transfer-Encoding` is rejected

use bytes::{Buf, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::ParseError;

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request heads.
///
/// Yields the parsed head together with the body length announced by `Content-Length`
/// (zero when absent). The head bytes are consumed from the buffer, the body bytes are not.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (Request<()>, usize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // a valid request line alone is longer than this
        if src.len() < 14 {
            return Ok(None);
        }

        let (header, body_offset) = {
            let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
            let mut req = httparse::Request::new(&mut headers);

            let parsed_result = req.parse(src).map_err(|e| match e {
                Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
                e => ParseError::invalid_header(e.to_string()),
            });

            let body_offset = match parsed_result? {
                Status::Complete(body_offset) => body_offset,
                Status::Partial => {
                    ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                    return Ok(None);
                }
            };

            trace!(header_size = body_offset, "parsed request header");
            ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

            let version = match req.version {
                Some(0) => Version::HTTP_10,
                Some(1) => Version::HTTP_11,
                // HTTP/2 and HTTP/3 are not served by this transport
                v => return Err(ParseError::InvalidVersion(v)),
            };

            let method = req.method.ok_or(ParseError::InvalidMethod)?;
            let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;
            let uri = req.path.ok_or(ParseError::InvalidUri)?.parse::<Uri>().map_err(|_e| ParseError::InvalidUri)?;

            let mut header = Request::new(());
            *header.method_mut() = method;
            *header.uri_mut() = uri;
            *header.version_mut() = version;

            let header_map = header.headers_mut();
            header_map.reserve(req.headers.len());
            for field in req.headers.iter() {
                let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(ParseError::invalid_header)?;
                let value = HeaderValue::from_bytes(field.value).map_err(ParseError::invalid_header)?;
                header_map.append(name, value);
            }

            (header, body_offset)
        };

        let content_length = parse_content_length(header.headers())?;
        src.advance(body_offset);

        Ok(Some((header, content_length)))
    }
}

/// Reads the body length of a request.
///
/// A request without `Content-Length` has no body. Conflicting lengths and any transfer coding
/// are rejected, since the body must be buffered as a whole.
fn parse_content_length(headers: &HeaderMap) -> Result<usize, ParseError> {
    if let Some(encoding) = headers.get(TRANSFER_ENCODING) {
        return Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(encoding.as_bytes())));
    }

    let mut length = None;
    for value in headers.get_all(CONTENT_LENGTH) {
        let parsed = value
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or_else(|| ParseError::invalid_content_length(String::from_utf8_lossy(value.as_bytes())))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length("conflicting content-length headers"));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.unwrap_or(0))
}
