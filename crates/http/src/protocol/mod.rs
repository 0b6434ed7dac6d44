//! Protocol level types shared by the codec and the connection.
//!
//! - [`HttpError`]: top-level error of a connection
//! - [`ParseError`]: errors raised while decoding a request
//! - [`SendError`]: errors raised while encoding or writing a response
//! - [`PeerAddr`]: the remote socket address, attached to every request's extensions

use std::fmt;
use std::net::SocketAddr;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

/// The network peer of the connection a request arrived on.
///
/// The connection inserts it into `Request::extensions` before calling the handler, so
/// handlers can fall back to it when no forwarding header names the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
