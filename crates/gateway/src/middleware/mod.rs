//! Middleware shipped with the gateway.
//!
//! Middleware is an ordinary [`RequestHandler`](crate::RequestHandler) that calls
//! [`Context::next`](crate::Context::next) to run the rest of the chain around its own work.

mod access_log;
mod recovery;

pub use access_log::access_log;
pub use recovery::recovery;
