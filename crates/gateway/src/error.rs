use std::error::Error;
use thiserror::Error;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// Code reported when a request envelope can't be decoded
pub const CODE_BAD_REQUEST: i32 = 400;
/// Code reported when no action matches the request header
pub const CODE_NOT_FOUND: i32 = 404;
/// Code reported for server side failures without a more specific code
pub const CODE_SERVER_ERROR: i32 = 500;

pub const MSG_NOT_FOUND: &str = "Not found action";
pub const MSG_SERVER_ERROR: &str = "Server Error";

/// An error carrying the code reported to the caller.
///
/// `Context::server_error` recognizes it and reports its own code instead of 500.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

impl ApiError {
    pub fn new<S: ToString>(code: i32, message: S) -> Self {
        Self { code, message: message.to_string() }
    }
}
