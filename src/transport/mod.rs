mod http;
pub mod oauth;

pub use http::{HttpTransport, DEFAULT_USER_AGENT};

use serde_json::Value;

use crate::error::Result;
use crate::request::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Signed form POST. Used for every mutating call.
    Post,
    /// Signed GET. Used for token queries.
    AuthenticatedGet,
    AnonymousGet,
}

impl Mode {
    pub fn is_signed(self) -> bool {
        !matches!(self, Mode::AnonymousGet)
    }
}

/// Sends one API request and returns the decoded JSON body.
///
/// Implementations must report a non-success HTTP status as an error
/// instead of trying to decode the body.
pub trait Transport {
    fn send(&self, url: &str, params: &Params, mode: Mode) -> Result<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, url: &str, params: &Params, mode: Mode) -> Result<Value> {
        (**self).send(url, params, mode)
    }
}
