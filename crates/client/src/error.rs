//! Client-side error wrapper.

use std::net::SocketAddr;
use thiserror::Error;

use traffic_ops_core::Error;

/// Result type for client calls.
pub type ClientResult<T> = std::result::Result<T, RequestError>;

/// A failed request, with the address of the server that was contacted
/// when one is known.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct RequestError {
    #[source]
    pub source: Error,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestError {
    pub fn new(source: Error, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            source,
            remote_addr,
        }
    }

    /// Status of the HTTP response behind this error, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match &self.source {
            Error::Http(e) => Some(e.status_code),
            Error::NotImplemented => Some(501),
            _ => None,
        }
    }

    pub fn into_inner(self) -> Error {
        self.source
    }
}

impl From<Error> for RequestError {
    fn from(source: Error) -> Self {
        Self::new(source, None)
    }
}
