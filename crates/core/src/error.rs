//! Error types for Traffic Ops.

use thiserror::Error;

/// Result type alias using Traffic Ops' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// A non-2xx response received from Traffic Ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    /// Numeric status code.
    pub status_code: u16,
    /// Canonical status text, e.g. `Unauthorized`.
    pub status: String,
    /// Full URL that was requested.
    pub url: String,
    /// Raw response body, kept for diagnostics.
    pub body: String,
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{}] - Error requesting Traffic Ops {} {}",
            self.status, self.status_code, self.url, self.body
        )
    }
}

/// Core error type for Traffic Ops.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Dispatch Errors
    // =========================================================================
    #[error("{0} missing")]
    MissingKey(String),

    #[error("{ordinal}key is not an int64: {value}")]
    KeyNotInteger { ordinal: &'static str, value: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Route {method} {path} registered more than once")]
    DuplicateRoute { path: String, method: String },

    // =========================================================================
    // Auth Errors
    // =========================================================================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Login failed: {0}")]
    Authentication(String),

    // =========================================================================
    // Client Errors
    // =========================================================================
    #[error("{0}")]
    Http(HttpError),

    #[error("Traffic Ops Server returned 'Not Implemented', this client is probably newer than Traffic Ops, and you probably need to either upgrade Traffic Ops, or use a client whose version matches your Traffic Ops version.")]
    NotImplemented,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request cancelled")]
    Cancelled,

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a missing key error, e.g. `missing_key("int64 key")`.
    pub fn missing_key(what: impl Into<String>) -> Self {
        Self::MissingKey(what.into())
    }

    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code the server answers with when this error ends a request.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingKey(_)
            | Self::KeyNotInteger { .. }
            | Self::InvalidRequest(_)
            | Self::Validation(_)
            | Self::Serialization(_) => 400,
            Self::Unauthorized(_) | Self::Authentication(_) => 401,
            Self::NotFound(_) => 404,
            Self::Http(e) => e.status_code,
            Self::NotImplemented => 501,
            Self::Timeout(_) => 504,
            _ => 500,
        }
    }

    /// Whether the error was caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_errors_name_the_offending_value() {
        let err = Error::KeyNotInteger {
            ordinal: "second ",
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "second key is not an int64: abc");
        assert_eq!(Error::missing_key("int64 key").to_string(), "int64 key missing");
        assert!(err.is_client_error());
    }

    #[test]
    fn http_error_display_matches_wire_text() {
        let err = Error::Http(HttpError {
            status_code: 404,
            status: "Not Found".into(),
            url: "https://to.example/api/2.0/cdn/x".into(),
            body: "{}".into(),
        });
        assert_eq!(
            err.to_string(),
            "Not Found[404] - Error requesting Traffic Ops https://to.example/api/2.0/cdn/x {}"
        );
        assert_eq!(err.status_code(), 404);
    }
}
