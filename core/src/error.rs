//! Error types for the Posterous API client.
//!
//! # Design
//! Every invocation either returns a parsed payload or fails with exactly one
//! `ApiError`. Argument problems are detected before any request leaves the
//! client. Transport and parse failures keep their original cause as a
//! `source` so callers can inspect the status code or the parser message.

use thiserror::Error;

/// Errors returned by bound operations and the typed client methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The endpoint needs credentials (or a token) that the client lacks.
    #[error("authentication is required for `{endpoint}`")]
    Authentication { endpoint: &'static str },

    /// A parameter was supplied more than once, either positionally and by
    /// keyword, or as two keyword arguments.
    #[error("multiple values supplied for parameter `{name}`")]
    DuplicateParameter { name: String },

    /// A keyword that matches no schema entry, or a positional argument past
    /// the end of the schema.
    #[error("unknown parameter `{name}`")]
    UnknownParameter { name: String },

    /// A value outside the parameter's allowed type set.
    #[error("invalid value {value} for parameter `{name}`, expected one of: {allowed}")]
    InvalidParameterType {
        name: String,
        value: String,
        allowed: String,
    },

    /// A `{placeholder}` in the path template had no bound value.
    #[error("`{endpoint}` needs a value for path parameter `{name}`")]
    MissingPathParameter { endpoint: &'static str, name: String },

    /// The transport failed or the service answered with a non-2xx status.
    #[error("request failed: {0}")]
    RequestFailed(#[from] TransportError),

    /// The response body did not parse into the declared shape.
    #[error("could not parse response: {0}")]
    ResponseParse(#[from] ParseError),
}

impl ApiError {
    /// HTTP status of the response when the failure was a non-2xx answer.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Failures surfaced by a `Transport` implementation, plus non-2xx statuses
/// detected by the binder.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, timeout, TLS failure, and the like.
    #[error("{0}")]
    Connection(String),

    /// The service answered with a non-success status code.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Failures surfaced by a `Parser` implementation.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The body is not valid for the expected model.
    #[error("malformed body: {0}")]
    Malformed(String),

    /// The body parsed, but not into the expected shape or model kind.
    #[error("expected {expected}, got {found}")]
    ShapeMismatch { expected: String, found: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_exposed_for_http_failures() {
        let err = ApiError::from(TransportError::Status {
            status: 401,
            body: "unauthorized".to_string(),
        });
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "request failed: HTTP 401: unauthorized");
    }

    #[test]
    fn status_is_none_for_connection_failures() {
        let err = ApiError::from(TransportError::Connection("refused".to_string()));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_type_message_names_parameter_and_types() {
        let err = ApiError::InvalidParameterType {
            name: "site_id".to_string(),
            value: "\"abc\"".to_string(),
            allowed: "int".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("site_id"));
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("int"));
    }
}
