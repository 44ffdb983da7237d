//! Error types for the remote boundary.

use thiserror::Error;

/// Errors that can occur while querying the organization.
///
/// Every variant carries plain messages so that a single failure can be
/// cloned out to all callers waiting on the same cached fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The credential was rejected by the upstream.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Non-success HTTP status other than 401.
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The upstream answered with query-level errors.
    #[error("query {query} failed: {}", .messages.join("; "))]
    Query { query: String, messages: Vec<String> },

    /// The response did not have the expected shape.
    #[error("unexpected response to {query}: {message}")]
    Schema { query: String, message: String },

    /// Connection, TLS, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteError {
    /// Whether the upstream definitively rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_))
    }

    /// A response of the wrong shape for `query`.
    pub fn schema(query: &str, message: impl ToString) -> Self {
        RemoteError::Schema {
            query: query.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
