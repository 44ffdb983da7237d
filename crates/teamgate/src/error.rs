//! Error types for the registry plugin.

use std::fmt;

use thiserror::Error;

use teamgate_core::CoreError;
use teamgate_perms::PermsError;
use teamgate_remote::RemoteError;

/// Why authentication did not succeed.
///
/// The two failure states are never collapsed: `Denied` is the caller's
/// fault and maps to 401, `Unknown` is ours and maps to 500.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoginState {
    /// Bad credential, credential of another user, or not a member.
    Denied,
    /// Authentication could not be decided.
    Unknown,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginState::Denied => f.write_str("denied"),
            LoginState::Unknown => f.write_str("unknown"),
        }
    }
}

/// A failed step of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("authentication {state}: {message}")]
pub struct AuthenticationError {
    pub state: LoginState,
    pub message: String,
}

impl AuthenticationError {
    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            state: LoginState::Denied,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            state: LoginState::Unknown,
            message: message.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        self.state == LoginState::Denied
    }
}

/// Errors that can occur in plugin operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Authentication failed.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// Permission resolution failed.
    #[error("permission error: {0}")]
    Permission(#[from] PermsError),

    /// The organization directory failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for plugin operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Startup configuration problems. Fatal: the plugin is never built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent or blank.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// `repositoryPattern` is not a valid regular expression.
    #[error("invalid repository pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A setting has an unusable value.
    #[error("invalid setting {field}: {message}")]
    Invalid { field: &'static str, message: String },

    /// The configuration document could not be parsed.
    #[error("malformed configuration: {0}")]
    Parse(String),

    /// The upstream client could not be built.
    #[error("cannot build client: {0}")]
    Client(#[from] RemoteError),
}

/// Error reported to the registry host. The host only sees the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PluginError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl PluginError {
    /// HTTP status the host answers with.
    pub fn status(&self) -> u16 {
        match self {
            PluginError::Unauthorized => 401,
            PluginError::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(PluginError::Unauthorized.status(), 401);
        assert_eq!(PluginError::Internal.status(), 500);
    }

    #[test]
    fn test_authentication_error_display() {
        let err = AuthenticationError::denied("not a member of acme");
        assert_eq!(err.to_string(), "authentication denied: not a member of acme");
        assert!(err.is_denied());
        assert!(!AuthenticationError::unknown("timeout").is_denied());
    }
}
