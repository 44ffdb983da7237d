//! Error types for teamgate core.

use thiserror::Error;

/// Core errors raised while interpreting the remote vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The organization reported a permission label outside the known vocabulary.
    #[error("unknown permission type: {0}")]
    UnknownPermission(String),

    #[error("invalid login: {0:?}")]
    InvalidLogin(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
