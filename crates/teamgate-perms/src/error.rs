//! Error types for permission resolution.

use thiserror::Error;

use teamgate_core::CoreError;
use teamgate_remote::RemoteError;

/// Errors that can occur while building the catalog, aggregating repository
/// permissions or resolving a user's permissions.
///
/// Cloneable so that one failed fetch can be handed to every caller waiting
/// on the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermsError {
    /// A permission label outside the known vocabulary.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// The organization directory failed or answered with the wrong shape.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),
}

impl PermsError {
    /// Whether the directory rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PermsError::Remote(e) if e.is_unauthorized())
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
