//! Error types for image reference parsing.

use thiserror::Error;

/// Errors that can occur when parsing an image reference.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The reference string is empty.
    #[error("image reference cannot be empty")]
    Empty,

    /// The repository name exceeds the maximum length.
    #[error("repository name is {length} characters, limit is {limit}")]
    NameTooLong { length: usize, limit: usize },

    /// The registry host is malformed.
    #[error("invalid registry '{0}'")]
    InvalidRegistry(String),

    /// A path component of the repository name is malformed.
    #[error("invalid repository path component '{0}'")]
    InvalidComponent(String),

    /// The tag is malformed.
    #[error("invalid tag '{0}'")]
    InvalidTag(String),

    /// The digest is malformed.
    #[error("invalid digest '{0}'")]
    InvalidDigest(String),
}

impl ReferenceError {
    /// Returns true if the error concerns the tag or digest rather than the repository.
    pub fn is_version_error(&self) -> bool {
        matches!(self, Self::InvalidTag(_) | Self::InvalidDigest(_))
    }
}
