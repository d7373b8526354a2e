//! Error types for mirror policy loading and configuration.

use std::path::PathBuf;
use std::time::Duration;

use plfm_image_ref::ReferenceError;
use thiserror::Error;

/// Errors that can occur while loading mirror policies.
///
/// A load error never poisons the resolver: the next resolution retries the load.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    /// The policy file could not be read.
    #[error("failed to read mirror policy {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The policy document is not valid YAML or does not match the schema.
    #[error("failed to decode mirror policy {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The document declares a kind other than a mirror policy.
    #[error("{origin} is a {kind}, not an ImageContentSourcePolicy")]
    UnexpectedKind { origin: String, kind: String },

    /// The document is structurally valid but semantically wrong.
    #[error("invalid mirror policy {origin}: {reason}")]
    InvalidDocument { origin: String, reason: String },

    /// A source or mirror is not a valid repository reference.
    #[error("invalid reference '{value}' in mirror policy {origin}: {source}")]
    InvalidReference {
        origin: String,
        value: String,
        #[source]
        source: ReferenceError,
    },

    /// The policy lister failed.
    #[error("failed to list mirror policies: {0}")]
    List(#[from] ListError),

    /// The load did not finish within the configured timeout.
    #[error("mirror policy load timed out after {0:?}")]
    Timeout(Duration),
}

impl PolicyLoadError {
    /// Returns true if retrying the load later may succeed without a config change.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io { .. } | Self::Timeout(_) => true,
            Self::List(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Error reported by a [`PolicyLister`](crate::PolicyLister) implementation.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListError(Box<dyn std::error::Error + Send + Sync + 'static>);

impl ListError {
    /// Wrap any error (or message) produced while listing policies.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self(err.into())
    }

    /// Returns true unless the lister failed on a policy document it read.
    ///
    /// Listers that surface a [`PolicyLoadError`] (such as the directory
    /// lister) inherit its classification; any other failure is treated as
    /// transient.
    pub fn is_transient(&self) -> bool {
        self.0
            .downcast_ref::<PolicyLoadError>()
            .map_or(true, PolicyLoadError::is_transient)
    }
}

/// Errors from reading mirror configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be used.
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },
}
