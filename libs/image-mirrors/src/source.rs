//! Where mirror policies come from.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::{PolicyDocument, PolicyLister, PolicyLoadError};

/// Origin of mirror policy documents, chosen once at construction.
#[derive(Clone)]
pub enum PolicySource {
    /// A single policy document on disk.
    File(PathBuf),

    /// Every document a lister returns, in list order.
    Lister(Arc<dyn PolicyLister>),
}

impl PolicySource {
    /// File mode.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Lister mode.
    pub fn lister<L: PolicyLister + 'static>(lister: L) -> Self {
        Self::Lister(Arc::new(lister))
    }

    /// Fetch the documents. Performs exactly one file read or one list call.
    pub async fn load(&self) -> Result<Vec<PolicyDocument>, PolicyLoadError> {
        match self {
            Self::File(path) => Ok(vec![read_policy_file(path).await?]),
            Self::Lister(lister) => Ok(lister.list().await?),
        }
    }
}

impl fmt::Debug for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Lister(_) => f.write_str("Lister(..)"),
        }
    }
}

impl fmt::Display for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Lister(_) => f.write_str("lister"),
        }
    }
}

/// Read and decode a single policy file.
pub async fn read_policy_file(path: &Path) -> Result<PolicyDocument, PolicyLoadError> {
    debug!(path = %path.display(), "Reading mirror policy file");

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PolicyLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    PolicyDocument::from_yaml(&contents, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ListError, MirrorRule, StaticPolicyLister};
    use async_trait::async_trait;
    use tempfile::NamedTempFile;

    struct FailingLister;

    #[async_trait]
    impl PolicyLister for FailingLister {
        async fn list(&self) -> Result<Vec<PolicyDocument>, ListError> {
            Err(ListError::new("api server unavailable"))
        }
    }

    #[tokio::test]
    async fn test_file_source() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "spec:\n  repositoryDigestMirrors:\n  - source: quay.io/a/b\n    mirrors: [m.io/a/b]\n",
        )
        .unwrap();

        let source = PolicySource::file(file.path());
        let docs = source.load().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].rules, vec![MirrorRule::new("quay.io/a/b", ["m.io/a/b"])]);
        assert!(source.to_string().starts_with("file:"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = PolicySource::file("/nonexistent/policy.yaml");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, PolicyLoadError::Io { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_lister_source() {
        let source = PolicySource::lister(StaticPolicyLister::new(vec![PolicyDocument::named(
            "release",
            vec![],
        )]));
        assert_eq!(source.load().await.unwrap().len(), 1);
        assert_eq!(source.to_string(), "lister");
        assert_eq!(format!("{source:?}"), "Lister(..)");
    }

    #[tokio::test]
    async fn test_lister_failure() {
        let err = PolicySource::lister(FailingLister).load().await.unwrap_err();
        assert!(matches!(err, PolicyLoadError::List(_)));
        assert_eq!(
            err.to_string(),
            "failed to list mirror policies: api server unavailable"
        );
    }
}
