//! Policy listers: enumerate every mirror policy document of a collection.
//!
//! ## Ordering contract
//!
//! Merged mirror order follows list order, so a lister must return
//! documents sorted by name (lexicographic, stable for equal names). This is
//! the order a Kubernetes-style API server uses for list responses, and both
//! listers here honor it. The aggregator does not re-sort.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{ListError, PolicyDocument, PolicyLoadError};

/// Enumerates all mirror policy documents.
#[async_trait]
pub trait PolicyLister: Send + Sync {
    /// List every document, sorted by name.
    async fn list(&self) -> Result<Vec<PolicyDocument>, ListError>;
}

#[async_trait]
impl<T: PolicyLister + ?Sized> PolicyLister for Arc<T> {
    async fn list(&self) -> Result<Vec<PolicyDocument>, ListError> {
        (**self).list().await
    }
}

/// Sort documents into list order (by name, unnamed first, stable).
pub fn sort_by_name(documents: &mut [PolicyDocument]) {
    documents.sort_by(|a, b| a.name.cmp(&b.name));
}

/// In-memory lister.
///
/// Counts calls to [`list`](PolicyLister::list) so embedders can check how
/// often the collection was enumerated.
#[derive(Debug, Default)]
pub struct StaticPolicyLister {
    documents: Vec<PolicyDocument>,
    calls: AtomicUsize,
}

impl StaticPolicyLister {
    /// Create a lister over the given documents.
    pub fn new(mut documents: Vec<PolicyDocument>) -> Self {
        sort_by_name(&mut documents);
        Self {
            documents,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times the collection has been listed.
    pub fn list_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicyLister for StaticPolicyLister {
    async fn list(&self) -> Result<Vec<PolicyDocument>, ListError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.documents.clone())
    }
}

/// Lists every policy file directly inside a directory.
///
/// Files ending in `.yaml`, `.yml` or `.json` are decoded as policy
/// documents; documents without `metadata.name` are named after their file
/// stem. Files declaring a different kind are skipped with a warning. A
/// missing directory is an empty collection.
#[derive(Debug, Clone)]
pub struct DirectoryPolicyLister {
    dir: PathBuf,
}

impl DirectoryPolicyLister {
    /// Create a lister for a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory being listed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PolicyLister for DirectoryPolicyLister {
    async fn list(&self) -> Result<Vec<PolicyDocument>, ListError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || read_policy_dir(&dir))
            .await
            .map_err(ListError::new)?
            .map_err(ListError::new)
    }
}

fn is_policy_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml" | "json")
    )
}

fn read_policy_dir(dir: &Path) -> Result<Vec<PolicyDocument>, PolicyLoadError> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Policy directory does not exist");
        return Ok(Vec::new());
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| PolicyLoadError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let path = entry.path();

        if !entry.file_type().is_file() || !is_policy_file(path) {
            debug!(path = %path.display(), "Skipping non-policy file");
            continue;
        }

        let contents = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut document = match PolicyDocument::from_yaml(&contents, &path.display().to_string()) {
            Ok(document) => document,
            Err(PolicyLoadError::UnexpectedKind { origin, kind }) => {
                warn!(path = %origin, kind = %kind, "Skipping document of another kind");
                continue;
            }
            Err(e) => return Err(e),
        };

        if document.name.is_none() {
            document.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string);
        }
        documents.push(document);
    }

    sort_by_name(&mut documents);
    Ok(documents)
}
