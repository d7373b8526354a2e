//! One-time mirror policy loading.
//!
//! The aggregator fetches policy documents from its source and merges them
//! into a [`MirrorIndex`] the first time the index is needed. After a
//! successful load the index is served from memory for the lifetime of the
//! aggregator; the source is never read again, even if it changes.
//!
//! Concurrent first callers share a single in-flight load. A failed,
//! timed-out or cancelled load leaves nothing cached, so the next call tries
//! again.

use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::{MirrorIndex, PolicyLoadError, PolicySource};

/// Loads and caches the merged mirror index.
#[derive(Debug)]
pub struct PolicyAggregator {
    source: PolicySource,
    load_timeout: Option<Duration>,
    index: OnceCell<MirrorIndex>,
}

impl PolicyAggregator {
    /// Create an aggregator over a source. Nothing is loaded yet.
    pub fn new(source: PolicySource) -> Self {
        Self {
            source,
            load_timeout: None,
            index: OnceCell::new(),
        }
    }

    /// Fail loads that take longer than `timeout`.
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }

    /// Policy source.
    pub fn source(&self) -> &PolicySource {
        &self.source
    }

    /// Returns true once a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.index.initialized()
    }

    /// Get the merged index, loading it on first use.
    pub async fn load(&self) -> Result<&MirrorIndex, PolicyLoadError> {
        self.index.get_or_try_init(|| self.load_index()).await
    }

    async fn load_index(&self) -> Result<MirrorIndex, PolicyLoadError> {
        let start = Instant::now();
        debug!(source = %self.source, "Loading mirror policies");

        let documents = match self.load_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.source.load())
                .await
                .map_err(|_| PolicyLoadError::Timeout(timeout))??,
            None => self.source.load().await?,
        };

        let index = MirrorIndex::build(&documents)?;

        info!(
            source = %self.source,
            documents = index.document_count(),
            rules = index.rule_count(),
            mirrored_sources = index.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Mirror policies loaded"
        );

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MirrorRule, PolicyDocument, StaticPolicyLister};
    use plfm_image_ref::ImageReference;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_load_once() {
        let lister = Arc::new(StaticPolicyLister::new(vec![PolicyDocument::named(
            "release",
            vec![MirrorRule::new("quay.io/a/b", ["m.io/a/b"])],
        )]));
        let aggregator = PolicyAggregator::new(PolicySource::Lister(lister.clone()));
        assert!(!aggregator.is_loaded());

        let index = aggregator.load().await.unwrap();
        assert_eq!(index.len(), 1);
        assert!(aggregator.is_loaded());

        for _ in 0..3 {
            aggregator.load().await.unwrap();
        }
        assert_eq!(lister.list_calls(), 1);

        let reference = ImageReference::parse("quay.io/a/b:1").unwrap();
        assert_eq!(aggregator.load().await.unwrap().mirrors(&reference).len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_policy_not_cached() {
        let lister = Arc::new(StaticPolicyLister::new(vec![PolicyDocument::named(
            "broken",
            vec![MirrorRule::new("quay.io/a/b", ["BAD"])],
        )]));
        let aggregator = PolicyAggregator::new(PolicySource::Lister(lister.clone()));

        assert!(aggregator.load().await.is_err());
        assert!(aggregator.load().await.is_err());
        assert!(!aggregator.is_loaded());
        assert_eq!(lister.list_calls(), 2);
    }
}
