//! Alternate image source resolution.
//!
//! When a pull fails, the resolver answers which repositories to try next:
//! the original repository first, followed by every mirror the policy
//! declares for it.

use async_trait::async_trait;
use plfm_image_ref::ImageReference;
use tracing::{debug, warn};

use crate::{MirrorConfig, PolicyAggregator, PolicyLoadError, PolicySource};

/// Decides which repositories a puller should try for an image.
#[async_trait]
pub trait AlternateStrategy: Send + Sync {
    /// Repositories to try before any pull has failed.
    async fn first_request(
        &self,
        reference: &ImageReference,
    ) -> Result<Vec<ImageReference>, PolicyLoadError>;

    /// Repositories to try after a pull of `reference` failed.
    async fn on_failure(
        &self,
        reference: &ImageReference,
    ) -> Result<Vec<ImageReference>, PolicyLoadError>;
}

/// Simple lookup strategy backed by mirror policies.
///
/// Policies are loaded on the first failure only, then served from memory.
#[derive(Debug)]
pub struct AlternateResolver {
    aggregator: PolicyAggregator,
}

impl AlternateResolver {
    /// Create a resolver over a policy source.
    pub fn new(source: PolicySource) -> Self {
        Self::with_aggregator(PolicyAggregator::new(source))
    }

    /// Create a resolver around a configured aggregator.
    pub fn with_aggregator(aggregator: PolicyAggregator) -> Self {
        Self { aggregator }
    }

    /// Create a resolver from mirror configuration.
    pub fn from_config(config: &MirrorConfig) -> Self {
        let mut aggregator = PolicyAggregator::new(config.policy_source());
        if let Some(timeout) = config.load_timeout {
            aggregator = aggregator.with_load_timeout(timeout);
        }
        Self::with_aggregator(aggregator)
    }

    /// Underlying aggregator.
    pub fn aggregator(&self) -> &PolicyAggregator {
        &self.aggregator
    }

    /// Like [`on_failure`](AlternateStrategy::on_failure), but a policy load
    /// failure degrades to retrying only the original repository.
    pub async fn on_failure_or_original(&self, reference: &ImageReference) -> Vec<ImageReference> {
        match self.on_failure(reference).await {
            Ok(alternates) => alternates,
            Err(e) => {
                warn!(
                    image_ref = %reference,
                    error = %e,
                    "Mirror policies unavailable, retrying original repository only"
                );
                vec![reference.as_repository()]
            }
        }
    }
}

#[async_trait]
impl AlternateStrategy for AlternateResolver {
    async fn first_request(
        &self,
        reference: &ImageReference,
    ) -> Result<Vec<ImageReference>, PolicyLoadError> {
        Ok(vec![reference.as_repository()])
    }

    async fn on_failure(
        &self,
        reference: &ImageReference,
    ) -> Result<Vec<ImageReference>, PolicyLoadError> {
        let index = self.aggregator.load().await?;
        let alternates = index.alternates(reference);

        debug!(
            image_ref = %reference,
            alternates = alternates.len(),
            "Resolved alternate image sources"
        );

        Ok(alternates)
    }
}
