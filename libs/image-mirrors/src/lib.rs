//! # plfm-image-mirrors
//!
//! Alternate image source resolution for failed image pulls.
//!
//! Mirror policies (`ImageContentSourcePolicy` documents) declare that the
//! content of a source repository is also served, bit for bit, by one or
//! more mirror repositories. When pulling an image fails, the
//! [`AlternateResolver`] returns the repositories to try next: the original
//! first, then its mirrors in policy order.
//!
//! ## Components
//!
//! - [`PolicySource`]: a single policy file, or a [`PolicyLister`] that
//!   enumerates a collection of documents
//! - [`PolicyAggregator`]: loads the source once and merges every rule into
//!   a [`MirrorIndex`]
//! - [`AlternateResolver`]: the [`AlternateStrategy`] that looks up the index
//!
//! ## Invariants
//!
//! - At most one successful policy load per resolver
//! - Mirror order follows list order, then rule order, then authored order
//! - Matching is exact on the repository path; tags and digests never matter

mod aggregator;
mod config;
mod error;
mod index;
mod lister;
mod policy;
mod resolver;
mod source;

pub use aggregator::PolicyAggregator;
pub use config::{
    MirrorConfig, DEFAULT_LOAD_TIMEOUT, ENV_LOAD_TIMEOUT_SECS, ENV_POLICY_DIR, ENV_POLICY_FILE,
};
pub use error::{ConfigError, ListError, PolicyLoadError};
pub use index::{IndexedMirror, MirrorIndex};
pub use lister::{sort_by_name, DirectoryPolicyLister, PolicyLister, StaticPolicyLister};
pub use policy::{MirrorRule, PolicyDocument, POLICY_KIND};
pub use resolver::{AlternateResolver, AlternateStrategy};
pub use source::{read_policy_file, PolicySource};

/// Re-export the reference type used throughout the API
pub use plfm_image_ref::ImageReference;
