//! Mirror policy documents.
//!
//! The on-disk form follows the `ImageContentSourcePolicy` schema:
//!
//! ```yaml
//! apiVersion: operator.openshift.io/v1alpha1
//! kind: ImageContentSourcePolicy
//! metadata:
//!   name: release
//! spec:
//!   repositoryDigestMirrors:
//!   - source: quay.io/ocp-test/release
//!     mirrors:
//!     - someregistry/mirrors/match
//! ```
//!
//! JSON documents decode too, since JSON is a subset of YAML.

use serde::{Deserialize, Serialize};

use crate::PolicyLoadError;

/// Kind that a policy document must declare when it declares one.
pub const POLICY_KIND: &str = "ImageContentSourcePolicy";

/// A source repository and the mirrors that serve identical content.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MirrorRule {
    /// Repository path whose content is mirrored.
    pub source: String,

    /// Mirror repository paths, most preferred first.
    #[serde(default)]
    pub mirrors: Vec<String>,
}

impl MirrorRule {
    /// Create a rule from a source and its mirrors.
    pub fn new<S, I, M>(source: S, mirrors: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            source: source.into(),
            mirrors: mirrors.into_iter().map(Into::into).collect(),
        }
    }
}

/// An ordered set of mirror rules, optionally named.
///
/// Documents listed from a collection carry a name; a standalone file may not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyDocument {
    /// Document name, used for provenance and list ordering only.
    pub name: Option<String>,

    /// Rules in authored order.
    pub rules: Vec<MirrorRule>,
}

impl PolicyDocument {
    /// Create an unnamed document.
    pub fn new(rules: Vec<MirrorRule>) -> Self {
        Self { name: None, rules }
    }

    /// Create a named document.
    pub fn named(name: impl Into<String>, rules: Vec<MirrorRule>) -> Self {
        Self {
            name: Some(name.into()),
            rules,
        }
    }

    /// Decode a document from YAML (or JSON).
    ///
    /// `origin` describes where the text came from and only shows up in errors.
    pub fn from_yaml(contents: &str, origin: &str) -> Result<Self, PolicyLoadError> {
        let raw: RawPolicy =
            serde_yaml::from_str(contents).map_err(|source| PolicyLoadError::Decode {
                origin: origin.to_string(),
                source,
            })?;

        if let Some(kind) = raw.kind {
            if kind != POLICY_KIND {
                return Err(PolicyLoadError::UnexpectedKind {
                    origin: origin.to_string(),
                    kind,
                });
            }
        }

        Ok(Self {
            name: raw.metadata.name,
            rules: raw.spec.repository_digest_mirrors,
        })
    }

    /// Label used in logs and errors.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    #[serde(default)]
    #[allow(dead_code)] // Accepted for schema compatibility
    api_version: Option<String>,

    #[serde(default)]
    kind: Option<String>,

    #[serde(default)]
    metadata: RawMetadata,

    #[serde(default)]
    spec: RawSpec,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpec {
    #[serde(default)]
    repository_digest_mirrors: Vec<MirrorRule>,
}
