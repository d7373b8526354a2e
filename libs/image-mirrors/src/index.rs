//! Aggregated mirror index.
//!
//! Merges the rules of every loaded document into one immutable lookup
//! table keyed by source repository path. For each source, mirrors keep
//! document order first, then rule order, then authored mirror order.

use std::collections::HashMap;

use plfm_image_ref::ImageReference;
use tracing::debug;

use crate::{PolicyDocument, PolicyLoadError};

/// A mirror recorded for a source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedMirror {
    /// Name of the document that declared the mirror.
    pub origin: Option<String>,

    /// Mirror repository (never carries a tag or digest).
    pub repository: ImageReference,
}

/// Merged view of all mirror rules.
#[derive(Debug, Default)]
pub struct MirrorIndex {
    entries: HashMap<String, Vec<IndexedMirror>>,
    document_count: usize,
    rule_count: usize,
}

impl MirrorIndex {
    /// Build the index from documents in list order.
    ///
    /// Every mirror must parse as a repository without tag or digest. A source
    /// that is not a plain repository (a bare `host:port`, for example) is
    /// keyed by its trimmed text and only matches a reference with that exact
    /// repository path.
    pub fn build(documents: &[PolicyDocument]) -> Result<Self, PolicyLoadError> {
        let mut index = Self {
            document_count: documents.len(),
            ..Default::default()
        };

        for document in documents {
            let origin = document.label();

            for rule in &document.rules {
                index.rule_count += 1;
                let key = source_key(&rule.source, origin);

                let mirrors = rule
                    .mirrors
                    .iter()
                    .map(|mirror| -> Result<IndexedMirror, PolicyLoadError> {
                        Ok(IndexedMirror {
                            origin: document.name.clone(),
                            repository: parse_repository(mirror, origin)?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                if mirrors.is_empty() {
                    continue;
                }

                index
                    .entries
                    .entry(key)
                    .or_default()
                    .extend(mirrors);
            }
        }

        Ok(index)
    }

    /// Mirrors recorded for the reference's repository, in merge order.
    pub fn mirrors(&self, reference: &ImageReference) -> &[IndexedMirror] {
        self.entries
            .get(&reference.repository_path())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Repositories to try for a reference: its own repository, then every mirror.
    ///
    /// Matching is exact on the repository path. Duplicates are kept.
    pub fn alternates(&self, reference: &ImageReference) -> Vec<ImageReference> {
        let mirrors = self.mirrors(reference);
        let mut alternates = Vec::with_capacity(mirrors.len() + 1);
        alternates.push(reference.as_repository());
        alternates.extend(mirrors.iter().map(|m| m.repository.clone()));
        alternates
    }

    /// Number of distinct source repositories with at least one mirror.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no source has a mirror.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of documents the index was built from.
    pub fn document_count(&self) -> usize {
        self.document_count
    }

    /// Number of rules the index was built from.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }
}

fn source_key(source: &str, origin: &str) -> String {
    match ImageReference::parse(source) {
        Ok(reference) if !reference.has_version() => reference.repository_path(),
        _ => {
            debug!(origin, source, "Mirror source is not a plain repository, matching verbatim");
            source.trim().to_string()
        }
    }
}

fn parse_repository(value: &str, origin: &str) -> Result<ImageReference, PolicyLoadError> {
    let reference =
        ImageReference::parse(value).map_err(|source| PolicyLoadError::InvalidReference {
            origin: origin.to_string(),
            value: value.to_string(),
            source,
        })?;

    if reference.has_version() {
        return Err(PolicyLoadError::InvalidDocument {
            origin: origin.to_string(),
            reason: format!("'{value}' must be a repository without tag or digest"),
        });
    }

    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MirrorRule;

    fn image(s: &str) -> ImageReference {
        ImageReference::parse(s).unwrap()
    }

    fn paths(refs: &[ImageReference]) -> Vec<String> {
        refs.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_index() {
        let index = MirrorIndex::build(&[]).unwrap();
        assert!(index.is_empty());
        assert_eq!(
            paths(&index.alternates(&image("quay.io/ocp-test/release:4.5"))),
            vec!["quay.io/ocp-test/release"]
        );
    }

    #[test]
    fn test_merge_order_across_documents() {
        let documents = vec![
            PolicyDocument::named(
                "a",
                vec![
                    MirrorRule::new("quay.io/x/y", ["m1.io/x/y", "m2.io/x/y"]),
                    MirrorRule::new("quay.io/other/y", ["o.io/other/y"]),
                ],
            ),
            PolicyDocument::named("b", vec![MirrorRule::new("quay.io/x/y", ["m3.io/x/y"])]),
            PolicyDocument::named("c", vec![MirrorRule::new("quay.io/x/y", ["m1.io/x/y"])]),
        ];
        let index = MirrorIndex::build(&documents).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.document_count(), 3);
        assert_eq!(index.rule_count(), 4);

        let mirrors = index.mirrors(&image("quay.io/x/y@sha256:0123456789abcdef0123456789abcdef"));
        let origins: Vec<_> = mirrors.iter().map(|m| m.origin.as_deref()).collect();
        assert_eq!(origins, vec![Some("a"), Some("a"), Some("b"), Some("c")]);

        // Repeated mirrors are not deduplicated
        assert_eq!(
            paths(&index.alternates(&image("quay.io/x/y:1"))),
            vec!["quay.io/x/y", "m1.io/x/y", "m2.io/x/y", "m3.io/x/y", "m1.io/x/y"]
        );
    }

    #[test]
    fn test_exact_match_only() {
        let documents = vec![PolicyDocument::new(vec![MirrorRule::new(
            "quay.io/ocp-test",
            ["m.io/ocp-test"],
        )])];
        let index = MirrorIndex::build(&documents).unwrap();

        // No prefix matching
        assert!(index.mirrors(&image("quay.io/ocp-test/release")).is_empty());
        // No registry defaulting
        assert!(index.mirrors(&image("ocp-test")).is_empty());
    }

    #[test]
    fn test_rule_without_mirrors_is_ignored() {
        let documents = vec![PolicyDocument::new(vec![MirrorRule::new(
            "quay.io/a/b",
            Vec::<String>::new(),
        )])];
        let index = MirrorIndex::build(&documents).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.rule_count(), 1);
    }

    #[test]
    fn test_invalid_references_rejected() {
        let bad_mirror = vec![PolicyDocument::named(
            "broken",
            vec![MirrorRule::new("quay.io/a/b", ["Not/Valid"])],
        )];
        let err = MirrorIndex::build(&bad_mirror).unwrap_err();
        assert!(
            matches!(err, PolicyLoadError::InvalidReference { ref origin, ref value, .. } if origin == "broken" && value == "Not/Valid")
        );

        let tagged_mirror = vec![PolicyDocument::new(vec![MirrorRule::new(
            "quay.io/a/b",
            ["m.io/a/b:latest"],
        )])];
        let err = MirrorIndex::build(&tagged_mirror).unwrap_err();
        assert!(matches!(err, PolicyLoadError::InvalidDocument { .. }));
    }

    #[test]
    fn test_odd_source_does_not_block_other_rules() {
        let documents = vec![
            PolicyDocument::named(
                "a-registry-wide",
                vec![MirrorRule::new("registry.local:5000", ["mirror.local:5000/x"])],
            ),
            PolicyDocument::named(
                "release",
                vec![
                    MirrorRule::new("quay.io/a/b:latest", ["m.io/a/b"]),
                    MirrorRule::new("Not/A/Repo", ["n.io/a/b"]),
                    MirrorRule::new("quay.io/ocp-test/release", ["someregistry/mirrors/match"]),
                ],
            ),
        ];
        let index = MirrorIndex::build(&documents).unwrap();
        assert_eq!(index.len(), 4);

        assert_eq!(
            paths(&index.alternates(&image("quay.io/ocp-test/release:4.5"))),
            vec!["quay.io/ocp-test/release", "someregistry/mirrors/match"]
        );
        // Verbatim keys never match the untagged repository
        assert!(index.mirrors(&image("quay.io/a/b:latest")).is_empty());
        assert!(index.mirrors(&image("registry.local/x")).is_empty());
    }
}
