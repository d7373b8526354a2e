//! Image reference type and parser.

use std::fmt;
use std::str::FromStr;

use crate::ReferenceError;

/// Registry that Docker clients assume when a reference names none.
pub const DOCKER_HUB_REGISTRY: &str = "docker.io";

/// Maximum length of a repository name, registry included.
pub const NAME_TOTAL_LENGTH_MAX: usize = 255;

const TAG_LENGTH_MAX: usize = 128;
const DIGEST_ENCODED_LENGTH_MIN: usize = 32;

/// A parsed container image reference.
///
/// Fields are stored exactly as written; no registry or namespace defaults
/// are filled in. Two references share a repository when their
/// [`repository_path`](Self::repository_path) strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageReference {
    registry: Option<String>,
    namespace: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    /// Parse a reference such as `quay.io/ocp-test/release:4.5`.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        if input.is_empty() {
            return Err(ReferenceError::Empty);
        }

        // Digest first: it may itself contain ':'
        let (rest, digest) = match input.split_once('@') {
            Some((rest, digest)) => {
                validate_digest(digest)?;
                (rest, Some(digest.to_string()))
            }
            None => (input, None),
        };

        // A ':' followed by a '/' belongs to a registry port, not a tag
        let (name_part, tag) = match rest.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => {
                validate_tag(tag)?;
                (name, Some(tag.to_string()))
            }
            _ => (rest, None),
        };

        if name_part.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if name_part.len() > NAME_TOTAL_LENGTH_MAX {
            return Err(ReferenceError::NameTooLong {
                length: name_part.len(),
                limit: NAME_TOTAL_LENGTH_MAX,
            });
        }

        let mut components: Vec<&str> = name_part.split('/').collect();

        let registry = if components.len() > 1 && looks_like_registry(components[0]) {
            let registry = components.remove(0);
            if !is_valid_registry(registry) {
                return Err(ReferenceError::InvalidRegistry(registry.to_string()));
            }
            Some(registry.to_string())
        } else {
            None
        };

        if let Some(bad) = components.iter().find(|c| !is_valid_path_component(c)) {
            return Err(ReferenceError::InvalidComponent(bad.to_string()));
        }

        // Split cannot yield an empty vector, and the registry is only taken
        // off when at least one component remains.
        let name = components.pop().unwrap_or_default().to_string();
        let namespace = if components.is_empty() {
            None
        } else {
            Some(components.join("/"))
        };

        Ok(Self {
            registry,
            namespace,
            name,
            tag,
            digest,
        })
    }

    /// Registry host (with optional port), if the reference names one.
    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Everything between the registry and the name, if present.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Final repository path component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tag, if present.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Content digest, if present.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Returns true if the reference pins a tag or a digest.
    pub fn has_version(&self) -> bool {
        self.tag.is_some() || self.digest.is_some()
    }

    /// The same repository with tag and digest removed.
    #[must_use]
    pub fn as_repository(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            tag: None,
            digest: None,
        }
    }

    /// The repository path (`registry/namespace/name`) as written.
    pub fn repository_path(&self) -> String {
        let mut out = String::new();
        if let Some(registry) = &self.registry {
            out.push_str(registry);
            out.push('/');
        }
        if let Some(namespace) = &self.namespace {
            out.push_str(namespace);
            out.push('/');
        }
        out.push_str(&self.name);
        out
    }

    /// Fill in the registry and namespace a Docker client would assume.
    ///
    /// `alpine` becomes `docker.io/library/alpine`. Only useful when talking to
    /// a registry; repository matching works on the reference as written.
    #[must_use]
    pub fn with_docker_hub_defaults(&self) -> Self {
        let mut out = self.clone();
        let registry = out
            .registry
            .get_or_insert_with(|| DOCKER_HUB_REGISTRY.to_string());
        if *registry == DOCKER_HUB_REGISTRY && out.namespace.is_none() {
            out.namespace = Some("library".to_string());
        }
        out
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository_path())?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ImageReference {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for ImageReference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn is_valid_registry(registry: &str) -> bool {
    let (host, port) = match registry.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };

    if let Some(port) = port {
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }

    !host.is_empty()
        && host.split('.').all(|label| {
            let bytes = label.as_bytes();
            !bytes.is_empty()
                && bytes[0].is_ascii_alphanumeric()
                && bytes[bytes.len() - 1].is_ascii_alphanumeric()
                && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
        })
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

/// Lowercase alphanumeric runs joined by `.`, `_`, `__` or any run of `-`.
fn is_valid_path_component(component: &str) -> bool {
    let bytes = component.as_bytes();
    if bytes.is_empty() || !is_lower_alnum(bytes[0]) || !is_lower_alnum(bytes[bytes.len() - 1]) {
        return false;
    }

    let mut i = 0;
    while i < bytes.len() {
        if is_lower_alnum(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && !is_lower_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[start..i];
        let valid = matches!(separator, "." | "_" | "__") || separator.bytes().all(|b| b == b'-');
        if !valid {
            return false;
        }
    }
    true
}

fn validate_tag(tag: &str) -> Result<(), ReferenceError> {
    let bytes = tag.as_bytes();
    let valid = !bytes.is_empty()
        && bytes.len() <= TAG_LENGTH_MAX
        && (bytes[0].is_ascii_alphanumeric() || bytes[0] == b'_')
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));

    if valid {
        Ok(())
    } else {
        Err(ReferenceError::InvalidTag(tag.to_string()))
    }
}

fn validate_digest(digest: &str) -> Result<(), ReferenceError> {
    let invalid = || ReferenceError::InvalidDigest(digest.to_string());

    let (algorithm, encoded) = digest.split_once(':').ok_or_else(invalid)?;

    let algorithm_ok = algorithm
        .split(['+', '.', '_', '-'])
        .all(|part| !part.is_empty() && part.bytes().all(is_lower_alnum));
    let encoded_ok = encoded.len() >= DIGEST_ENCODED_LENGTH_MIN
        && encoded.bytes().all(|b| b.is_ascii_hexdigit());

    if algorithm_ok && encoded_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}
