//! Configuration for mirror resolution.

use std::path::PathBuf;
use std::time::Duration;

use crate::{ConfigError, DirectoryPolicyLister, PolicySource, StaticPolicyLister};

/// Single policy file (file mode).
pub const ENV_POLICY_FILE: &str = "GHOST_IMAGE_MIRROR_POLICY_FILE";

/// Directory of policy documents (lister mode).
pub const ENV_POLICY_DIR: &str = "GHOST_IMAGE_MIRROR_POLICY_DIR";

/// Load timeout in seconds; `0` disables the timeout.
pub const ENV_LOAD_TIMEOUT_SECS: &str = "GHOST_IMAGE_MIRROR_LOAD_TIMEOUT_SECS";

/// Default policy load timeout.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Mirror resolution configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    /// Single policy file. Takes precedence over `policy_dir`.
    pub policy_file: Option<PathBuf>,

    /// Directory listed for policy documents.
    pub policy_dir: Option<PathBuf>,

    /// Maximum time a policy load may take.
    pub load_timeout: Option<Duration>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            policy_file: None,
            policy_dir: None,
            load_timeout: Some(DEFAULT_LOAD_TIMEOUT),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let policy_file = get(ENV_POLICY_FILE).map(PathBuf::from);
        let policy_dir = get(ENV_POLICY_DIR).map(PathBuf::from);

        let load_timeout = match get(ENV_LOAD_TIMEOUT_SECS) {
            None => Some(DEFAULT_LOAD_TIMEOUT),
            Some(value) => {
                let secs: u64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        var: ENV_LOAD_TIMEOUT_SECS,
                        value: value.clone(),
                    })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
        };

        Ok(Self {
            policy_file,
            policy_dir,
            load_timeout,
        })
    }

    /// Policy source selected by this configuration.
    ///
    /// A policy file wins over a directory; with neither, no mirrors are configured.
    pub fn policy_source(&self) -> PolicySource {
        if let Some(file) = &self.policy_file {
            PolicySource::file(file)
        } else if let Some(dir) = &self.policy_dir {
            PolicySource::lister(DirectoryPolicyLister::new(dir))
        } else {
            PolicySource::lister(StaticPolicyLister::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, MirrorConfig::default());
        assert_eq!(config.policy_source().to_string(), "lister");
    }

    #[test]
    fn test_file_takes_precedence() {
        let config = MirrorConfig::from_lookup(lookup(&[
            (ENV_POLICY_FILE, "/etc/ghost/icsp.yaml"),
            (ENV_POLICY_DIR, "/etc/ghost/mirrors.d"),
        ]))
        .unwrap();
        assert_eq!(
            config.policy_source().to_string(),
            "file:/etc/ghost/icsp.yaml"
        );
    }

    #[test]
    fn test_directory_source() {
        let config =
            MirrorConfig::from_lookup(lookup(&[(ENV_POLICY_FILE, ""), (ENV_POLICY_DIR, "/d")]))
                .unwrap();
        assert_eq!(config.policy_file, None);
        assert_eq!(config.policy_dir, Some(PathBuf::from("/d")));
        assert!(matches!(config.policy_source(), PolicySource::Lister(_)));
    }

    #[test]
    fn test_load_timeout() {
        let config = MirrorConfig::from_lookup(lookup(&[(ENV_LOAD_TIMEOUT_SECS, "5")])).unwrap();
        assert_eq!(config.load_timeout, Some(Duration::from_secs(5)));

        let config = MirrorConfig::from_lookup(lookup(&[(ENV_LOAD_TIMEOUT_SECS, "0")])).unwrap();
        assert_eq!(config.load_timeout, None);

        let err = MirrorConfig::from_lookup(lookup(&[(ENV_LOAD_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                var: ENV_LOAD_TIMEOUT_SECS,
                value: "soon".to_string()
            }
        );
    }
}
