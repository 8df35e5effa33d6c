//! TOML configuration for tree depth, key artifacts and nullifier scope.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shieldlist_circuits::MAX_DEPTH;

use crate::registry::ScopePolicy;

const DEFAULT_BUILD_DIR: &str = "zksnarkBuild";
const DEFAULT_SETUP_SEED: u64 = 42;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_depth")]
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysConfig {
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Seed for the development setup RNG.
    #[serde(default = "default_setup_seed")]
    pub setup_seed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub scope: ScopePolicy,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: MAX_DEPTH,
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            setup_seed: DEFAULT_SETUP_SEED,
        }
    }
}

fn default_depth() -> usize {
    MAX_DEPTH
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

fn default_setup_seed() -> u64 {
    DEFAULT_SETUP_SEED
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_from_file_or_default(path: &Path) -> Self {
        Self::load_from_file(path).unwrap_or_default()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tree.depth, 254);
        assert_eq!(config.keys.build_dir, PathBuf::from("zksnarkBuild"));
        assert_eq!(config.registry.scope, ScopePolicy::Global);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tree]
            depth = 20

            [registry]
            scope = "per_cycle"
            "#,
        )
        .unwrap();

        assert_eq!(config.tree.depth, 20);
        assert_eq!(config.keys.setup_seed, 42);
        assert_eq!(config.registry.scope, ScopePolicy::PerCycle);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("shieldlist.toml");

        let mut config = Config::default();
        config.keys.build_dir = PathBuf::from("/tmp/keys");
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_or_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Read { .. })
        ));
        assert_eq!(Config::load_from_file_or_default(&path), Config::default());

        std::fs::write(&path, "[tree]\ndepth = \"deep\"").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
