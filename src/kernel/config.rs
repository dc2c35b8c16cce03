use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::ExplicitIndexConfig;

/// Kernel settings, loadable from a TOML file.
///
/// ```toml
/// [auto_indexing]
/// nodes = true
///
/// [locks]
/// wait_timeout_ms = 5000
///
/// [explicit_index.default_config]
/// type = "exact"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Automatic explicit-index maintenance.
    pub auto_indexing: AutoIndexingConfig,
    /// Lock manager policy.
    pub locks: LockConfig,
    /// Explicit index defaults.
    pub explicit_index: ExplicitIndexDefaults,
}

/// `[auto_indexing]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoIndexingConfig {
    /// Keep `node_auto_index` in step with node deletions.
    pub nodes: bool,
}

/// `[locks]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Longest wait for a conflicting lock; absent means wait forever.
    pub wait_timeout_ms: Option<u64>,
}

/// `[explicit_index]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplicitIndexDefaults {
    /// Settings applied to lazily created indexes unless the caller overrides them.
    pub default_config: ExplicitIndexConfig,
}

impl KernelConfig {
    /// Loads the configuration from `explicit`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        match explicit.or_else(default_config_path) {
            Some(path) if path.exists() => read_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    /// Writes the configuration to `path` as TOML, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized =
            toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Enables or disables node auto indexing.
    pub fn node_auto_indexing(mut self, enabled: bool) -> Self {
        self.auto_indexing.nodes = enabled;
        self
    }

    /// Bounds lock waits; `None` waits forever.
    pub fn lock_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.locks.wait_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    /// Sets one default explicit index setting.
    pub fn explicit_index_default(mut self, key: &str, value: &str) -> Self {
        self.explicit_index
            .default_config
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Lock wait timeout as a duration.
    pub fn lock_wait_duration(&self) -> Option<Duration> {
        self.locks.wait_timeout_ms.map(Duration::from_millis)
    }
}

fn read_file(path: &Path) -> Result<KernelConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Failure to load or store a [`KernelConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read kernel config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse kernel config {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },
    /// The configuration could not be rendered as TOML.
    #[error("failed to serialize kernel config: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: toml::ser::Error,
    },
    /// The file could not be written.
    #[error("failed to write kernel config {path}: {source}")]
    Write {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The parent directory could not be created.
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Default config file location, `<config dir>/sombra/kernel.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("sombra").join("kernel.toml"))
}
