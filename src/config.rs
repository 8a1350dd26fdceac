use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::feed::filter::FilterPolicy;

// =============================================================================
// Feed constants
// =============================================================================

/// Default maximum number of entries per feed
pub const DEFAULT_FEED_LIMIT: usize = 100;

/// Default snapshot refresh interval in milliseconds (5 minutes)
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// File name of the log file inside [`data_dir`]
pub const LOG_FILE_NAME: &str = "package-feed.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub feed: FeedConfig,
    pub refresh: RefreshConfig,
}

/// Feed-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedConfig {
    /// Maximum number of entries per feed
    pub limit: usize,
    /// Handling of unrecognized release filter tokens
    pub filter_policy: FilterPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_FEED_LIMIT,
            filter_policy: FilterPolicy::default(),
        }
    }
}

/// Snapshot refresh configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RefreshConfig {
    /// Refresh interval in milliseconds
    pub interval: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if the file does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.limit == 0 {
            return Err(ConfigError::Invalid("feed.limit must be positive".to_string()));
        }
        if self.refresh.interval == 0 {
            return Err(ConfigError::Invalid(
                "refresh.interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the path to the data directory for package-feed.
/// Uses $XDG_DATA_HOME/package-feed if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/package-feed,
/// or ./package-feed if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the catalog database file.
pub fn db_path() -> PathBuf {
    data_dir().join("catalog.db")
}

/// Returns the path to the config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("package-feed")
}
