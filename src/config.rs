//! User configuration, stored as TOML.
//!
//! The file lives in the OS config directory:
//! - Windows: %APPDATA%\mir-datasets\config.toml
//! - macOS: ~/Library/Application Support/mir-datasets/config.toml
//! - Linux: ~/.config/mir-datasets/config.toml
//!
//! Every section falls back to defaults, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the directory that holds every dataset by default.
pub const DEFAULT_DATA_DIR: &str = "mir_datasets";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where datasets live on disk
    pub storage: StorageConfig,

    /// Download behaviour
    pub download: DownloadConfig,
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Parent of each dataset's default data_home (empty = ~/mir_datasets)
    pub data_root: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the data root, falling back to `~/mir_datasets`.
    pub fn data_root(&self) -> PathBuf {
        self.data_root.clone().unwrap_or_else(default_data_root)
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Seconds allowed to establish a connection
    pub connect_timeout_secs: u64,

    /// Connection attempts per remote file
    pub retry_attempts: u32,

    /// User agent sent with every request
    pub user_agent: String,

    /// Delete archives after they have been extracted
    pub cleanup_archives: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 15,
            retry_attempts: 3,
            user_agent: concat!("mir-datasets/", env!("CARGO_PKG_VERSION")).to_string(),
            cleanup_archives: true,
        }
    }
}

impl DownloadConfig {
    /// Connection timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// `~/mir_datasets`, or `./mir_datasets` when no home directory is known.
pub fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DATA_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// `<config dir>/mir-datasets`, if the platform has a config directory.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mir-datasets"))
}

/// `<config dir>/mir-datasets/config.toml`
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load the user configuration, falling back to defaults.
///
/// A missing, unreadable or malformed file is logged and never fatal.
pub fn load() -> Config {
    match config_path() {
        Some(path) => load_from(&path),
        None => {
            tracing::warn!(target: "config", "No config directory on this platform, using defaults");
            Config::default()
        }
    }
}

/// Load configuration from an explicit file, falling back to defaults.
pub fn load_from(path: &Path) -> Config {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(target: "config", path = %path.display(), "No config file, using defaults");
            return Config::default();
        }
        Err(e) => {
            tracing::error!(target: "config", path = %path.display(), error = %e, "Unreadable config file, using defaults");
            return Config::default();
        }
    };
    toml::from_str(&contents).unwrap_or_else(|e| {
        tracing::error!(target: "config", path = %path.display(), error = %e, "Malformed config file, using defaults");
        Config::default()
    })
}

/// Save the user configuration.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Write configuration to `path` through a temporary sibling file, so a
/// crash never leaves a half-written config behind.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, contents).map_err(|e| ConfigError::Write(staging.clone(), e))?;
    std::fs::rename(&staging, path)
        .map_err(|e| ConfigError::Rename(staging, path.to_path_buf(), e))?;

    tracing::info!(target: "config", path = %path.display(), "Saved config");
    Ok(())
}

/// Errors from writing the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config directory on this platform")]
    NoConfigDir,

    #[error("cannot create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("cannot write {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("cannot move {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[storage]"));
        assert!(toml.contains("[download]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.storage.data_root = Some(PathBuf::from("/datasets"));
        config.download.retry_attempts = 5;
        config.download.cleanup_archives = false;

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.storage.data_root, Some(PathBuf::from("/datasets")));
        assert_eq!(parsed.download.retry_attempts, 5);
        assert!(!parsed.download.cleanup_archives);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[storage]
data_root = "/mnt/corpora"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.storage.data_root(), PathBuf::from("/mnt/corpora"));
        assert_eq!(config.download.connect_timeout_secs, 15);
        assert_eq!(config.download.retry_attempts, 3);
        assert!(config.download.cleanup_archives);
    }

    #[test]
    fn test_save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut config = Config::default();
        config.download.user_agent = "lab-mirror".to_string();

        save_to(&config, &path).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());
        assert_eq!(load_from(&path).download.user_agent, "lab-mirror");
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[download\nretry_attempts = ").unwrap();

        assert_eq!(load_from(&path).download.retry_attempts, 3);
        assert_eq!(load_from(&dir.path().join("absent.toml")).download.retry_attempts, 3);
    }

    #[test]
    fn test_default_data_root_ends_with_dataset_dir() {
        let root = StorageConfig::default().data_root();
        assert!(root.ends_with(DEFAULT_DATA_DIR));
    }
}
