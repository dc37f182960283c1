use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use crate::models::dates::{self, wall_clock};

/// Limits of the reference change feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on entities per response page, applied on top of the client's own
    /// request.
    pub max_items_per_page: u32,
    /// Protocol version that introduced mega items. Older clients get legacy shapes.
    pub mega_item_sync_version: u32,
    /// Pushed `Updated`/`DateCreated` values before this are rejected.
    #[serde(with = "wall_clock")]
    pub min_persisted_date: DateTime<Utc>,
    /// Pushed `Updated`/`DateCreated` values after this are rejected.
    #[serde(with = "wall_clock")]
    pub max_persisted_date: DateTime<Utc>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_items_per_page: i32::MAX as u32,
            mega_item_sync_version: 2,
            min_persisted_date: dates::min_persisted(),
            max_persisted_date: dates::max_persisted(),
        }
    }
}

impl SyncConfig {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
            tracing::info!("Loaded sync config from {}", path.display());
        }

        if let Some(value) = env_override("PLANNER_SYNC_MAX_ITEMS_PER_PAGE")? {
            config.max_items_per_page = value;
        }
        if let Some(value) = env_override("PLANNER_SYNC_MEGA_ITEM_VERSION")? {
            config.mega_item_sync_version = value;
        }

        if config.min_persisted_date > config.max_persisted_date {
            return Err(ConfigError::InvalidDateRange {
                min: config.min_persisted_date,
                max: config.max_persisted_date,
            });
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/planner-sync/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("planner-sync")
            .join("config.yaml")
    }
}

fn env_override(name: &'static str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv(name, raw)),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(&'static str, String),
    InvalidDateRange {
        min: DateTime<Utc>,
        max: DateTime<Utc>,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                )
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value '{}' for {}: expected a number", value, name)
            }
            ConfigError::InvalidDateRange { min, max } => {
                write!(
                    f,
                    "min_persisted_date {} is after max_persisted_date {}",
                    dates::format_wall_clock(min),
                    dates::format_wall_clock(max)
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.max_items_per_page, 2_147_483_647);
        assert_eq!(config.mega_item_sync_version, 2);
        assert_eq!(config.min_persisted_date, dates::min_persisted());
        assert_eq!(config.max_persisted_date, dates::max_persisted());
    }

    #[test]
    fn test_load_no_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = SyncConfig::load(Some(config_path)).unwrap();
        assert_eq!(config.mega_item_sync_version, 2);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "mega_item_sync_version: 3").unwrap();
        writeln!(file, "min_persisted_date: \"1900-01-01T00:00:00Z\"").unwrap();

        let config = SyncConfig::load(Some(config_path)).unwrap();
        assert_eq!(config.mega_item_sync_version, 3);
        assert_eq!(
            dates::format_wall_clock(&config.min_persisted_date),
            "1900-01-01T00:00:00Z"
        );
        assert_eq!(config.max_persisted_date, dates::max_persisted());
    }

    #[test]
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "max_items_per_page: 500").unwrap();

        std::env::set_var("PLANNER_SYNC_MAX_ITEMS_PER_PAGE", "25");

        let config = SyncConfig::load(Some(config_path));

        std::env::remove_var("PLANNER_SYNC_MAX_ITEMS_PER_PAGE");

        assert_eq!(config.unwrap().max_items_per_page, 25);
    }

    #[test]
    fn test_inverted_date_range_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "min_persisted_date: \"3000-01-01T00:00:00Z\"").unwrap();
        writeln!(file, "max_persisted_date: \"2000-01-01T00:00:00Z\"").unwrap();

        let err = SyncConfig::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("is after max_persisted_date"));
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = SyncConfig::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
