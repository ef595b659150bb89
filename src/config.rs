use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_notifications_path")]
    pub notifications_path: String,
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Program that turns a check-in prompt (stdin) into a report (stdout)
    #[serde(default)]
    pub report_command: Option<String>,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            notifications_path: default_notifications_path(),
            log_filter: default_log_filter(),
            report_command: None,
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    data_file_for_profile(utils::Profile::Prod, "clarity.db")
}

fn default_notifications_path() -> String {
    data_file_for_profile(utils::Profile::Prod, "notifications.json")
}

fn default_log_filter() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

fn data_file_for_profile(profile: utils::Profile, file: &str) -> String {
    if let Some(data_dir) = utils::get_data_dir(profile) {
        data_dir.join(file).to_string_lossy().to_string()
    } else {
        match profile {
            utils::Profile::Dev => format!("~/.local/share/clarity-dev/{file}"),
            utils::Profile::Prod => format!("~/.local/share/clarity/{file}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from the profile's config file, or create it with defaults
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from(&config_path, profile)
    }

    /// Load configuration from an explicit path, creating it with defaults if missing.
    /// Data paths left at their defaults follow `profile`.
    pub fn load_from(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;
            config.apply_profile_defaults(profile);
            Ok(config)
        } else {
            let mut config = Config::default();
            config.apply_profile_defaults(profile);
            if let Err(e) = config.save_to(config_path) {
                warn!(path = %config_path.display(), error = %e, "failed to save default config");
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to the given path
    pub fn save_to(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Point untouched data paths at the profile's data directory so a dev
    /// run never writes into the production database
    fn apply_profile_defaults(&mut self, profile: utils::Profile) {
        if self.database_path == default_database_path() {
            self.database_path = data_file_for_profile(profile, "clarity.db");
        }
        if self.notifications_path == default_notifications_path() {
            self.notifications_path = data_file_for_profile(profile, "notifications.json");
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Get the expanded notification spool path
    pub fn get_notifications_path(&self) -> PathBuf {
        utils::expand_path(&self.notifications_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("clarity-config-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir.join("config.toml")
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = toml::from_str("log_filter = \"debug\"").unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.database_path, default_database_path());
        assert_eq!(config.report_command, None);
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn first_load_writes_defaults() {
        let path = temp_config("first-load");
        let config = Config::load_from(&path, utils::Profile::Prod).unwrap();
        assert!(path.exists());
        let reloaded = Config::load_from(&path, utils::Profile::Prod).unwrap();
        assert_eq!(config, reloaded);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn explicit_paths_are_kept() {
        let path = temp_config("explicit");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "database_path = \"/tmp/custom.db\"\nreport_command = \"llm\"\n").unwrap();
        let config = Config::load_from(&path, utils::Profile::Dev).unwrap();
        assert_eq!(config.get_database_path(), PathBuf::from("/tmp/custom.db"));
        assert_eq!(config.report_command.as_deref(), Some("llm"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let path = temp_config("invalid");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "database_path = [").unwrap();
        assert!(matches!(Config::load_from(&path, utils::Profile::Prod), Err(ConfigError::ParseError(_))));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
