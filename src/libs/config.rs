//! Configuration management for the pricis core.
//!
//! Settings are stored as pretty-printed JSON in `config.json` inside the
//! application data directory. A missing file is not an error: the defaults
//! below are used instead, so the application runs without any setup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pricis::libs::config::Config;
//!
//! let mut config = Config::read()?;
//! config.database.max_retries = 5;
//! config.save()?;
//! # Ok::<(), pricis::libs::error::Error>(())
//! ```

use super::data_storage::DataStorage;
use crate::db::connection::{ConnectionOptions, Synchronous};
use crate::db::retry::RetryPolicy;
use crate::libs::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Default database file name.
pub const DB_FILE_NAME: &str = "timetracking.db";

/// Settings for the embedded database and its retry behaviour.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File name of the primary database file.
    pub file_name: String,

    /// Durability mode applied with `PRAGMA synchronous`.
    pub synchronous: Synchronous,

    /// SQLite's own busy handler timeout in milliseconds.
    ///
    /// Zero leaves lock waiting entirely to the retry executor.
    pub busy_timeout_ms: u64,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,

    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,

    /// Insert the default categories when a database file is created.
    pub seed_default_categories: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            file_name: DB_FILE_NAME.to_string(),
            synchronous: Synchronous::Normal,
            busy_timeout_ms: 0,
            max_retries: 3,
            retry_delay_ms: 100,
            seed_default_categories: false,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            synchronous: self.synchronous,
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

/// Root configuration object.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Overrides the resolved application data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    pub database: DatabaseConfig,
}

impl Config {
    /// Builds a default configuration rooted at `dir`. Used by tests and
    /// embedders that manage their own storage location.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Config {
            data_dir: Some(dir.into()),
            database: DatabaseConfig::default(),
        }
    }

    /// Reads `config.json` from the default data directory.
    pub fn read() -> Result<Config> {
        let config_file_path = DataStorage::new().get_path(CONFIG_FILE_NAME)?;

        if !config_file_path.exists() {
            return Ok(Config::default());
        }

        let config_str = fs::read_to_string(config_file_path)?;
        let config: Config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_file_path = self.storage().get_path(CONFIG_FILE_NAME)?;
        let config_file = File::create(config_file_path)?;
        serde_json::to_writer_pretty(&config_file, &self)?;
        Ok(())
    }

    /// The storage location this configuration points at.
    pub fn storage(&self) -> DataStorage {
        match &self.data_dir {
            Some(dir) => DataStorage::at(dir.clone()),
            None => DataStorage::new(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.storage().base_path().join(&self.database.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config = serde_json::from_str(r#"{ "database": { "max_retries": 7 } }"#).unwrap();
        assert_eq!(config.database.max_retries, 7);
        assert_eq!(config.database.retry_delay_ms, 100);
        assert_eq!(config.database.file_name, DB_FILE_NAME);
        assert_eq!(config.database.synchronous, Synchronous::Normal);
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn retry_policy_follows_settings() {
        let policy = DatabaseConfig::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_millis(100));
    }
}
