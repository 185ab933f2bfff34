//! Storage location resolution and the writability check run before first open.

use crate::libs::error::{Error, Result};
use std::env::consts::OS;
use std::env::var;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const APP_NAME: &str = "pricis";

/// Environment variable that overrides the default data directory.
pub const DATA_DIR_ENV: &str = "PRICIS_DATA_DIR";

const WRITE_CHECK_FILE: &str = ".write_check.tmp";

#[derive(Debug, Clone)]
pub struct DataStorage {
    base_path: PathBuf,
}

impl DataStorage {
    /// Resolves the per-OS application data directory, honouring
    /// `PRICIS_DATA_DIR` when it is set.
    pub fn new() -> Self {
        if let Ok(dir) = var(DATA_DIR_ENV) {
            return Self::at(dir);
        }

        let base_path = match OS {
            "windows" => var("LOCALAPPDATA").unwrap_or_else(|_| ".".into()),
            "macos" => var("HOME").unwrap_or_else(|_| ".".into()) + "/Library/Application Support",
            _ => var("HOME").unwrap_or_else(|_| ".".into()) + "/.local/share",
        };

        Self {
            base_path: Path::new(&base_path).join(APP_NAME),
        }
    }

    pub fn at(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path of `file_name` inside the data directory, creating
    /// the directory if needed.
    pub fn get_path(&self, file_name: &str) -> Result<PathBuf> {
        if !self.base_path.exists() {
            fs::create_dir_all(&self.base_path).map_err(|source| Error::StorageUnavailable {
                path: self.base_path.clone(),
                source,
            })?;
        }
        Ok(self.base_path.join(file_name))
    }

    /// Confirms the directory is writable by creating, writing and deleting
    /// a scratch file.
    pub fn ensure_writable(&self) -> Result<()> {
        let permission_denied = |source| Error::PermissionDenied {
            path: self.base_path.clone(),
            source,
        };

        fs::create_dir_all(&self.base_path).map_err(permission_denied)?;
        let scratch = self.base_path.join(WRITE_CHECK_FILE);
        fs::write(&scratch, b"pricis").map_err(permission_denied)?;
        fs::remove_file(&scratch).map_err(permission_denied)?;

        debug!(path = %self.base_path.display(), "data directory is writable");
        Ok(())
    }
}

impl Default for DataStorage {
    fn default() -> Self {
        Self::new()
    }
}
