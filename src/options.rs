//! Durable option store
//!
//! Named JSON records without expiry, one file per option, so a second
//! process can poll scan progress while a scan is running.

use crate::error::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Scan progress record
pub const PROGRESS_OPTION: &str = "wp_site_analyzer_scan_progress";
/// Copy of the latest scan envelope
pub const BACKUP_OPTION: &str = "wp_site_analyzer_scan_results_backup";
/// Local time of the last completed scan
pub const LAST_SCAN_OPTION: &str = "wp_site_analyzer_last_scan";

const OPTIONS_DIR: &str = "options";

/// File-backed key/value store for options
#[derive(Debug, Clone)]
pub struct OptionStore {
    dir: PathBuf,
}

impl OptionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join(OPTIONS_DIR),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Read an option. Missing or unreadable options are `None`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = std::fs::read_to_string(self.path_for(name)).ok()?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("ignoring unreadable option {}: {}", name, e);
                None
            }
        }
    }

    /// Write an option, replacing any previous value
    pub fn update<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;
        let json = serde_json::to_vec_pretty(value)?;
        let path = self.path_for(name);
        let tmp = self.dir.join(format!(".{}.{}.tmp", name, std::process::id()));
        std::fs::write(&tmp, json).map_err(|e| Error::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Error::io(&path, e))
    }

    /// Remove an option. Returns whether it existed.
    pub fn delete(&self, name: &str) -> bool {
        std::fs::remove_file(self.path_for(name)).is_ok()
    }
}
