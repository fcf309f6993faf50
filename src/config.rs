//! Analyzer configuration loaded from `wp-site-analyzer.toml`

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file name searched for in the working directory and its ancestors
pub const CONFIG_FILE_NAME: &str = "wp-site-analyzer.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scanners memoize their results when enabled
    pub enable_caching: bool,
    /// Scanner cache lifetime in seconds
    pub cache_duration: u64,
    pub batch_size: usize,
    /// Use the in-process object cache in front of the transient store
    pub object_cache: bool,
    /// Where transients, options and snapshots live
    pub data_dir: Option<PathBuf>,
    pub site: SiteSettings,
    pub admin: AdminSettings,
    pub export: ExportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_caching: true,
            cache_duration: 3600,
            batch_size: 100,
            object_cache: false,
            data_dir: None,
            site: SiteSettings::default(),
            admin: AdminSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Remote site access
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSettings {
    pub url: Option<String>,
    pub username: Option<String>,
    pub application_password: Option<String>,
    pub allow_private: bool,
}

/// Operator identity and nonce secret
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSettings {
    pub user: String,
    pub secret: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            user: "admin".to_string(),
            secret: "wp-site-analyzer".to_string(),
        }
    }
}

/// Which export formats may be produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub json: bool,
    pub markdown: bool,
    pub ai_optimized: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            json: true,
            markdown: true,
            ai_optimized: true,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load an explicit config file; errors are returned, not swallowed
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let settings = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// Search the current directory and its ancestors for a config file.
    /// Unreadable or invalid files are logged and defaults are used.
    pub fn discover() -> Self {
        let current = match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("failed to get current directory: {}. Using defaults.", e);
                return Self::default();
            }
        };

        directory_ancestors(current, MAX_TRAVERSAL_DEPTH)
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find_map(|path| try_load(&path))
            .unwrap_or_default()
    }

    /// Directory for transients, options and snapshots
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("wp-site-analyzer")
        })
    }
}

fn try_load(path: &Path) -> Option<Settings> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("failed to read config file {}: {}", path.display(), e);
            }
            return None;
        }
    };

    match Settings::from_toml(&contents) {
        Ok(settings) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            Some(settings)
        }
        Err(e) => {
            tracing::warn!("{} in {}. Using defaults.", e, path.display());
            Some(Settings::default())
        }
    }
}

fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        parent.pop().then_some(parent)
    })
    .take(max_depth)
}
