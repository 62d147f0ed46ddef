//! Application configuration loaded from a TOML file.
//!
//! Every field has a default, so dirscope runs without a config file and a
//! partial file only overrides what it names.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Top-level application configuration.
///
/// Call [`Config::load`] to read from a TOML path, or
/// [`Config::load_or_default`] for the startup path that never fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sizes: SizesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Key name → action id overrides, merged over the default keymap.
    #[serde(default)]
    pub keys: HashMap<String, String>,
}

impl Config {
    /// Loads configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the file does not exist.
    /// - [`CoreError::PermissionDenied`] if the file is not readable.
    /// - [`CoreError::ConfigParse`] if the TOML is malformed.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::from_io(e, path))?;
        toml::from_str(&content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }

    /// Loads `path`, falling back to defaults when the file is missing or
    /// unreadable. A malformed file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(CoreError::NotFound(_)) => Self::default(),
            Err(e) => {
                tracing::warn!("ignoring config {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// `~/.config/dirscope/config.toml`, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".config").join("dirscope").join("config.toml"))
    }
}

/// General file-browsing preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub show_hidden: bool,
    /// One of `type_name`, `name`, `size`, `modified`, optionally suffixed
    /// with `_desc`.
    #[serde(default = "default_sort")]
    pub default_sort: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            show_hidden: false,
            default_sort: default_sort(),
        }
    }
}

/// Background size computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizesConfig {
    /// Worker threads; 0 means one per available CPU.
    #[serde(default)]
    pub worker_pool_size: usize,
    /// Enqueue every directory as soon as its parent is opened.
    #[serde(default = "default_true")]
    pub auto_compute: bool,
}

impl Default for SizesConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 0,
            auto_compute: true,
        }
    }
}

/// Change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_coalesce_interval_ms")]
    pub coalesce_interval_ms: u64,
    /// Retry with the polling backend when native watching dies.
    #[serde(default = "default_true")]
    pub poll_fallback: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    pub fn coalesce_interval(&self) -> Duration {
        Duration::from_millis(self.coalesce_interval_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            coalesce_interval_ms: default_coalesce_interval_ms(),
            poll_fallback: true,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// File preview pane configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_preview_max_lines")]
    pub max_lines: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_preview_max_bytes(),
            max_lines: default_preview_max_lines(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sort() -> String {
    "type_name".to_string()
}

fn default_coalesce_interval_ms() -> u64 {
    100
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_preview_max_bytes() -> u64 {
    64 * 1024
}

fn default_preview_max_lines() -> usize {
    200
}
