//! Configuration management for Folio.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{FolioError, Result};
use crate::sort::{SortDirection, SortKey, SortSpec};
use crate::window::{
    ViewMode, VirtualLayout, DEFAULT_BUFFER_ROWS, DEFAULT_PAGE_SIZE, DEFAULT_ROW_HEIGHT,
    DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIRTUAL_THRESHOLD,
};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure for Folio.
///
/// ## Example Configuration File (folio.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
/// data_dir = "/home/me/library"
/// items_file = "items.json"
/// collections_file = "collections.json"
///
/// [view]
/// page_size = 25
/// virtual_threshold = 200
/// row_height = 48
/// viewport_height = 720
/// buffer_rows = 5
/// default_sort = "year"
/// default_direction = "desc"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Windowing and sort defaults
    pub view: ViewConfig,
}

/// General configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Directory holding the datasets (None = default data location)
    pub data_dir: Option<PathBuf>,

    /// Item dataset file name, relative to the data directory
    pub items_file: String,

    /// Collection dataset file name, relative to the data directory
    pub collections_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            data_dir: None,
            items_file: "items.json".to_string(),
            collections_file: "collections.json".to_string(),
        }
    }
}

/// View configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Rows per page in paged mode
    pub page_size: usize,

    /// Datasets with more records than this use virtual scrolling
    pub virtual_threshold: usize,

    /// Row height in virtual mode
    pub row_height: u32,

    /// Initial viewport height in virtual mode
    pub viewport_height: u32,

    /// Rows rendered above and below the viewport
    pub buffer_rows: usize,

    /// Sort key when none is chosen
    pub default_sort: String,

    /// Sort direction when none is chosen
    pub default_direction: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            page_size: DEFAULT_PAGE_SIZE,
            virtual_threshold: DEFAULT_VIRTUAL_THRESHOLD,
            row_height: DEFAULT_ROW_HEIGHT,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            buffer_rows: DEFAULT_BUFFER_ROWS,
            default_sort: SortKey::default().as_str().to_string(),
            default_direction: SortDirection::default().as_str().to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| FolioError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| FolioError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "folio").ok_or_else(|| FolioError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("folio.toml"))
    }

    /// Get the default data directory path.
    pub fn default_data_dir() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "folio").ok_or_else(|| FolioError::ConfigError {
            reason: "Could not determine data directory".to_string(),
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }

    /// Get the dataset directory (from config or default).
    pub fn data_dir(&self) -> Result<PathBuf> {
        match self.general.data_dir {
            Some(ref path) => Ok(path.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Full path of the item dataset.
    pub fn items_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.general.items_file))
    }

    /// Full path of the collection dataset.
    pub fn collections_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.general.collections_file))
    }

    /// Default sort; unparseable settings fall back to title ascending.
    pub fn default_sort(&self) -> SortSpec {
        let key = self.view.default_sort.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid default sort in config");
            SortKey::default()
        });
        let direction = self.view.default_direction.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid default direction in config");
            SortDirection::default()
        });
        SortSpec::new(key, direction)
    }

    /// Virtual scrolling geometry.
    pub fn layout(&self) -> VirtualLayout {
        VirtualLayout::new(
            self.view.row_height,
            self.view.viewport_height,
            self.view.buffer_rows,
        )
    }

    /// Pick the window mode for a dataset of `item_count` records.
    pub fn view_mode(&self, item_count: usize) -> ViewMode {
        ViewMode::select(
            item_count,
            self.view.virtual_threshold,
            self.view.page_size,
            self.layout(),
        )
    }
}
