//! Tool Settings
//!
//! User-level defaults for flutter-assemble, stored as TOML in the platform
//! config directory:
//! - flutter SDK location used when a build file omits `flutter-root`
//! - default minimum Android SDK version
//! - default log filter

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.toml";

/// Flutter SDK settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlutterConfig {
    /// Flutter SDK root
    pub root: Option<PathBuf>,
    /// Default minimum Android SDK version
    pub min_sdk_version: Option<u32>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Main tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Configuration version for migrations
    pub version: u32,
    pub flutter: FlutterConfig,
    pub log: LogConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            version: 1,
            flutter: FlutterConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "flutter-assemble", "flutter-assemble")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(SETTINGS_FILE))
    }

    /// Load settings from the default location, falling back to defaults.
    ///
    /// Unlike [`ToolConfig::load_from`], a missing file is not an error.
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| CoreError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            Self::load_from(&config_file).await
        } else {
            info!("Settings file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load settings from an explicit file
    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading settings from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let config: ToolConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save settings to `path`, creating parent directories
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Settings saved to {:?}", path);
        Ok(())
    }

    /// Flutter SDK root, from settings or the `FLUTTER_ROOT` environment variable
    pub fn flutter_root(&self) -> Option<PathBuf> {
        self.flutter
            .root
            .clone()
            .or_else(|| std::env::var_os("FLUTTER_ROOT").map(PathBuf::from))
    }
}
