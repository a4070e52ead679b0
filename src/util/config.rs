//! Tool settings for keelson.
//!
//! Settings are read from two locations:
//! - Global: `~/.keelson/config.toml` - user-wide defaults
//! - Project: `.keelson/config.toml` - project-specific overrides
//!
//! Project settings take precedence over global settings. These files
//! configure the tool itself; the cluster document is separate.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default name of the external provisioning binary.
pub const DEFAULT_EXECUTOR_BINARY: &str = "terraform";

/// keelson settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// External executor settings
    pub executor: ExecutorSettings,

    /// Validation settings
    pub validate: ValidateSettings,
}

/// External executor settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Path or name of the terraform binary
    pub binary: Option<PathBuf>,

    /// Value passed as `-parallelism=N`
    pub parallelism: Option<u32>,
}

/// Validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateSettings {
    /// Treat warning diagnostics as fatal. Unset means off.
    pub deny_warnings: Option<bool>,
}

impl Settings {
    /// Load settings from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse settings file: {}", path.display()))
    }

    /// Load settings with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load settings from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another settings value into this one (other takes precedence).
    pub fn merge(&mut self, other: Settings) {
        if other.executor.binary.is_some() {
            self.executor.binary = other.executor.binary;
        }
        if other.executor.parallelism.is_some() {
            self.executor.parallelism = other.executor.parallelism;
        }
        if other.validate.deny_warnings.is_some() {
            self.validate.deny_warnings = other.validate.deny_warnings;
        }
    }

    /// Whether warnings fail validation.
    pub fn deny_warnings(&self) -> bool {
        self.validate.deny_warnings.unwrap_or(false)
    }

    /// The executor binary to use.
    pub fn executor_binary(&self) -> PathBuf {
        self.executor
            .binary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTOR_BINARY))
    }
}

/// Get the global keelson directory (~/.keelson).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keelson"))
}

/// Get the global settings path (~/.keelson/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project settings path (.keelson/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".keelson").join("config.toml")
}

/// Load merged settings from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project settings (.keelson/config.toml)
/// 2. Global settings (~/.keelson/config.toml)
/// 3. Defaults
pub fn load_settings(global_path: Option<&Path>, project_path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            settings.merge(Settings::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        settings.merge(Settings::load_or_default(project_path));
    }

    settings
}
