//! Application Configuration
//!
//! One JSON file describes where views and logs live and how the runtime
//! mode is decided. Every field has a default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::log::{Log, ModeFlag, RuntimeMode, DEFAULT_MODE_VAR};
use crate::view::{ViewConfig, DEFAULT_EXT, DEFAULT_LAYOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Extension must start with '.': {0:?}")]
    InvalidExtension(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_views_dir")]
    pub views_dir: PathBuf,
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default = "default_ext")]
    pub ext: String,
    /// Fixes the runtime mode. When absent, `mode_var` is consulted on
    /// every check.
    #[serde(default)]
    pub production: Option<bool>,
    #[serde(default = "default_mode_var")]
    pub mode_var: String,
}

fn default_views_dir() -> PathBuf { PathBuf::from("app/views") }
fn default_logs_dir() -> PathBuf { PathBuf::from("app/logs") }
fn default_layout() -> String { DEFAULT_LAYOUT.to_string() }
fn default_ext() -> String { DEFAULT_EXT.to_string() }
fn default_mode_var() -> String { DEFAULT_MODE_VAR.to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            views_dir: default_views_dir(),
            logs_dir: default_logs_dir(),
            layout: default_layout(),
            ext: default_ext(),
            production: None,
            mode_var: default_mode_var(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        if !config.ext.starts_with('.') {
            return Err(ConfigError::InvalidExtension(config.ext));
        }
        Ok(config)
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            views_dir: self.views_dir.clone(),
            layout: self.layout.clone(),
            ext: self.ext.clone(),
        }
    }

    pub fn mode_flag(&self) -> ModeFlag {
        match self.production {
            Some(true) => ModeFlag::Fixed(RuntimeMode::Production),
            Some(false) => ModeFlag::Fixed(RuntimeMode::Development),
            None => ModeFlag::Env(self.mode_var.clone()),
        }
    }

    pub fn logger(&self) -> Log {
        Log::new(&self.logs_dir).with_mode(self.mode_flag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.views_dir, PathBuf::from("app/views"));
        assert_eq!(config.layout, "default");
        assert_eq!(config.ext, ".html");
        assert_eq!(config.mode_flag(), ModeFlag::Env("APP_ENV".to_string()));
    }

    #[test]
    fn test_fixed_production_flag() {
        let config = AppConfig::from_json(r#"{"production": true, "logsDir": "/var/log/app"}"#).unwrap();
        assert_eq!(config.mode_flag(), ModeFlag::Fixed(RuntimeMode::Production));
        assert_eq!(config.logger().dir(), Path::new("/var/log/app"));
    }

    #[test]
    fn test_rejects_extension_without_dot() {
        assert!(matches!(
            AppConfig::from_json(r#"{"ext": "php"}"#),
            Err(ConfigError::InvalidExtension(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("none.json")).unwrap_err();
        assert!(err.to_string().contains("none.json"));
    }
}
