//! Configuration management.
//!
//! Config file location: `~/.config/lxz/config.toml` (per the XDG base
//! directories). Override the location with `LXZ_CONFIG_PATH`. A missing
//! file yields defaults; there is nothing mandatory in here.

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Export behavior defaults.
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory reports are written to. Defaults to the home directory.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Default format for the export subcommand: "json", "txt" or "both".
    #[serde(default)]
    pub format: Option<String>,
}

impl Config {
    /// Load configuration from file, or defaults when no file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("LXZ_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "lxz")
            .context("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Where reports land: configured directory, else home, else the
    /// current directory.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(dir) = &self.export.directory {
            return dir.clone();
        }
        UserDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::default();
        assert!(config.export.directory.is_none());
        assert!(config.export.format.is_none());
    }

    #[test]
    fn export_dir_prefers_configured_directory() {
        let config = Config {
            export: ExportConfig {
                directory: Some(PathBuf::from("/tmp/reports")),
                format: None,
            },
        };
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn config_parses_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[export]\nformat = \"json\"\n").unwrap();
        let content = fs::read_to_string(file.path()).unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config.export.format.as_deref(), Some("json"));
        assert!(config.export.directory.is_none());
    }

    #[test]
    fn empty_toml_is_valid() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.export.directory.is_none());
    }
}
