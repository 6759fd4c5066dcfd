//! Common configuration types shared across OpenTot crates

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up next to the data directory
pub const CONFIG_FILE_NAME: &str = "opentot.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Window presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Integer upscale of the 320×200 frame
    pub scale: u32,
    pub fps: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { scale: 3, fps: 60 }
    }
}

/// Game clock rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Milliseconds per game tick
    pub tick_ms: u64,
    /// Every n-th game tick is also a secondary tick
    pub secondary_divisor: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            secondary_divisor: 2,
        }
    }
}

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the room file, item file and bitmaps
    pub data_dir: PathBuf,
    pub save_dir: PathBuf,
    pub log_level: String,
    /// Room entered on a new game
    pub start_room: u16,
    pub window: WindowConfig,
    pub timing: TimingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self {
            data_dir: cwd.join("game_data"),
            save_dir: cwd.join("saves"),
            log_level: "info".to_string(),
            start_room: 1,
            window: WindowConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a TOML document; missing keys and sections take their defaults
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> String {
        // Every field is a plain value or table; serialising cannot fail
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = AppConfig::parse("start_room = 7\n[window]\nscale = 2\n").unwrap();
        assert_eq!(config.start_room, 7);
        assert_eq!(config.window.scale, 2);
        assert_eq!(config.window.fps, 60);
        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(AppConfig::parse("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_bad_types_are_rejected() {
        assert!(matches!(AppConfig::parse("start_room = \"uno\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("opentot_config_{}.toml", std::process::id()));
        let mut config = AppConfig::default();
        config.timing.tick_ms = 55;
        config.save_dir = PathBuf::from("/tmp/partidas");
        std::fs::write(&path, config.to_toml()).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
        let _ = std::fs::remove_file(&path);
        assert_eq!(AppConfig::load_or_default(&path).unwrap(), AppConfig::default());
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Read { .. })));
    }
}
