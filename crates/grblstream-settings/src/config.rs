//! Configuration file handling for GrblStream
//!
//! Supports JSON and TOML files; the format is chosen by file extension.
//! Configuration is organized into two sections:
//! - Connection settings (port, baud rate)
//! - Streaming options applied to the controller before a job

use crate::error::{SettingsError, SettingsResult};
use grblstream_communication::GrblController;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Serial port name, or "Auto"
    pub port: String,
    /// Baud rate for serial connections
    pub baud_rate: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: "Auto".to_string(),
            baud_rate: 115200,
        }
    }
}

/// Streaming options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Feed rate substituted into every F word; -1 disables the override
    pub speed_override: i32,
    /// Print verbose console messages (status reports)
    pub verbose_console: bool,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            speed_override: -1,
            verbose_console: false,
        }
    }
}

impl StreamingSettings {
    /// Push these options into a controller
    pub fn apply(&self, controller: &GrblController) {
        controller.set_speed_override(self.speed_override);
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionSettings,
    pub streaming: StreamingSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    if path.extension().is_some_and(|ext| ext == "json") {
        Ok(Format::Json)
    } else if path.extension().is_some_and(|ext| ext == "toml") {
        Ok(Format::Toml)
    } else {
        Err(SettingsError::UnsupportedFormat(
            path.display().to_string(),
        ))
    }
}

impl Config {
    /// Default config location: `<config dir>/grblstream/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            SettingsError::ConfigDirectory("could not determine config directory".to_string())
        })?;
        Ok(dir.join("grblstream").join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load config from `path`, or the defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        if self.connection.baud_rate == 0 {
            return Err(SettingsError::invalid("baud_rate", "must be > 0"));
        }

        let speed = self.streaming.speed_override;
        if speed != -1 && speed <= 0 {
            return Err(SettingsError::invalid(
                "speed_override",
                format!("must be -1 (disabled) or > 0, got {}", speed),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grblstream_communication::NoOpTransport;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection.port, "Auto");
        assert_eq!(config.connection.baud_rate, 115200);
        assert_eq!(config.streaming.speed_override, -1);
        assert!(!config.streaming.verbose_console);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.connection.baud_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::InvalidSetting { ref key, .. }) if key == "baud_rate"
        ));

        for bad in [0, -2, -100] {
            let mut config = Config::default();
            config.streaming.speed_override = bad;
            assert!(config.validate().is_err(), "{} should be rejected", bad);
        }

        let mut config = Config::default();
        config.streaming.speed_override = 1200;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.connection.port = "/dev/ttyUSB0".to_string();
        config.streaming.speed_override = 800;
        config.streaming.verbose_console = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.connection.baud_rate = 250000;
        config.save_to_file(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.connection.baud_rate, 250000);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[streaming]\nspeed_override = 500\n").unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.streaming.speed_override, 500);
        assert_eq!(loaded.connection, ConnectionSettings::default());
    }

    #[test]
    fn test_invalid_file_contents() {
        let dir = tempdir().unwrap();

        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[connection\nport = ").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(SettingsError::TomlError(_))
        ));

        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(SettingsError::JsonError(_))
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[connection]\nbaud_rate = 0\n").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(SettingsError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        assert!(matches!(
            Config::default().save_to_file(&path),
            Err(SettingsError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Config::load_from_file(&path),
            Err(SettingsError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_or_default() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(Config::load_or_default(&missing).unwrap(), Config::default());

        let missing_file = dir.path().join("missing.json");
        assert!(matches!(
            Config::load_from_file(&missing_file),
            Err(SettingsError::IoError(_))
        ));
    }

    #[test]
    fn test_default_path_file_name() {
        if let Ok(path) = Config::default_path() {
            assert!(path.ends_with("grblstream/config.toml"));
        }
    }

    #[test]
    fn test_apply_sets_speed_override() {
        let controller = GrblController::new(Box::new(NoOpTransport::new()));
        let settings = StreamingSettings {
            speed_override: 750,
            ..Default::default()
        };
        settings.apply(&controller);
        assert_eq!(controller.speed_override(), 750);
    }
}
