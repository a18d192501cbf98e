use std::{fs, io, path::Path, path::PathBuf};

use metronome_core::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::paths::ProjectPaths;

pub const APP_NAME: &str = "metronome";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found")]
    NotFound,
    #[error("Failed to parse config: {0}")]
    ParseError(String),
    #[error("IO error reading config: {0}")]
    IoError(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Period of `tick`, in seconds
    pub step: f64,
    /// Fail instead of skipping ticks when a step overruns
    pub strict_timing: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step: 1.0,
            strict_timing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub max_depth: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to `<data_dir>/logs/metronome.log`
    pub file: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub timing: TimingConfig,
    pub diagnostics: DiagnosticsConfig,
    pub logging: LoggingConfig,
}

impl MetronomeConfig {
    pub fn config_path() -> Option<PathBuf> {
        ProjectPaths::new(APP_NAME).map(|paths| paths.config_dir().join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigLoadError::NotFound),
            Err(e) => return Err(ConfigLoadError::IoError(e.to_string())),
        };
        let config =
            toml::from_str(&content).map_err(|e| ConfigLoadError::ParseError(e.to_string()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`MetronomeConfig::load_from`], but a missing file means defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigLoadError> {
        match Self::load_from(path) {
            Err(ConfigLoadError::NotFound) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(matches!(
            MetronomeConfig::load_from(&path),
            Err(ConfigLoadError::NotFound)
        ));
        assert_eq!(
            MetronomeConfig::load_or_default(&path).unwrap(),
            MetronomeConfig::default()
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[timing]\nstep = 0.25\n").unwrap();

        let config = MetronomeConfig::load_from(&path).unwrap();
        assert_eq!(config.timing.step, 0.25);
        assert!(!config.timing.strict_timing);
        assert_eq!(config.diagnostics.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.logging.file);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[timing\nstep = ").unwrap();

        assert!(matches!(
            MetronomeConfig::load_or_default(&path),
            Err(ConfigLoadError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = MetronomeConfig::default();
        config.timing.strict_timing = true;
        config.diagnostics.max_depth = 8;
        config.logging.file = true;
        config.save_to(&path).unwrap();

        assert_eq!(MetronomeConfig::load_from(&path).unwrap(), config);
    }
}
