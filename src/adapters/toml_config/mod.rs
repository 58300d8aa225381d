// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::engine::EngineConfig;
use crate::utils::logging::LoggingConfig;

/// Name of the configuration file
pub const CONFIG_FILE: &str = "admark.toml";

/// Content of `admark.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Engine settings and thresholds
    pub admark: EngineConfig,
    pub logging: LoggingConfig,
}

/// TOML configuration adapter
#[derive(Debug, Clone, Default)]
pub struct TomlConfigAdapter {
    explicit_path: Option<PathBuf>,
}

impl TomlConfigAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapter reading only the given file
    pub fn with_path(path: &Path) -> Self {
        Self {
            explicit_path: Some(path.to_path_buf()),
        }
    }

    /// Per-user config file path, `$XDG_CONFIG_HOME/admark/admark.toml` or
    /// `~/.config/admark/admark.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
            .map(|base| base.join("admark").join(CONFIG_FILE))
    }

    /// Locate the config file: the explicit path, `./admark.toml`, then the
    /// per-user file
    pub fn locate(&self) -> Result<Option<PathBuf>, DomainError> {
        if let Some(path) = &self.explicit_path {
            if !path.is_file() {
                return Err(DomainError::FileNotFound(format!(
                    "Config file does not exist: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.clone()));
        }

        let candidates = std::iter::once(PathBuf::from(CONFIG_FILE)).chain(Self::user_config_path());
        for candidate in candidates {
            debug!("Looking for config file at {}", candidate.display());
            if candidate.is_file() {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Load the located config file, defaults when there is none
    pub fn load(&self) -> Result<ConfigFile, DomainError> {
        match self.locate()? {
            Some(path) => Self::load_file(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(ConfigFile::default())
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<ConfigFile, DomainError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)
            .map_err(|e| DomainError::BadArgs(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse config file content
    pub fn parse(content: &str) -> Result<ConfigFile, DomainError> {
        let config: ConfigFile = toml::from_str(content)
            .map_err(|e| DomainError::BadArgs(format!("Failed to parse TOML config: {}", e)))?;
        config.admark.tuning.validate()?;
        Ok(config)
    }

    /// Write a config file, creating its directory
    pub fn save(path: &Path, config: &ConfigFile) -> Result<(), DomainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)
            .map_err(|e| DomainError::InternalError(format!("TOML serialization failed: {}", e)))?;
        std::fs::write(path, content)?;
        info!("Wrote configuration to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::LogFormat;
    use tempfile::TempDir;

    #[test]
    fn test_parse_partial_config() {
        let config = TomlConfigAdapter::parse(
            r#"
[admark]
backup_marks = true
use_vps = false

[admark.tuning]
astopoffs_secs = 90

[[admark.tuning.channel_overrides]]
channel = "RTL_Television"
silence_range_secs = 8

[logging]
format = "json"
"#,
        )
        .unwrap();
        assert!(config.admark.backup_marks);
        assert!(!config.admark.use_vps);
        assert_eq!(config.admark.tuning.astopoffs_secs, 90);
        assert_eq!(config.admark.tuning.silence_range_for("RTL_Television"), 8);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(config.admark.passes.detect);
    }

    #[test]
    fn test_parse_rejects_invalid_tuning() {
        let result = TomlConfigAdapter::parse("[admark.tuning]\nmax_range_secs = 0\n");
        assert!(matches!(result, Err(DomainError::BadArgs(_))));
        assert!(TomlConfigAdapter::parse("[admark\n").is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = TempDir::new().unwrap();
        let adapter = TomlConfigAdapter::with_path(&dir.path().join("missing.toml"));
        assert!(matches!(adapter.locate(), Err(DomainError::FileNotFound(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf").join(CONFIG_FILE);
        let mut config = ConfigFile::default();
        config.admark.full_decode = true;
        config.admark.threads = 2;
        TomlConfigAdapter::save(&path, &config).unwrap();

        let loaded = TomlConfigAdapter::with_path(&path).load().unwrap();
        assert_eq!(loaded, config);
    }
}
