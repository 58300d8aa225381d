//! Logging configuration and subscriber setup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use crate::error::{AdmarkError, AdmarkResult};

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level, overridden by `RUST_LOG`
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
    /// Include timestamps
    pub timestamps: bool,
    /// Include target module information
    pub target: bool,
    /// Include line numbers
    pub line_numbers: bool,
    /// Use colored output (if supported)
    pub colored: bool,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directive())
    }
}

impl FromStr for LogLevel {
    type Err = AdmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(AdmarkError::ConfigError {
                message: format!("Unknown log level: {}", other),
            }),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Pretty,
    /// Compact text format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            timestamps: true,
            target: false,
            line_numbers: false,
            colored: true,
        }
    }
}

impl LoggingConfig {
    /// Map the `-v` count of the command line to a level
    pub fn with_verbosity(mut self, verbose: u8) -> Self {
        self.level = match verbose {
            0 => self.level,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        };
        self
    }

    /// Filter from `RUST_LOG`, falling back to the configured level
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.directive()))
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    /// Install the global subscriber. Logs go to stderr so command output on
    /// stdout stays parseable.
    pub fn initialize(&self) -> AdmarkResult<()> {
        let config = &self.config;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(config.env_filter())
            .with_writer(std::io::stderr)
            .with_target(config.target)
            .with_line_number(config.line_numbers)
            .with_ansi(config.colored);

        let result = match (config.format, config.timestamps) {
            (LogFormat::Json, _) => builder.json().try_init(),
            (LogFormat::Pretty, true) => builder.pretty().try_init(),
            (LogFormat::Pretty, false) => builder.pretty().without_time().try_init(),
            (LogFormat::Compact, true) => builder.compact().try_init(),
            (LogFormat::Compact, false) => builder.compact().without_time().try_init(),
        };
        result.map_err(|e| AdmarkError::LoggingError { message: e.to_string() })?;

        tracing::debug!("Logging initialized with level {}", config.level);
        Ok(())
    }

    /// Log version and platform
    pub fn log_system_info(&self) {
        tracing::info!("admark {}", env!("CARGO_PKG_VERSION"));
        tracing::debug!("Platform: {} {}", std::env::consts::OS, std::env::consts::ARCH);
        tracing::debug!("Logging level: {}, format: {:?}", self.config.level, self.config.format);
    }
}

impl Default for LoggingSystem {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}
