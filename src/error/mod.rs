//! Error handling module for admark

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for admark operations
#[derive(Error, Debug)]
pub enum AdmarkError {
    /// Recording directory not found or inaccessible
    #[error("Recording directory not found: {path}")]
    RecordingNotFound { path: String },

    /// Invalid frame timestamp format
    #[error("Invalid timestamp: {time}. Expected H:MM:SS.FF, H:MM:SS or seconds")]
    InvalidTimeFormat { time: String },

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Recording metadata could not be read
    #[error("Failed to read recording info: {message}")]
    RecordingInfoError { message: String },

    /// Marks file could not be parsed
    #[error("Failed to parse marks file: {message}")]
    MarksFileError { message: String },

    /// Mark detection failed
    #[error("Mark detection failed: {message}")]
    DetectionError { message: String },

    /// Cut preparation found an inconsistent mark sequence
    #[error("Cut preparation failed: {message}")]
    CutPlanError { message: String },

    /// Logging setup failed
    #[error("Failed to initialize logging: {message}")]
    LoggingError { message: String },

    /// Engine or port error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for admark operations
pub type AdmarkResult<T> = std::result::Result<T, AdmarkError>;
