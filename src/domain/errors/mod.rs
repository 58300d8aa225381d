// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// File not found
    FileNotFound(String),
    /// Invalid file format
    InvalidFormat(String),
    /// The decode/seek service could not reach a frame
    SeekFailed(String),
    /// The decode/seek service failed to deliver frame data
    DecodeFailed(String),
    /// A mark sequence violates the start/stop alternation
    StructuralViolation(String),
    /// Reading or writing a persisted file failed
    Io(String),
    /// Processing was cancelled through the abort flag
    Aborted,
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            DomainError::SeekFailed(msg) => write!(f, "Seek failed: {}", msg),
            DomainError::DecodeFailed(msg) => write!(f, "Decode failed: {}", msg),
            DomainError::StructuralViolation(msg) => write!(f, "Invalid mark sequence: {}", msg),
            DomainError::Io(msg) => write!(f, "I/O failure: {}", msg),
            DomainError::Aborted => write!(f, "Processing aborted"),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DomainError::FileNotFound(err.to_string())
        } else {
            DomainError::Io(err.to_string())
        }
    }
}
