//! admark library
//!
//! Finds the broadcast parts of recorded TV programs. Per-frame detector
//! events (logo, black screen, borders, aspect ratio, audio channels) are
//! turned into start/stop marks, cleaned up, refined by overlap matching
//! and aligned to silence, black screens and closing credits.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::marks::MarkStore;
pub use domain::model::{Mark, MarkClass, MarkType, RecordingInfo, Strength};
pub use engine::{AbortFlag, EngineConfig, MarkEngine, RunSummary};
pub use error::{AdmarkError, AdmarkResult};
