//! Core mark detection engine module

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::model::PassSelection;
use crate::domain::rules::Tuning;

pub mod cleanup;
pub mod finetune;
pub mod logo_changes;
pub mod marker;
pub mod overlap;
pub mod progress;
pub mod session;
pub mod start;
pub mod stop;
#[cfg(test)]
pub(crate) mod test_support;

pub use marker::{MarkEngine, RunSummary};
pub use progress::{AbortFlag, ProgressCallback, TracingProgressCallback};
pub use session::Session;

/// Mark engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Thresholds of the mark rules
    pub tuning: Tuning,
    /// Passes to execute
    pub passes: PassSelection,
    /// Apply VPS events during cleanup
    pub use_vps: bool,
    /// Copy the marks file aside before the first save
    pub backup_marks: bool,
    /// Every frame is decoded, not only keyframes
    pub full_decode: bool,
    /// Decoder threads handed to the decode service
    pub threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tuning: Tuning::default(),
            passes: PassSelection::all(),
            use_vps: true,
            backup_marks: false,
            full_decode: false,
            threads: num_cpus::get(),
        }
    }
}

/// Engine passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pass {
    /// Online boundary detection and cleanup
    Detect,
    /// Overlap refinement
    Overlap,
    /// Silence, black screen and closing credits alignment
    FineTune,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Detect => write!(f, "pass 1 (mark detection)"),
            Pass::Overlap => write!(f, "pass 2 (overlap refinement)"),
            Pass::FineTune => write!(f, "pass 3 (fine tuning)"),
        }
    }
}

/// How a pass ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassOutcome {
    Completed,
    /// Returned early through the abort flag
    Aborted,
}
