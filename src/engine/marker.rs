//! Pass orchestration for one recording

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::progress::{AbortFlag, ProgressCallback};
use super::session::Session;
use super::{EngineConfig, Pass, PassOutcome};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::planner::gop::KeyframeIndex;
use crate::ports::{DecodePort, LogoSectionPort, MarkRepository};

/// Result of a complete engine run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Final mark sequence
    pub marks: Vec<Mark>,
    /// Passes that ran to completion
    pub passes: Vec<Pass>,
    /// A pass returned early through the abort flag
    pub aborted: bool,
    /// The final sequence differed from the loaded one and was saved
    pub saved: bool,
    pub fps: FrameRate,
}

/// Runs the configured passes over a recording
pub struct MarkEngine {
    config: EngineConfig,
    abort: AbortFlag,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
}

impl MarkEngine {
    pub fn new(config: EngineConfig, abort: AbortFlag) -> Self {
        Self {
            config,
            abort,
            callbacks: Vec::new(),
        }
    }

    /// Add a progress callback handed to every session
    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared flag that stops the running pass
    pub fn abort_flag(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Run the selected passes. Without the detect pass the marks of an
    /// earlier run are loaded from the repository.
    ///
    /// The final sequence is saved whenever it differs from the loaded one,
    /// also when a pass was aborted. Passes after an aborted one do not run.
    pub fn run(
        &self,
        dir: &Path,
        info: RecordingInfo,
        vps_events: Vec<VpsEvent>,
        repository: Box<dyn MarkRepository>,
        decoder: &mut dyn DecodePort,
        sections: &mut dyn LogoSectionPort,
    ) -> Result<RunSummary, DomainError> {
        self.config.tuning.validate()?;
        let passes = self.config.passes;
        info!(
            "Processing {} (channel {}, {} fps, length {}s)",
            dir.display(),
            if info.channel_name.is_empty() { "unknown" } else { info.channel_name.as_str() },
            info.fps.value(),
            info.length_secs
        );

        let fps = info.fps;
        let mut session = Session::new(info, &self.config, repository, self.abort.clone());
        for callback in &self.callbacks {
            session.add_callback(callback.clone());
        }
        if self.config.use_vps {
            if !vps_events.is_empty() {
                debug!("{} VPS events available", vps_events.len());
            }
            session.set_vps_events(vps_events);
        }
        if self.config.backup_marks {
            session.backup();
        }

        decoder.open_recording(dir)?;
        match decoder.keyframes() {
            Ok(keyframes) => session.set_keyframes(KeyframeIndex::new(keyframes)),
            Err(e) => warn!("No keyframe index available: {}", e),
        }

        let mut completed = Vec::new();
        let mut outcome = PassOutcome::Completed;
        if passes.detect {
            outcome = session.run_detect_pass(decoder, sections)?;
            if outcome == PassOutcome::Completed {
                completed.push(Pass::Detect);
            }
        } else {
            session.load_marks()?;
        }

        if outcome == PassOutcome::Completed && passes.overlap {
            decoder.open_recording(dir)?;
            outcome = session.run_overlap_pass(decoder)?;
            if outcome == PassOutcome::Completed {
                completed.push(Pass::Overlap);
            }
        }

        if outcome == PassOutcome::Completed && passes.fine_tune {
            decoder.open_recording(dir)?;
            outcome = session.run_fine_tune_pass(decoder, sections)?;
            if outcome == PassOutcome::Completed {
                completed.push(Pass::FineTune);
            }
        }

        let aborted = outcome == PassOutcome::Aborted;
        if aborted {
            warn!("Processing aborted, saving marks found so far");
        }
        let saved = session.save_final();
        info!("Finished with {} marks", session.marks().len());
        Ok(RunSummary {
            marks: session.marks().to_vec(),
            passes: completed,
            aborted,
            saved,
            fps,
        })
    }
}
