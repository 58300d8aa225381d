// Mark interactor - Orchestrates mark detection and refinement of a recording

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::adapters::{FrameIndex, FrameIndexDecoder, FrameIndexSections, MarksFileAdapter};
use crate::domain::errors::*;
use crate::engine::{AbortFlag, EngineConfig, MarkEngine, ProgressCallback, RunSummary};
use crate::ports::RecordingInfoPort;

/// Request to mark a recording
#[derive(Debug, Clone)]
pub struct MarkRequest {
    /// Recording directory
    pub recording_dir: PathBuf,
    /// Marks file to write instead of `<dir>/marks`
    pub marks_path: Option<PathBuf>,
    /// Frame index to read instead of `<dir>/frames.json`
    pub frame_index_path: Option<PathBuf>,
}

impl MarkRequest {
    pub fn new(recording_dir: PathBuf) -> Self {
        Self {
            recording_dir,
            marks_path: None,
            frame_index_path: None,
        }
    }
}

/// Interactor for the mark use case
pub struct MarkInteractor {
    info_port: Arc<dyn RecordingInfoPort>,
    config: EngineConfig,
    abort: AbortFlag,
    callbacks: Vec<Arc<dyn ProgressCallback>>,
}

impl MarkInteractor {
    /// Create new mark interactor with injected ports
    pub fn new(info_port: Arc<dyn RecordingInfoPort>, config: EngineConfig, abort: AbortFlag) -> Self {
        Self {
            info_port,
            config,
            abort,
            callbacks: Vec::new(),
        }
    }

    pub fn with_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callbacks.push(callback);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute all configured passes over the recording
    pub fn execute(&self, request: &MarkRequest) -> Result<RunSummary, DomainError> {
        let dir = &request.recording_dir;
        if !dir.is_dir() {
            return Err(DomainError::FileNotFound(format!(
                "Recording directory does not exist: {}",
                dir.display()
            )));
        }

        let info = self.info_port.load_info(dir)?;
        let vps_events = if self.config.use_vps {
            self.info_port.load_vps_events(dir, &info)?
        } else {
            Vec::new()
        };

        let index = match &request.frame_index_path {
            Some(path) => FrameIndex::load_file(path)?,
            None => FrameIndex::load(dir)?,
        };
        let index = Arc::new(index);
        debug!("Decoding with {} threads", self.config.threads);
        let mut decoder = FrameIndexDecoder::new(index.clone());
        let mut sections = FrameIndexSections::new(index);

        let repository = match &request.marks_path {
            Some(path) => MarksFileAdapter::with_path(path, info.fps),
            None => MarksFileAdapter::new(dir, info.fps),
        };
        info!("Writing marks to {}", repository.path().display());

        let mut engine = MarkEngine::new(self.config.clone(), self.abort.clone());
        for callback in &self.callbacks {
            engine = engine.with_callback(callback.clone());
        }
        engine.run(dir, info, vps_events, Box::new(repository), &mut decoder, &mut sections)
    }
}
