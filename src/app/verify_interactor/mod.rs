// Verify interactor - Checks a final mark sequence and prepares the cut plan

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::{FrameIndex, MarksFileAdapter};
use crate::app::inspect_interactor::ReportFormat;
use crate::domain::errors::*;
use crate::planner::gop::KeyframeIndex;
use crate::planner::{CutPlan, CutPlanner};
use crate::ports::{MarkRepository, RecordingInfoPort};
use crate::utils::Utils;

/// Request for cut preparation
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub recording_dir: PathBuf,
    /// Marks file to read instead of `<dir>/marks`
    pub marks_path: Option<PathBuf>,
    /// Align starts to the keyframe before the mark instead of after it
    pub full_decode: bool,
    pub format: ReportFormat,
}

impl VerifyRequest {
    pub fn new(recording_dir: PathBuf) -> Self {
        Self {
            recording_dir,
            marks_path: None,
            full_decode: false,
            format: ReportFormat::Text,
        }
    }
}

/// Response from cut preparation
#[derive(Debug, Clone)]
pub struct VerifyResponse {
    pub plan: CutPlan,
    pub summary: String,
}

/// Interactor for the verify use case
pub struct VerifyInteractor {
    info_port: Arc<dyn RecordingInfoPort>,
}

impl VerifyInteractor {
    /// Create new verify interactor with injected ports
    pub fn new(info_port: Arc<dyn RecordingInfoPort>) -> Self {
        Self { info_port }
    }

    /// Walk the marks pairwise and derive the keep segments
    pub fn execute(&self, request: &VerifyRequest) -> Result<VerifyResponse, DomainError> {
        let dir = &request.recording_dir;
        let info = self.info_port.load_info(dir)?;
        let repository = match &request.marks_path {
            Some(path) => MarksFileAdapter::with_path(path, info.fps),
            None => MarksFileAdapter::new(dir, info.fps),
        };
        let marks = repository.load()?;

        let keyframes = match FrameIndex::load(dir) {
            Ok(index) => KeyframeIndex::new(
                index.samples().iter().filter(|s| s.key_frame).map(|s| s.frame).collect(),
            ),
            Err(e) => {
                warn!("No keyframes available, cutting at mark positions: {}", e);
                KeyframeIndex::default()
            }
        };

        let plan = CutPlanner::plan(&marks, &keyframes, info.fps, request.full_decode)?;
        info!("Mark sequence of {} is consistent", dir.display());

        let summary = match request.format {
            ReportFormat::Json => serde_json::to_string_pretty(&plan)
                .map_err(|e| DomainError::InternalError(format!("JSON serialization failed: {}", e)))?,
            ReportFormat::Text => Self::format_as_text(&plan),
        };
        Ok(VerifyResponse { plan, summary })
    }

    fn format_as_text(plan: &CutPlan) -> String {
        let mut output = String::new();
        output.push_str(&format!("Segments: {}\n", plan.segments.len()));
        for (i, segment) in plan.segments.iter().enumerate() {
            output.push_str(&format!(
                "  #{}: {} ({}) - {} ({})  {} -> {}\n",
                i + 1,
                segment.start_time,
                segment.start_frame,
                segment.stop_time,
                segment.stop_frame,
                segment.start_type,
                segment.stop_type
            ));
        }
        output.push_str(&format!(
            "Total kept: {}\n",
            Utils::format_duration(std::time::Duration::from_secs_f64(plan.total_secs.max(0.0)))
        ));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingInfoAdapter;
    use tempfile::TempDir;

    fn recording(marks: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("recording.toml"), "[recording]\nfps = 25.0\n").unwrap();
        std::fs::write(dir.path().join("marks"), marks).unwrap();
        dir
    }

    #[test]
    fn test_plan_from_marks_file() {
        let dir = recording("0:01:00.00 (1500) LOGOSTART\n0:11:00.00 (16500) LOGOSTOP\n");
        let interactor = VerifyInteractor::new(Arc::new(RecordingInfoAdapter::new()));
        let response = interactor
            .execute(&VerifyRequest::new(dir.path().to_path_buf()))
            .unwrap();
        assert_eq!(response.plan.segments.len(), 1);
        assert_eq!(response.plan.segments[0].start_frame, 1500);
        assert!(response.summary.contains("Segments: 1"));
        assert!(response.summary.contains("Total kept: 10:00."));
    }

    #[test]
    fn test_consecutive_starts_fail() {
        let dir = recording("0:01:00.00 (1500) LOGOSTART\n0:02:00.00 (3000) VPSSTART\n0:11:00.00 (16500) LOGOSTOP\n");
        let interactor = VerifyInteractor::new(Arc::new(RecordingInfoAdapter::new()));
        let result = interactor.execute(&VerifyRequest::new(dir.path().to_path_buf()));
        assert!(matches!(result, Err(DomainError::StructuralViolation(_))));
    }
}
