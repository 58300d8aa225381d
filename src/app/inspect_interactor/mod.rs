// Inspect interactor - Lists the marks of a recording

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::adapters::MarksFileAdapter;
use crate::domain::errors::*;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::ports::{MarkRepository, RecordingInfoPort};
use crate::utils::time::frame_to_timestamp;

/// Output format of the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Request for mark inspection
#[derive(Debug, Clone)]
pub struct InspectRequest {
    pub recording_dir: PathBuf,
    /// Marks file to read instead of `<dir>/marks`
    pub marks_path: Option<PathBuf>,
    pub format: ReportFormat,
}

impl InspectRequest {
    pub fn new(recording_dir: PathBuf) -> Self {
        Self {
            recording_dir,
            marks_path: None,
            format: ReportFormat::Text,
        }
    }

    pub fn with_format(recording_dir: PathBuf, format: ReportFormat) -> Self {
        Self {
            format,
            ..Self::new(recording_dir)
        }
    }
}

/// One listed mark
#[derive(Debug, Clone, Serialize)]
pub struct MarkEntry {
    pub position: i32,
    pub timestamp: String,
    pub mark_type: MarkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Marks of a recording with derived totals
#[derive(Debug, Clone, Serialize)]
pub struct MarksReport {
    pub recording_dir: String,
    pub channel: String,
    pub fps: f64,
    pub marks: Vec<MarkEntry>,
    /// Seconds between start marks and their following stop marks
    pub broadcast_secs: f64,
}

/// Response from mark inspection
#[derive(Debug, Clone)]
pub struct InspectResponse {
    pub report: MarksReport,
    /// Rendered listing in the requested format
    pub summary: String,
}

/// Interactor for the inspect use case
pub struct InspectInteractor {
    info_port: Arc<dyn RecordingInfoPort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(info_port: Arc<dyn RecordingInfoPort>) -> Self {
        Self { info_port }
    }

    /// Execute mark inspection
    pub fn execute(&self, request: &InspectRequest) -> Result<InspectResponse, DomainError> {
        let dir = &request.recording_dir;
        if !dir.is_dir() {
            return Err(DomainError::FileNotFound(format!(
                "Recording directory does not exist: {}",
                dir.display()
            )));
        }

        let info = match self.info_port.load_info(dir) {
            Ok(info) => info,
            Err(e) => {
                warn!("Using default recording info: {}", e);
                RecordingInfo::default()
            }
        };
        let repository = match &request.marks_path {
            Some(path) => MarksFileAdapter::with_path(path, info.fps),
            None => MarksFileAdapter::new(dir, info.fps),
        };
        let marks = repository.load()?;
        info!("Inspecting {} marks of {}", marks.len(), dir.display());

        let report = Self::build_report(dir.display().to_string(), &info, &marks);
        let summary = match request.format {
            ReportFormat::Json => serde_json::to_string_pretty(&report)
                .map_err(|e| DomainError::InternalError(format!("JSON serialization failed: {}", e)))?,
            ReportFormat::Text => Self::format_as_text(&report),
        };
        Ok(InspectResponse { report, summary })
    }

    fn build_report(recording_dir: String, info: &RecordingInfo, marks: &MarkStore) -> MarksReport {
        let entries = marks
            .iter()
            .map(|mark| MarkEntry {
                position: mark.position,
                timestamp: frame_to_timestamp(mark.position, info.fps),
                mark_type: mark.mark_type,
                comment: mark.comment.clone(),
            })
            .collect();

        let mut broadcast_frames = 0i64;
        let mut open_start: Option<i32> = None;
        for mark in marks.iter() {
            match (mark.is_start(), open_start) {
                (true, None) => open_start = Some(mark.position),
                (false, Some(start)) => {
                    broadcast_frames += i64::from(mark.position - start);
                    open_start = None;
                }
                _ => {}
            }
        }

        MarksReport {
            recording_dir,
            channel: info.channel_name.clone(),
            fps: info.fps.value(),
            marks: entries,
            broadcast_secs: broadcast_frames as f64 / info.fps.value(),
        }
    }

    /// Format the report as human-readable text
    fn format_as_text(report: &MarksReport) -> String {
        let mut output = String::new();
        output.push_str(&format!("Recording: {}\n", report.recording_dir));
        if !report.channel.is_empty() {
            output.push_str(&format!("  Channel: {}\n", report.channel));
        }
        output.push_str(&format!("  Frame rate: {} fps\n", report.fps));
        output.push_str(&format!("  Marks: {}\n", report.marks.len()));
        output.push_str(&format!("  Broadcast length: {:.1}s\n", report.broadcast_secs));

        if !report.marks.is_empty() {
            output.push('\n');
        }
        for entry in &report.marks {
            output.push_str(&format!(
                "{} ({:>7}) {:<16} {}\n",
                entry.timestamp,
                entry.position,
                entry.mark_type.code(),
                entry.comment.as_deref().unwrap_or("")
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingInfoAdapter;
    use tempfile::TempDir;

    fn recording_with_marks() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("recording.toml"),
            "[recording]\nchannel = \"arte\"\nlength_secs = 600\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("marks"),
            "0:01:00.00 (1500) LOGOSTART detected logo start (1500)*\n0:11:00.00 (16500) LOGOSTOP\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_text_listing() {
        let dir = recording_with_marks();
        let interactor = InspectInteractor::new(Arc::new(RecordingInfoAdapter::new()));
        let response = interactor
            .execute(&InspectRequest::new(dir.path().to_path_buf()))
            .unwrap();
        assert_eq!(response.report.marks.len(), 2);
        assert!((response.report.broadcast_secs - 600.0).abs() < 1e-9);
        assert!(response.summary.contains("Channel: arte"));
        assert!(response.summary.contains("0:01:00.00 (   1500) LOGOSTART"));
    }

    #[test]
    fn test_json_listing() {
        let dir = recording_with_marks();
        let interactor = InspectInteractor::new(Arc::new(RecordingInfoAdapter::new()));
        let request = InspectRequest::with_format(dir.path().to_path_buf(), ReportFormat::Json);
        let response = interactor.execute(&request).unwrap();
        let value: serde_json::Value = serde_json::from_str(&response.summary).unwrap();
        assert_eq!(value["marks"][1]["mark_type"], "LOGOSTOP");
        assert_eq!(value["marks"][1]["timestamp"], "0:11:00.00");
        assert!(value["marks"][1].get("comment").is_none());
    }

    #[test]
    fn test_missing_recording_info_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let interactor = InspectInteractor::new(Arc::new(RecordingInfoAdapter::new()));
        let response = interactor
            .execute(&InspectRequest::new(dir.path().to_path_buf()))
            .unwrap();
        assert!(response.report.marks.is_empty());
        assert_eq!(response.report.fps, 25.0);
    }
}
