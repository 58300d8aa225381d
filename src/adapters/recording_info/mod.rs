// Recording info adapter - Reads recording metadata from recording.toml

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::adapters::vps_log;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::RecordingInfoPort;

/// Name of the metadata file inside a recording directory
pub const RECORDING_INFO_FILE: &str = "recording.toml";

#[derive(Debug, Deserialize)]
struct InfoFile {
    recording: RecordingTable,
}

#[derive(Debug, Deserialize)]
struct RecordingTable {
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    aspect: Option<String>,
    #[serde(default)]
    hd_video: Option<bool>,
    #[serde(default)]
    length_secs: Option<i32>,
    #[serde(default)]
    pre_timer_secs: Option<i32>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    audio_channels: Option<u8>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
}

/// Recording metadata adapter
#[derive(Debug, Default, Clone)]
pub struct RecordingInfoAdapter;

impl RecordingInfoAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Parse the content of a `recording.toml`
    pub fn parse(content: &str) -> Result<RecordingInfo, DomainError> {
        let file: InfoFile = toml::from_str(content)
            .map_err(|e| DomainError::InvalidFormat(format!("{}: {}", RECORDING_INFO_FILE, e)))?;
        let table = file.recording;
        let defaults = RecordingInfo::default();

        let fps = match table.fps {
            Some(fps) => FrameRate::new(fps)?,
            None => defaults.fps,
        };
        let aspect_ratio = table.aspect.as_deref().map(str::parse::<AspectRatio>).transpose()?;

        Ok(RecordingInfo {
            fps,
            aspect_ratio,
            hd_video: table.hd_video.unwrap_or(defaults.hd_video),
            length_secs: table.length_secs.unwrap_or(defaults.length_secs).max(0),
            pre_timer_secs: table.pre_timer_secs.unwrap_or(defaults.pre_timer_secs),
            channel_name: table.channel.unwrap_or_default(),
            audio_channels: table.audio_channels.unwrap_or(defaults.audio_channels),
            recording_start: table.start,
        })
    }
}

impl RecordingInfoPort for RecordingInfoAdapter {
    fn load_info(&self, dir: &Path) -> Result<RecordingInfo, DomainError> {
        let path = dir.join(RECORDING_INFO_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| DomainError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let info = Self::parse(&content)?;
        info!(
            "Recording on '{}': {} fps, length {}s, pre-timer {}s",
            info.channel_name,
            info.fps.value(),
            info.length_secs,
            info.pre_timer_secs
        );
        Ok(info)
    }

    fn load_vps_events(&self, dir: &Path, info: &RecordingInfo) -> Result<Vec<VpsEvent>, DomainError> {
        let events = vps_log::load(dir, info.recording_start)?;
        for event in &events {
            debug!("VPS event {} at {}s", event.kind.tag(), event.offset_secs);
        }
        Ok(events)
    }
}
