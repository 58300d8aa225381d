// Ports - Interface definitions (contracts)

use std::path::Path;

use crate::domain::errors::*;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;

/// Port for the decode/seek service.
///
/// Calls block until the service delivered the requested frame. All frame
/// numbers are zero based; `current_frame_number` is negative before the
/// first frame was read.
pub trait DecodePort {
    /// Open the recording in a directory and rewind to its start
    fn open_recording(&mut self, dir: &Path) -> Result<(), DomainError>;

    /// Advance to the next packet; `false` at the end of the recording
    fn next_frame(&mut self) -> Result<bool, DomainError>;

    /// Position the service so that the next frame read is `frame`
    fn seek_to_frame(&mut self, frame: i32) -> Result<(), DomainError>;

    /// Frame number of the current packet
    fn current_frame_number(&self) -> i32;

    /// Whether the current packet carries video
    fn is_video_frame(&self) -> bool;

    /// Whether the current packet is a keyframe
    fn is_key_frame(&self) -> bool;

    /// Run the detectors on the current frame; `None` when the frame could
    /// not be decoded
    fn classify_current_frame(&mut self, full_decode: bool) -> Result<Option<FrameSample>, DomainError>;

    /// Scan forward from the current position up to `stop_frame` for audio
    /// silence. With `search_backward` the silence closest to `stop_frame`
    /// is returned, otherwise the first one; `want_start` selects the first
    /// silent frame instead of the last one.
    fn next_silence(
        &mut self,
        stop_frame: i32,
        search_backward: bool,
        want_start: bool,
    ) -> Result<Option<i32>, DomainError>;

    /// Keyframe positions of the whole recording in ascending order
    fn keyframes(&mut self) -> Result<Vec<i32>, DomainError>;
}

/// Port for analysis of a logo-free section between two frames
pub trait LogoSectionPort {
    /// Whether the section shows an info overlay over the logo area
    fn is_info_logo(&mut self, from: i32, to: i32) -> Result<bool, DomainError>;

    /// Whether the section shows a changed logo style
    fn is_logo_change(&mut self, from: i32, to: i32) -> Result<bool, DomainError>;

    /// End of closing credits without logo starting at `from`, searched up
    /// to `to`
    fn closing_credits_end(&mut self, from: i32, to: i32) -> Result<Option<i32>, DomainError>;

    /// Advertising in frame inside `[from, to]`: with `after_start` the end of
    /// the first such section, otherwise the begin of the last one
    fn ad_in_frame(&mut self, from: i32, to: i32, after_start: bool) -> Result<Option<i32>, DomainError>;

    /// Begin of the last introduction logo inside `[from, to]`
    fn introduction_logo(&mut self, from: i32, to: i32) -> Result<Option<i32>, DomainError>;
}

/// Port for durable mark storage
pub trait MarkRepository {
    /// Persist the mark sequence
    fn save(&self, marks: &MarkStore, fps: FrameRate) -> Result<(), DomainError>;

    /// Copy the existing marks file aside; a missing file is not an error
    fn backup(&self) -> Result<(), DomainError>;

    /// Restore a persisted mark sequence; empty when none exists
    fn load(&self) -> Result<MarkStore, DomainError>;
}

/// Port for recording metadata
pub trait RecordingInfoPort {
    /// Read the metadata of a recording directory
    fn load_info(&self, dir: &Path) -> Result<RecordingInfo, DomainError>;

    /// Read VPS events of a recording directory; empty when none exist
    fn load_vps_events(&self, dir: &Path, info: &RecordingInfo) -> Result<Vec<VpsEvent>, DomainError>;
}
