//! Processing session: recording context, check positions and online mark
//! insertion

use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

use super::progress::{AbortFlag, PassProgress, ProgressCallback};
use super::{EngineConfig, Pass, PassOutcome};
use crate::domain::errors::DomainError;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::domain::pairs::LogoPairEvaluator;
use crate::domain::rules::{MarkConflictPolicy, Tuning};
use crate::planner::gop::KeyframeIndex;
use crate::ports::{DecodePort, LogoSectionPort, MarkRepository};
use crate::utils::time::frame_to_timestamp;

/// Frame positions steering boundary selection.
///
/// `i_start` and `i_stop` are negative until the frame loop passed them and
/// zero once the matching boundary was selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckPositions {
    pub i_start: i32,
    pub i_stop: i32,
    /// Assumed broadcast start
    pub i_start_a: i32,
    /// Assumed broadcast end
    pub i_stop_a: i32,
    /// Frame after which the start is selected
    pub chk_start: i32,
    /// Frame after which the end is selected
    pub chk_stop: i32,
}

/// Which detector events are fed into the mark store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorFlags {
    /// Picture based detectors (logo, borders, black screen) are used
    pub decode_video: bool,
    pub ignore_aspect: bool,
    pub ignore_logo: bool,
    pub ignore_black: bool,
    pub ignore_hborder: bool,
    pub ignore_vborder: bool,
}

impl Default for DetectorFlags {
    fn default() -> Self {
        Self {
            decode_video: true,
            ignore_aspect: false,
            ignore_logo: false,
            ignore_black: false,
            ignore_hborder: false,
            ignore_vborder: false,
        }
    }
}

impl DetectorFlags {
    /// Stop picture analysis; aspect and channel events still arrive
    pub fn disable_video(&mut self) {
        self.decode_video = false;
        self.ignore_logo = true;
        self.ignore_black = true;
    }

    /// Whether an event of this type is accepted
    pub fn accepts(&self, mark_type: MarkType) -> bool {
        match mark_type.strength {
            Strength::Logo => self.decode_video && !self.ignore_logo,
            Strength::BlackScreen => self.decode_video && !self.ignore_black,
            Strength::HBorder => self.decode_video && !self.ignore_hborder,
            Strength::VBorder => self.decode_video && !self.ignore_vborder,
            Strength::Aspect => !self.ignore_aspect,
            _ => true,
        }
    }
}

/// State of one recording across all passes
pub struct Session {
    pub(crate) info: RecordingInfo,
    pub(crate) tuning: Tuning,
    pub(crate) full_decode: bool,
    pub(crate) positions: CheckPositions,
    pub(crate) detectors: DetectorFlags,
    pub(crate) marks: MarkStore,
    pub(crate) black_marks: MarkStore,
    pub(crate) in_broadcast: bool,
    pub(crate) got_end_mark: bool,
    /// Detectors were re-enabled for the end part
    pub(crate) restart_done: bool,
    pub(crate) frame_current: i32,
    pub(crate) iframe_current: i32,
    pub(crate) iframe_before: i32,
    /// Aspect ratio observed in the video
    pub(crate) video_aspect: Option<AspectRatio>,
    /// Audio channel count observed in the audio
    pub(crate) audio_channels: Option<u8>,
    pub(crate) channel_change: bool,
    pub(crate) has_border: bool,
    pub(crate) aspect_checked: bool,
    pub(crate) evaluator: Option<LogoPairEvaluator>,
    pub(crate) keyframes: KeyframeIndex,
    pub(crate) vps_events: Vec<VpsEvent>,
    repository: Box<dyn MarkRepository>,
    abort: AbortFlag,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
    initial: MarkStore,
}

impl Session {
    /// Create a session for one recording
    pub fn new(
        info: RecordingInfo,
        config: &EngineConfig,
        repository: Box<dyn MarkRepository>,
        abort: AbortFlag,
    ) -> Self {
        Self {
            info,
            tuning: config.tuning.clone(),
            full_decode: config.full_decode,
            positions: CheckPositions::default(),
            detectors: DetectorFlags::default(),
            marks: MarkStore::new(),
            black_marks: MarkStore::new(),
            in_broadcast: false,
            got_end_mark: false,
            restart_done: false,
            frame_current: -1,
            iframe_current: -1,
            iframe_before: -1,
            video_aspect: None,
            audio_channels: None,
            channel_change: false,
            has_border: false,
            aspect_checked: false,
            evaluator: None,
            keyframes: KeyframeIndex::default(),
            vps_events: Vec::new(),
            repository,
            abort,
            callbacks: Arc::new(Mutex::new(Vec::new())),
            initial: MarkStore::new(),
        }
    }

    /// Add a progress callback
    pub fn add_callback(&mut self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    pub fn marks(&self) -> &MarkStore {
        &self.marks
    }

    pub fn black_marks(&self) -> &MarkStore {
        &self.black_marks
    }

    pub fn positions(&self) -> CheckPositions {
        self.positions
    }

    pub fn detectors(&self) -> DetectorFlags {
        self.detectors
    }

    pub fn info(&self) -> &RecordingInfo {
        &self.info
    }

    pub fn in_broadcast(&self) -> bool {
        self.in_broadcast
    }

    pub fn got_end_mark(&self) -> bool {
        self.got_end_mark
    }

    pub fn fps(&self) -> FrameRate {
        self.info.fps
    }

    /// Search range in frames
    pub fn delta(&self) -> i32 {
        self.tuning.delta(self.info.fps)
    }

    pub fn set_keyframes(&mut self, keyframes: KeyframeIndex) {
        self.keyframes = keyframes;
    }

    pub fn set_vps_events(&mut self, events: Vec<VpsEvent>) {
        self.vps_events = events;
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    pub(crate) fn start_progress(&self, pass: Pass, total_frames: Option<u64>) -> PassProgress {
        PassProgress::start(pass, total_frames, self.callbacks.clone())
    }

    /// Restore marks of an earlier run for the refinement passes
    pub fn load_marks(&mut self) -> Result<(), DomainError> {
        self.marks = self.repository.load()?;
        self.initial = self.marks.clone();
        self.got_end_mark = true;
        info!("Loaded {} marks", self.marks.len());
        Ok(())
    }

    /// Copy the marks file aside
    pub fn backup(&self) {
        if let Err(e) = self.repository.backup() {
            warn!("Failed to back up marks file: {}", e);
        }
    }

    /// Persist the mark sequence; failures are logged and processing goes on
    pub fn save(&self) {
        if let Err(e) = self.repository.save(&self.marks, self.info.fps) {
            error!("Failed to save marks: {}", e);
        }
    }

    /// Persist the final sequence when this run changed it
    pub fn save_final(&self) -> bool {
        if self.marks == self.initial {
            debug!("Marks unchanged, nothing to save");
            return false;
        }
        self.save();
        true
    }

    pub(crate) fn debug_marks(&self, context: &str) {
        debug!("{}: {} marks\n{}", context, self.marks.len(), self.marks);
    }

    pub(crate) fn timestamp(&self, frame: i32) -> String {
        frame_to_timestamp(frame, self.info.fps)
    }

    /// Derive the check positions from the frame the broadcast is assumed
    /// to start at
    pub fn calculate_check_positions(&mut self, start_frame: i32) {
        let fps = self.info.fps;
        let mut start = start_frame;
        debug!("Calculate check positions from start frame ({})", start);

        if self.info.length_secs <= 0 {
            info!(
                "Recording length unknown, assume {}s",
                self.tuning.unknown_length_secs
            );
            self.info.length_secs = self.tuning.unknown_length_secs;
            start = fps.frames(self.tuning.unknown_length_start_secs as f64);
        }

        if start < 0 {
            info!("Recording started too late, set start mark to start of recording");
            self.add_event(&CandidateEvent::new(MarkType::RECORDING_START, 1));
            start = fps.frames(self.tuning.late_start_secs as f64);
        }

        let length = self.info.length_secs as f64;
        let delta = self.delta();
        let positions = &mut self.positions;
        positions.i_start = -start;
        positions.i_stop = -(start + fps.frames(length));
        positions.i_start_a = start;
        positions.i_stop_a = start + fps.frames(length + self.tuning.astopoffs_secs as f64);
        positions.chk_start = positions.i_start_a + 4 * delta;
        positions.chk_stop = start + fps.frames(length + self.tuning.posttimer_secs as f64);

        debug!(
            "Assumed start ({}) stop ({}), check start at ({}) stop at ({})",
            positions.i_start_a, positions.i_stop_a, positions.chk_start, positions.chk_stop
        );
    }

    /// Insert a detector event into the mark store
    pub fn add_event(&mut self, event: &CandidateEvent) {
        if self.got_end_mark {
            return;
        }
        let mark_type = event.mark_type;
        let position = event.position;

        if mark_type == MarkType::CHANNEL_START {
            self.channel_change = true;
        }
        if mark_type == MarkType::CHANNEL_STOP {
            let positions = self.positions;
            if position > positions.chk_start
                && position < positions.i_stop_a / 2
                && !self.channel_change
            {
                debug!(
                    "First audio channel change ({}) after check start, disable picture and aspect detection",
                    position
                );
                if positions.i_start == 0 {
                    if let Some(first) = self.marks.first(MarkFilter::Any).map(|m| m.position) {
                        self.marks.delete_weak_in_range(first, i32::MAX, Strength::Channel);
                    }
                }
                self.detectors.disable_video();
                self.detectors.ignore_aspect = true;
            }
            self.channel_change = true;
        }

        let is_black = mark_type.strength == Strength::BlackScreen;
        let prev = self
            .marks
            .iter()
            .rev()
            .find(|m| m.strength() != Strength::BlackScreen)
            .cloned();
        if let Some(prev) = prev {
            if prev.mark_type.class == mark_type.class && prev.strength() != mark_type.strength {
                let window = MarkConflictPolicy::window_secs(
                    &self.tuning,
                    self.positions.i_start == 0,
                    self.restart_done,
                );
                let diff = self.info.fps.secs((position - prev.position).abs());
                if diff < window {
                    if MarkConflictPolicy::survivor(prev.mark_type, mark_type) == prev.mark_type {
                        info!(
                            "Previous mark ({}) {} stronger than new mark ({}) {} with distance {}s, dropping new mark",
                            prev.position, prev.mark_type, position, mark_type, diff
                        );
                        if is_black {
                            self.black_marks.add(mark_type, position, None, false);
                        }
                        return;
                    }
                    info!(
                        "New mark ({}) {} stronger than previous mark ({}) {} with distance {}s, deleting previous mark",
                        position, mark_type, prev.position, prev.mark_type, diff
                    );
                    if prev.strength() == Strength::BlackScreen {
                        self.black_marks.add(prev.mark_type, prev.position, None, false);
                    }
                    self.marks.delete(prev.position);
                }
            }
        }

        if !is_black {
            let waits_for_channel_start = mark_type <= MarkType::ASPECT_START
                && self.marks.prev(position, MarkType::CHANNEL_STOP.into()).is_some()
                && self.marks.prev(position, MarkType::CHANNEL_START.into()).is_some();
            if !waits_for_channel_start {
                self.in_broadcast = mark_type.is_start();
            }
        }

        let comment = event.describe();
        if is_black {
            debug!(
                "{} at {} in broadcast: {}",
                comment,
                self.timestamp(position),
                self.in_broadcast
            );
            self.black_marks.add(mark_type, position, None, self.in_broadcast);
        } else {
            info!(
                "{} at {} in broadcast: {}",
                comment,
                self.timestamp(position),
                self.in_broadcast
            );
        }
        self.marks.add(mark_type, position, Some(comment), self.in_broadcast);

        if self.positions.i_start == 0 {
            self.save();
        }
    }

    /// Feed one classified frame; `false` ends the detection loop
    pub fn process_frame(&mut self, sample: &FrameSample, sections: &mut dyn LogoSectionPort) -> bool {
        let frame = sample.frame;
        self.frame_current = frame;
        if sample.key_frame {
            self.iframe_before = self.iframe_current;
            self.iframe_current = frame;
            self.keyframes.push(frame);
        }
        if !sample.video {
            return true;
        }

        if self.positions.i_start < 0 && frame > -self.positions.i_start {
            self.positions.i_start = frame;
        }
        if self.positions.i_stop < 0 && frame > -self.positions.i_stop {
            self.positions.i_stop = frame;
        }
        if self.positions.i_stop_a < 0 && frame > -self.positions.i_stop_a {
            self.positions.i_stop_a = frame;
        }

        if !self.restart_done && frame > self.positions.i_stop_a - 2 * self.delta() {
            debug!("Enter end part at frame ({})", frame);
            self.restart_done = true;
            if self.detectors.ignore_black || self.detectors.ignore_logo {
                info!("Restart logo and black screen detection at frame ({})", frame);
                self.detectors.decode_video = true;
                self.detectors.ignore_black = false;
                if self.detectors.ignore_logo {
                    if self.has_border {
                        debug!("Broadcast has borders, logo detection stays disabled");
                    } else {
                        self.detectors.ignore_logo = false;
                    }
                }
            }
        }

        if let Some(aspect) = sample.aspect {
            self.video_aspect = Some(aspect);
        }
        if let Some(channels) = sample.audio_channels {
            self.audio_channels = Some(channels);
        }
        for event in &sample.events {
            if self.detectors.accepts(event.mark_type) {
                self.add_event(event);
            } else {
                debug!("Ignore {} event at ({})", event.mark_type, event.position);
            }
        }

        let positions = self.positions;
        if positions.i_start > 0 && self.in_broadcast && frame > positions.chk_start {
            self.check_start(sections);
        }
        let positions = self.positions;
        if positions.i_stop > 0 && positions.i_stop_a > 0 && frame > positions.chk_stop {
            if positions.i_start != 0 {
                debug!("Start still not selected, doing it now");
                self.check_start(sections);
            }
            self.check_stop(sections);
            return false;
        }
        true
    }

    /// Frame the broadcast is expected to begin at, from the pre-timer
    pub fn pre_timer_frame(&self) -> i32 {
        let mut pre_timer = self.info.pre_timer_secs;
        if pre_timer > self.tuning.pre_timer_max_secs {
            info!(
                "Pre-timer {}s not valid, use default of {}s",
                pre_timer, self.tuning.pre_timer_fallback_secs
            );
            pre_timer = self.tuning.pre_timer_fallback_secs;
        }
        self.info.fps.frames(pre_timer as f64)
    }

    /// Pass 1: read every frame, select start and end, clean up
    pub fn run_detect_pass(
        &mut self,
        decoder: &mut dyn DecodePort,
        sections: &mut dyn LogoSectionPort,
    ) -> Result<PassOutcome, DomainError> {
        let expected = self.info.fps.frames(self.info.length_secs.max(0) as f64) as u64;
        let mut progress = self.start_progress(Pass::Detect, (expected > 0).then_some(expected));

        let start_frame = self.pre_timer_frame();
        self.calculate_check_positions(start_frame);

        loop {
            if self.is_aborted() {
                progress.cancel();
                return Ok(PassOutcome::Aborted);
            }
            if !decoder.next_frame()? {
                break;
            }
            progress.tick();
            if !decoder.is_video_frame() {
                continue;
            }
            let sample = match decoder.classify_current_frame(self.full_decode)? {
                Some(sample) => sample,
                None => {
                    debug!("No frame data for ({})", decoder.current_frame_number());
                    continue;
                }
            };
            if !self.process_frame(&sample, sections) {
                break;
            }
        }

        self.finish_detect(sections);
        progress.complete();
        Ok(PassOutcome::Completed)
    }

    fn finish_detect(&mut self, sections: &mut dyn LogoSectionPort) {
        if self.positions.i_start != 0 {
            info!(
                "Recording ends at frame ({}) before start check position ({})",
                self.frame_current, self.positions.chk_start
            );
            self.check_start(sections);
        }
        if self.positions.i_stop_a > 0 {
            if self.positions.i_stop <= 0 {
                info!("Recording ends before recording length from info reached");
                self.positions.i_stop = self.frame_current;
            }
            self.check_stop(sections);
        }
        self.check_marks();
        if self.in_broadcast && !self.got_end_mark && self.frame_current > 0 {
            self.add_event(&CandidateEvent::new(MarkType::RECORDING_STOP, self.iframe_current));
        }
        self.save();
    }
}
