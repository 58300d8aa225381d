// In-memory port implementations for engine tests

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::errors::DomainError;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::engine::AbortFlag;
use crate::ports::{DecodePort, LogoSectionPort, MarkRepository};

/// Repository keeping every saved sequence
#[derive(Clone, Default)]
pub(crate) struct MemoryRepository {
    saves: Arc<Mutex<Vec<MarkStore>>>,
    backups: Arc<AtomicUsize>,
    stored: MarkStore,
}

impl MemoryRepository {
    /// Repository returning `stored` on load
    pub(crate) fn with_stored(stored: MarkStore) -> Self {
        Self {
            stored,
            ..Self::default()
        }
    }

    pub(crate) fn save_count(&self) -> usize {
        self.saves.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub(crate) fn last_saved(&self) -> Option<MarkStore> {
        self.saves.lock().ok().and_then(|s| s.last().cloned())
    }

    pub(crate) fn backup_count(&self) -> usize {
        self.backups.load(Ordering::SeqCst)
    }
}

impl MarkRepository for MemoryRepository {
    fn save(&self, marks: &MarkStore, _fps: FrameRate) -> Result<(), DomainError> {
        self.saves
            .lock()
            .map_err(|e| DomainError::InternalError(e.to_string()))?
            .push(marks.clone());
        Ok(())
    }

    fn backup(&self) -> Result<(), DomainError> {
        self.backups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self) -> Result<MarkStore, DomainError> {
        Ok(self.stored.clone())
    }
}

/// Decoder replaying a fixed list of frame samples
pub(crate) struct ScriptedDecoder {
    frames: Vec<FrameSample>,
    current: Option<usize>,
    pub(crate) opened: usize,
    pub(crate) fail_seek: bool,
    abort_at: Option<(i32, AbortFlag)>,
}

impl ScriptedDecoder {
    pub(crate) fn new(mut frames: Vec<FrameSample>) -> Self {
        frames.sort_by_key(|f| f.frame);
        Self {
            frames,
            current: None,
            opened: 0,
            fail_seek: false,
            abort_at: None,
        }
    }

    /// Request an abort once the replay reaches `frame`
    pub(crate) fn abort_at(mut self, frame: i32, abort: AbortFlag) -> Self {
        self.abort_at = Some((frame, abort));
        self
    }

    /// Keyframes every `step` frames from `from` to `to`
    pub(crate) fn keyframes(from: i32, to: i32, step: usize) -> Vec<FrameSample> {
        (from..=to).step_by(step).map(|f| FrameSample::new(f, true)).collect()
    }

    fn sample(&self) -> Option<&FrameSample> {
        self.current.and_then(|c| self.frames.get(c))
    }
}

impl DecodePort for ScriptedDecoder {
    fn open_recording(&mut self, _dir: &Path) -> Result<(), DomainError> {
        self.opened += 1;
        self.current = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<bool, DomainError> {
        let next = self.current.map_or(0, |c| c + 1);
        if next >= self.frames.len() {
            return Ok(false);
        }
        self.current = Some(next);
        if let Some((frame, abort)) = &self.abort_at {
            if self.current_frame_number() >= *frame {
                abort.abort();
            }
        }
        Ok(true)
    }

    fn seek_to_frame(&mut self, frame: i32) -> Result<(), DomainError> {
        if self.fail_seek {
            return Err(DomainError::SeekFailed(format!("frame ({})", frame)));
        }
        let index = self.frames.partition_point(|f| f.frame < frame);
        self.current = index.checked_sub(1);
        Ok(())
    }

    fn current_frame_number(&self) -> i32 {
        self.sample().map_or(-1, |s| s.frame)
    }

    fn is_video_frame(&self) -> bool {
        self.sample().is_some_and(|s| s.video)
    }

    fn is_key_frame(&self) -> bool {
        self.sample().is_some_and(|s| s.key_frame)
    }

    fn classify_current_frame(&mut self, _full_decode: bool) -> Result<Option<FrameSample>, DomainError> {
        Ok(self.sample().cloned())
    }

    fn next_silence(
        &mut self,
        stop_frame: i32,
        search_backward: bool,
        want_start: bool,
    ) -> Result<Option<i32>, DomainError> {
        let mut runs: Vec<(i32, i32)> = Vec::new();
        let mut open: Option<(i32, i32)> = None;
        while self.next_frame()? {
            let Some(sample) = self.sample().cloned() else {
                break;
            };
            if sample.frame > stop_frame {
                break;
            }
            if sample.silent {
                let start = open.map_or(sample.frame, |(start, _)| start);
                open = Some((start, sample.frame));
            } else if let Some(run) = open.take() {
                runs.push(run);
            }
        }
        runs.extend(open);
        let run = if search_backward { runs.last() } else { runs.first() };
        Ok(run.map(|(start, end)| if want_start { *start } else { *end }))
    }

    fn keyframes(&mut self) -> Result<Vec<i32>, DomainError> {
        Ok(self.frames.iter().filter(|f| f.key_frame).map(|f| f.frame).collect())
    }
}

/// Section analysis with fixed answers
#[derive(Default)]
pub(crate) struct StaticSections {
    pub(crate) info_logos: Vec<(i32, i32)>,
    pub(crate) logo_changes: Vec<(i32, i32)>,
    pub(crate) closing_credits_end: Option<i32>,
    /// Advertising in frame sections as first and last frame
    pub(crate) ads_in_frame: Vec<(i32, i32)>,
    /// First frames of introduction logos
    pub(crate) introductions: Vec<i32>,
}

impl LogoSectionPort for StaticSections {
    fn is_info_logo(&mut self, from: i32, to: i32) -> Result<bool, DomainError> {
        Ok(self.info_logos.contains(&(from, to)))
    }

    fn is_logo_change(&mut self, from: i32, to: i32) -> Result<bool, DomainError> {
        Ok(self.logo_changes.contains(&(from, to)))
    }

    fn closing_credits_end(&mut self, _from: i32, _to: i32) -> Result<Option<i32>, DomainError> {
        Ok(self.closing_credits_end)
    }

    fn ad_in_frame(&mut self, from: i32, to: i32, after_start: bool) -> Result<Option<i32>, DomainError> {
        let mut inside = self
            .ads_in_frame
            .iter()
            .filter(|(begin, end)| *begin >= from && *end <= to);
        let found = if after_start {
            inside.next().map(|(_, end)| *end)
        } else {
            inside.last().map(|(begin, _)| *begin)
        };
        Ok(found)
    }

    fn introduction_logo(&mut self, from: i32, to: i32) -> Result<Option<i32>, DomainError> {
        Ok(self.introductions.iter().rev().find(|f| (from..=to).contains(*f)).copied())
    }
}

/// Recording at 25 fps
pub(crate) fn recording(length_secs: i32, pre_timer_secs: i32) -> RecordingInfo {
    RecordingInfo {
        fps: FrameRate(25.0),
        length_secs,
        pre_timer_secs,
        channel_name: "Test".to_string(),
        ..RecordingInfo::default()
    }
}

/// Event carrying frame sample
pub(crate) fn event_at(mark_type: MarkType, frame: i32) -> FrameSample {
    let mut sample = FrameSample::new(frame, true);
    sample.events.push(CandidateEvent::new(mark_type, frame));
    sample
}
