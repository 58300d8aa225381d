// Frame index adapter - Replays recorded per-frame detector output
//
// `frames.json` holds an array of frame samples as the detectors reported
// them. The decoder walks the samples in frame order; the section analysis
// answers logo questions from the logo verdicts of the same samples.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::{DecodePort, LogoSectionPort};

/// Name of the frame index inside a recording directory
pub const FRAME_INDEX_FILE: &str = "frames.json";

/// Frame samples of one recording in frame order
#[derive(Debug, Clone, Default)]
pub struct FrameIndex {
    samples: Vec<FrameSample>,
}

impl FrameIndex {
    pub fn new(mut samples: Vec<FrameSample>) -> Self {
        samples.sort_by_key(|s| s.frame);
        samples.dedup_by_key(|s| s.frame);
        Self { samples }
    }

    /// Read `frames.json` from a recording directory
    pub fn load(dir: &Path) -> Result<Self, DomainError> {
        let path = dir.join(FRAME_INDEX_FILE);
        Self::load_file(&path)
    }

    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        let content = fs::read_to_string(path)
            .map_err(|e| DomainError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        let samples: Vec<FrameSample> = serde_json::from_str(&content)
            .map_err(|e| DomainError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
        info!("Loaded {} frame samples from {}", samples.len(), path.display());
        Ok(Self::new(samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    /// Index of the first sample at or after `frame`
    fn index_at(&self, frame: i32) -> usize {
        self.samples.partition_point(|s| s.frame < frame)
    }

    /// Samples in `[from, to]`
    fn range(&self, from: i32, to: i32) -> &[FrameSample] {
        if from > to {
            return &[];
        }
        let lower = self.index_at(from);
        let upper = self.samples.partition_point(|s| s.frame <= to);
        &self.samples[lower..upper]
    }
}

/// Decode service over a frame index
pub struct FrameIndexDecoder {
    index: Arc<FrameIndex>,
    current: Option<usize>,
    dir: Option<PathBuf>,
}

impl FrameIndexDecoder {
    pub fn new(index: Arc<FrameIndex>) -> Self {
        Self {
            index,
            current: None,
            dir: None,
        }
    }

    fn sample(&self) -> Option<&FrameSample> {
        self.current.and_then(|c| self.index.samples.get(c))
    }
}

impl DecodePort for FrameIndexDecoder {
    fn open_recording(&mut self, dir: &Path) -> Result<(), DomainError> {
        if !dir.is_dir() {
            return Err(DomainError::FileNotFound(dir.display().to_string()));
        }
        debug!("Open recording {} with {} frame samples", dir.display(), self.index.len());
        self.dir = Some(dir.to_path_buf());
        self.current = None;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<bool, DomainError> {
        let next = self.current.map_or(0, |c| c + 1);
        if next >= self.index.len() {
            return Ok(false);
        }
        self.current = Some(next);
        Ok(true)
    }

    fn seek_to_frame(&mut self, frame: i32) -> Result<(), DomainError> {
        if self.dir.is_none() {
            return Err(DomainError::SeekFailed(format!("no recording open, frame ({})", frame)));
        }
        if frame < 0 || self.index.samples.last().map_or(true, |s| frame > s.frame) {
            return Err(DomainError::SeekFailed(format!("frame ({}) outside of recording", frame)));
        }
        self.current = self.index.index_at(frame).checked_sub(1);
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

    fn classify_current_frame(&mut self, full_decode: bool) -> Result<Option<FrameSample>, DomainError> {
        match self.sample() {
            Some(sample) if full_decode || sample.key_frame => Ok(Some(sample.clone())),
            Some(_) => Ok(None),
            None => Err(DomainError::DecodeFailed("no current frame".to_string())),
        }
    }

    fn next_silence(
        &mut self,
        stop_frame: i32,
        search_backward: bool,
        want_start: bool,
    ) -> Result<Option<i32>, DomainError> {
        let mut runs: Vec<(i32, i32)> = Vec::new();
        let mut open: Option<(i32, i32)> = None;
        while self.current_frame_number() < stop_frame && self.next_frame()? {
            let Some(sample) = self.sample() else {
                break;
            };
            if sample.frame > stop_frame {
                break;
            }
            if sample.silent {
                let start = open.map_or(sample.frame, |(start, _)| start);
                open = Some((start, sample.frame));
            } else if let Some(run) = open.take() {
                if !search_backward {
                    break;
                }
                runs.push(run);
            }
        }
        runs.extend(open);
        let run = if search_backward { runs.last() } else { runs.first() };
        Ok(run.map(|(start, end)| if want_start { *start } else { *end }))
    }

    fn keyframes(&mut self) -> Result<Vec<i32>, DomainError> {
        Ok(self
            .index
            .samples
            .iter()
            .filter(|s| s.key_frame)
            .map(|s| s.frame)
            .collect())
    }
}

/// Logo section analysis over a frame index.
///
/// A section counts as info logo or logo change when at least half of its
/// samples carry that logo verdict.
pub struct FrameIndexSections {
    index: Arc<FrameIndex>,
}

impl FrameIndexSections {
    pub fn new(index: Arc<FrameIndex>) -> Self {
        Self { index }
    }

    fn majority(&self, from: i32, to: i32, state: LogoState) -> bool {
        let samples = self.index.range(from, to);
        if samples.is_empty() {
            return false;
        }
        let matching = samples.iter().filter(|s| s.logo == state).count();
        debug!(
            "{} of {} samples between ({}) and ({}) show {:?}",
            matching,
            samples.len(),
            from,
            to,
            state
        );
        matching * 2 >= samples.len()
    }

    /// Consecutive sample runs in `[from, to]` showing `state`, as first and
    /// last frame
    fn runs(&self, from: i32, to: i32, state: LogoState) -> Vec<(i32, i32)> {
        let mut runs: Vec<(i32, i32)> = Vec::new();
        let mut open: Option<(i32, i32)> = None;
        for sample in self.index.range(from, to) {
            if sample.logo == state {
                let begin = open.map_or(sample.frame, |(begin, _)| begin);
                open = Some((begin, sample.frame));
            } else if let Some(run) = open.take() {
                runs.push(run);
            }
        }
        runs.extend(open);
        runs
    }
}

impl LogoSectionPort for FrameIndexSections {
    fn is_info_logo(&mut self, from: i32, to: i32) -> Result<bool, DomainError> {
        Ok(self.majority(from, to, LogoState::Info))
    }

    fn is_logo_change(&mut self, from: i32, to: i32) -> Result<bool, DomainError> {
        Ok(self.majority(from, to, LogoState::Changed))
    }

    fn closing_credits_end(&mut self, from: i32, to: i32) -> Result<Option<i32>, DomainError> {
        Ok(self.runs(from, to, LogoState::Credits).first().map(|(_, end)| *end))
    }

    fn ad_in_frame(&mut self, from: i32, to: i32, after_start: bool) -> Result<Option<i32>, DomainError> {
        let runs = self.runs(from, to, LogoState::AdInFrame);
        let found = if after_start {
            runs.first().map(|(_, end)| *end)
        } else {
            runs.last().map(|(begin, _)| *begin)
        };
        Ok(found)
    }

    fn introduction_logo(&mut self, from: i32, to: i32) -> Result<Option<i32>, DomainError> {
        Ok(self.runs(from, to, LogoState::Intro).last().map(|(begin, _)| *begin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame: i32, key_frame: bool, silent: bool, logo: LogoState) -> FrameSample {
        FrameSample {
            silent,
            logo,
            ..FrameSample::new(frame, key_frame)
        }
    }

    fn index() -> Arc<FrameIndex> {
        let samples = (0..100)
            .map(|f| {
                let silent = (40..=45).contains(&f) || (60..=62).contains(&f);
                let logo = match f {
                    10..=20 => LogoState::Info,
                    25..=28 => LogoState::Intro,
                    32..=35 => LogoState::AdInFrame,
                    50..=55 => LogoState::AdInFrame,
                    70..=80 => LogoState::Credits,
                    _ => LogoState::Visible,
                };
                sample(f, f % 10 == 0, silent, logo)
            })
            .collect();
        Arc::new(FrameIndex::new(samples))
    }

    fn open(index: Arc<FrameIndex>) -> FrameIndexDecoder {
        let mut decoder = FrameIndexDecoder::new(index);
        decoder.open_recording(&std::env::temp_dir()).unwrap();
        decoder
    }

    #[test]
    fn test_walk_and_seek() {
        let mut decoder = open(index());
        assert_eq!(decoder.current_frame_number(), -1);
        assert!(decoder.next_frame().unwrap());
        assert_eq!(decoder.current_frame_number(), 0);
        assert!(decoder.is_key_frame());

        decoder.seek_to_frame(50).unwrap();
        assert!(decoder.next_frame().unwrap());
        assert_eq!(decoder.current_frame_number(), 50);
        assert!(decoder.seek_to_frame(500).is_err());
        assert_eq!(decoder.keyframes().unwrap().len(), 10);
    }

    #[test]
    fn test_classify_only_keyframes_without_full_decode() {
        let mut decoder = open(index());
        decoder.seek_to_frame(11).unwrap();
        decoder.next_frame().unwrap();
        assert!(decoder.classify_current_frame(false).unwrap().is_none());
        assert_eq!(decoder.classify_current_frame(true).unwrap().unwrap().frame, 11);
    }

    #[test]
    fn test_next_silence() {
        let mut decoder = open(index());
        decoder.seek_to_frame(30).unwrap();
        assert_eq!(decoder.next_silence(70, true, true).unwrap(), Some(60));

        decoder.seek_to_frame(30).unwrap();
        assert_eq!(decoder.next_silence(70, false, false).unwrap(), Some(45));

        decoder.seek_to_frame(0).unwrap();
        assert_eq!(decoder.next_silence(30, false, true).unwrap(), None);
    }

    #[test]
    fn test_sections() {
        let mut sections = FrameIndexSections::new(index());
        assert!(sections.is_info_logo(10, 25).unwrap());
        assert!(!sections.is_info_logo(10, 60).unwrap());
        assert!(!sections.is_logo_change(10, 25).unwrap());
        assert_eq!(sections.closing_credits_end(65, 90).unwrap(), Some(80));
        assert_eq!(sections.closing_credits_end(0, 60).unwrap(), None);
    }

    #[test]
    fn test_ad_in_frame_and_introduction_logo() {
        let mut sections = FrameIndexSections::new(index());
        assert_eq!(sections.ad_in_frame(30, 60, true).unwrap(), Some(35));
        assert_eq!(sections.ad_in_frame(30, 60, false).unwrap(), Some(50));
        assert_eq!(sections.ad_in_frame(52, 60, false).unwrap(), Some(52));
        assert_eq!(sections.ad_in_frame(60, 99, true).unwrap(), None);

        assert_eq!(sections.introduction_logo(0, 30).unwrap(), Some(25));
        assert_eq!(sections.introduction_logo(29, 60).unwrap(), None);
    }

    #[test]
    fn test_logo_state_names() {
        let sample: FrameSample =
            serde_json::from_str(r#"{"frame": 5, "key_frame": false, "logo": "ad_in_frame"}"#).unwrap();
        assert_eq!(sample.logo, LogoState::AdInFrame);
        let sample: FrameSample =
            serde_json::from_str(r#"{"frame": 6, "key_frame": false, "logo": "intro"}"#).unwrap();
        assert_eq!(sample.logo, LogoState::Intro);
    }

    #[test]
    fn test_load_frames_json() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(FRAME_INDEX_FILE),
            r#"[{"frame": 25, "key_frame": true, "silent": true},
                {"frame": 0, "key_frame": true, "events": [{"position": 0, "mark_type": "LOGOSTART"}]}]"#,
        )
        .unwrap();
        let index = FrameIndex::load(dir.path()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.samples()[0].events[0].mark_type, MarkType::LOGO_START);
        assert!(index.samples()[1].silent);
        assert!(FrameIndex::load(&dir.path().join("missing")).is_err());
    }
}
