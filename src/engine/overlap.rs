//! Overlap refinement around advertising breaks
//!
//! Broadcasters often repeat the last seconds before a break right after
//! it. The keyframes before each stop mark are compared with the keyframes
//! after the following start mark; a repeated sequence moves the stop to the
//! begin of the repetition and the start to its end.

use tracing::{debug, info, warn};

use super::progress::PassProgress;
use super::session::Session;
use super::{Pass, PassOutcome};
use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::ports::DecodePort;

/// Matching keyframes before a stop and after a start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapMatch {
    /// First repeated frame before the stop mark
    pub before: i32,
    /// Last repeated frame after the start mark
    pub after: i32,
    /// Number of matched keyframes
    pub length: usize,
}

/// Finds the longest repeated keyframe sequence
#[derive(Debug, Clone)]
pub struct OverlapMatcher {
    reference: Vec<(i32, u64)>,
    similar_max: u32,
    min_frames: i32,
}

impl OverlapMatcher {
    /// `similar_max` is the largest Hamming distance of two matching
    /// fingerprints, `min_frames` the shortest accepted repetition
    pub fn new(similar_max: u32, min_frames: i32) -> Self {
        Self {
            reference: Vec::new(),
            similar_max,
            min_frames,
        }
    }

    /// Add a keyframe from before the stop mark
    pub fn push_reference(&mut self, frame: i32, fingerprint: u64) {
        self.reference.push((frame, fingerprint));
    }

    pub fn reference_len(&self) -> usize {
        self.reference.len()
    }

    fn similar(&self, a: u64, b: u64) -> bool {
        (a ^ b).count_ones() <= self.similar_max
    }

    /// Compare keyframes from after the start mark with the reference.
    ///
    /// The longest run of pairwise similar keyframes wins, ties go to the
    /// later run.
    pub fn find(&self, after: &[(i32, u64)]) -> Option<OverlapMatch> {
        if self.reference.is_empty() || after.is_empty() {
            return None;
        }
        let mut run = vec![0usize; after.len() + 1];
        let mut best: Option<(usize, usize, usize)> = None;
        for (i, (_, reference)) in self.reference.iter().enumerate() {
            for j in (0..after.len()).rev() {
                run[j + 1] = if self.similar(*reference, after[j].1) { run[j] + 1 } else { 0 };
                let length = run[j + 1];
                if length > 0 && best.map_or(true, |(_, _, l)| length >= l) {
                    best = Some((i, j, length));
                }
            }
        }

        let (i, j, length) = best?;
        let first_after = after[j + 1 - length].0;
        let last_after = after[j].0;
        if last_after - first_after < self.min_frames {
            debug!(
                "Longest repetition from ({}) to ({}) too short, {} keyframes",
                first_after, last_after, length
            );
            return None;
        }
        Some(OverlapMatch {
            before: self.reference[i + 1 - length].0,
            after: last_after,
            length,
        })
    }
}

impl Session {
    /// Pass 2: look for repeated content around every stop/start pair
    pub fn run_overlap_pass(&mut self, decoder: &mut dyn DecodePort) -> Result<PassOutcome, DomainError> {
        let mut progress = self.start_progress(Pass::Overlap, None);
        if self.marks.len() < 4 {
            debug!("Only {} marks, no overlap check", self.marks.len());
            progress.complete();
            return Ok(PassOutcome::Completed);
        }

        let mut stop = self
            .marks
            .first(MarkFilter::Any)
            .and_then(|first| self.marks.after(first.position))
            .map(|m| m.position);
        while let Some(stop_position) = stop {
            let Some(start_position) = self.marks.after(stop_position).map(|m| m.position) else {
                break;
            };
            if self.is_aborted() {
                progress.cancel();
                return Ok(PassOutcome::Aborted);
            }
            debug!(
                "Check overlap before stop ({}) and after start ({})",
                stop_position, start_position
            );
            let next = match self.overlap_pair(decoder, stop_position, start_position, &mut progress) {
                Ok(Some(moved_start)) => moved_start,
                Ok(None) => {
                    debug!(
                        "No overlap found before ({}) and after ({})",
                        stop_position, start_position
                    );
                    start_position
                }
                Err(e) => {
                    warn!(
                        "Overlap check before ({}) and after ({}) failed: {}",
                        stop_position, start_position, e
                    );
                    start_position
                }
            };
            stop = self.marks.after(next).map(|m| m.position);
        }

        if self.is_aborted() {
            progress.cancel();
            return Ok(PassOutcome::Aborted);
        }
        progress.complete();
        Ok(PassOutcome::Completed)
    }

    /// Check one stop/start pair; returns the new start position when the
    /// marks moved
    fn overlap_pair(
        &mut self,
        decoder: &mut dyn DecodePort,
        stop: i32,
        start: i32,
        progress: &mut PassProgress,
    ) -> Result<Option<i32>, DomainError> {
        let is_pair = self.marks.get(stop).is_some_and(|m| m.is_stop())
            && self.marks.get(start).is_some_and(|m| m.is_start());
        if !is_pair {
            debug!("Marks ({}) and ({}) are no stop/start pair", stop, start);
            return Ok(None);
        }

        let fps = self.fps();
        let before_frames = fps.frames(self.tuning.overlap_before_secs as f64);
        let after_frames = fps.frames(self.tuning.overlap_after_secs as f64);

        let Some(range_begin) = self.keyframes.keyframe_before((stop - before_frames).max(0)) else {
            debug!("No keyframe before ({})", stop - before_frames);
            return Ok(None);
        };
        if let Some(prev_start) = self.marks.prev(stop, MarkClass::Start.into()) {
            if range_begin <= prev_start.position + fps.frames((self.tuning.overlap_after_secs + 1) as f64) {
                debug!("Previous start mark ({}) very near, unable to check overlap", prev_start.position);
                return Ok(None);
            }
        }

        let mut range_end = start + after_frames;
        let last = self.marks.last(MarkFilter::Any).map(|m| m.position);
        if let Some(next_stop) = self.marks.next(start, MarkClass::Stop.into()).map(|m| m.position) {
            if Some(next_stop) != last {
                let margin = self.tuning.overlap_before_secs + self.tuning.overlap_after_secs + 1;
                if range_end >= next_stop - fps.frames(margin as f64) {
                    range_end = next_stop - fps.frames((self.tuning.overlap_before_secs + 1) as f64);
                    if range_end <= start {
                        debug!("Next stop mark ({}) very near, unable to check overlap", next_stop);
                        return Ok(None);
                    }
                    debug!("Next stop mark ({}) too near, reduce check end to ({})", next_stop, range_end);
                }
            }
            range_end = range_end.min(next_stop);
        }

        debug!("Preload from ({}) to ({}), compare from ({}) to ({})", range_begin, stop, start, range_end);
        let mut matcher = OverlapMatcher::new(
            self.tuning.overlap_similar_max,
            fps.frames(self.tuning.overlap_min_secs as f64),
        );
        decoder.seek_to_frame(range_begin)?;
        while decoder.current_frame_number() <= stop {
            if self.is_aborted() {
                return Ok(None);
            }
            if !decoder.next_frame()? {
                debug!("Recording ended at ({}) before stop mark", decoder.current_frame_number());
                return Ok(None);
            }
            progress.tick();
            if let Some((frame, fingerprint)) = read_keyframe_fingerprint(decoder)? {
                matcher.push_reference(frame, fingerprint);
            }
        }
        debug!("{} keyframes preloaded before stop mark ({})", matcher.reference_len(), stop);

        let from = self
            .keyframes
            .keyframe_before(start)
            .unwrap_or(0)
            .max(decoder.current_frame_number());
        if from <= 0 {
            debug!("No keyframe before start mark ({})", start);
            return Ok(None);
        }
        decoder.seek_to_frame(from)?;
        let mut after = Vec::new();
        while decoder.current_frame_number() <= range_end {
            if self.is_aborted() {
                return Ok(None);
            }
            if !decoder.next_frame()? {
                break;
            }
            progress.tick();
            if let Some(keyframe) = read_keyframe_fingerprint(decoder)? {
                after.push(keyframe);
            }
        }

        let Some(found) = matcher.find(&after) else {
            return Ok(None);
        };
        if found.before > stop || found.after < start {
            debug!(
                "Repetition ({}) to ({}) does not surround the pair, ignoring",
                found.before, found.after
            );
            return Ok(None);
        }
        info!(
            "Found overlap from ({}) at {} to ({}) at {} identical with ({}) at {} to ({}) at {}",
            found.before,
            self.timestamp(found.before),
            stop,
            self.timestamp(stop),
            start,
            self.timestamp(start),
            found.after,
            self.timestamp(found.after)
        );
        if found.before != stop {
            self.marks.move_mark(stop, found.before, "overlap");
        }
        let moved_start = if found.after != start {
            self.marks.move_mark(start, found.after, "overlap").unwrap_or(start)
        } else {
            start
        };
        self.save();
        Ok(Some(moved_start))
    }
}

/// Fingerprint of the current packet when it is a decodable video keyframe
fn read_keyframe_fingerprint(decoder: &mut dyn DecodePort) -> Result<Option<(i32, u64)>, DomainError> {
    if !decoder.is_video_frame() || !decoder.is_key_frame() {
        return Ok(None);
    }
    let sample = decoder.classify_current_frame(false)?;
    Ok(sample.and_then(|s| s.fingerprint.map(|fp| (s.frame, fp))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyframes(frames: &[(i32, u64)]) -> Vec<(i32, u64)> {
        frames.to_vec()
    }

    #[test]
    fn test_find_repeated_tail() {
        let mut matcher = OverlapMatcher::new(4, 30);
        for (frame, fp) in [(1000, 0xA), (1012, 0xB00), (1024, 0xC000), (1036, 0xD0000), (1048, 0xE000000)] {
            matcher.push_reference(frame, fp);
        }
        let after = keyframes(&[
            (5000, 0xFF00FF00FF),
            (5012, 0xB00),
            (5024, 0xC000),
            (5036, 0xD0000),
            (5048, 0xE000000),
            (5060, 0xFFFF_FFFF_FFFF),
        ]);
        let found = matcher.find(&after).unwrap();
        assert_eq!(found.before, 1012);
        assert_eq!(found.after, 5048);
        assert_eq!(found.length, 4);
    }

    #[test]
    fn test_similar_fingerprints_match() {
        let mut matcher = OverlapMatcher::new(2, 10);
        matcher.push_reference(100, 0b1111_0000);
        matcher.push_reference(112, 0b1111_1111_0000_0000);
        // one and two differing bits
        let after = keyframes(&[(400, 0b1111_0001), (412, 0b1111_1111_0000_0011)]);
        let found = matcher.find(&after).unwrap();
        assert_eq!((found.before, found.after), (100, 412));
    }

    #[test]
    fn test_too_short_repetition_is_rejected() {
        let mut matcher = OverlapMatcher::new(0, 100);
        matcher.push_reference(100, 7);
        matcher.push_reference(112, 8);
        let after = keyframes(&[(400, 7), (412, 8)]);
        assert!(matcher.find(&after).is_none());
    }

    #[test]
    fn test_no_match() {
        let mut matcher = OverlapMatcher::new(0, 0);
        matcher.push_reference(100, 1);
        assert!(matcher.find(&keyframes(&[(400, 2)])).is_none());
        assert!(OverlapMatcher::new(0, 0).find(&keyframes(&[(400, 2)])).is_none());
    }
}
