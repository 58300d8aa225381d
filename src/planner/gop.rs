//! GOP (Group of Pictures) keyframe index

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::model::FrameRate;

/// Sorted keyframe positions of a recording
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframeIndex {
    keyframes: Vec<i32>,
}

impl KeyframeIndex {
    /// Build an index from keyframe positions in any order
    pub fn new(mut keyframes: Vec<i32>) -> Self {
        keyframes.sort_unstable();
        keyframes.dedup();
        debug!("Keyframe index with {} entries", keyframes.len());
        Self { keyframes }
    }

    /// Record a keyframe seen while decoding
    pub fn push(&mut self, frame: i32) {
        match self.keyframes.last() {
            Some(&last) if last >= frame => {
                if let Err(index) = self.keyframes.binary_search(&frame) {
                    self.keyframes.insert(index, frame);
                }
            }
            _ => self.keyframes.push(frame),
        }
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.keyframes
    }

    /// Last keyframe at or before `frame`
    pub fn keyframe_before(&self, frame: i32) -> Option<i32> {
        let index = self.keyframes.partition_point(|&k| k <= frame);
        index.checked_sub(1).map(|i| self.keyframes[i])
    }

    /// First keyframe at or after `frame`
    pub fn keyframe_after(&self, frame: i32) -> Option<i32> {
        let index = self.keyframes.partition_point(|&k| k < frame);
        self.keyframes.get(index).copied()
    }

    /// Number of keyframes in `[from, to]`
    pub fn range_count(&self, from: i32, to: i32) -> usize {
        if from > to {
            return 0;
        }
        let lower = self.keyframes.partition_point(|&k| k < from);
        let upper = self.keyframes.partition_point(|&k| k <= to);
        upper - lower
    }

    /// Keyframe at a time offset from the recording start
    pub fn frame_from_offset(&self, offset_ms: i64, fps: FrameRate) -> Option<i32> {
        if offset_ms < 0 {
            return None;
        }
        let frame = fps.frames_ms(offset_ms);
        match self.keyframe_before(frame) {
            Some(keyframe) => Some(keyframe),
            None if self.keyframes.is_empty() => Some(frame),
            None => None,
        }
    }

    /// Average distance between keyframes in frames
    pub fn average_gop_size(&self) -> Option<f64> {
        if self.keyframes.len() < 2 {
            return None;
        }
        let first = self.keyframes[0];
        let last = self.keyframes[self.keyframes.len() - 1];
        Some((last - first) as f64 / (self.keyframes.len() - 1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> KeyframeIndex {
        KeyframeIndex::new(vec![24, 0, 12, 36, 12])
    }

    #[test]
    fn test_keyframe_before_and_after() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.keyframe_before(13), Some(12));
        assert_eq!(index.keyframe_before(12), Some(12));
        assert_eq!(index.keyframe_before(-1), None);
        assert_eq!(index.keyframe_after(13), Some(24));
        assert_eq!(index.keyframe_after(24), Some(24));
        assert_eq!(index.keyframe_after(37), None);
    }

    #[test]
    fn test_range_count() {
        let index = index();
        assert_eq!(index.range_count(0, 36), 4);
        assert_eq!(index.range_count(1, 35), 2);
        assert_eq!(index.range_count(30, 10), 0);
    }

    #[test]
    fn test_push_keeps_order() {
        let mut index = KeyframeIndex::default();
        index.push(10);
        index.push(20);
        index.push(15);
        index.push(20);
        assert_eq!(index.as_slice(), &[10, 15, 20]);
    }

    #[test]
    fn test_frame_from_offset() {
        let index = index();
        let fps = FrameRate(25.0);
        assert_eq!(index.frame_from_offset(1000, fps), Some(24));
        assert_eq!(index.frame_from_offset(-5, fps), None);
        assert_eq!(KeyframeIndex::default().frame_from_offset(2000, fps), Some(50));
    }

    #[test]
    fn test_average_gop_size() {
        assert_eq!(index().average_gop_size(), Some(12.0));
        assert_eq!(KeyframeIndex::new(vec![5]).average_gop_size(), None);
    }
}
