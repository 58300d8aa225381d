//! Cut preparation from a finalized mark sequence

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod gop;

use crate::domain::errors::DomainError;
use crate::domain::marks::MarkStore;
use crate::domain::model::*;
use crate::utils::time::frame_to_timestamp;
use gop::KeyframeIndex;

/// A broadcast part to keep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSegment {
    /// First frame to keep, aligned to a keyframe
    pub start_frame: i32,
    /// Last frame to keep
    pub stop_frame: i32,
    /// Start mark the segment was derived from
    pub start_mark: i32,
    pub start_type: MarkType,
    pub stop_type: MarkType,
    pub start_time: String,
    pub stop_time: String,
}

impl CutSegment {
    /// Number of frames kept
    pub fn frames(&self) -> i32 {
        self.stop_frame - self.start_frame + 1
    }
}

/// Ordered keep segments of a recording
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutPlan {
    pub segments: Vec<CutSegment>,
    /// Total kept length in seconds
    pub total_secs: f64,
}

/// Walks start/stop mark pairs and derives keep segments
pub struct CutPlanner;

impl CutPlanner {
    /// Build the cut plan. A start where a stop is expected, or the other way
    /// round, fails the walk; a trailing unpaired start is ignored.
    pub fn plan(
        marks: &MarkStore,
        keyframes: &KeyframeIndex,
        fps: FrameRate,
        full_decode: bool,
    ) -> Result<CutPlan, DomainError> {
        let sequence = marks.to_vec();
        if sequence.len() < 2 {
            info!("Less than two marks, nothing to cut");
            return Ok(CutPlan::default());
        }

        let mut segments = Vec::new();
        let mut index = 0;
        while index + 1 < sequence.len() {
            let start = &sequence[index];
            if !start.is_start() {
                return Err(DomainError::StructuralViolation(format!(
                    "expected start mark at ({}), found {}",
                    start.position, start.mark_type
                )));
            }
            let stop = &sequence[index + 1];
            if !stop.is_stop() {
                return Err(DomainError::StructuralViolation(format!(
                    "expected stop mark at ({}), found {}",
                    stop.position, stop.mark_type
                )));
            }

            let aligned = if full_decode {
                keyframes.keyframe_before(start.position - 1)
            } else {
                keyframes.keyframe_after(start.position)
            };
            let start_frame = aligned.unwrap_or(start.position);
            debug!(
                "Segment from ({}) aligned to ({}) until ({})",
                start.position, start_frame, stop.position
            );
            segments.push(CutSegment {
                start_frame,
                stop_frame: stop.position,
                start_mark: start.position,
                start_type: start.mark_type,
                stop_type: stop.mark_type,
                start_time: frame_to_timestamp(start_frame, fps),
                stop_time: frame_to_timestamp(stop.position, fps),
            });
            index += 2;
        }

        let total_frames: i64 = segments.iter().map(|s| s.frames().max(0) as i64).sum();
        let total_secs = total_frames as f64 / fps.value();
        info!("Cut plan with {} segments, {:.1}s kept", segments.len(), total_secs);
        Ok(CutPlan { segments, total_secs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(marks: &[(MarkType, i32)]) -> MarkStore {
        let mut store = MarkStore::new();
        for (mark_type, position) in marks {
            store.add(*mark_type, *position, None, true);
        }
        store
    }

    #[test]
    fn test_plan_aligns_to_keyframes() {
        let marks = store_with(&[
            (MarkType::LOGO_START, 110),
            (MarkType::LOGO_STOP, 500),
            (MarkType::LOGO_START, 700),
            (MarkType::LOGO_STOP, 900),
        ]);
        let keyframes = KeyframeIndex::new((0..100).map(|i| i * 12).collect());
        let plan = CutPlanner::plan(&marks, &keyframes, FrameRate(25.0), false).unwrap();
        assert_eq!(plan.segments.len(), 2);
        assert_eq!(plan.segments[0].start_frame, 120);
        assert_eq!(plan.segments[0].stop_frame, 500);
        assert_eq!(plan.segments[1].start_frame, 708);

        let plan = CutPlanner::plan(&marks, &keyframes, FrameRate(25.0), true).unwrap();
        assert_eq!(plan.segments[0].start_frame, 108);
    }

    #[test]
    fn test_plan_rejects_consecutive_starts() {
        let marks = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_START, 200),
            (MarkType::LOGO_STOP, 300),
        ]);
        let result = CutPlanner::plan(&marks, &KeyframeIndex::default(), FrameRate(25.0), false);
        assert!(matches!(result, Err(DomainError::StructuralViolation(_))));
    }

    #[test]
    fn test_plan_rejects_leading_stop() {
        let marks = store_with(&[(MarkType::LOGO_STOP, 100), (MarkType::LOGO_START, 200)]);
        let result = CutPlanner::plan(&marks, &KeyframeIndex::default(), FrameRate(25.0), false);
        assert!(result.is_err());
    }

    #[test]
    fn test_plan_ignores_trailing_start() {
        let marks = store_with(&[
            (MarkType::LOGO_START, 100),
            (MarkType::LOGO_STOP, 200),
            (MarkType::LOGO_START, 300),
        ]);
        let plan = CutPlanner::plan(&marks, &KeyframeIndex::default(), FrameRate(25.0), false).unwrap();
        assert_eq!(plan.segments.len(), 1);
        assert_eq!(plan.segments[0].start_frame, 100);
        assert!((plan.total_secs - 101.0 / 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_plan_with_single_mark_is_empty() {
        let marks = store_with(&[(MarkType::LOGO_START, 100)]);
        let plan = CutPlanner::plan(&marks, &KeyframeIndex::default(), FrameRate(25.0), false).unwrap();
        assert!(plan.segments.is_empty());
    }
}
