//! Integration tests for the mark engine over a frame index and a marks file

use std::fs;
use std::path::Path;
use std::sync::Arc;

use admark::adapters::frame_index::FRAME_INDEX_FILE;
use admark::adapters::{FrameIndex, FrameIndexDecoder, FrameIndexSections, MarksFileAdapter};
use admark::domain::model::*;
use admark::engine::progress::ProgressInfo;
use admark::engine::{AbortFlag, EngineConfig, MarkEngine, Pass, ProgressCallback};
use admark::ports::MarkRepository;
use tempfile::TempDir;

// Test utilities

/// Recording of ten minutes with one minute pre-timer at 25 fps
fn test_recording() -> RecordingInfo {
    RecordingInfo {
        fps: FrameRate(25.0),
        length_secs: 600,
        pre_timer_secs: 60,
        channel_name: "Test".to_string(),
        ..RecordingInfo::default()
    }
}

/// One keyframe per second up to `to`, with detector events
fn keyframes_with_events(to: i32, events: &[(MarkType, i32)]) -> Vec<FrameSample> {
    (25..=to)
        .step_by(25)
        .map(|frame| {
            let mut sample = FrameSample::new(frame, true);
            for (mark_type, position) in events.iter().filter(|(_, p)| *p == frame) {
                sample.events.push(CandidateEvent::new(*mark_type, *position));
            }
            sample
        })
        .collect()
}

fn write_frames(dir: &Path, samples: &[FrameSample]) {
    fs::write(dir.join(FRAME_INDEX_FILE), serde_json::to_string(samples).unwrap()).unwrap();
}

fn run_engine(dir: &Path, config: EngineConfig, abort: AbortFlag) -> admark::RunSummary {
    let index = Arc::new(FrameIndex::load(dir).unwrap());
    let mut decoder = FrameIndexDecoder::new(index.clone());
    let mut sections = FrameIndexSections::new(index);
    let info = test_recording();
    let repository = MarksFileAdapter::new(dir, info.fps);
    MarkEngine::new(config, abort)
        .run(dir, info, Vec::new(), Box::new(repository), &mut decoder, &mut sections)
        .unwrap()
}

// Full runs

#[test]
fn test_full_run_writes_logo_marks() {
    let dir = TempDir::new().unwrap();
    write_frames(
        dir.path(),
        &keyframes_with_events(31600, &[(MarkType::LOGO_START, 1525), (MarkType::LOGO_STOP, 16525)]),
    );

    let summary = run_engine(dir.path(), EngineConfig::default(), AbortFlag::new());
    assert!(!summary.aborted);
    assert_eq!(summary.passes, vec![Pass::Detect, Pass::Overlap, Pass::FineTune]);
    assert_eq!(summary.marks.len(), 2);

    let stored = MarksFileAdapter::new(dir.path(), FrameRate(25.0)).load().unwrap();
    assert_eq!(stored.positions(MarkFilter::Any), vec![1525, 16525]);
    assert_eq!(stored.get(1525).unwrap().mark_type, MarkType::LOGO_START);
    assert_eq!(stored.get(16525).unwrap().mark_type, MarkType::LOGO_STOP);

    let content = fs::read_to_string(dir.path().join("marks")).unwrap();
    assert!(content.starts_with("0:01:01.00 (1525) LOGOSTART"));
}

#[test]
fn test_run_without_events_assumes_marks() {
    let dir = TempDir::new().unwrap();
    write_frames(dir.path(), &keyframes_with_events(31600, &[]));

    let summary = run_engine(dir.path(), EngineConfig::default(), AbortFlag::new());
    let types: Vec<MarkType> = summary.marks.iter().map(|m| m.mark_type).collect();
    assert_eq!(types, vec![MarkType::ASSUMED_START, MarkType::ASSUMED_STOP]);
    assert!(summary.saved);
}

#[test]
fn test_abort_leaves_marks_file_untouched() {
    let dir = TempDir::new().unwrap();
    write_frames(
        dir.path(),
        &keyframes_with_events(31600, &[(MarkType::LOGO_START, 1525), (MarkType::LOGO_STOP, 16525)]),
    );
    let previous = "0:00:40.00 (1000) ASPECTSTART\n0:10:00.00 (15000) ASPECTSTOP\n";
    fs::write(dir.path().join("marks"), previous).unwrap();

    let abort = AbortFlag::new();
    abort.abort();
    let summary = run_engine(dir.path(), EngineConfig::default(), abort);

    assert!(summary.aborted);
    assert!(!summary.saved);
    assert!(summary.passes.is_empty());
    assert_eq!(fs::read_to_string(dir.path().join("marks")).unwrap(), previous);
}

/// Requests an abort once the detect pass finished
struct AbortAfterDetect(AbortFlag);

impl ProgressCallback for AbortAfterDetect {
    fn on_start(&self, _pass: Pass, _total_frames: Option<u64>) {}

    fn on_progress(&self, _pass: Pass, _frames: u64, _total_frames: Option<u64>) {}

    fn on_complete(&self, pass: Pass, _info: &ProgressInfo) {
        if pass == Pass::Detect {
            self.0.abort();
        }
    }

    fn on_cancel(&self, _pass: Pass) {}
}

#[test]
fn test_abort_after_detection_saves_detected_marks() {
    let dir = TempDir::new().unwrap();
    write_frames(
        dir.path(),
        &keyframes_with_events(31600, &[(MarkType::LOGO_START, 1525), (MarkType::LOGO_STOP, 16525)]),
    );
    let index = Arc::new(FrameIndex::load(dir.path()).unwrap());
    let mut decoder = FrameIndexDecoder::new(index.clone());
    let mut sections = FrameIndexSections::new(index);
    let info = test_recording();
    let repository = MarksFileAdapter::new(dir.path(), info.fps);
    let abort = AbortFlag::new();

    let summary = MarkEngine::new(EngineConfig::default(), abort.clone())
        .with_callback(Arc::new(AbortAfterDetect(abort)))
        .run(dir.path(), info, Vec::new(), Box::new(repository), &mut decoder, &mut sections)
        .unwrap();

    assert!(summary.aborted);
    assert!(summary.saved);
    assert!(!summary.passes.contains(&Pass::FineTune));
    let stored = MarksFileAdapter::new(dir.path(), FrameRate(25.0)).load().unwrap();
    assert_eq!(stored.positions(MarkFilter::Any), vec![1525, 16525]);
}

#[test]
fn test_refine_only_moves_marks_to_silence() {
    let dir = TempDir::new().unwrap();
    let samples: Vec<FrameSample> = (4800..=5100)
        .chain(19800..=20200)
        .map(|frame| {
            let mut sample = FrameSample::new(frame, false);
            sample.silent = (4900..=4910).contains(&frame) || (20040..=20060).contains(&frame);
            sample
        })
        .collect();
    write_frames(dir.path(), &samples);
    fs::write(
        dir.path().join("marks"),
        "0:03:20.00 (5000) LOGOSTART\n0:13:20.00 (20000) LOGOSTOP\n",
    )
    .unwrap();

    let config = EngineConfig {
        passes: PassSelection::refine_only(),
        backup_marks: true,
        ..EngineConfig::default()
    };
    let summary = run_engine(dir.path(), config, AbortFlag::new());
    assert_eq!(summary.passes, vec![Pass::Overlap, Pass::FineTune]);
    assert!(summary.saved);

    let content = fs::read_to_string(dir.path().join("marks")).unwrap();
    assert!(content.contains("(4900) MOVEDSTART moved from LOGOSTART (5000) to (4900), silence*"));
    assert!(content.contains("(20060) MOVEDSTOP moved from LOGOSTOP (20000) to (20060), silence"));

    let backup = fs::read_to_string(dir.path().join("marks.bak")).unwrap();
    assert!(backup.contains("(5000) LOGOSTART"));
}
