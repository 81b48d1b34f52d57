//! FFmpeg-backed frame source tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.

use std::path::Path;

use framepersist::{
    AnalysisOptions, FrameSource, PersistenceError, Tolerance, VideoComparisonOptions, VideoFile,
};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";
const HELD_FRAMES: &str = "tests/fixtures/held_frames.mkv";

fn fixture(path: &'static str) -> Option<&'static str> {
    if Path::new(path).exists() {
        Some(path)
    } else {
        eprintln!("Skipping: fixture {path} not found");
        None
    }
}

#[test]
fn missing_file_is_open_error() {
    let result = VideoFile::open("tests/fixtures/does_not_exist.mp4");
    match result {
        Err(PersistenceError::FileOpen { path, .. }) => {
            assert!(path.ends_with("does_not_exist.mp4"));
        }
        other => panic!("Expected FileOpen, got: {other:?}"),
    }
}

#[test]
fn metadata_of_sample_video() {
    let Some(path) = fixture(SAMPLE_VIDEO) else {
        return;
    };

    let video = VideoFile::open(path).expect("Failed to open fixture");
    let metadata = video.metadata();
    assert_eq!(metadata.width, 640);
    assert_eq!(metadata.height, 480);
    assert!((metadata.frames_per_second - 30.0).abs() < 0.01);
    assert!(metadata.frame_count > 0);
    assert_eq!(metadata.codec, "h264");
    assert!(metadata.frame_time_ms().is_some());
}

#[test]
fn frames_are_rgba_at_stream_resolution() {
    let Some(path) = fixture(SAMPLE_VIDEO) else {
        return;
    };

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let mut frames = video.frames().expect("Failed to start decoding");
    assert!((frames.frame_rate() - 30.0).abs() < 0.01);

    let frame = frames.next().expect("No frames").expect("Decode failed");
    assert_eq!(frame.shape(), (640, 480, 4));
    assert_eq!(frame.samples().len(), 640 * 480 * 4);
}

#[test]
fn frames_can_be_walked_twice() {
    let Some(path) = fixture(SAMPLE_VIDEO) else {
        return;
    };

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let first = video.frames().unwrap().count();
    let second = video.frames().unwrap().count();
    assert_eq!(first, second);
    assert_eq!(first as u64, framepersist::count_frames(path, None).unwrap());
}

#[test]
fn held_frames_are_detected() {
    let Some(path) = fixture(HELD_FRAMES) else {
        return;
    };

    let mut video = VideoFile::open(path).expect("Failed to open fixture");
    let analysis = framepersist::analyze(&mut video.frames().unwrap(), &AnalysisOptions::new())
        .expect("Analysis failed");

    let held: u64 = analysis.unique_frames().iter().map(|u| u.hold_frames).sum();
    assert_eq!(held, analysis.total_frames());

    // 10 distinct images per second shown at 30 fps.
    assert!(analysis.total_frames() >= 57);
    assert!(analysis.unique_frames().len() as u64 <= analysis.total_frames() / 2);
    assert!(!analysis.events().is_empty());

    let last = analysis.frames().last().unwrap();
    assert!((last.effective_fps - 10.0).abs() < 1.0, "effective fps {}", last.effective_fps);
}

#[test]
fn video_compared_with_itself_has_no_unique_frames() {
    let Some(path) = fixture(HELD_FRAMES) else {
        return;
    };

    let comparison =
        framepersist::count_unique_video_frames(path, path, &VideoComparisonOptions::new()).unwrap();
    assert!(comparison.compared_frames > 0);
    assert_eq!(comparison.unique_frames, 0);
    assert!(!comparison.length_mismatch);
}

#[test]
fn videos_of_different_sizes_are_rejected() {
    let (Some(first), Some(second)) = (fixture(SAMPLE_VIDEO), fixture(HELD_FRAMES)) else {
        return;
    };

    let options = VideoComparisonOptions::new().with_tolerance(Tolerance::new(0));
    let result = framepersist::count_unique_video_frames(first, second, &options);
    assert!(matches!(result, Err(PersistenceError::FrameSizeMismatch { .. })));
}
