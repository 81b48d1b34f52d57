//! Progress and cancellation integration tests.

use std::sync::{Arc, Mutex};

use framepersist::{
    AnalysisOptions, CancellationToken, Frame, FrameSequence, FrameSource, OperationType,
    PersistenceError, ProgressCallback, ProgressInfo,
};

fn sequence(count: u8) -> FrameSequence {
    FrameSequence::new((0..count).map(|value| Frame::filled(2, 2, 1, value / 2)).collect(), 30.0)
}

struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl RecordingProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            infos: Mutex::new(Vec::new()),
        })
    }
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancellation_token_default_trait() {
    let token = CancellationToken::default();
    assert!(!token.is_cancelled());
}

/// Cancels the token once a given frame has been handed out.
struct CancelAfter {
    inner: FrameSequence,
    served: u64,
    cancel_at: u64,
    token: CancellationToken,
}

impl FrameSource for CancelAfter {
    fn frame_rate(&self) -> f64 {
        self.inner.frame_rate()
    }

    fn next_frame(&mut self) -> Option<Result<Frame, PersistenceError>> {
        self.served += 1;
        if self.served == self.cancel_at {
            self.token.cancel();
        }
        self.inner.next_frame()
    }
}

#[test]
fn cancellation_stops_between_frames() {
    let token = CancellationToken::new();
    let recorder = RecordingProgress::new();
    let options = AnalysisOptions::new()
        .with_cancellation(token.clone())
        .with_progress(recorder.clone());

    let mut source = CancelAfter {
        inner: sequence(10),
        served: 0,
        cancel_at: 3,
        token,
    };

    let result = framepersist::analyze(&mut source, &options);
    assert!(matches!(result, Err(PersistenceError::Cancelled)));
    // The third frame was already fetched and is still processed.
    assert_eq!(source.served, 3);
    assert_eq!(recorder.infos.lock().unwrap().len(), 3);
}

// ── ProgressInfo ───────────────────────────────────────────────────

#[test]
fn progress_reports_every_frame_by_default() {
    let recorder = RecordingProgress::new();
    let options = AnalysisOptions::new().with_progress(recorder.clone());
    framepersist::analyze(&mut sequence(6), &options).unwrap();

    let infos = recorder.infos.lock().unwrap();
    // One per frame plus the final report.
    assert_eq!(infos.len(), 7);
    for info in infos.iter() {
        assert_eq!(info.operation, OperationType::PersistenceAnalysis);
        assert_eq!(info.expected, Some(6));
    }

    let last = infos.last().unwrap();
    assert_eq!(last.processed, 6);
    assert_eq!(last.percent, Some(100.0));
    assert_eq!(last.frame_number, None);
}

#[test]
fn progress_respects_batch_size() {
    let recorder = RecordingProgress::new();
    let options = AnalysisOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(4);
    framepersist::analyze(&mut sequence(10), &options).unwrap();

    let frames: Vec<Option<u64>> = recorder
        .infos
        .lock()
        .unwrap()
        .iter()
        .map(|info| info.frame_number)
        .collect();
    assert_eq!(frames, vec![Some(4), Some(8), None]);
}

#[test]
fn progress_current_increases() {
    let recorder = RecordingProgress::new();
    let options = AnalysisOptions::new().with_progress(recorder.clone());
    framepersist::analyze(&mut sequence(12), &options).unwrap();

    let infos = recorder.infos.lock().unwrap();
    for window in infos.windows(2) {
        assert!(
            window[1].processed >= window[0].processed,
            "processed count should never go backwards",
        );
    }
}

#[test]
fn operation_type_debug() {
    assert_eq!(format!("{:?}", OperationType::VideoComparison), "VideoComparison");
}
