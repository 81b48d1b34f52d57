//! Progress snapshots and cooperative cancellation.
//!
//! Long walks over a video report through a [`ProgressCallback`], receiving a
//! [`ProgressInfo`] every few frames. A [`CancellationToken`] shared with the
//! caller stops the walk between two frames.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepersist::{AnalysisOptions, ProgressCallback, ProgressInfo, VideoFile};
//!
//! struct Percent;
//!
//! impl ProgressCallback for Percent {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         match info.percent {
//!             Some(percent) => eprintln!("{:?}: {percent:.1}%", info.operation),
//!             None => eprintln!("{:?}: {} frames", info.operation, info.processed),
//!         }
//!     }
//! }
//!
//! let mut video = VideoFile::open("capture.mp4")?;
//! let options = AnalysisOptions::new().with_progress(Arc::new(Percent));
//! let analysis = framepersist::analyze(&mut video.frames()?, &options)?;
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Which walk a [`ProgressInfo`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// [`analyze`](crate::analyze) over a frame source.
    PersistenceAnalysis,
    /// [`count_frames`](crate::count_frames).
    FrameCounting,
    /// [`count_unique_video_frames`](crate::count_unique_video_frames).
    VideoComparison,
}

/// Where an operation stands.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub operation: OperationType,
    /// Frames handled so far.
    pub processed: u64,
    /// Frames the source expects to yield, when it knows.
    pub expected: Option<u64>,
    /// `processed / expected` as 0-100.
    pub percent: Option<f32>,
    pub elapsed: Duration,
    /// Linear extrapolation from the throughput so far.
    pub eta: Option<Duration>,
    /// 1-based number of the last frame handled; `None` on the closing report.
    pub frame_number: Option<u64>,
}

/// Receives progress snapshots.
///
/// Callbacks only observe. To stop an operation, cancel its
/// [`CancellationToken`].
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, info: &ProgressInfo);
}

pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _: &ProgressInfo) {}
}

/// A shared stop flag.
///
/// Clones observe the same flag, so a token handed to
/// [`AnalysisOptions::with_cancellation`](crate::AnalysisOptions::with_cancellation)
/// can be cancelled from another thread or a signal handler.
///
/// ```
/// use framepersist::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this token to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Counts frames and fires the callback every `emit_every` of them.
pub(crate) struct ProgressReporter {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    expected: Option<u64>,
    emit_every: u64,
    processed: u64,
    started: Instant,
}

impl ProgressReporter {
    pub(crate) fn start(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        expected: Option<u64>,
        emit_every: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            expected: expected.filter(|&count| count > 0),
            emit_every: emit_every.max(1),
            processed: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn frame_done(&mut self, frame_number: u64) {
        self.processed += 1;
        if self.processed % self.emit_every == 0 {
            self.emit(Some(frame_number));
        }
    }

    pub(crate) fn done(&self) {
        self.emit(None);
    }

    fn emit(&self, frame_number: Option<u64>) {
        let elapsed = self.started.elapsed();
        let processed = self.processed;

        let percent = self
            .expected
            .map(|expected| processed as f32 * 100.0 / expected as f32);
        let eta = match self.expected {
            Some(expected) if processed > 0 => {
                let left = expected.saturating_sub(processed) as f64;
                Some(elapsed.mul_f64(left / processed as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            processed,
            expected: self.expected,
            percent,
            elapsed,
            eta,
            frame_number,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Collect {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn zero_expected_is_treated_as_unknown() {
        let sink = Arc::new(Collect::default());
        let reporter = ProgressReporter::start(sink.clone(), OperationType::FrameCounting, Some(0), 1);
        reporter.done();

        let infos = sink.0.lock().unwrap();
        assert_eq!(infos[0].expected, None);
        assert_eq!(infos[0].percent, None);
        assert_eq!(infos[0].eta, None);
    }

    #[test]
    fn eta_reaches_zero_at_the_end() {
        let sink = Arc::new(Collect::default());
        let mut reporter =
            ProgressReporter::start(sink.clone(), OperationType::VideoComparison, Some(2), 1);
        reporter.frame_done(1);
        reporter.frame_done(2);

        let infos = sink.0.lock().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[1].percent, Some(100.0));
        assert_eq!(infos[1].eta, Some(Duration::ZERO));
    }
}
