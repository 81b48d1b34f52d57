//! Frame persistence analysis.
//!
//! [`PersistenceAnalyzer`] walks a stream one frame at a time and keeps the
//! last unique frame as its reference. Each incoming frame is either a
//! repeat of that reference (the reference's hold grows by one) or a new
//! unique frame (the previous hold is finalized and the new frame becomes
//! the reference).
//!
//! A unique frame's **hold** is the number of input frames it stayed on
//! screen, counting its first showing. A hold of `n` frames is `n - 1`
//! duplicates, and holds with more than one duplicate are reported as
//! [`PersistenceEvent`]s lasting `n * frame_time_ms`.
//!
//! # Example
//!
//! ```no_run
//! use framepersist::{AnalysisOptions, Tolerance, VideoFile};
//!
//! let mut video = VideoFile::open("capture.mp4")?;
//! let options = AnalysisOptions::new().with_tolerance(Tolerance::new(2));
//! let analysis = framepersist::analyze(&mut video.frames()?, &options)?;
//!
//! for event in analysis.events() {
//!     println!("frame {} held for {:.2} ms", event.first_frame, event.duration_ms);
//! }
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```

use std::sync::Arc;

use crate::comparator::PixelComparator;
use crate::config::AnalysisOptions;
use crate::error::PersistenceError;
use crate::frame::{Frame, FrameSource};
use crate::probe::{Resolution, ResolutionProber};
use crate::progress::{OperationType, ProgressReporter};

/// Holds with more duplicates than this are reported as events.
pub const REPORTED_DUPLICATE_THRESHOLD: u64 = 1;

/// Per-input-frame analysis state, recorded during the forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// 1-based position in the stream.
    pub frame_number: u64,
    /// Id of the unique frame on screen at this point.
    pub unique_frame_id: u64,
    /// Unique frames seen so far divided by elapsed stream time so far.
    pub effective_fps: f64,
    /// Provisional hold of the current unique frame, in milliseconds.
    pub frame_time_ms: f64,
    /// Probed resolution, when probing is enabled.
    pub resolution: Option<Resolution>,
}

/// A frame that became the comparison reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueFrame {
    /// 1-based id, incremented on every detected change.
    pub id: u64,
    /// Frame number of the first showing.
    pub first_frame: u64,
    /// Number of input frames this frame stayed on screen.
    pub hold_frames: u64,
}

impl UniqueFrame {
    /// Repeats after the first showing.
    pub fn duplicate_count(&self) -> u64 {
        self.hold_frames.saturating_sub(1)
    }

    /// Hold duration in milliseconds at the given nominal frame time.
    pub fn hold_ms(&self, frame_time_ms: f64) -> f64 {
        self.hold_frames as f64 * frame_time_ms
    }
}

/// A unique frame that was held for more than two frame times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersistenceEvent {
    pub unique_frame_id: u64,
    pub first_frame: u64,
    pub duplicate_count: u64,
    /// Time on screen including the first showing.
    pub duration_ms: f64,
}

/// The finished result of an analysis.
///
/// Every hold is final, so this is the input to the second pass in
/// [`export_rows`](PersistenceAnalysis::export_rows) and
/// [`summary`](PersistenceAnalysis::summary).
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceAnalysis {
    pub(crate) frame_rate: f64,
    pub(crate) frame_time_ms: f64,
    pub(crate) frames: Vec<FrameRecord>,
    pub(crate) unique_frames: Vec<UniqueFrame>,
    pub(crate) events: Vec<PersistenceEvent>,
    pub(crate) unique_per_second: Vec<u64>,
}

impl PersistenceAnalysis {
    /// Nominal frames per second of the analyzed stream.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Nominal frame time (`1000 / fps`) in milliseconds.
    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }

    /// Number of input frames analyzed.
    pub fn total_frames(&self) -> u64 {
        self.frames.len() as u64
    }

    /// One record per input frame, in input order.
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    /// Finalized unique frames, in id order.
    pub fn unique_frames(&self) -> &[UniqueFrame] {
        &self.unique_frames
    }

    /// Persistence events, in stream order.
    pub fn events(&self) -> &[PersistenceEvent] {
        &self.events
    }

    /// First appearances of unique frames per second of stream time, one
    /// entry for each second that at least one frame falls in.
    pub fn unique_per_second(&self) -> &[u64] {
        &self.unique_per_second
    }

    /// Look up a unique frame by its 1-based id.
    pub fn unique_frame(&self, id: u64) -> Option<&UniqueFrame> {
        id.checked_sub(1)
            .and_then(|index| self.unique_frames.get(index as usize))
    }
}

enum RunState {
    AwaitingFirstFrame,
    Tracking {
        unique_id: u64,
        hold_frames: u64,
        reference: Frame,
    },
}

enum Step {
    Start,
    Repeat { unique_id: u64, hold_frames: u64 },
    Replace { ended: u64, hold_frames: u64 },
}

/// Incremental duplicate-run state machine.
///
/// Feed frames with [`push`](PersistenceAnalyzer::push) and call
/// [`finish`](PersistenceAnalyzer::finish) once the stream is exhausted.
/// [`analyze`] drives both from a [`FrameSource`].
pub struct PersistenceAnalyzer {
    frame_rate: f64,
    frame_time_ms: f64,
    comparator: PixelComparator,
    prober: Option<Arc<dyn ResolutionProber>>,
    verbose: bool,
    state: RunState,
    frames: Vec<FrameRecord>,
    unique_frames: Vec<UniqueFrame>,
    events: Vec<PersistenceEvent>,
    current_second: u64,
    unique_in_second: u64,
    unique_per_second: Vec<u64>,
}

impl PersistenceAnalyzer {
    /// Create an analyzer for a stream running at `frame_rate` fps.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidFrameRate`] unless `frame_rate` is
    /// finite and positive.
    pub fn new(frame_rate: f64, options: &AnalysisOptions) -> Result<Self, PersistenceError> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(PersistenceError::InvalidFrameRate(frame_rate));
        }

        Ok(Self {
            frame_rate,
            frame_time_ms: 1000.0 / frame_rate,
            comparator: PixelComparator::new(options.tolerance),
            prober: options.prober.clone(),
            verbose: options.verbose,
            state: RunState::AwaitingFirstFrame,
            frames: Vec::new(),
            unique_frames: Vec::new(),
            events: Vec::new(),
            current_second: 0,
            unique_in_second: 0,
            unique_per_second: Vec::new(),
        })
    }

    /// Nominal frame time in milliseconds.
    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }

    /// Classify the next frame of the stream and record it.
    ///
    /// On error nothing is recorded and the analyzer is left as it was.
    ///
    /// # Errors
    ///
    /// - [`PersistenceError::FrameSizeMismatch`] if the frame's shape differs
    ///   from the first frame.
    /// - Any error from the configured [`ResolutionProber`].
    pub fn push(&mut self, frame: Frame) -> Result<&FrameRecord, PersistenceError> {
        let frame_number = self.frames.len() as u64 + 1;

        let resolution = match &self.prober {
            Some(prober) => Some(prober.probe(&frame)?),
            None => None,
        };

        let comparator = self.comparator;
        let step = match &mut self.state {
            RunState::AwaitingFirstFrame => Step::Start,
            RunState::Tracking {
                unique_id,
                hold_frames,
                reference,
            } => {
                if reference.shape() != frame.shape() {
                    return Err(PersistenceError::FrameSizeMismatch {
                        frame_number,
                        expected: reference.shape(),
                        actual: frame.shape(),
                    });
                }

                if comparator.differs(reference.samples(), frame.samples())? {
                    Step::Replace {
                        ended: *unique_id,
                        hold_frames: *hold_frames,
                    }
                } else {
                    *hold_frames += 1;
                    Step::Repeat {
                        unique_id: *unique_id,
                        hold_frames: *hold_frames,
                    }
                }
            }
        };

        self.advance_second(frame_number);

        let (unique_frame_id, hold_frames) = match step {
            Step::Start => self.start_unique(frame_number, frame),
            Step::Replace { ended, hold_frames } => {
                self.finalize(ended, hold_frames);
                self.start_unique(frame_number, frame)
            }
            Step::Repeat {
                unique_id,
                hold_frames,
            } => (unique_id, hold_frames),
        };

        let elapsed_frames = frame_number as f64;
        self.frames.push(FrameRecord {
            frame_number,
            unique_frame_id,
            effective_fps: unique_frame_id as f64 * self.frame_rate / elapsed_frames,
            frame_time_ms: hold_frames as f64 * self.frame_time_ms,
            resolution,
        });

        Ok(&self.frames[self.frames.len() - 1])
    }

    /// Close the open hold and the trailing second.
    pub fn finish(mut self) -> PersistenceAnalysis {
        if let RunState::Tracking {
            unique_id,
            hold_frames,
            ..
        } = self.state
        {
            self.finalize(unique_id, hold_frames);
        }

        if !self.frames.is_empty() {
            self.flush_second();
        }

        PersistenceAnalysis {
            frame_rate: self.frame_rate,
            frame_time_ms: self.frame_time_ms,
            frames: self.frames,
            unique_frames: self.unique_frames,
            events: self.events,
            unique_per_second: self.unique_per_second,
        }
    }

    fn start_unique(&mut self, frame_number: u64, frame: Frame) -> (u64, u64) {
        let unique_id = self.unique_frames.len() as u64 + 1;
        self.unique_frames.push(UniqueFrame {
            id: unique_id,
            first_frame: frame_number,
            hold_frames: 1,
        });
        self.unique_in_second += 1;
        self.state = RunState::Tracking {
            unique_id,
            hold_frames: 1,
            reference: frame,
        };
        (unique_id, 1)
    }

    fn finalize(&mut self, unique_id: u64, hold_frames: u64) {
        let Some(unique) = self.unique_frames.get_mut(unique_id as usize - 1) else {
            return;
        };
        unique.hold_frames = hold_frames;

        let duplicate_count = unique.duplicate_count();
        if duplicate_count > REPORTED_DUPLICATE_THRESHOLD {
            let duration_ms = unique.hold_ms(self.frame_time_ms);
            log::info!(
                "Frame {} persisted for {duration_ms:.2} ms ({duplicate_count} consecutive duplicates)",
                unique.first_frame,
            );
            self.events.push(PersistenceEvent {
                unique_frame_id: unique_id,
                first_frame: unique.first_frame,
                duplicate_count,
                duration_ms,
            });
        }
    }

    /// Flush the current second once `frame_number` falls past it.
    ///
    /// Seconds that no frame lands in are not recorded, so the tally never
    /// grows faster than the frame count.
    fn advance_second(&mut self, frame_number: u64) {
        let second = ((frame_number - 1) as f64 / self.frame_rate).floor() as u64;
        if second > self.current_second {
            self.flush_second();
            self.current_second = second;
        }
    }

    fn flush_second(&mut self) {
        if self.verbose {
            log::info!(
                "Second {}: {} unique frames",
                self.current_second + 1,
                self.unique_in_second,
            );
        }
        self.unique_per_second.push(self.unique_in_second);
        self.unique_in_second = 0;
    }
}

/// Run a full persistence analysis over `source`.
///
/// Pulls frames until the source is exhausted, reporting progress and
/// checking for cancellation before each frame.
///
/// # Errors
///
/// - [`PersistenceError::InvalidFrameRate`] if the source's frame rate is
///   unusable (no frame is read).
/// - Any error yielded by the source, which aborts the analysis.
/// - [`PersistenceError::Cancelled`] if the options' token is cancelled.
/// - Errors from [`PersistenceAnalyzer::push`].
pub fn analyze<S: FrameSource + ?Sized>(
    source: &mut S,
    options: &AnalysisOptions,
) -> Result<PersistenceAnalysis, PersistenceError> {
    let mut analyzer = PersistenceAnalyzer::new(source.frame_rate(), options)?;

    log::debug!(
        "Analyzing frame persistence at {:.2} fps ({:.2} ms per frame, tolerance {})",
        source.frame_rate(),
        analyzer.frame_time_ms(),
        options.tolerance,
    );

    let mut reporter = ProgressReporter::start(
        options.progress.clone(),
        OperationType::PersistenceAnalysis,
        source.frame_count_hint(),
        options.batch_size,
    );

    loop {
        if options.is_cancelled() {
            return Err(PersistenceError::Cancelled);
        }
        let Some(frame) = source.next_frame() else {
            break;
        };
        let record = analyzer.push(frame?)?;
        reporter.frame_done(record.frame_number);
    }

    reporter.done();
    Ok(analyzer.finish())
}
