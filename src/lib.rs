//! # framepersist
//!
//! Measure frame persistence in video: how long each distinct image stays on
//! screen, how many unique frames appear each second, and the effective frame
//! rate a viewer actually sees.
//!
//! A captured game or screen recording at 60 fps often shows the same image
//! for several consecutive frames when the source stutters. `framepersist`
//! walks the stream, compares each frame to the last distinct one, and
//! records how long every unique frame was held. Decoding is powered by
//! FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate.
//!
//! ## Quick Start
//!
//! ### Analyze a Video
//!
//! ```no_run
//! use framepersist::{AnalysisOptions, VideoFile};
//!
//! let mut video = VideoFile::open("capture.mp4")?;
//! let analysis = framepersist::analyze(&mut video.frames()?, &AnalysisOptions::new())?;
//! print!("{}", analysis.summary());
//! framepersist::save_csv(&analysis.export_rows(), "capture.csv")?;
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```
//!
//! ### Analyze Frames Already in Memory
//!
//! ```
//! use framepersist::{AnalysisOptions, Frame, FrameSequence};
//!
//! let a = Frame::filled(2, 2, 3, 0);
//! let b = Frame::filled(2, 2, 3, 255);
//! let mut source = FrameSequence::new(vec![a.clone(), a, b.clone(), b.clone(), b], 10.0);
//!
//! let analysis = framepersist::analyze(&mut source, &AnalysisOptions::new())?;
//! assert_eq!(analysis.unique_frames().len(), 2);
//! assert_eq!(analysis.events().len(), 1);
//! assert_eq!(analysis.events()[0].duration_ms, 300.0);
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```
//!
//! ### Compare Two Videos
//!
//! ```no_run
//! use framepersist::{Tolerance, VideoComparisonOptions};
//!
//! let options = VideoComparisonOptions::new()
//!     .with_min_differing_samples(100)
//!     .with_tolerance(Tolerance::new(4));
//! let comparison = framepersist::count_unique_video_frames("a.mp4", "b.mp4", &options)?;
//! println!("{}/{} differ", comparison.unique_frames, comparison.compared_frames);
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```
//!
//! ## Features
//!
//! - **Persistence analysis**: per-frame unique ids, hold times, effective
//!   FPS, per-second unique counts, persistence events
//! - **Tolerant comparison**: squared per-sample threshold to ignore
//!   encoder noise
//! - **CSV export** in the layout frame-time graphing tools expect
//! - **Resolution probing** through the external `resdet` tool
//! - **Progress & cancellation**: cooperative callbacks and
//!   `CancellationToken` for long videos
//! - **Streaming**: frames are decoded one at a time, never buffered
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Compare frame buffers in parallel chunks |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod analyzer;
pub mod comparator;
pub mod comparison;
pub mod config;
pub mod error;
pub mod export;
pub mod frame;
pub mod metadata;
pub mod probe;
pub mod progress;
pub mod report;
pub mod video;

pub use analyzer::{
    FrameRecord, PersistenceAnalysis, PersistenceAnalyzer, PersistenceEvent,
    REPORTED_DUPLICATE_THRESHOLD, UniqueFrame, analyze,
};
pub use comparator::{PixelComparator, is_sample_different};
pub use comparison::{VideoComparison, compare_image_files, count_frames, count_unique_video_frames};
pub use config::{AnalysisOptions, MAX_TOLERANCE_LEVEL, Tolerance, VideoComparisonOptions};
pub use error::PersistenceError;
pub use export::{CSV_HEADER, ExportOutcome, format_csv_row, save_csv, write_csv};
pub use frame::{Frame, FrameSequence, FrameSource};
pub use metadata::VideoMetadata;
pub use probe::{ResdetProber, Resolution, ResolutionProber, parse_resdet_output};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use report::{ExportRow, PersistenceSummary};
pub use video::{VideoFile, VideoFrames};
