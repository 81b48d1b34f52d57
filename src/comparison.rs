//! Standalone comparison helpers.
//!
//! These sit beside the persistence analysis and share its comparator:
//! counting the frames of a video, counting differing samples between two
//! still images, and pairing two videos frame by frame to see how many
//! pairs differ.

use std::path::Path;
use std::sync::Arc;

use crate::comparator::PixelComparator;
use crate::config::{Tolerance, VideoComparisonOptions};
use crate::error::PersistenceError;
use crate::frame::{Frame, FrameSource};
use crate::progress::{NoOpProgress, OperationType, ProgressCallback, ProgressReporter};
use crate::video::VideoFile;

/// Result of [`count_unique_video_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoComparison {
    /// Number of frame pairs compared.
    pub compared_frames: u64,
    /// Pairs with at least the configured number of differing samples.
    pub unique_frames: u64,
    /// `true` if one video ran out before the other.
    pub length_mismatch: bool,
}

/// Decode a video end to end and return the exact number of frames.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a frame fails to decode.
pub fn count_frames<P: AsRef<Path>>(
    path: P,
    progress: Option<Arc<dyn ProgressCallback>>,
) -> Result<u64, PersistenceError> {
    let mut video = VideoFile::open(path.as_ref())?;
    let mut frames = video.frames()?;

    let mut reporter = ProgressReporter::start(
        progress.unwrap_or_else(|| Arc::new(NoOpProgress)),
        OperationType::FrameCounting,
        frames.frame_count_hint(),
        1,
    );

    let mut count = 0_u64;
    while let Some(frame) = frames.next_frame() {
        frame?;
        count += 1;
        reporter.frame_done(count);
    }
    reporter.done();

    log::debug!("{}: {count} decoded frames", path.as_ref().display());
    Ok(count)
}

/// Count the samples that differ between two image files.
///
/// Both images are converted to RGBA8 before comparing.
///
/// # Errors
///
/// - Image loading errors.
/// - [`PersistenceError::FrameSizeMismatch`] if the images have different
///   dimensions.
pub fn compare_image_files<P: AsRef<Path>, Q: AsRef<Path>>(
    first: P,
    second: Q,
    tolerance: Tolerance,
) -> Result<u64, PersistenceError> {
    let first = Frame::open(first)?;
    let second = Frame::open(second)?;
    compare_frames(&first, &second, 2, &PixelComparator::new(tolerance))
}

/// Pair two videos frame by frame and count the pairs that differ.
///
/// Stops at the end of the shorter video. Videos of different lengths are
/// still compared; the mismatch is logged and flagged in the result.
///
/// # Errors
///
/// - Open or decode errors from either video.
/// - [`PersistenceError::FrameSizeMismatch`] if paired frames have
///   different dimensions.
pub fn count_unique_video_frames<P: AsRef<Path>, Q: AsRef<Path>>(
    first: P,
    second: Q,
    options: &VideoComparisonOptions,
) -> Result<VideoComparison, PersistenceError> {
    let mut first_video = VideoFile::open(first)?;
    let mut second_video = VideoFile::open(second)?;
    let mut first_frames = first_video.frames()?;
    let mut second_frames = second_video.frames()?;

    let comparator = PixelComparator::new(options.tolerance);
    let mut reporter = ProgressReporter::start(
        options
            .progress
            .clone()
            .unwrap_or_else(|| Arc::new(NoOpProgress)),
        OperationType::VideoComparison,
        first_frames.frame_count_hint(),
        1,
    );

    let mut result = VideoComparison {
        compared_frames: 0,
        unique_frames: 0,
        length_mismatch: false,
    };

    loop {
        let (left, right) = match (first_frames.next_frame(), second_frames.next_frame()) {
            (None, None) => break,
            (Some(left), Some(right)) => (left?, right?),
            (left, right) => {
                let ended = if left.is_none() { "First" } else { "Second" };
                if let Some(Err(error)) = left.or(right) {
                    return Err(error);
                }
                log::warn!(
                    "{ended} video ended after {} frames, ignoring the rest of the other",
                    result.compared_frames,
                );
                result.length_mismatch = true;
                break;
            }
        };

        let frame_number = result.compared_frames + 1;
        let differing = compare_frames(&left, &right, frame_number, &comparator)?;
        result.compared_frames = frame_number;

        if differing >= options.min_differing_samples {
            result.unique_frames += 1;
            log::debug!("[{frame_number}] Unique frame ({differing} differing samples)");
        } else {
            log::debug!("[{frame_number}] Non-unique frame ({differing} differing samples)");
        }
        reporter.frame_done(frame_number);
    }
    reporter.done();

    log::info!(
        "{}/{} are unique!",
        result.unique_frames,
        result.compared_frames
    );
    Ok(result)
}

fn compare_frames(
    left: &Frame,
    right: &Frame,
    frame_number: u64,
    comparator: &PixelComparator,
) -> Result<u64, PersistenceError> {
    if left.shape() != right.shape() {
        return Err(PersistenceError::FrameSizeMismatch {
            frame_number,
            expected: left.shape(),
            actual: right.shape(),
        });
    }
    comparator.count_differences(left.samples(), right.samples())
}
