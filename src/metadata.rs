//! Video stream metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoFile`](crate::VideoFile) is
//! opened and cached for its lifetime.

use std::time::Duration;

/// Metadata for the analyzed video stream.
///
/// # Example
///
/// ```no_run
/// use framepersist::VideoFile;
///
/// let video = VideoFile::open("capture.mp4")?;
/// let metadata = video.metadata();
/// println!(
///     "{}x{} @ {:.2} fps, ~{} frames",
///     metadata.width, metadata.height, metadata.frames_per_second, metadata.frame_count,
/// );
/// # Ok::<(), framepersist::PersistenceError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal frames per second (average frame rate of the stream).
    pub frames_per_second: f64,
    /// Frame count reported by the container, or estimated from duration and
    /// frame rate. Only used for progress reporting.
    pub frame_count: u64,
    /// Container duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`, `"av1"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

impl VideoMetadata {
    /// Nominal time each frame is on screen, in milliseconds.
    ///
    /// Returns `None` when the frame rate is unknown.
    pub fn frame_time_ms(&self) -> Option<f64> {
        (self.frames_per_second > 0.0).then(|| 1000.0 / self.frames_per_second)
    }
}
