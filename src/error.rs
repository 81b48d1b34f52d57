//! Error types for the `framepersist` crate.
//!
//! This module defines [`PersistenceError`], the unified error type returned by
//! all fallible operations in the crate. Source, collaborator, and
//! configuration failures each get their own variants so callers can tell a
//! broken video apart from a bad `--tolerance`.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `framepersist` operations.
///
/// Every public method that can fail returns `Result<T, PersistenceError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A frame's shape differs from the first frame of the stream.
    #[error(
        "Frame {frame_number} is {}x{}x{} but the stream started with {}x{}x{}",
        actual.0, actual.1, actual.2, expected.0, expected.1, expected.2
    )]
    FrameSizeMismatch {
        /// 1-based position of the offending frame.
        frame_number: u64,
        /// `(width, height, channels)` of the first frame.
        expected: (u32, u32, u8),
        /// `(width, height, channels)` of the offending frame.
        actual: (u32, u32, u8),
    },

    /// A sample buffer does not match the declared frame dimensions.
    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrameBuffer {
        /// `width * height * channels`.
        expected: usize,
        /// Length of the buffer that was supplied.
        actual: usize,
    },

    /// Two buffers handed to the comparator have different lengths.
    #[error("Cannot compare buffers of {left} and {right} samples")]
    BufferLengthMismatch {
        /// Length of the first buffer.
        left: usize,
        /// Length of the second buffer.
        right: usize,
    },

    /// The stream's frame rate cannot be used to derive a frame time.
    #[error("Invalid frame rate: {0} (must be finite and greater than zero)")]
    InvalidFrameRate(f64),

    /// The pixel tolerance is malformed or out of range.
    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),

    /// The external resolution prober failed.
    #[error("Resolution probe failed: {0}")]
    ResolutionProbe(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while loading or encoding a frame.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for PersistenceError {
    fn from(error: FfmpegError) -> Self {
        PersistenceError::FfmpegError(error.to_string())
    }
}
