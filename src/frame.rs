//! Raw frames and the sources that yield them.
//!
//! A [`Frame`] is a tightly packed grid of 8-bit samples. The analyzer pulls
//! frames one at a time from a [`FrameSource`]; [`VideoFrames`](crate::VideoFrames)
//! decodes them from a video file and [`FrameSequence`] serves them from
//! memory.

use std::collections::VecDeque;
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use crate::error::PersistenceError;

/// A decoded frame: `width * height` pixels of `channels` samples each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a packed sample buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidFrameBuffer`] if `data` is not
    /// exactly `width * height * channels` bytes long.
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self, PersistenceError> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(PersistenceError::InvalidFrameBuffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// A frame where every sample has the same value.
    pub fn filled(width: u32, height: u32, channels: u8, value: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![value; len],
        }
    }

    /// Convert any image to an RGBA8 frame.
    pub fn from_image(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            channels: 4,
            data: rgba.into_raw(),
        }
    }

    /// Load an image file (PNG, JPEG, ...) as an RGBA8 frame.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::ImageError`] if the file cannot be read or
    /// decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let image = image::open(path.as_ref())?;
        Ok(Self::from_image(&image))
    }

    /// Render the frame as an image, if its channel layout maps to one.
    pub fn to_image(&self) -> Option<DynamicImage> {
        let data = self.data.clone();
        match self.channels {
            1 => GrayImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(self.width, self.height, data).map(DynamicImage::ImageRgba8),
            _ => None,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples per pixel.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// `(width, height, channels)`.
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.width, self.height, self.channels)
    }

    /// The packed samples, row by row.
    pub fn samples(&self) -> &[u8] {
        &self.data
    }
}

/// A forward-only, finite supply of identically sized frames.
///
/// `next_frame` returning `None` means the stream is exhausted; an `Err`
/// is fatal for whoever is consuming the source.
pub trait FrameSource {
    /// Nominal frames per second of the stream.
    fn frame_rate(&self) -> f64;

    /// Expected number of frames, used only for progress reporting.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }

    /// Fetch the next frame.
    fn next_frame(&mut self) -> Option<Result<Frame, PersistenceError>>;
}

/// An in-memory [`FrameSource`].
///
/// # Example
///
/// ```
/// use framepersist::{AnalysisOptions, Frame, FrameSequence};
///
/// let a = Frame::filled(2, 2, 4, 0);
/// let b = Frame::filled(2, 2, 4, 255);
/// let mut source = FrameSequence::new(vec![a.clone(), a, b], 30.0);
///
/// let analysis = framepersist::analyze(&mut source, &AnalysisOptions::new())?;
/// assert_eq!(analysis.unique_frames().len(), 2);
/// # Ok::<(), framepersist::PersistenceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: VecDeque<Frame>,
    frame_rate: f64,
    total: u64,
}

impl FrameSequence {
    /// Serve `frames` in order at `frame_rate` frames per second.
    pub fn new(frames: Vec<Frame>, frame_rate: f64) -> Self {
        let total = frames.len() as u64;
        Self {
            frames: frames.into(),
            frame_rate,
            total,
        }
    }
}

impl FrameSource for FrameSequence {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.total)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, PersistenceError>> {
        self.frames.pop_front().map(Ok)
    }
}

impl Iterator for FrameSequence {
    type Item = Result<Frame, PersistenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}
