//! FFmpeg-backed video frame source.
//!
//! [`VideoFile`] opens a container, picks its best video stream and caches
//! its [`VideoMetadata`]. [`VideoFile::frames`] returns a [`VideoFrames`]
//! iterator that decodes every frame in order and converts it to RGBA8, one
//! frame per call, without buffering the stream.
//!
//! # Example
//!
//! ```no_run
//! use framepersist::VideoFile;
//!
//! let mut video = VideoFile::open("capture.mp4")?;
//! for frame in video.frames()? {
//!     let frame = frame?;
//!     println!("{}x{}", frame.width(), frame.height());
//! }
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::error::PersistenceError;
use crate::frame::{Frame, FrameSource};
use crate::metadata::VideoMetadata;

const RGBA_CHANNELS: u8 = 4;

/// An opened video file.
pub struct VideoFile {
    input_context: Input,
    video_stream_index: usize,
    metadata: VideoMetadata,
    file_path: PathBuf,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file and read its stream metadata.
    ///
    /// Initializes FFmpeg (idempotent) and selects the best video stream.
    ///
    /// # Errors
    ///
    /// - [`PersistenceError::FileOpen`] if the file cannot be opened or its
    ///   decoder cannot be created.
    /// - [`PersistenceError::NoVideoStream`] if the file has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        let open_error = |reason: String| PersistenceError::FileOpen {
            path: file_path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let (video_stream_index, metadata) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(PersistenceError::NoVideoStream)?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

            let duration = match input_context.duration() {
                micros if micros > 0 => Duration::from_micros(micros as u64),
                _ => Duration::ZERO,
            };

            let frames_per_second = rational_to_f64(stream.avg_frame_rate())
                .or_else(|| rational_to_f64(stream.rate()))
                .unwrap_or(0.0);

            let frame_count = if stream.frames() > 0 {
                stream.frames() as u64
            } else {
                (duration.as_secs_f64() * frames_per_second) as u64
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            (
                stream.index(),
                VideoMetadata {
                    width: decoder.width(),
                    height: decoder.height(),
                    frames_per_second,
                    frame_count,
                    duration,
                    codec,
                    format: input_context.format().name().to_string(),
                },
            )
        };

        log::debug!(
            "Video stream {video_stream_index}: {}x{} @ {:.2} fps, ~{} frames [{}]",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            video_stream_index,
            metadata,
            file_path,
        })
    }

    /// Cached metadata of the video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Decode the stream from the start, one RGBA8 frame per iteration.
    ///
    /// # Errors
    ///
    /// Returns an FFmpeg error if the decoder cannot be created.
    pub fn frames(&mut self) -> Result<VideoFrames<'_>, PersistenceError> {
        let stream = self
            .input_context
            .stream(self.video_stream_index)
            .ok_or(PersistenceError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        // A previous walk leaves the demuxer at EOF.
        if let Err(error) = self.input_context.seek(0, ..0) {
            log::debug!("Seek to start failed ({error}), decoding from current position");
        }

        Ok(VideoFrames {
            input_context: &mut self.input_context,
            decoder,
            scaler: None,
            video_stream_index: self.video_stream_index,
            width: self.metadata.width,
            height: self.metadata.height,
            frame_rate: self.metadata.frames_per_second,
            frame_count: self.metadata.frame_count,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            eof_sent: false,
            done: false,
        })
    }
}

/// Sequential decoder over every frame of a [`VideoFile`].
///
/// Yields frames at the stream's original resolution as RGBA8. The first
/// error ends the iteration.
pub struct VideoFrames<'a> {
    input_context: &'a mut Input,
    decoder: VideoDecoder,
    scaler: Option<ScalingContext>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    frame_rate: f64,
    frame_count: u64,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    eof_sent: bool,
    done: bool,
}

impl VideoFrames<'_> {
    fn convert_current_frame(&mut self) -> Result<Frame, PersistenceError> {
        if self.scaler.is_none() {
            // Build from the first decoded frame; the decoder's advertised
            // format can differ from what it actually outputs.
            self.scaler = Some(ScalingContext::get(
                self.decoded_frame.format(),
                self.decoded_frame.width(),
                self.decoded_frame.height(),
                Pixel::RGBA,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )?);
        }
        if let Some(scaler) = self.scaler.as_mut() {
            scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;
        }

        let buffer = packed_plane(&self.scaled_frame, self.width, self.height, RGBA_CHANNELS);
        Frame::new(self.width, self.height, RGBA_CHANNELS, buffer).map_err(|error| {
            PersistenceError::VideoDecodeError(format!("Failed to pack decoded frame: {error}"))
        })
    }
}

impl Iterator for VideoFrames<'_> {
    type Item = Result<Frame, PersistenceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                let result = self.convert_current_frame();
                self.done = result.is_err();
                return Some(result);
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut *self.input_context) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            self.done = true;
                            return Some(Err(PersistenceError::from(error)));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(PersistenceError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(PersistenceError::VideoDecodeError(format!(
                        "Failed to read packet: {error}"
                    ))));
                }
            }
        }
    }
}

impl FrameSource for VideoFrames<'_> {
    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (self.frame_count > 0).then_some(self.frame_count)
    }

    fn next_frame(&mut self) -> Option<Result<Frame, PersistenceError>> {
        self.next()
    }
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    (rate.denominator() != 0 && rate.numerator() > 0)
        .then(|| f64::from(rate.numerator()) / f64::from(rate.denominator()))
}

/// Copy plane 0 into a tightly packed buffer, dropping per-row padding.
fn packed_plane(frame: &VideoFrame, width: u32, height: u32, channels: u8) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_len = width as usize * channels as usize;
    let rows = height as usize;
    let data = frame.data(0);

    if stride == row_len {
        return data[..row_len * rows].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_len * rows);
    for row in data.chunks(stride).take(rows) {
        buffer.extend_from_slice(&row[..row_len]);
    }
    buffer
}
