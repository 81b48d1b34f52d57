//! Per-frame resolution probing.
//!
//! Captures are often upscaled from a lower internal render resolution. A
//! [`ResolutionProber`] estimates that native resolution for a single frame;
//! [`ResdetProber`] shells out to the
//! [`resdet`](https://github.com/0x09/resdet) tool to do it.
//!
//! Probing is slow (one PNG encode and one process per frame) and any failure
//! aborts the analysis, since there is no meaningful fallback value.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use image::ImageFormat;

use crate::error::PersistenceError;
use crate::frame::Frame;

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Estimates the resolution of a single frame.
pub trait ResolutionProber: Send + Sync {
    /// Probe one frame.
    fn probe(&self, frame: &Frame) -> Result<Resolution, PersistenceError>;
}

/// Runs `resdet -v 1 <png>` on each frame.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use framepersist::{AnalysisOptions, ResdetProber, VideoFile};
///
/// let options = AnalysisOptions::new().with_prober(Arc::new(ResdetProber::new()));
/// let mut video = VideoFile::open("capture.mp4")?;
/// let analysis = framepersist::analyze(&mut video.frames()?, &options)?;
/// if let Some((width, height)) = analysis.summary().average_resolution {
///     println!("native resolution is roughly {width:.0}x{height:.0}");
/// }
/// # Ok::<(), framepersist::PersistenceError>(())
/// ```
#[derive(Debug)]
pub struct ResdetProber {
    program: PathBuf,
    scratch_dir: PathBuf,
    counter: AtomicU64,
}

impl Default for ResdetProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ResdetProber {
    /// Use `resdet` from `PATH` and the system temp directory.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("resdet"),
            scratch_dir: std::env::temp_dir(),
            counter: AtomicU64::new(0),
        }
    }

    /// Run a specific `resdet` executable.
    #[must_use]
    pub fn with_program<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    /// Write the temporary PNGs into `dir`.
    #[must_use]
    pub fn with_scratch_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.scratch_dir = dir.as_ref().to_path_buf();
        self
    }

    fn scratch_path(&self) -> PathBuf {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir
            .join(format!("framepersist-{}-{sequence}.png", std::process::id()))
    }

    fn run(&self, path: &Path, frame: &Frame) -> Result<Resolution, PersistenceError> {
        let image = frame.to_image().ok_or_else(|| {
            PersistenceError::ResolutionProbe(format!(
                "cannot encode a {}-channel frame as PNG",
                frame.channels()
            ))
        })?;
        image.save_with_format(path, ImageFormat::Png)?;

        let output = Command::new(&self.program)
            .arg("-v")
            .arg("1")
            .arg(path)
            .output()
            .map_err(|error| {
                PersistenceError::ResolutionProbe(format!(
                    "failed to run {}: {error}",
                    self.program.display()
                ))
            })?;

        if !output.status.success() {
            return Err(PersistenceError::ResolutionProbe(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim(),
            )));
        }

        parse_resdet_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl ResolutionProber for ResdetProber {
    fn probe(&self, frame: &Frame) -> Result<Resolution, PersistenceError> {
        let path = self.scratch_path();
        let result = self.run(&path, frame);
        let cleanup = std::fs::remove_file(&path);

        let resolution = result?;
        cleanup?;
        Ok(resolution)
    }
}

/// Parse `resdet -v 1` output, `"<width> <height>\n"`.
pub fn parse_resdet_output(output: &str) -> Result<Resolution, PersistenceError> {
    let mut fields = output.split_whitespace();
    let (Some(width), Some(height)) = (fields.next(), fields.next()) else {
        return Err(PersistenceError::ResolutionProbe(format!(
            "unexpected resdet output: {:?}",
            output.trim()
        )));
    };

    let parse = |value: &str| {
        value.parse::<u32>().map_err(|error| {
            PersistenceError::ResolutionProbe(format!("invalid dimension {value:?}: {error}"))
        })
    };

    Ok(Resolution {
        width: parse(width)?,
        height: parse(height)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_width_and_height() {
        let resolution = parse_resdet_output("1280 720\n").unwrap();
        assert_eq!(
            resolution,
            Resolution {
                width: 1280,
                height: 720
            }
        );
    }

    #[test]
    fn rejects_malformed_output() {
        assert!(parse_resdet_output("").is_err());
        assert!(parse_resdet_output("1280\n").is_err());
        assert!(parse_resdet_output("wide 720").is_err());
        assert!(parse_resdet_output("-1 720").is_err());
    }

    #[test]
    fn missing_program_is_fatal() {
        let scratch = tempfile::tempdir().unwrap();
        let prober = ResdetProber::new()
            .with_program(scratch.path().join("no-such-resdet"))
            .with_scratch_dir(scratch.path());

        let result = prober.probe(&Frame::filled(4, 4, 4, 0));
        assert!(matches!(result, Err(PersistenceError::ResolutionProbe(_))));
        // The scratch PNG is removed even when the probe fails.
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
