//! Second-pass reporting over a finished analysis.
//!
//! A unique frame's hold is only known once the next distinct frame arrives
//! (or the stream ends), so the per-frame `real_frame_time` and the summary
//! are computed here from a complete [`PersistenceAnalysis`] rather than
//! during the forward pass.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::analyzer::PersistenceAnalysis;

/// One exported row per input frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub frame: u64,
    /// Effective FPS up to and including this frame.
    pub average_fps: f64,
    /// Provisional hold at this frame, in milliseconds.
    pub frame_time_ms: f64,
    /// Id of the unique frame on screen.
    pub unique_frame_count: u64,
    /// Final hold of that unique frame, in milliseconds.
    pub real_frame_time_ms: f64,
    /// Probed width, `0` when probing was off.
    pub frame_width: u32,
    /// Probed height, `0` when probing was off.
    pub frame_height: u32,
}

/// Aggregate statistics of an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceSummary {
    /// Number of input frames analyzed.
    pub total_frames: u64,
    /// `total_frames / fps`, saturating at [`Duration::MAX`].
    pub duration: Duration,
    /// Number of unique frames.
    pub unique_frames: u64,
    /// Unique first appearances per second that frames fell in.
    pub unique_per_second: Vec<u64>,
    /// Mean of `unique_per_second`, `None` for an empty stream.
    pub average_unique_per_second: Option<f64>,
    /// Number of persistence events.
    pub persistence_events: usize,
    /// Mean event duration in milliseconds, `None` when there were no events.
    pub average_persistence_ms: Option<f64>,
    /// Mean probed `(width, height)` over frames that reported a non-zero
    /// width.
    pub average_resolution: Option<(f64, f64)>,
}

impl PersistenceAnalysis {
    /// Materialize one export row per frame with its final hold time.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.frames
            .iter()
            .map(|record| {
                let real_frame_time_ms = self
                    .unique_frame(record.unique_frame_id)
                    .map_or(0.0, |unique| unique.hold_ms(self.frame_time_ms));
                let (frame_width, frame_height) = record
                    .resolution
                    .map_or((0, 0), |resolution| (resolution.width, resolution.height));

                ExportRow {
                    frame: record.frame_number,
                    average_fps: record.effective_fps,
                    frame_time_ms: record.frame_time_ms,
                    unique_frame_count: record.unique_frame_id,
                    real_frame_time_ms,
                    frame_width,
                    frame_height,
                }
            })
            .collect()
    }

    /// Compute the aggregate statistics.
    pub fn summary(&self) -> PersistenceSummary {
        let total_frames = self.total_frames();
        let unique_frames = self.unique_frames.len() as u64;

        let average_unique_per_second = if self.unique_per_second.is_empty() {
            None
        } else {
            Some(unique_frames as f64 / self.unique_per_second.len() as f64)
        };

        let average_persistence_ms = if self.events.is_empty() {
            None
        } else {
            let total: f64 = self.events.iter().map(|event| event.duration_ms).sum();
            Some(total / self.events.len() as f64)
        };

        let measured: Vec<_> = self
            .frames
            .iter()
            .filter_map(|record| record.resolution)
            .filter(|resolution| resolution.width != 0)
            .collect();
        let average_resolution = if measured.is_empty() {
            None
        } else {
            let count = measured.len() as f64;
            let width: f64 = measured.iter().map(|r| f64::from(r.width)).sum();
            let height: f64 = measured.iter().map(|r| f64::from(r.height)).sum();
            Some((width / count, height / count))
        };

        PersistenceSummary {
            total_frames,
            duration: Duration::try_from_secs_f64(total_frames as f64 / self.frame_rate)
                .unwrap_or(Duration::MAX),
            unique_frames,
            unique_per_second: self.unique_per_second.clone(),
            average_unique_per_second,
            persistence_events: self.events.len(),
            average_persistence_ms,
            average_resolution,
        }
    }
}

impl Display for PersistenceSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "=== SUMMARY ===")?;
        writeln!(f, "Total frames analyzed: {}", self.total_frames)?;
        writeln!(f, "Video duration: {:.2} seconds", self.duration.as_secs_f64())?;
        for (index, count) in self.unique_per_second.iter().enumerate() {
            writeln!(f, "Second {}: {count} unique frames", index + 1)?;
        }
        writeln!(f, "Total unique frames: {}", self.unique_frames)?;
        if let Some(average) = self.average_unique_per_second {
            writeln!(f, "Average unique frames per second: {average:.2}")?;
        }

        match self.average_persistence_ms {
            Some(average) => {
                writeln!(f, "Average frame persistence: {average:.2} ms")?;
                writeln!(f, "Number of persistence events: {}", self.persistence_events)?;
            }
            None => writeln!(f, "No frame persistence detected (no frame held longer than two frame times)")?,
        }

        if let Some((width, height)) = self.average_resolution {
            writeln!(f, "Average width: {width:.2}")?;
            writeln!(f, "Average height: {height:.2}")?;
        }
        Ok(())
    }
}
