//! CSV export of per-frame rows.
//!
//! The column layout matches what frame-time graphing tools expect:
//!
//! ```text
//! frame,average_fps,frame_time,unique_frame_count,real_frame_time,frame_width,frame_height
//! ```
//!
//! Floating-point columns are written with two decimals. A failure to open
//! the file or write the header aborts the export; a failed row is logged,
//! recorded in [`ExportOutcome`], and skipped.
//!
//! Every row is flushed on its own, so a row only counts as written once the
//! writer has accepted and flushed it.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::PersistenceError;
use crate::report::ExportRow;

/// Header row of the CSV export.
pub const CSV_HEADER: &str =
    "frame,average_fps,frame_time,unique_frame_count,real_frame_time,frame_width,frame_height";

/// What happened during an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Rows written successfully (header excluded).
    pub rows_written: u64,
    /// `(frame, error message)` for every row that could not be written.
    pub failed_rows: Vec<(u64, String)>,
}

impl ExportOutcome {
    /// Returns `true` if every row made it out.
    pub fn is_complete(&self) -> bool {
        self.failed_rows.is_empty()
    }
}

/// Format a row as one CSV line, newline included.
pub fn format_csv_row(row: &ExportRow) -> String {
    format!(
        "{},{:.2},{:.2},{},{:.2},{},{}\n",
        row.frame,
        row.average_fps,
        row.frame_time_ms,
        row.unique_frame_count,
        row.real_frame_time_ms,
        row.frame_width,
        row.frame_height,
    )
}

/// Write the header and `rows` to `writer`.
///
/// Each row is handed to the writer in a single `write_all` followed by a
/// `flush`; a failure in either is logged as a warning and the remaining rows
/// are still attempted.
///
/// # Errors
///
/// Returns [`PersistenceError::IoError`] if the header cannot be written.
pub fn write_csv<W: Write>(rows: &[ExportRow], mut writer: W) -> Result<ExportOutcome, PersistenceError> {
    write_line(&mut writer, format!("{CSV_HEADER}\n").as_bytes())?;

    let mut outcome = ExportOutcome::default();
    for row in rows {
        match write_line(&mut writer, format_csv_row(row).as_bytes()) {
            Ok(()) => outcome.rows_written += 1,
            Err(error) => {
                log::warn!("failed to write CSV row {}: {error}", row.frame);
                outcome.failed_rows.push((row.frame, error.to_string()));
            }
        }
    }

    Ok(outcome)
}

fn write_line<W: Write>(writer: &mut W, line: &[u8]) -> io::Result<()> {
    writer.write_all(line)?;
    writer.flush()
}

/// Create (or truncate) `path` and write the rows as CSV.
///
/// Rows go straight to the file, one write per row.
///
/// # Errors
///
/// Returns [`PersistenceError::IoError`] if the file cannot be created or
/// the header cannot be written.
pub fn save_csv<P: AsRef<Path>>(rows: &[ExportRow], path: P) -> Result<ExportOutcome, PersistenceError> {
    let path = path.as_ref();
    log::debug!("Writing {} CSV rows to {}", rows.len(), path.display());
    let file = File::create(path)?;
    write_csv(rows, file)
}
