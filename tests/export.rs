//! CSV export integration tests.

use std::io::{self, BufWriter, Write};

use framepersist::{
    AnalysisOptions, CSV_HEADER, ExportRow, Frame, FrameSequence, PersistenceError, format_csv_row,
};

fn rows(values: &[u8], fps: f64) -> Vec<ExportRow> {
    let frames = values.iter().map(|&value| Frame::filled(2, 2, 4, value)).collect();
    framepersist::analyze(&mut FrameSequence::new(frames, fps), &AnalysisOptions::new())
        .unwrap()
        .export_rows()
}

#[test]
fn csv_layout() {
    let mut buffer = Vec::new();
    let outcome = framepersist::write_csv(&rows(&[1, 1, 2, 2, 2], 10.0), &mut buffer).unwrap();

    assert!(outcome.is_complete());
    assert_eq!(outcome.rows_written, 5);
    assert_eq!(
        String::from_utf8(buffer).unwrap(),
        "frame,average_fps,frame_time,unique_frame_count,real_frame_time,frame_width,frame_height\n\
         1,10.00,100.00,1,200.00,0,0\n\
         2,5.00,200.00,1,200.00,0,0\n\
         3,6.67,100.00,2,300.00,0,0\n\
         4,5.00,200.00,2,300.00,0,0\n\
         5,4.00,300.00,2,300.00,0,0\n"
    );
}

#[test]
fn empty_analysis_writes_header_only() {
    let mut buffer = Vec::new();
    let outcome = framepersist::write_csv(&rows(&[], 30.0), &mut buffer).unwrap();
    assert_eq!(outcome.rows_written, 0);
    assert_eq!(String::from_utf8(buffer).unwrap(), format!("{CSV_HEADER}\n"));
}

#[test]
fn save_csv_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frames.csv");

    let outcome = framepersist::save_csv(&rows(&[3, 3, 3], 60.0), &path).unwrap();
    assert_eq!(outcome.rows_written, 3);

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 4);
    assert!(written.lines().all(|line| line.split(',').count() == 7));
}

#[test]
fn save_csv_into_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("frames.csv");
    let result = framepersist::save_csv(&rows(&[1], 30.0), &path);
    assert!(matches!(result, Err(PersistenceError::IoError(_))));
}

/// Accepts the header, then rejects every other row write.
struct FlakyWriter {
    writes: usize,
    accepted: Vec<u8>,
}

impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writes += 1;
        if self.writes > 1 && self.writes % 2 == 0 {
            return Err(io::Error::other("disk hiccup"));
        }
        self.accepted.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failed_rows_are_reported_and_skipped() {
    let mut writer = FlakyWriter {
        writes: 0,
        accepted: Vec::new(),
    };
    let outcome = framepersist::write_csv(&rows(&[1, 2, 3, 4], 10.0), &mut writer).unwrap();

    assert!(!outcome.is_complete());
    assert_eq!(outcome.rows_written, 2);
    let failed: Vec<u64> = outcome.failed_rows.iter().map(|(frame, _)| *frame).collect();
    assert_eq!(failed, vec![1, 3]);

    let text = String::from_utf8(writer.accepted).unwrap();
    assert!(text.starts_with(CSV_HEADER));
    assert!(text.contains("\n2,"));
    assert!(text.contains("\n4,"));
}

/// Rejects everything.
struct BrokenWriter;

impl Write for BrokenWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::other("read-only"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn header_failure_is_fatal() {
    let result = framepersist::write_csv(&rows(&[1], 10.0), BrokenWriter);
    assert!(matches!(result, Err(PersistenceError::IoError(_))));
}

/// Accepts whole writes until `cap` bytes have landed, then fails.
struct Quota {
    cap: usize,
    landed: Vec<u8>,
}

impl Write for Quota {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.landed.len() + buf.len() > self.cap {
            return Err(io::Error::other("quota"));
        }
        self.landed.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn buffered_rows_count_only_once_they_reach_the_sink() {
    let rows = rows(&[1, 1, 2, 2, 2], 10.0);
    let header = format!("{CSV_HEADER}\n");
    let kept = format!("{header}{}{}", format_csv_row(&rows[0]), format_csv_row(&rows[1]));
    let mut sink = Quota {
        cap: kept.len(),
        landed: Vec::new(),
    };

    let outcome = framepersist::write_csv(&rows, BufWriter::new(&mut sink)).unwrap();

    assert_eq!(outcome.rows_written, 2);
    let failed: Vec<u64> = outcome.failed_rows.iter().map(|(frame, _)| *frame).collect();
    assert_eq!(failed, vec![3, 4, 5]);
    assert_eq!(String::from_utf8(sink.landed).unwrap(), kept);
}

#[cfg(target_os = "linux")]
#[test]
fn full_device_fails_at_the_header() {
    let result = framepersist::save_csv(&rows(&[1, 2], 10.0), "/dev/full");
    assert!(matches!(result, Err(PersistenceError::IoError(_))));
}
