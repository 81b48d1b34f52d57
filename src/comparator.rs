//! Sample-level frame comparison.
//!
//! [`PixelComparator`] decides whether two equally sized sample buffers
//! differ beyond a [`Tolerance`]. Two samples `x` and `y` differ when
//! `(x - y)^2 > tolerance`; a buffer differs when any sample differs.
//!
//! # Example
//!
//! ```
//! use framepersist::{PixelComparator, Tolerance};
//!
//! let comparator = PixelComparator::new(Tolerance::new(4));
//! // (12 - 10)^2 = 4 is within tolerance, (20 - 10)^2 = 100 is not.
//! assert!(!comparator.differs(&[10, 10], &[12, 10])?);
//! assert_eq!(comparator.count_differences(&[10, 10], &[12, 20])?, 1);
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```

#[cfg(feature = "rayon")]
use ::rayon::prelude::*;

use crate::config::Tolerance;
use crate::error::PersistenceError;

#[cfg(feature = "rayon")]
const PARALLEL_CHUNK: usize = 64 * 1024;

/// Returns `true` when two samples differ by more than `tolerance`.
///
/// The subtraction happens in `i64`, so `y > x` squares the true negative
/// difference rather than a wrapped unsigned value.
#[inline]
pub fn is_sample_different(x: u8, y: u8, tolerance: u64) -> bool {
    let delta = i64::from(x) - i64::from(y);
    (delta * delta) as u64 > tolerance
}

/// Compares sample buffers under a fixed tolerance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelComparator {
    tolerance: Tolerance,
}

impl PixelComparator {
    /// Create a comparator with the given tolerance.
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// The tolerance this comparator applies.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Returns `true` as soon as one sample pair differs.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BufferLengthMismatch`] if the buffers have
    /// different lengths.
    pub fn differs(&self, left: &[u8], right: &[u8]) -> Result<bool, PersistenceError> {
        check_lengths(left, right)?;
        let tolerance = self.tolerance.squared_threshold();

        #[cfg(feature = "rayon")]
        {
            Ok(left
                .par_chunks(PARALLEL_CHUNK)
                .zip(right.par_chunks(PARALLEL_CHUNK))
                .any(|(a, b)| any_different(a, b, tolerance)))
        }

        #[cfg(not(feature = "rayon"))]
        {
            Ok(any_different(left, right, tolerance))
        }
    }

    /// Count every sample pair that differs.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::BufferLengthMismatch`] if the buffers have
    /// different lengths.
    pub fn count_differences(&self, left: &[u8], right: &[u8]) -> Result<u64, PersistenceError> {
        check_lengths(left, right)?;
        let tolerance = self.tolerance.squared_threshold();

        #[cfg(feature = "rayon")]
        {
            Ok(left
                .par_chunks(PARALLEL_CHUNK)
                .zip(right.par_chunks(PARALLEL_CHUNK))
                .map(|(a, b)| count_different(a, b, tolerance))
                .sum())
        }

        #[cfg(not(feature = "rayon"))]
        {
            Ok(count_different(left, right, tolerance))
        }
    }
}

fn check_lengths(left: &[u8], right: &[u8]) -> Result<(), PersistenceError> {
    if left.len() != right.len() {
        return Err(PersistenceError::BufferLengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    Ok(())
}

fn any_different(left: &[u8], right: &[u8], tolerance: u64) -> bool {
    left.iter()
        .zip(right)
        .any(|(&x, &y)| is_sample_different(x, y, tolerance))
}

fn count_different(left: &[u8], right: &[u8], tolerance: u64) -> u64 {
    left.iter()
        .zip(right)
        .filter(|&(&x, &y)| is_sample_different(x, y, tolerance))
        .count() as u64
}
