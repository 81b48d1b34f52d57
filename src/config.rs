//! Analysis configuration.
//!
//! [`AnalysisOptions`] is a builder that threads the pixel tolerance,
//! resolution probing, progress callbacks, and cancellation tokens through
//! [`analyze`](crate::analyze) without polluting its signature.
//! [`VideoComparisonOptions`] does the same for
//! [`count_unique_video_frames`](crate::count_unique_video_frames).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framepersist::{AnalysisOptions, CancellationToken, ProgressCallback, ProgressInfo, Tolerance};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} frames", info.operation, info.processed);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = AnalysisOptions::new()
//!     .with_tolerance(Tolerance::from_level(2.5)?)
//!     .with_verbose(true)
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_batch_size(30);
//! # Ok::<(), framepersist::PersistenceError>(())
//! ```

use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::PersistenceError;
use crate::probe::ResolutionProber;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Highest tolerance level accepted from the command line.
pub const MAX_TOLERANCE_LEVEL: f64 = 255.0;

/// Threshold on the squared difference between two samples.
///
/// Samples `x` and `y` differ when `(x - y)^2` is strictly greater than the
/// threshold. [`Tolerance::EXACT`] (zero) treats any inequality as a
/// difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tolerance(u64);

impl Tolerance {
    /// Any differing sample counts.
    pub const EXACT: Tolerance = Tolerance(0);

    /// Wrap a raw squared-difference threshold.
    pub const fn new(squared_threshold: u64) -> Self {
        Self(squared_threshold)
    }

    /// Parse a user-facing tolerance level.
    ///
    /// The level must be finite and within `0.0..=255.0`; the fractional part
    /// is truncated and the integer is used directly as the squared-difference
    /// threshold.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidTolerance`] for NaN, infinite,
    /// negative, or out-of-range levels.
    pub fn from_level(level: f64) -> Result<Self, PersistenceError> {
        if !level.is_finite() {
            return Err(PersistenceError::InvalidTolerance(format!(
                "{level} is not a finite number"
            )));
        }
        if !(0.0..=MAX_TOLERANCE_LEVEL).contains(&level) {
            return Err(PersistenceError::InvalidTolerance(format!(
                "{level} is outside 0-{MAX_TOLERANCE_LEVEL}"
            )));
        }
        Ok(Self(level.trunc() as u64))
    }

    /// The raw squared-difference threshold.
    pub const fn squared_threshold(self) -> u64 {
        self.0
    }
}

impl Display for Tolerance {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Configuration for a persistence analysis run.
///
/// All fields have sensible defaults: exact comparison, no probing, no
/// progress reporting, never cancelled.
#[derive(Clone)]
pub struct AnalysisOptions {
    pub(crate) tolerance: Tolerance,
    /// Log each completed second's unique-frame count.
    pub(crate) verbose: bool,
    pub(crate) prober: Option<Arc<dyn ResolutionProber>>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    /// Fire the progress callback every N frames.
    pub(crate) batch_size: u64,
}

impl Debug for AnalysisOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisOptions")
            .field("tolerance", &self.tolerance)
            .field("verbose", &self.verbose)
            .field("has_prober", &self.prober.is_some())
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            tolerance: Tolerance::EXACT,
            verbose: false,
            prober: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Set the per-sample tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Log the unique-frame count of every completed second.
    ///
    /// The per-second counts are collected either way; this only controls
    /// logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Measure every frame's resolution with `prober`.
    ///
    /// Probing runs once per frame and any failure aborts the analysis.
    #[must_use]
    pub fn with_prober(mut self, prober: Arc<dyn ResolutionProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token, checked before each frame.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured tolerance.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Settings for pairing two videos frame by frame.
///
/// A frame pair counts as unique when at least
/// [`min_differing_samples`](VideoComparisonOptions::with_min_differing_samples)
/// samples differ under the tolerance.
#[derive(Clone)]
pub struct VideoComparisonOptions {
    pub(crate) min_differing_samples: u64,
    pub(crate) tolerance: Tolerance,
    pub(crate) progress: Option<Arc<dyn ProgressCallback>>,
}

impl Debug for VideoComparisonOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoComparisonOptions")
            .field("min_differing_samples", &self.min_differing_samples)
            .field("tolerance", &self.tolerance)
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

impl Default for VideoComparisonOptions {
    fn default() -> Self {
        Self {
            min_differing_samples: 1,
            tolerance: Tolerance::EXACT,
            progress: None,
        }
    }
}

impl VideoComparisonOptions {
    /// Defaults: one differing sample makes a pair unique, exact comparison.
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of differing samples for a pair to count as unique.
    #[must_use]
    pub fn with_min_differing_samples(mut self, count: u64) -> Self {
        self.min_differing_samples = count;
        self
    }

    /// Per-sample tolerance used when counting differences.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Attach a progress callback (fired once per frame pair).
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_truncated() {
        assert_eq!(Tolerance::from_level(0.0).unwrap(), Tolerance::EXACT);
        assert_eq!(Tolerance::from_level(2.9).unwrap().squared_threshold(), 2);
        assert_eq!(Tolerance::from_level(255.0).unwrap().squared_threshold(), 255);
    }

    #[test]
    fn malformed_levels_are_rejected() {
        for level in [-0.5, 255.5, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    Tolerance::from_level(level),
                    Err(PersistenceError::InvalidTolerance(_))
                ),
                "{level} should be rejected",
            );
        }
    }

    #[test]
    fn options_defaults() {
        let options = AnalysisOptions::new();
        let debug = format!("{options:?}");
        assert!(debug.contains("AnalysisOptions"));
        assert!(debug.contains("has_prober: false"));
        assert!(debug.contains("batch_size: 1"));
        assert_eq!(options.tolerance(), Tolerance::EXACT);
    }

    #[test]
    fn batch_size_clamps_zero() {
        let options = AnalysisOptions::new().with_batch_size(0);
        assert_eq!(options.batch_size, 1);
    }

    #[test]
    fn cancellation_is_observed() {
        let token = CancellationToken::new();
        let options = AnalysisOptions::new().with_cancellation(token.clone());
        assert!(!options.is_cancelled());
        token.cancel();
        assert!(options.is_cancelled());
    }
}
