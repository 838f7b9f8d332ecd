//! Scan domain and sigma band intervals

use serde::{Deserialize, Serialize};

/// Errors constructing interval types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntervalError {
    /// One or both bounds are NaN or infinite
    #[error("interval bounds must be finite, got [{lo}, {hi})")]
    NonFinite {
        /// Lower bound as given
        lo: f64,
        /// Upper bound as given
        hi: f64,
    },

    /// Bounds are out of order or equal
    #[error("interval must be non-empty and ordered, got [{lo}, {hi})")]
    Empty {
        /// Lower bound as given
        lo: f64,
        /// Upper bound as given
        hi: f64,
    },

    /// The scan domain lives on the positive imaginary axis
    #[error("scan domain lower bound must be positive, got {lo}")]
    NonPositive {
        /// Lower bound as given
        lo: f64,
    },

    /// Sigma band must stay inside the open critical strip
    #[error("sigma band [{lo}, {hi}) must lie within (0, 1)")]
    OutsideCriticalStrip {
        /// Lower bound as given
        lo: f64,
        /// Upper bound as given
        hi: f64,
    },
}

/// Half-open interval `[t_lo, t_hi)` on the imaginary-height axis.
///
/// The lower bound never retreats below the historical frontier except
/// via an explicit reset command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanDomain {
    /// Inclusive lower bound
    pub t_lo: f64,
    /// Exclusive upper bound
    pub t_hi: f64,
}

impl ScanDomain {
    /// Create a validated domain.
    ///
    /// # Errors
    /// Returns `IntervalError` if the bounds are non-finite, empty, or
    /// not positive.
    pub fn new(t_lo: f64, t_hi: f64) -> Result<Self, IntervalError> {
        if !t_lo.is_finite() || !t_hi.is_finite() {
            return Err(IntervalError::NonFinite { lo: t_lo, hi: t_hi });
        }
        if t_lo >= t_hi {
            return Err(IntervalError::Empty { lo: t_lo, hi: t_hi });
        }
        if t_lo <= 0.0 {
            return Err(IntervalError::NonPositive { lo: t_lo });
        }
        Ok(Self { t_lo, t_hi })
    }

    /// Check whether `t` lies within the domain.
    #[inline]
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.t_lo && t < self.t_hi
    }

    /// Domain width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.t_hi - self.t_lo
    }
}

impl Default for ScanDomain {
    fn default() -> Self {
        Self {
            t_lo: crate::DEFAULT_T_LO,
            t_hi: crate::DEFAULT_T_HI,
        }
    }
}

/// Real-part band `[lo, hi)` sampled by the detector.
///
/// Constrained to the open critical strip; the default band starts just
/// off the critical line since on-line zeros are not counterexamples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaBand {
    /// Inclusive lower bound
    pub lo: f64,
    /// Exclusive upper bound
    pub hi: f64,
}

impl SigmaBand {
    /// Create a validated sigma band.
    ///
    /// # Errors
    /// Returns `IntervalError` if the band is empty, non-finite, or
    /// escapes the open critical strip.
    pub fn new(lo: f64, hi: f64) -> Result<Self, IntervalError> {
        if !lo.is_finite() || !hi.is_finite() {
            return Err(IntervalError::NonFinite { lo, hi });
        }
        if lo >= hi {
            return Err(IntervalError::Empty { lo, hi });
        }
        if lo <= 0.0 || hi >= 1.0 {
            return Err(IntervalError::OutsideCriticalStrip { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// Band width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

impl Default for SigmaBand {
    fn default() -> Self {
        Self {
            lo: crate::DEFAULT_SIGMA_LO,
            hi: crate::DEFAULT_SIGMA_HI,
        }
    }
}
