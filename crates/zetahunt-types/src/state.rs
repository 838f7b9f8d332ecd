//! Live search state
//!
//! The process-wide tuning knobs: granularity, pause flag, precision
//! levels, and the current domain. Mutated only via controller
//! commands; flushed to durable storage on every change and re-derived
//! at startup from the persisted copy plus the ledger, never from
//! volatile memory alone.

use crate::command::{Command, CommandEffect, CommandRejected};
use crate::domain::{ScanDomain, SigmaBand};
use serde::{Deserialize, Serialize};

/// Process-wide search configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// Sample points per region (floor [`crate::POINTS_FLOOR`])
    pub points_per_region: u32,
    /// Step applied by granularity commands (fine or coarse)
    pub increment: u32,
    /// Spacing between consecutive t samples, in units of t
    pub point_spacing: f64,
    /// Whether the scan loop is paused
    pub paused: bool,
    /// Truncation length of the approximate series
    pub approx_terms: u32,
    /// Significant digits for precision verification
    pub digits: u32,
    /// Approximate-stage detection threshold on |zeta(s)|
    pub approx_threshold: f64,
    /// Sigma band sampled by the detector
    pub sigma: SigmaBand,
    /// Current scan domain
    pub domain: ScanDomain,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            points_per_region: crate::DEFAULT_POINTS_PER_REGION,
            increment: crate::INCREMENT_COARSE,
            point_spacing: crate::DEFAULT_POINT_SPACING,
            paused: false,
            approx_terms: crate::DEFAULT_APPROX_TERMS,
            digits: crate::MIN_DIGITS,
            approx_threshold: crate::DEFAULT_APPROX_THRESHOLD,
            sigma: SigmaBand::default(),
            domain: ScanDomain::default(),
        }
    }
}

impl SearchState {
    /// Width of the next region, derived from the current granularity.
    #[inline]
    #[must_use]
    pub fn region_width(&self) -> f64 {
        f64::from(self.points_per_region) * self.point_spacing
    }

    /// Digit count verification actually runs at: the configured count,
    /// clamped up to the minimum.
    #[inline]
    #[must_use]
    pub fn effective_digits(&self) -> u32 {
        self.digits.max(crate::MIN_DIGITS)
    }

    /// Apply a controller command.
    ///
    /// # Errors
    /// Returns `CommandRejected` without mutating state if the command
    /// would breach a bound (granularity floor, malformed domain).
    pub fn apply(&mut self, command: Command) -> Result<CommandEffect, CommandRejected> {
        match command {
            Command::RaisePoints => {
                self.points_per_region = self.points_per_region.saturating_add(self.increment);
                Ok(CommandEffect::Updated)
            }
            Command::LowerPoints => {
                let lowered = self.points_per_region.saturating_sub(self.increment);
                if lowered < crate::POINTS_FLOOR {
                    return Err(CommandRejected::BelowPointsFloor {
                        current: self.points_per_region,
                        floor: crate::POINTS_FLOOR,
                    });
                }
                self.points_per_region = lowered;
                Ok(CommandEffect::Updated)
            }
            Command::ToggleIncrement => {
                self.increment = if self.increment == crate::INCREMENT_COARSE {
                    crate::INCREMENT_FINE
                } else {
                    crate::INCREMENT_COARSE
                };
                Ok(CommandEffect::Updated)
            }
            Command::Pause => {
                self.paused = true;
                Ok(CommandEffect::Updated)
            }
            Command::Resume => {
                self.paused = false;
                Ok(CommandEffect::Updated)
            }
            Command::ResetDomain { t_lo, t_hi } => {
                self.domain = ScanDomain::new(t_lo, t_hi)?;
                Ok(CommandEffect::DomainReset { t_lo, t_hi })
            }
            Command::RaiseDigits => {
                self.digits = self.digits.saturating_add(crate::DIGITS_STEP);
                Ok(CommandEffect::Updated)
            }
            Command::RaiseApproxTerms => {
                self.approx_terms = self.approx_terms.saturating_add(crate::APPROX_TERMS_STEP);
                Ok(CommandEffect::Updated)
            }
            Command::Shutdown => Ok(CommandEffect::Shutdown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_and_lower_points_move_by_increment() {
        let mut state = SearchState::default();
        assert_eq!(state.points_per_region, 10_000);

        state.apply(Command::RaisePoints).unwrap();
        assert_eq!(state.points_per_region, 11_000);

        state.apply(Command::LowerPoints).unwrap();
        assert_eq!(state.points_per_region, 10_000);
    }

    #[test]
    fn lower_points_rejected_at_floor() {
        let mut state = SearchState {
            points_per_region: crate::POINTS_FLOOR,
            ..SearchState::default()
        };

        let err = state.apply(Command::LowerPoints).unwrap_err();
        assert!(matches!(err, CommandRejected::BelowPointsFloor { .. }));
        assert_eq!(state.points_per_region, crate::POINTS_FLOOR);
    }

    #[test]
    fn lower_points_rejected_when_result_would_undershoot_floor() {
        // 1,500 - 1,000 = 500 < floor: reject rather than clamp
        let mut state = SearchState {
            points_per_region: 1_500,
            ..SearchState::default()
        };

        assert!(state.apply(Command::LowerPoints).is_err());
        assert_eq!(state.points_per_region, 1_500);
    }

    #[test]
    fn toggle_increment_flips_between_steps() {
        let mut state = SearchState::default();
        assert_eq!(state.increment, crate::INCREMENT_COARSE);

        state.apply(Command::ToggleIncrement).unwrap();
        assert_eq!(state.increment, crate::INCREMENT_FINE);

        state.apply(Command::ToggleIncrement).unwrap();
        assert_eq!(state.increment, crate::INCREMENT_COARSE);
    }

    #[test]
    fn reset_domain_validates_bounds() {
        let mut state = SearchState::default();

        let err = state.apply(Command::ResetDomain { t_lo: 5.0, t_hi: 1.0 });
        assert!(err.is_err());
        assert_eq!(state.domain, ScanDomain::default());

        let effect = state
            .apply(Command::ResetDomain { t_lo: 3.1e12, t_hi: 1e15 })
            .unwrap();
        assert!(matches!(effect, CommandEffect::DomainReset { .. }));
        assert_eq!(state.domain.t_lo, 3.1e12);
    }

    #[test]
    fn pause_and_resume_flip_flag() {
        let mut state = SearchState::default();
        state.apply(Command::Pause).unwrap();
        assert!(state.paused);
        state.apply(Command::Resume).unwrap();
        assert!(!state.paused);
    }

    #[test]
    fn effective_digits_never_below_minimum() {
        let state = SearchState {
            digits: 10,
            ..SearchState::default()
        };
        assert_eq!(state.effective_digits(), crate::MIN_DIGITS);
    }

    #[test]
    fn region_width_tracks_granularity() {
        let state = SearchState::default();
        let expected = 10_000.0 * crate::DEFAULT_POINT_SPACING;
        assert!((state.region_width() - expected).abs() < f64::EPSILON);
    }
}
