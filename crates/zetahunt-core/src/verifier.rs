//! Precision verifier: the expensive second stage
//!
//! Re-evaluates each candidate at high precision (the backend refines
//! toward a nearby root) and classifies it. Classification never runs
//! below the configured minimum digit count, and a counterexample is
//! the one verdict the rest of the system treats as terminal.

use std::sync::Arc;
use zetahunt_backend::{BackendError, NumericBackend};
use zetahunt_types::{
    AnomalyRecord, Classification, SearchState, VerifiedResult, AMBIGUITY_CEILING,
    CRITICAL_LINE_TOLERANCE, TIGHT_THRESHOLD,
};

/// Second-stage verifier over a high-precision backend.
#[derive(Debug)]
pub struct PrecisionVerifier<B> {
    backend: Arc<B>,
}

impl<B: NumericBackend> PrecisionVerifier<B> {
    /// Create a verifier over `backend`.
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Verify one candidate.
    ///
    /// The digit count is the configured level clamped up to the
    /// minimum; the returned result records the count actually used.
    ///
    /// # Errors
    /// Backend failures; the caller retries transient ones.
    pub async fn verify(
        &self,
        anomaly: &AnomalyRecord,
        state: &SearchState,
    ) -> Result<VerifiedResult, BackendError> {
        let digits = state.effective_digits();
        let eval = self
            .backend
            .precise_eval(anomaly.sigma, anomaly.t, digits)
            .await?;

        let (classification, ambiguous) = classify(eval.sigma, eval.zeta_abs);
        match classification {
            Classification::Counterexample => {
                tracing::error!(
                    sigma = eval.sigma,
                    t = eval.t,
                    zeta_abs = eval.zeta_abs,
                    digits,
                    "COUNTEREXAMPLE CONFIRMED: zero off the critical line"
                );
            }
            Classification::OnCriticalLine => {
                tracing::info!(
                    sigma = eval.sigma,
                    t = eval.t,
                    zeta_abs = eval.zeta_abs,
                    "zero confirmed on the critical line"
                );
            }
            Classification::FalsePositive if ambiguous => {
                tracing::warn!(
                    sigma = eval.sigma,
                    t = eval.t,
                    zeta_abs = eval.zeta_abs,
                    "ambiguous verdict near tight threshold; kept as false positive for manual review"
                );
            }
            Classification::FalsePositive => {
                tracing::debug!(
                    sigma = eval.sigma,
                    t = eval.t,
                    zeta_abs = eval.zeta_abs,
                    "false positive"
                );
            }
        }

        Ok(VerifiedResult::new(
            anomaly.clone(),
            eval.sigma,
            eval.t,
            eval.zeta_abs,
            digits,
            classification,
            ambiguous,
        ))
    }
}

/// Classification rule over the refined point.
///
/// Magnitudes at or above the tight threshold are false positives; of
/// those, magnitudes inside the ambiguity band are additionally marked
/// for manual review. Genuine zeros split on |sigma - 1/2|.
fn classify(sigma: f64, zeta_abs: f64) -> (Classification, bool) {
    if zeta_abs >= TIGHT_THRESHOLD {
        let ambiguous = zeta_abs < AMBIGUITY_CEILING;
        (Classification::FalsePositive, ambiguous)
    } else if (sigma - 0.5).abs() <= CRITICAL_LINE_TOLERANCE {
        (Classification::OnCriticalLine, false)
    } else {
        (Classification::Counterexample, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zetahunt_test_utils::ScriptedBackend;
    use zetahunt_types::RegionId;

    fn anomaly_at(sigma: f64, t: f64) -> AnomalyRecord {
        AnomalyRecord::new(RegionId::new(), sigma, t, 1e-6)
    }

    #[test]
    fn classify_splits_on_thresholds() {
        assert_eq!(classify(0.55, 0.5), (Classification::FalsePositive, false));
        assert_eq!(classify(0.55, 1e-9), (Classification::FalsePositive, true));
        assert_eq!(classify(0.5, 1e-12), (Classification::OnCriticalLine, false));
        assert_eq!(classify(0.55, 1e-12), (Classification::Counterexample, false));
    }

    #[tokio::test]
    async fn off_line_zero_classifies_as_counterexample() {
        // The synthetic hunt scenario: sigma = 0.55, t = 3.1e12, with
        // the precise backend reporting a magnitude below the tight
        // threshold
        let backend =
            Arc::new(ScriptedBackend::new(1.0).with_precise_result(0.55, 3.1e12, 1e-12));
        let verifier = PrecisionVerifier::new(backend);

        let result = verifier
            .verify(&anomaly_at(0.55, 3.1e12), &SearchState::default())
            .await
            .unwrap();

        assert_eq!(result.classification, Classification::Counterexample);
        assert!(!result.ambiguous);
        assert_eq!(result.digits, 50);
    }

    #[tokio::test]
    async fn on_line_zero_classifies_as_on_critical_line() {
        let backend =
            Arc::new(ScriptedBackend::new(1.0).with_precise_result(0.5, 3.1e12, 1e-14));
        let verifier = PrecisionVerifier::new(backend);

        let result = verifier
            .verify(&anomaly_at(0.500_2, 3.1e12), &SearchState::default())
            .await
            .unwrap();

        assert_eq!(result.classification, Classification::OnCriticalLine);
    }

    #[tokio::test]
    async fn surviving_magnitude_classifies_as_false_positive() {
        let backend =
            Arc::new(ScriptedBackend::new(1.0).with_precise_result(0.55, 3.1e12, 3e-4));
        let verifier = PrecisionVerifier::new(backend);

        let result = verifier
            .verify(&anomaly_at(0.55, 3.1e12), &SearchState::default())
            .await
            .unwrap();

        assert_eq!(result.classification, Classification::FalsePositive);
        assert!(!result.ambiguous);
    }

    #[tokio::test]
    async fn near_threshold_magnitude_is_marked_ambiguous() {
        // Inside [1e-10, 1e-8): conservatively a false positive, but
        // flagged for manual review, never escalated
        let backend =
            Arc::new(ScriptedBackend::new(1.0).with_precise_result(0.55, 3.1e12, 5e-9));
        let verifier = PrecisionVerifier::new(backend);

        let result = verifier
            .verify(&anomaly_at(0.55, 3.1e12), &SearchState::default())
            .await
            .unwrap();

        assert_eq!(result.classification, Classification::FalsePositive);
        assert!(result.ambiguous);
    }

    #[tokio::test]
    async fn digits_clamp_up_to_the_minimum() {
        let backend = Arc::new(ScriptedBackend::new(1.0));
        let verifier = PrecisionVerifier::new(backend.clone());

        let state = SearchState {
            digits: 10,
            ..SearchState::default()
        };
        let result = verifier
            .verify(&anomaly_at(0.6, 4.0e12), &state)
            .await
            .unwrap();

        assert_eq!(result.digits, 50);
        assert_eq!(backend.last_precise_digits(), Some(50));
    }
}
