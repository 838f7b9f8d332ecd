//! Anomaly detector: the cheap first stage
//!
//! Samples a claimed region, batches the points to the backend's
//! approximate evaluator, and flags every sub-threshold magnitude as a
//! candidate. Candidates go to the anomaly sink the moment they are
//! flagged, independent of what verification later decides; false
//! positives are expected and are not errors.

use crate::error::EngineError;
use crate::sink::ResultSink;
use rand::Rng;
use std::sync::Arc;
use zetahunt_backend::{NumericBackend, SamplePoint};
use zetahunt_types::{AnomalyRecord, Region, SearchState, SigmaBand};

/// Points per approximate-evaluation batch.
const DEFAULT_BATCH_SIZE: usize = 100;

/// First-stage detector over a claimed region.
#[derive(Debug)]
pub struct AnomalyDetector<B> {
    backend: Arc<B>,
    batch_size: usize,
}

impl<B: NumericBackend> AnomalyDetector<B> {
    /// Create a detector over `backend`.
    #[inline]
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the evaluation batch size.
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Scan one region: evaluate its sample points approximately and
    /// flag every magnitude below the detection threshold.
    ///
    /// A region producing zero anomalies is still a valid, completed
    /// scan.
    ///
    /// # Errors
    /// Backend failures (the caller retries transient ones at region
    /// granularity) or sink failures.
    pub async fn scan(
        &self,
        region: &Region,
        state: &SearchState,
        sink: &dyn ResultSink,
    ) -> Result<Vec<AnomalyRecord>, EngineError> {
        let points = sample_points(region, &state.sigma);
        let mut anomalies = Vec::new();

        for batch in points.chunks(self.batch_size) {
            let magnitudes = self.backend.approx_eval(batch, state.approx_terms).await?;
            for (point, magnitude) in batch.iter().zip(magnitudes) {
                if magnitude < state.approx_threshold {
                    let record = AnomalyRecord::new(region.id, point.sigma, point.t, magnitude);
                    sink.record_anomaly(&record)?;
                    tracing::info!(
                        sigma = record.sigma,
                        t = record.t,
                        zeta_abs = record.zeta_abs,
                        region = %region.id,
                        "anomaly flagged"
                    );
                    anomalies.push(record);
                }
            }
        }

        tracing::debug!(
            region = %region.id,
            points = points.len(),
            anomalies = anomalies.len(),
            "region scan complete"
        );
        Ok(anomalies)
    }
}

/// Log-spaced t samples across the region (t spans many orders of
/// magnitude over the hunt's lifetime), each with a sigma drawn
/// uniformly from the band.
fn sample_points(region: &Region, band: &SigmaBand) -> Vec<SamplePoint> {
    let n = region.points.max(1) as usize;
    let ln_lo = region.t_lo.ln();
    let ln_step = (region.t_hi.ln() - ln_lo) / n as f64;
    let mut rng = rand::rng();

    (0..n)
        .map(|k| {
            let t = (ln_lo + ln_step * k as f64).exp().min(region.t_hi);
            let sigma = rng.random_range(band.lo..band.hi);
            SamplePoint::new(sigma, t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use parking_lot::Mutex;
    use zetahunt_test_utils::ScriptedBackend;
    use zetahunt_types::VerifiedResult;

    /// In-memory [`ResultSink`] capturing everything it is handed.
    ///
    /// Defined locally (rather than reused from `zetahunt-test-utils`)
    /// because that crate depends on `zetahunt-core`; importing its
    /// sink into these in-lib unit tests would pull a second copy of
    /// `zetahunt-core` and its `ResultSink` trait into the graph.
    #[derive(Debug, Default)]
    struct MemorySink {
        anomalies: Mutex<Vec<AnomalyRecord>>,
        verified: Mutex<Vec<VerifiedResult>>,
    }

    impl MemorySink {
        fn anomalies(&self) -> Vec<AnomalyRecord> {
            self.anomalies.lock().clone()
        }
    }

    impl ResultSink for MemorySink {
        fn record_anomaly(&self, record: &AnomalyRecord) -> Result<(), SinkError> {
            self.anomalies.lock().push(record.clone());
            Ok(())
        }

        fn record_verified(&self, result: &VerifiedResult) -> Result<(), SinkError> {
            self.verified.lock().push(result.clone());
            Ok(())
        }
    }

    fn test_state() -> SearchState {
        SearchState::default()
    }

    #[test]
    fn samples_are_log_spaced_within_bounds() {
        let region = Region::claimed(1_000.0, 2_000.0, 500);
        let band = SigmaBand::default();
        let points = sample_points(&region, &band);

        assert_eq!(points.len(), 500);
        assert!(points.iter().all(|p| p.t >= 1_000.0 && p.t <= 2_000.0));
        assert!(points.iter().all(|p| p.sigma >= band.lo && p.sigma < band.hi));
        assert!(points.windows(2).all(|w| w[0].t < w[1].t));
    }

    #[tokio::test]
    async fn sub_threshold_point_is_flagged() {
        // 1e-6 < 1e-5: must be flagged
        let backend = Arc::new(
            ScriptedBackend::new(1.0).with_approx_window(1_000.0, 2_000.0, 1e-6),
        );
        let detector = AnomalyDetector::new(backend);
        let sink = MemorySink::default();

        let region = Region::claimed(1_000.0, 2_000.0, 50);
        let anomalies = detector
            .scan(&region, &test_state(), &sink)
            .await
            .unwrap();

        assert_eq!(anomalies.len(), 50);
        assert_eq!(sink.anomalies().len(), 50);
        assert!(anomalies.iter().all(|a| a.zeta_abs < 1e-5));
    }

    #[tokio::test]
    async fn above_threshold_point_is_not_flagged() {
        // 1e-4 > 1e-5: must not be flagged
        let backend = Arc::new(
            ScriptedBackend::new(1.0).with_approx_window(1_000.0, 2_000.0, 1e-4),
        );
        let detector = AnomalyDetector::new(backend);
        let sink = MemorySink::default();

        let region = Region::claimed(1_000.0, 2_000.0, 50);
        let anomalies = detector
            .scan(&region, &test_state(), &sink)
            .await
            .unwrap();

        assert!(anomalies.is_empty());
        assert!(sink.anomalies().is_empty());
    }

    #[tokio::test]
    async fn zero_anomaly_region_is_a_valid_scan() {
        let backend = Arc::new(ScriptedBackend::new(1.0));
        let detector = AnomalyDetector::new(backend.clone());
        let sink = MemorySink::default();

        let region = Region::claimed(3.0001753329e12, 3.0001753329e12 + 2_500.0, 10_000);
        let anomalies = detector
            .scan(&region, &test_state(), &sink)
            .await
            .unwrap();

        assert!(anomalies.is_empty());
        // All 10,000 points went through the approximate path
        assert_eq!(backend.approx_points_evaluated(), 10_000);
    }

    #[tokio::test]
    async fn transient_backend_failure_propagates_for_retry() {
        let backend = Arc::new(ScriptedBackend::new(1.0).failing_approx_calls(1));
        let detector = AnomalyDetector::new(backend);
        let sink = MemorySink::default();

        let region = Region::claimed(1_000.0, 2_000.0, 10);
        let err = detector
            .scan(&region, &test_state(), &sink)
            .await
            .unwrap_err();

        match err {
            EngineError::Backend(e) => assert!(e.is_transient()),
            other => panic!("expected backend error, got {other}"),
        }
    }
}
