//! Testing utilities for the zetahunt workspace
//!
//! Scripted backends and in-memory sinks shared by unit and
//! integration tests.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use zetahunt_backend::{BackendError, NumericBackend, PreciseEvaluation, SamplePoint};
use zetahunt_core::{ResultSink, SinkError};
use zetahunt_types::{AnomalyRecord, VerifiedResult};

/// Deterministic stand-in for a numeric backend.
///
/// Approximate evaluation returns `default_magnitude` everywhere except
/// inside configured t-windows. Precise evaluation pops pre-scripted
/// results in order, falling back to echoing the query point at the
/// default magnitude. Transient failures can be injected on either
/// path.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    default_magnitude: f64,
    approx_windows: Vec<(f64, f64, f64)>,
    precise_presets: Mutex<VecDeque<(f64, f64, f64)>>,
    approx_failures: AtomicU32,
    precise_failures: AtomicU32,
    approx_points: AtomicU64,
    last_precise_digits: Mutex<Option<u32>>,
}

impl ScriptedBackend {
    pub fn new(default_magnitude: f64) -> Self {
        Self {
            default_magnitude,
            ..Self::default()
        }
    }

    /// Approximate magnitudes for any t in `[t_lo, t_hi)` become
    /// `magnitude`.
    #[must_use]
    pub fn with_approx_window(mut self, t_lo: f64, t_hi: f64, magnitude: f64) -> Self {
        self.approx_windows.push((t_lo, t_hi, magnitude));
        self
    }

    /// Enqueue a precise-evaluation result `(sigma, t, |zeta|)`;
    /// results are consumed in order.
    #[must_use]
    pub fn with_precise_result(self, sigma: f64, t: f64, zeta_abs: f64) -> Self {
        self.precise_presets.lock().push_back((sigma, t, zeta_abs));
        self
    }

    /// Make the next `n` approximate calls fail transiently.
    #[must_use]
    pub fn failing_approx_calls(self, n: u32) -> Self {
        self.approx_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Make the next `n` precise calls fail transiently.
    #[must_use]
    pub fn failing_precise_calls(self, n: u32) -> Self {
        self.precise_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Total points pushed through the approximate path.
    pub fn approx_points_evaluated(&self) -> u64 {
        self.approx_points.load(Ordering::SeqCst)
    }

    /// Digit count of the most recent precise call.
    pub fn last_precise_digits(&self) -> Option<u32> {
        *self.last_precise_digits.lock()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl NumericBackend for ScriptedBackend {
    async fn approx_eval(
        &self,
        points: &[SamplePoint],
        _terms: u32,
    ) -> Result<Vec<f64>, BackendError> {
        if Self::take_failure(&self.approx_failures) {
            return Err(BackendError::Transient("scripted approx failure".into()));
        }

        self.approx_points
            .fetch_add(points.len() as u64, Ordering::SeqCst);
        Ok(points
            .iter()
            .map(|p| {
                self.approx_windows
                    .iter()
                    .find(|(lo, hi, _)| p.t >= *lo && p.t < *hi)
                    .map_or(self.default_magnitude, |(_, _, m)| *m)
            })
            .collect())
    }

    async fn precise_eval(
        &self,
        sigma: f64,
        t: f64,
        digits: u32,
    ) -> Result<PreciseEvaluation, BackendError> {
        if Self::take_failure(&self.precise_failures) {
            return Err(BackendError::Transient("scripted precise failure".into()));
        }

        *self.last_precise_digits.lock() = Some(digits);
        let (sigma, t, zeta_abs) = self
            .precise_presets
            .lock()
            .pop_front()
            .unwrap_or((sigma, t, self.default_magnitude));
        Ok(PreciseEvaluation {
            sigma,
            t,
            zeta_abs,
            digits,
        })
    }
}

/// In-memory [`ResultSink`] capturing everything it is handed.
#[derive(Debug, Default)]
pub struct MemorySink {
    anomalies: Mutex<Vec<AnomalyRecord>>,
    verified: Mutex<Vec<VerifiedResult>>,
}

impl MemorySink {
    pub fn anomalies(&self) -> Vec<AnomalyRecord> {
        self.anomalies.lock().clone()
    }

    pub fn verified(&self) -> Vec<VerifiedResult> {
        self.verified.lock().clone()
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
