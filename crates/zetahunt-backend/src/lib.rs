//! Numeric evaluation contract for zetahunt
//!
//! The core consumes zeta evaluation through a narrow contract with two
//! capabilities:
//! - cheap approximate evaluation (batched, best-effort precision,
//!   possibly GPU-resident)
//! - expensive high-precision evaluation (single point, root-refining)
//!
//! Either capability may be CPU-only. A pure-CPU reference backend is
//! included so the pipeline runs end to end without external hardware.

pub mod error;
pub mod reference;

pub use error::BackendError;
pub use reference::CpuBackend;

use serde::{Deserialize, Serialize};

/// A single sample point `s = sigma + it` in the critical strip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePoint {
    /// Real part
    pub sigma: f64,
    /// Imaginary height
    pub t: f64,
}

impl SamplePoint {
    /// Create a sample point.
    #[inline]
    #[must_use]
    pub fn new(sigma: f64, t: f64) -> Self {
        Self { sigma, t }
    }
}

/// Outcome of a high-precision evaluation.
///
/// The backend may refine the candidate toward a nearby root, so the
/// returned point can differ from the one handed in. Classification
/// uses the refined coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreciseEvaluation {
    /// Refined real part
    pub sigma: f64,
    /// Refined imaginary height
    pub t: f64,
    /// |zeta(s)| at the refined point
    pub zeta_abs: f64,
    /// Significant digits the evaluation was carried out at
    pub digits: u32,
}

/// Narrow evaluation contract the core consumes.
///
/// Implementations must tolerate arbitrarily large `t` (the scan domain
/// reaches 10^15) and must never panic on points inside the critical
/// strip.
#[async_trait::async_trait]
pub trait NumericBackend: Send + Sync {
    /// Batched approximate evaluation: one magnitude estimate per input
    /// point, in input order.
    ///
    /// `terms` bounds the work per point (series truncation length for
    /// series-based backends).
    ///
    /// # Errors
    /// `BackendError::Transient` when the evaluation failed or timed
    /// out and a retry may succeed.
    async fn approx_eval(
        &self,
        points: &[SamplePoint],
        terms: u32,
    ) -> Result<Vec<f64>, BackendError>;

    /// Single-point high-precision evaluation at the requested digit
    /// count, refining toward a nearby root where possible.
    ///
    /// # Errors
    /// `BackendError::Transient` for retryable failures;
    /// `BackendError::Unsupported` when the backend cannot honor the
    /// request at all.
    async fn precise_eval(
        &self,
        sigma: f64,
        t: f64,
        digits: u32,
    ) -> Result<PreciseEvaluation, BackendError>;
}
