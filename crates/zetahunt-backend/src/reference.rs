//! CPU reference backend
//!
//! Implements both halves of the evaluation contract in pure f64:
//! - the approximate path is the truncated Dirichlet partial sum, the
//!   same estimate the batched GPU path produces
//! - the precise path evaluates the approximate functional equation
//!   (Riemann-Siegel main terms) with a Stirling log-gamma, then Newton
//!   root refinement
//!
//! This backend exists so the pipeline runs end to end on any machine.
//! Its accuracy is bounded by f64: requested digit counts are honored
//! as contract data and scale the refinement effort, but true 50-digit
//! verification requires plugging in an arbitrary-precision backend.

use crate::{BackendError, NumericBackend, PreciseEvaluation, SamplePoint};
use num_complex::Complex64;

/// Significant digits f64 can actually deliver.
const F64_DIGITS: u32 = 15;

/// Heights below this use Euler-Maclaurin directly; above it the
/// approximate functional equation is both cheaper and more accurate.
const AFE_CUTOVER: f64 = 40.0;

/// Pure-CPU reference implementation of [`NumericBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl CpuBackend {
    /// Create the reference backend.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl NumericBackend for CpuBackend {
    async fn approx_eval(
        &self,
        points: &[SamplePoint],
        terms: u32,
    ) -> Result<Vec<f64>, BackendError> {
        let magnitudes = points
            .iter()
            .map(|p| {
                let s = Complex64::new(p.sigma, p.t);
                let m = dirichlet_partial(s, terms).norm();
                // Overflowed estimates are simply "not small"
                if m.is_finite() { m } else { f64::INFINITY }
            })
            .collect();
        Ok(magnitudes)
    }

    async fn precise_eval(
        &self,
        sigma: f64,
        t: f64,
        digits: u32,
    ) -> Result<PreciseEvaluation, BackendError> {
        if !sigma.is_finite() || !t.is_finite() {
            return Err(BackendError::Unsupported(format!(
                "non-finite evaluation point sigma={sigma} t={t}"
            )));
        }
        if digits > F64_DIGITS {
            tracing::debug!(
                digits,
                f64_digits = F64_DIGITS,
                "reference backend is f64-bound; delivering best effort"
            );
        }

        let newton_evals = 6 + (digits / 10).min(20);
        let (root, zeta_abs) = refine_root(Complex64::new(sigma, t), newton_evals);

        Ok(PreciseEvaluation {
            sigma: root.re,
            t: root.im,
            zeta_abs,
            digits,
        })
    }
}

/// Truncated Dirichlet partial sum `sum_{n=1}^{terms} n^{-s}`.
///
/// Divergent for sigma <= 1 as an exact formula; used as the cheap
/// candidate signal exactly as the batched GPU path computes it.
fn dirichlet_partial(s: Complex64, terms: u32) -> Complex64 {
    let mut sum = Complex64::new(0.0, 0.0);
    for n in 1..=terms.max(1) {
        sum += n_pow_neg_s(f64::from(n), s);
    }
    sum
}

#[inline]
fn n_pow_neg_s(n: f64, s: Complex64) -> Complex64 {
    (-s * n.ln()).exp()
}

/// zeta(s) via the approximate functional equation for large heights,
/// Euler-Maclaurin below the cutover.
fn zeta(s: Complex64) -> Complex64 {
    if s.im.abs() < AFE_CUTOVER {
        zeta_euler_maclaurin(s, 64)
    } else {
        zeta_functional_equation(s)
    }
}

/// Approximate functional equation:
/// `zeta(s) ~ sum_{n<=N} n^{-s} + chi(s) * sum_{n<=N} n^{s-1}` with
/// `N = floor(sqrt(t / 2pi))`.
fn zeta_functional_equation(s: Complex64) -> Complex64 {
    let t = s.im.abs();
    let n = (t / std::f64::consts::TAU).sqrt().floor().max(1.0) as u32;

    let mut direct = Complex64::new(0.0, 0.0);
    let mut mirrored = Complex64::new(0.0, 0.0);
    let one_minus_s = Complex64::new(1.0, 0.0) - s;
    for k in 1..=n {
        let kf = f64::from(k);
        direct += n_pow_neg_s(kf, s);
        mirrored += n_pow_neg_s(kf, one_minus_s);
    }

    direct + chi(s) * mirrored
}

/// The functional-equation factor
/// `chi(s) = pi^(s - 1/2) * Gamma((1-s)/2) / Gamma(s/2)`.
///
/// Computed in log space; the huge real parts of the two log-gamma
/// terms cancel, leaving a modest magnitude `(t/2pi)^(1/2 - sigma)`.
fn chi(s: Complex64) -> Complex64 {
    let half = Complex64::new(0.5, 0.0);
    let ln_pi = std::f64::consts::PI.ln();
    let exponent =
        (s - half) * ln_pi + ln_gamma((Complex64::new(1.0, 0.0) - s) * 0.5) - ln_gamma(s * 0.5);
    exponent.exp()
}

/// Euler-Maclaurin evaluation with Bernoulli tail corrections, valid
/// for modest heights.
fn zeta_euler_maclaurin(s: Complex64, terms: u32) -> Complex64 {
    // B_2, B_4, B_6, B_8 over (2k)!
    const BERNOULLI_OVER_FACT: [f64; 4] = [
        1.0 / 12.0,
        -1.0 / 720.0,
        1.0 / 30_240.0,
        -1.0 / 1_209_600.0,
    ];

    let n = f64::from(terms.max(2));
    let mut sum = Complex64::new(0.0, 0.0);
    for k in 1..terms.max(2) {
        sum += n_pow_neg_s(f64::from(k), s);
    }

    let n_neg_s = n_pow_neg_s(n, s);
    sum += n_neg_s * n / (s - Complex64::new(1.0, 0.0));
    sum += n_neg_s * 0.5;

    // Tail: sum_k B_2k/(2k)! * s(s+1)...(s+2k-2) * N^(-s-2k+1)
    let mut rising = s;
    let mut power = n_neg_s / n;
    for (k, coeff) in BERNOULLI_OVER_FACT.iter().enumerate() {
        sum += rising * power * *coeff;
        let j = (2 * k + 1) as f64;
        rising = rising * (s + j) * (s + j + 1.0);
        power /= n * n;
    }

    sum
}

/// Stirling-series log-gamma with recurrence shift for small |z|.
fn ln_gamma(mut z: Complex64) -> Complex64 {
    const HALF_LN_TAU: f64 = 0.918_938_533_204_672_7;

    let mut shift = Complex64::new(0.0, 0.0);
    while z.norm() < 10.0 {
        shift -= z.ln();
        z += 1.0;
    }

    let zinv = Complex64::new(1.0, 0.0) / z;
    let zinv2 = zinv * zinv;
    // 1/(12z) - 1/(360 z^3) + 1/(1260 z^5)
    let series = zinv * (1.0 / 12.0 - zinv2 * (1.0 / 360.0 - zinv2 * (1.0 / 1260.0)));

    (z - Complex64::new(0.5, 0.0)) * z.ln() - z + HALF_LN_TAU + series + shift
}

/// Newton iteration toward the nearest root, keeping the best point
/// seen. The step size floor reflects f64 resolution at large heights.
fn refine_root(s0: Complex64, max_evals: u32) -> (Complex64, f64) {
    let h = (s0.im.abs() * f64::EPSILON * 64.0).max(1e-2);
    let dh = Complex64::new(h, 0.0);

    let mut best = s0;
    let mut best_mag = zeta(s0).norm();
    let mut s = s0;

    for _ in 0..max_evals {
        let z = zeta(s);
        let dz = (zeta(s + dh) - zeta(s - dh)) / (2.0 * h);
        if !dz.is_finite() || dz.norm() == 0.0 {
            break;
        }

        let step = z / dz;
        s -= step;
        let m = zeta(s).norm();
        if !m.is_finite() {
            break;
        }
        if m < best_mag {
            best = s;
            best_mag = m;
        }
        if step.norm() < h {
            break;
        }
    }

    (best, best_mag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_maclaurin_matches_known_values() {
        // zeta(2) = pi^2 / 6
        let z = zeta_euler_maclaurin(Complex64::new(2.0, 0.0), 64);
        assert!((z.re - std::f64::consts::PI.powi(2) / 6.0).abs() < 1e-12);
        assert!(z.im.abs() < 1e-12);

        // zeta(4) = pi^4 / 90
        let z = zeta_euler_maclaurin(Complex64::new(4.0, 0.0), 64);
        assert!((z.re - std::f64::consts::PI.powi(4) / 90.0).abs() < 1e-12);
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        // Gamma(5) = 24
        let g = ln_gamma(Complex64::new(5.0, 0.0)).exp();
        assert!((g.re - 24.0).abs() < 1e-6);
        assert!(g.im.abs() < 1e-6);
    }

    #[test]
    fn zeta_vanishes_near_first_nontrivial_zero() {
        // First zero at sigma = 1/2, t ~ 14.134725
        let near = zeta(Complex64::new(0.5, 14.134_725_14)).norm();
        let away = zeta(Complex64::new(0.5, 15.0)).norm();
        assert!(near < 1e-3, "|zeta| near the zero was {near}");
        assert!(away > near * 10.0);
    }

    #[test]
    fn refinement_converges_onto_first_zero() {
        let (root, mag) = refine_root(Complex64::new(0.5, 14.1), 12);
        assert!((root.im - 14.134_725).abs() < 1e-3, "refined t = {}", root.im);
        assert!(mag < 1e-4, "refined |zeta| = {mag}");
    }

    #[tokio::test]
    async fn approx_eval_returns_one_magnitude_per_point() {
        let backend = CpuBackend::new();
        let points = vec![
            SamplePoint::new(0.6, 100.0),
            SamplePoint::new(0.7, 200.0),
            SamplePoint::new(0.8, 300.0),
        ];

        let mags = backend.approx_eval(&points, 1_000).await.unwrap();
        assert_eq!(mags.len(), 3);
        assert!(mags.iter().all(|m| m.is_finite() && *m >= 0.0));
    }

    #[tokio::test]
    async fn precise_eval_rejects_non_finite_points() {
        let backend = CpuBackend::new();
        let err = backend.precise_eval(f64::NAN, 14.0, 50).await.unwrap_err();
        assert!(matches!(err, BackendError::Unsupported(_)));
    }

    #[tokio::test]
    async fn precise_eval_reports_requested_digits() {
        let backend = CpuBackend::new();
        let eval = backend.precise_eval(0.5, 14.1, 50).await.unwrap();
        assert_eq!(eval.digits, 50);
        assert!(eval.zeta_abs.is_finite());
    }
}
