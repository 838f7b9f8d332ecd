//! Anomaly candidates and verified results

use crate::region::RegionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate point `s = sigma + it` whose approximate |zeta(s)| fell
/// below the detection threshold.
///
/// Created by the anomaly detector, consumed by the precision verifier,
/// immutable afterward. False positives are expected; every record is
/// appended to the anomaly sink before verification runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Region the candidate was found in
    pub region: RegionId,
    /// Real part of the candidate point
    pub sigma: f64,
    /// Imaginary height of the candidate point
    pub t: f64,
    /// Approximate |zeta(s)| at the candidate
    pub zeta_abs: f64,
    /// Detection time
    pub detected_at: DateTime<Utc>,
}

impl AnomalyRecord {
    /// Create a record stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(region: RegionId, sigma: f64, t: f64, zeta_abs: f64) -> Self {
        Self {
            region,
            sigma,
            t,
            zeta_abs,
            detected_at: Utc::now(),
        }
    }
}

/// Verdict of high-precision verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Refined magnitude did not fall below the tight threshold
    FalsePositive,
    /// A genuine zero with sigma within tolerance of 1/2
    OnCriticalLine,
    /// A genuine zero with sigma off the critical line
    Counterexample,
}

impl Classification {
    /// Whether this verdict is the terminal counterexample event.
    #[inline]
    #[must_use]
    pub fn is_counterexample(&self) -> bool {
        matches!(self, Self::Counterexample)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::FalsePositive => "false_positive",
            Self::OnCriticalLine => "on_critical_line",
            Self::Counterexample => "counterexample",
        };
        write!(f, "{s}")
    }
}

/// An anomaly plus its high-precision re-evaluation and verdict.
///
/// A counterexample result is terminal: it must be durably recorded
/// before any further progress is acknowledged, and is never discarded
/// or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedResult {
    /// The candidate this verdict refers to
    pub anomaly: AnomalyRecord,
    /// Refined real part
    pub sigma: f64,
    /// Refined imaginary height
    pub t: f64,
    /// Refined |zeta(s)|
    pub zeta_abs: f64,
    /// Significant digits the verdict was classified at
    pub digits: u32,
    /// The verdict
    pub classification: Classification,
    /// Set when the refined magnitude landed inside the ambiguity band;
    /// such results are conservatively false positives but flagged for
    /// manual review
    pub ambiguous: bool,
    /// Verification time
    pub verified_at: DateTime<Utc>,
}

impl VerifiedResult {
    /// Assemble a result stamped with the current time.
    #[must_use]
    pub fn new(
        anomaly: AnomalyRecord,
        sigma: f64,
        t: f64,
        zeta_abs: f64,
        digits: u32,
        classification: Classification,
        ambiguous: bool,
    ) -> Self {
        Self {
            anomaly,
            sigma,
            t,
            zeta_abs,
            digits,
            classification,
            ambiguous,
            verified_at: Utc::now(),
        }
    }
}
