//! Controller commands
//!
//! Discrete commands posted by an external controller and consumed by
//! the scan engine only at suspension points, never mid-evaluation.

use crate::domain::IntervalError;
use serde::{Deserialize, Serialize};

/// A discrete controller command.
///
/// Each command takes effect at the engine's next suspension point.
/// Invalid commands are rejected locally with state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Raise points-per-region by the current increment
    RaisePoints,
    /// Lower points-per-region by the current increment; rejected if
    /// the result would fall below the floor
    LowerPoints,
    /// Toggle the increment between its fine and coarse steps
    ToggleIncrement,
    /// Suspend scanning at the next suspension point
    Pause,
    /// Resume a paused scan
    Resume,
    /// Deliberately restart the hunt over new domain bounds
    ResetDomain {
        /// New inclusive lower bound
        t_lo: f64,
        /// New exclusive upper bound
        t_hi: f64,
    },
    /// Raise the verification digit count by one step
    RaiseDigits,
    /// Raise the approximate-series truncation length by one step
    RaiseApproxTerms,
    /// Stop the scan loop at the next suspension point
    Shutdown,
}

/// Rejection reasons for malformed or out-of-bounds commands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandRejected {
    /// Lowering points would breach the floor
    #[error("points per region cannot drop below {floor} (currently {current})")]
    BelowPointsFloor {
        /// Points-per-region at the time of the command
        current: u32,
        /// The enforced floor
        floor: u32,
    },

    /// Reset bounds failed interval validation
    #[error("invalid domain bounds: {0}")]
    InvalidDomain(#[from] IntervalError),
}

/// What a successfully applied command did, from the engine's point of
/// view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandEffect {
    /// Search state changed; persist it
    Updated,
    /// Domain bounds were redefined; the ledger must record the reset
    DomainReset {
        /// New inclusive lower bound
        t_lo: f64,
        /// New exclusive upper bound
        t_hi: f64,
    },
    /// The controller requested shutdown
    Shutdown,
}
