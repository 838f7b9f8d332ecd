//! Ledger error taxonomy
//!
//! Any ledger failure is fatal to the scan loop: without a working
//! journal the non-overlap invariant cannot be guaranteed, so the
//! process stops rather than proceed with unverifiable state.

use zetahunt_types::{IntervalError, RegionId};

/// Errors from the durable region ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The underlying store failed
    #[error("ledger I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A fully terminated journal line failed to parse
    #[error("journal corrupt at line {line}: {detail}")]
    Corrupt {
        /// 1-based line number
        line: usize,
        /// Parse failure detail
        detail: String,
    },

    /// An entry's hash chain does not match its predecessor
    #[error("journal hash chain broken at seq {seq}")]
    ChainBroken {
        /// Sequence number of the offending entry
        seq: u64,
    },

    /// Completion referenced a region the ledger has never claimed
    #[error("unknown region {id}")]
    UnknownRegion {
        /// The offending region ID
        id: RegionId,
    },

    /// Completion bounds disagree with the claimed bounds
    #[error(
        "region {id} bounds mismatch: ledger holds [{held_lo}, {held_hi}), caller gave [{given_lo}, {given_hi})"
    )]
    BoundsMismatch {
        /// The region being completed
        id: RegionId,
        /// Lower bound on record
        held_lo: f64,
        /// Upper bound on record
        held_hi: f64,
        /// Lower bound supplied
        given_lo: f64,
        /// Upper bound supplied
        given_hi: f64,
    },

    /// Reset bounds failed interval validation
    #[error("invalid domain bounds: {0}")]
    InvalidDomain(#[from] IntervalError),
}
