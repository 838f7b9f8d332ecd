//! Durable search-state ledger
//!
//! The ledger is the single source of truth for which sub-intervals of
//! the scan domain have been scanned and which candidate points have
//! been verified. It is an append-only, hash-chained JSON-lines journal
//! replayed into an in-memory interval index at startup, so a process
//! killed between any two operations resumes with no gaps and no
//! re-scans of completed work.
//!
//! Durability ordering is strict: every journal append is flushed and
//! fsynced before the in-memory index moves, so `frontier()` can never
//! claim more progress than the disk holds.

pub mod error;
pub mod journal;
pub mod ledger;

pub use error::LedgerError;
pub use journal::{Journal, JournalEntry, JournalRecord};
pub use ledger::{LedgerStats, RegionLedger};
