//! Engine error taxonomy
//!
//! Transient backend failures never reach this type: the engine retries
//! them with backoff at region granularity. What does reach it is fatal
//! to the scan loop, above all a ledger failure: the non-overlap
//! invariant cannot be guaranteed without a working ledger.

use crate::sink::SinkError;
use zetahunt_backend::BackendError;
use zetahunt_ledger::LedgerError;

/// Fatal scan-loop errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The durable ledger failed; scanning must stop
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// A backend failure that retries cannot fix
    #[error("backend failure: {0}")]
    Backend(#[from] BackendError),

    /// The result sink failed
    #[error("result sink failure: {0}")]
    Sink(#[from] SinkError),

    /// Persisting the search state failed
    #[error("state persistence failure: {0}")]
    StatePersist(#[from] std::io::Error),
}
