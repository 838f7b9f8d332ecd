//! Result sink
//!
//! Append-only structured records of every flagged anomaly and every
//! verified result. Deliberately decoupled from the ledger's
//! transactional guarantees: the ledger is the source of truth, the
//! sink is the durable export surface. Records are never mutated or
//! deleted.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use zetahunt_types::{AnomalyRecord, VerifiedResult};

/// Sink failures.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Filesystem failure
    #[error("sink I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Record failed to serialize
    #[error("sink serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only record consumer.
///
/// `record_anomaly` is called the moment a candidate is flagged,
/// before verification; false positives are expected in that stream.
pub trait ResultSink: Send + Sync {
    /// Append a flagged candidate.
    ///
    /// # Errors
    /// `SinkError` if the record could not be appended.
    fn record_anomaly(&self, record: &AnomalyRecord) -> Result<(), SinkError>;

    /// Append a classified result.
    ///
    /// # Errors
    /// `SinkError` if the record could not be appended.
    fn record_verified(&self, result: &VerifiedResult) -> Result<(), SinkError>;
}

/// JSON-lines sink: one file for anomalies, one for verified results.
#[derive(Debug)]
pub struct JsonlSink {
    anomalies: Mutex<File>,
    verified: Mutex<File>,
}

impl JsonlSink {
    /// Open (or create) the sink files under `dir`.
    ///
    /// # Errors
    /// `SinkError::Io` if either file cannot be opened for append.
    pub fn open(dir: &Path) -> Result<Self, SinkError> {
        let open = |name: &str| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))
        };
        Ok(Self {
            anomalies: Mutex::new(open("anomalies.jsonl")?),
            verified: Mutex::new(open("verified.jsonl")?),
        })
    }

    fn append<T: serde::Serialize>(file: &Mutex<File>, value: &T) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(value)?;
        line.push('\n');
        let mut guard = file.lock();
        guard.write_all(line.as_bytes())?;
        guard.flush()?;
        Ok(())
    }
}

impl ResultSink for JsonlSink {
    fn record_anomaly(&self, record: &AnomalyRecord) -> Result<(), SinkError> {
        Self::append(&self.anomalies, record)
    }

    fn record_verified(&self, result: &VerifiedResult) -> Result<(), SinkError> {
        Self::append(&self.verified, result)
    }
}
