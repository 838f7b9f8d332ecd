//! Append-only hash-chained journal
//!
//! One JSON record per line. Every record carries a sequence number,
//! UTC timestamp, the previous record's SHA-256 hash, and its own hash,
//! so replay can detect truncation in the middle of history as well as
//! tampering. A torn trailing line (crash mid-append, never
//! acknowledged) is discarded on recovery.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zetahunt_types::{Region, RegionId, ScanSummary, VerifiedResult};

/// Hash of the empty chain, before any record exists.
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// The events the ledger persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEntry {
    /// Domain bounds fixed at ledger creation
    DomainDefined {
        /// Inclusive lower bound
        t_lo: f64,
        /// Exclusive upper bound
        t_hi: f64,
    },
    /// Deliberate restart of the hunt over new bounds; opens a new
    /// scan epoch, the only way the frontier moves backwards
    DomainReset {
        /// Inclusive lower bound
        t_lo: f64,
        /// Exclusive upper bound
        t_hi: f64,
    },
    /// A region was carved from the frontier and is being scanned
    RegionClaimed {
        /// The claimed region (status in-progress)
        region: Region,
    },
    /// A region's scan pass finished
    RegionScanned {
        /// The region that completed
        id: RegionId,
        /// Inclusive lower bound, re-stated for auditability
        t_lo: f64,
        /// Exclusive upper bound, re-stated for auditability
        t_hi: f64,
        /// Scan outcome summary
        summary: ScanSummary,
    },
    /// A candidate finished high-precision verification
    ResultVerified {
        /// The classified result
        result: VerifiedResult,
    },
}

/// A journal line: entry plus chain metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// Monotonic sequence number, starting at 0
    pub seq: u64,
    /// Append time
    pub at: DateTime<Utc>,
    /// The persisted event
    pub entry: JournalEntry,
    /// Hex SHA-256 of the previous record
    pub prev_hash: String,
    /// Hex SHA-256 of this record
    pub hash: String,
}

fn compute_hash(seq: u64, at: &DateTime<Utc>, entry_json: &str, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(at.to_rfc3339().as_bytes());
    hasher.update([0]);
    hasher.update(entry_json.as_bytes());
    hasher.update([0]);
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Append handle over the journal file.
#[derive(Debug)]
pub struct Journal {
    file: File,
    path: PathBuf,
    next_seq: u64,
    last_hash: String,
}

impl Journal {
    /// Open (or create) the journal at `path`, replaying and verifying
    /// every record already on disk.
    ///
    /// A trailing line without its newline terminator was never
    /// acknowledged to a caller; it is truncated away. A malformed
    /// line anywhere else is corruption.
    ///
    /// # Errors
    /// `LedgerError::Io` on filesystem failure, `Corrupt`/`ChainBroken`
    /// when the surviving history does not verify.
    pub fn open(path: &Path) -> Result<(Self, Vec<JournalRecord>), LedgerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let mut records = Vec::new();
        let mut valid_len = 0usize;
        let mut prev_hash = GENESIS_HASH.to_string();
        let mut offset = 0usize;
        let mut line_no = 0usize;

        while offset < content.len() {
            let Some(nl) = content[offset..].find('\n') else {
                // Torn tail from a crash mid-append; never acknowledged
                tracing::warn!(
                    path = %path.display(),
                    discarded_bytes = content.len() - offset,
                    "discarding torn trailing journal line"
                );
                break;
            };
            line_no += 1;
            let line = &content[offset..offset + nl];
            offset += nl + 1;

            let record: JournalRecord =
                serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
                    line: line_no,
                    detail: e.to_string(),
                })?;

            if record.prev_hash != prev_hash {
                return Err(LedgerError::ChainBroken { seq: record.seq });
            }
            let entry_json = serde_json::to_string(&record.entry).map_err(|e| {
                LedgerError::Corrupt {
                    line: line_no,
                    detail: e.to_string(),
                }
            })?;
            let expected = compute_hash(record.seq, &record.at, &entry_json, &record.prev_hash);
            if record.hash != expected {
                return Err(LedgerError::ChainBroken { seq: record.seq });
            }

            prev_hash = record.hash.clone();
            valid_len = offset;
            records.push(record);
        }

        if valid_len < content.len() {
            file.set_len(valid_len as u64)?;
            file.seek(std::io::SeekFrom::End(0))?;
        }

        let next_seq = records.len() as u64;
        Ok((
            Self {
                file,
                path: path.to_path_buf(),
                next_seq,
                last_hash: prev_hash,
            },
            records,
        ))
    }

    /// Append an entry, flushing and fsyncing before returning.
    ///
    /// The record is only acknowledged (and the chain advanced) once it
    /// is durable.
    ///
    /// # Errors
    /// `LedgerError::Io` if the write or sync fails; the in-memory
    /// chain state is unchanged in that case.
    pub fn append(&mut self, entry: JournalEntry) -> Result<JournalRecord, LedgerError> {
        let at = Utc::now();
        let entry_json = serde_json::to_string(&entry).map_err(|e| LedgerError::Corrupt {
            line: 0,
            detail: e.to_string(),
        })?;
        let hash = compute_hash(self.next_seq, &at, &entry_json, &self.last_hash);
        let record = JournalRecord {
            seq: self.next_seq,
            at,
            entry,
            prev_hash: self.last_hash.clone(),
            hash,
        };

        let mut line = serde_json::to_string(&record).map_err(|e| LedgerError::Corrupt {
            line: 0,
            detail: e.to_string(),
        })?;
        line.push('\n');

        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;

        self.next_seq += 1;
        self.last_hash = record.hash.clone();
        Ok(record)
    }

    /// Number of records acknowledged so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u64 {
        self.next_seq
    }

    /// Whether the journal holds no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.next_seq == 0
    }

    /// Path of the backing file.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
