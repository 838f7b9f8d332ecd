//! Region ledger: claim / complete / verify / frontier
//!
//! An in-memory interval index replayed from the journal. All mutations
//! journal first (flushed and fsynced), then update the index, so a
//! crash between any two operations loses nothing that was
//! acknowledged.

use crate::error::LedgerError;
use crate::journal::{Journal, JournalEntry};
use std::collections::BTreeMap;
use std::path::Path;
use zetahunt_types::{
    Region, RegionStatus, ScanDomain, ScanSummary, VerifiedResult,
};

/// Aggregate counters over the ledger's current epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LedgerStats {
    /// Regions fully scanned
    pub regions_scanned: usize,
    /// Regions claimed but not completed
    pub regions_in_progress: usize,
    /// Total points evaluated across completed regions
    pub points_scanned: u64,
    /// Total anomalies flagged across completed regions
    pub anomalies: u64,
    /// Verified results recorded (all classifications)
    pub verified: usize,
    /// Confirmed counterexamples recorded
    pub counterexamples: usize,
}

/// Durable record of which intervals have been scanned and which
/// points have been verified.
///
/// Regions tile the domain from its lower bound: claims always carve
/// at the current claim edge, so scanned intervals are disjoint and
/// gap-free by construction, and the invariant survives restarts
/// because every claim is journaled before it is returned.
#[derive(Debug)]
pub struct RegionLedger {
    journal: Journal,
    domain: ScanDomain,
    /// Active-epoch regions keyed by the raw bits of `t_lo`; bit order
    /// matches numeric order for the positive heights the domain allows
    regions: BTreeMap<u64, Region>,
    verified: Vec<VerifiedResult>,
    stats: LedgerStats,
}

impl RegionLedger {
    /// Open (or create) a ledger backed by the journal at `path`.
    ///
    /// A fresh ledger records `default_domain` as its scan domain; an
    /// existing one replays its journal and ignores the default.
    ///
    /// # Errors
    /// Propagates journal I/O and corruption errors; corruption is not
    /// repaired silently.
    pub fn open(path: &Path, default_domain: ScanDomain) -> Result<Self, LedgerError> {
        let (journal, records) = Journal::open(path)?;

        let mut ledger = Self {
            journal,
            domain: default_domain,
            regions: BTreeMap::new(),
            verified: Vec::new(),
            stats: LedgerStats::default(),
        };

        if records.is_empty() {
            ledger.journal.append(JournalEntry::DomainDefined {
                t_lo: default_domain.t_lo,
                t_hi: default_domain.t_hi,
            })?;
        } else {
            for record in records {
                ledger.replay(record.entry);
            }
        }

        tracing::info!(
            path = %ledger.journal.path().display(),
            frontier = ledger.frontier(),
            regions = ledger.regions.len(),
            "region ledger open"
        );
        Ok(ledger)
    }

    fn replay(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::DomainDefined { t_lo, t_hi }
            | JournalEntry::DomainReset { t_lo, t_hi } => {
                self.domain = ScanDomain { t_lo, t_hi };
                // A reset opens a new epoch; prior regions stay in the
                // journal as audit trail only
                self.regions.clear();
                self.stats.regions_scanned = 0;
                self.stats.regions_in_progress = 0;
            }
            JournalEntry::RegionClaimed { region } => {
                self.regions.insert(region.t_lo.to_bits(), region);
                self.stats.regions_in_progress += 1;
            }
            JournalEntry::RegionScanned { t_lo, summary, .. } => {
                if let Some(region) = self.regions.get_mut(&t_lo.to_bits()) {
                    if region.status == RegionStatus::InProgress {
                        region.status = RegionStatus::Scanned;
                        self.stats.regions_in_progress =
                            self.stats.regions_in_progress.saturating_sub(1);
                        self.stats.regions_scanned += 1;
                        self.stats.points_scanned += u64::from(summary.points_scanned);
                        self.stats.anomalies += u64::from(summary.anomalies);
                    }
                }
            }
            JournalEntry::ResultVerified { result } => {
                if result.classification.is_counterexample() {
                    self.stats.counterexamples += 1;
                }
                self.stats.verified += 1;
                self.verified.push(result);
            }
        }
    }

    /// The domain this ledger is scanning.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> ScanDomain {
        self.domain
    }

    /// Atomically claim the next unscanned interval.
    ///
    /// An in-progress region abandoned by a crashed pass is returned
    /// first, with its original bounds, so interrupted work is
    /// re-scanned rather than skipped (at-least-once, never gaps).
    /// Otherwise a fresh region of `width` is carved at the claim edge
    /// and journaled before it is returned; it can never overlap a
    /// scanned or in-progress region.
    ///
    /// Returns `None` once the domain is exhausted.
    ///
    /// # Errors
    /// Journal I/O failure; no region is claimed in that case.
    pub fn claim_next(&mut self, width: f64, points: u32) -> Result<Option<Region>, LedgerError> {
        if let Some(region) = self
            .regions
            .values()
            .find(|r| r.status == RegionStatus::InProgress)
        {
            tracing::info!(region = %region.id, t_lo = region.t_lo, t_hi = region.t_hi,
                "re-claiming interrupted region");
            return Ok(Some(*region));
        }

        let edge = self.claim_edge();
        if edge >= self.domain.t_hi {
            return Ok(None);
        }

        let t_hi = (edge + width).min(self.domain.t_hi);
        let region = Region::claimed(edge, t_hi, points);
        debug_assert!(self.regions.values().all(|r| !r.overlaps(&region)));

        self.journal
            .append(JournalEntry::RegionClaimed { region })?;
        self.regions.insert(region.t_lo.to_bits(), region);
        self.stats.regions_in_progress += 1;
        Ok(Some(region))
    }

    fn claim_edge(&self) -> f64 {
        // Highest claimed upper bound, or the domain start. Regions are
        // carved in order, so the last key is the highest interval.
        self.regions
            .values()
            .next_back()
            .map_or(self.domain.t_lo, |r| r.t_hi)
    }

    /// Mark a region scanned.
    ///
    /// Idempotent: completing an already-scanned region with identical
    /// bounds is a no-op, not an error. Unknown regions and bounds
    /// mismatches are errors; a partially scanned region is never
    /// silently promoted.
    ///
    /// # Errors
    /// `UnknownRegion`, `BoundsMismatch`, or journal I/O failure (in
    /// which case the region stays in-progress and `frontier()` is
    /// unchanged).
    pub fn complete(&mut self, region: &Region, summary: ScanSummary) -> Result<(), LedgerError> {
        let Some(held) = self.regions.get(&region.t_lo.to_bits()).copied() else {
            return Err(LedgerError::UnknownRegion { id: region.id });
        };
        if held.id != region.id {
            return Err(LedgerError::UnknownRegion { id: region.id });
        }
        if held.t_lo != region.t_lo || held.t_hi != region.t_hi {
            return Err(LedgerError::BoundsMismatch {
                id: region.id,
                held_lo: held.t_lo,
                held_hi: held.t_hi,
                given_lo: region.t_lo,
                given_hi: region.t_hi,
            });
        }
        if held.status == RegionStatus::Scanned {
            return Ok(());
        }

        self.journal.append(JournalEntry::RegionScanned {
            id: region.id,
            t_lo: region.t_lo,
            t_hi: region.t_hi,
            summary,
        })?;

        if let Some(entry) = self.regions.get_mut(&region.t_lo.to_bits()) {
            entry.status = RegionStatus::Scanned;
        }
        self.stats.regions_in_progress = self.stats.regions_in_progress.saturating_sub(1);
        self.stats.regions_scanned += 1;
        self.stats.points_scanned += u64::from(summary.points_scanned);
        self.stats.anomalies += u64::from(summary.anomalies);
        Ok(())
    }

    /// Durably record a verified result (record-before-acknowledge).
    ///
    /// The journal append is flushed and fsynced before this returns,
    /// so a counterexample can never be lost to a later crash once the
    /// caller observes `Ok`.
    ///
    /// # Errors
    /// Journal I/O failure; nothing is recorded in memory either.
    pub fn record_verified(&mut self, result: &VerifiedResult) -> Result<(), LedgerError> {
        self.journal.append(JournalEntry::ResultVerified {
            result: result.clone(),
        })?;

        if result.classification.is_counterexample() {
            self.stats.counterexamples += 1;
        }
        self.stats.verified += 1;
        self.verified.push(result.clone());
        Ok(())
    }

    /// Deliberately restart the hunt over new bounds.
    ///
    /// The only operation allowed to move the frontier backwards. Prior
    /// regions remain in the journal as an audit trail but leave the
    /// active epoch, so re-scanning the new domain cannot violate the
    /// per-epoch non-overlap invariant.
    ///
    /// # Errors
    /// `InvalidDomain` for malformed bounds, or journal I/O failure.
    pub fn reset_domain(&mut self, t_lo: f64, t_hi: f64) -> Result<(), LedgerError> {
        let domain = ScanDomain::new(t_lo, t_hi)?;
        self.journal
            .append(JournalEntry::DomainReset { t_lo, t_hi })?;

        self.domain = domain;
        self.regions.clear();
        self.stats.regions_scanned = 0;
        self.stats.regions_in_progress = 0;
        tracing::info!(t_lo, t_hi, "domain reset; new scan epoch");
        Ok(())
    }

    /// Highest t such that every point below it is scanned.
    ///
    /// Non-decreasing across any sequence of claims and completions,
    /// absent an explicit reset.
    #[must_use]
    pub fn frontier(&self) -> f64 {
        let mut edge = self.domain.t_lo;
        for region in self.regions.values() {
            if region.status != RegionStatus::Scanned || region.t_lo > edge {
                break;
            }
            if region.t_hi > edge {
                edge = region.t_hi;
            }
        }
        edge
    }

    /// Regions of the active epoch, in ascending interval order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.values()
    }

    /// Verified results recorded this epoch and before.
    #[inline]
    #[must_use]
    pub fn verified_results(&self) -> &[VerifiedResult] {
        &self.verified
    }

    /// Aggregate counters.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zetahunt_types::{AnomalyRecord, Classification, RegionId};

    fn open_ledger(dir: &tempfile::TempDir) -> RegionLedger {
        let domain = ScanDomain::new(1_000.0, 10_000.0).unwrap();
        RegionLedger::open(&dir.path().join("ledger.jsonl"), domain).unwrap()
    }

    #[test]
    fn claim_and_complete_advance_frontier_by_region_width() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);
        assert_eq!(ledger.frontier(), 1_000.0);

        let region = ledger.claim_next(250.0, 1_000).unwrap().unwrap();
        assert_eq!(region.t_lo, 1_000.0);
        assert_eq!(region.t_hi, 1_250.0);
        // Claimed but not scanned: frontier must not move
        assert_eq!(ledger.frontier(), 1_000.0);

        ledger.complete(&region, ScanSummary::default()).unwrap();
        assert_eq!(ledger.frontier(), 1_250.0);
    }

    #[test]
    fn sequential_claims_tile_without_overlap() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);

        let mut previous_hi = 1_000.0;
        for _ in 0..5 {
            let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
            assert_eq!(region.t_lo, previous_hi);
            previous_hi = region.t_hi;
            ledger.complete(&region, ScanSummary::default()).unwrap();
        }

        let regions: Vec<_> = ledger.regions().copied().collect();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
        assert_eq!(ledger.frontier(), 1_500.0);
    }

    #[test]
    fn completion_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);

        let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
        ledger.complete(&region, ScanSummary::default()).unwrap();
        ledger.complete(&region, ScanSummary::default()).unwrap();

        assert_eq!(ledger.stats().regions_scanned, 1);
        assert_eq!(ledger.frontier(), 1_100.0);
    }

    #[test]
    fn completing_unknown_or_mismatched_region_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);

        let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();

        let phantom = Region::claimed(5_000.0, 5_100.0, 1_000);
        assert!(matches!(
            ledger.complete(&phantom, ScanSummary::default()),
            Err(LedgerError::UnknownRegion { .. })
        ));

        let mut stretched = region;
        stretched.t_hi += 50.0;
        assert!(matches!(
            ledger.complete(&stretched, ScanSummary::default()),
            Err(LedgerError::BoundsMismatch { .. })
        ));
    }

    #[test]
    fn crash_before_complete_resumes_with_same_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let domain = ScanDomain::new(1_000.0, 10_000.0).unwrap();

        let claimed = {
            let mut ledger = RegionLedger::open(&path, domain).unwrap();
            let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
            let frontier = ledger.frontier();
            assert_eq!(frontier, 1_000.0);
            region
            // Dropped without complete: simulated crash mid-region
        };

        let mut ledger = RegionLedger::open(&path, domain).unwrap();
        assert_eq!(ledger.frontier(), 1_000.0);

        let resumed = ledger.claim_next(999.0, 9_999).unwrap().unwrap();
        assert_eq!(resumed.id, claimed.id);
        assert_eq!(resumed.t_lo, claimed.t_lo);
        assert_eq!(resumed.t_hi, claimed.t_hi);

        ledger.complete(&resumed, ScanSummary::default()).unwrap();
        assert_eq!(ledger.frontier(), 1_100.0);
    }

    #[test]
    fn verified_counterexample_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let domain = ScanDomain::new(1_000.0, 10_000.0).unwrap();

        {
            let mut ledger = RegionLedger::open(&path, domain).unwrap();
            let anomaly = AnomalyRecord::new(RegionId::new(), 0.55, 3.1e12, 1e-6);
            let result = VerifiedResult::new(
                anomaly,
                0.55,
                3.1e12,
                1e-12,
                50,
                Classification::Counterexample,
                false,
            );
            ledger.record_verified(&result).unwrap();
        }

        let ledger = RegionLedger::open(&path, domain).unwrap();
        assert_eq!(ledger.stats().counterexamples, 1);
        assert_eq!(ledger.verified_results().len(), 1);
        assert!(ledger.verified_results()[0]
            .classification
            .is_counterexample());
    }

    #[test]
    fn reset_opens_a_new_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);

        let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
        ledger.complete(&region, ScanSummary::default()).unwrap();
        assert_eq!(ledger.frontier(), 1_100.0);

        ledger.reset_domain(2_000.0, 20_000.0).unwrap();
        assert_eq!(ledger.frontier(), 2_000.0);
        assert_eq!(ledger.regions().count(), 0);

        let region = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
        assert_eq!(region.t_lo, 2_000.0);
    }

    #[test]
    fn reset_rejects_malformed_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = open_ledger(&dir);
        assert!(matches!(
            ledger.reset_domain(5.0, 1.0),
            Err(LedgerError::InvalidDomain(_))
        ));
        // State unchanged
        assert_eq!(ledger.domain().t_lo, 1_000.0);
    }

    #[test]
    fn claim_clamps_at_domain_end_then_exhausts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.jsonl");
        let domain = ScanDomain::new(1_000.0, 1_150.0).unwrap();
        let mut ledger = RegionLedger::open(&path, domain).unwrap();

        let first = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
        ledger.complete(&first, ScanSummary::default()).unwrap();

        let second = ledger.claim_next(100.0, 1_000).unwrap().unwrap();
        assert_eq!(second.t_hi, 1_150.0);
        ledger.complete(&second, ScanSummary::default()).unwrap();

        assert!(ledger.claim_next(100.0, 1_000).unwrap().is_none());
    }
}
