//! The scan engine
//!
//! A single continuous loop: claim the next region, detect candidates
//! over it, verify each candidate at high precision, record everything
//! durably, complete the region. The loop yields at named suspension
//! points (pause check, before claim, before approximate evaluation,
//! before each precision call) where controller commands take effect.
//! Long-running numeric calls are the only blocking operations, and
//! they are abandoned at region granularity on shutdown: a killed
//! in-flight region reverts to in-progress and is re-claimed on the
//! next start, never marked scanned from a partial pass.

use crate::command::CommandInbox;
use crate::detector::AnomalyDetector;
use crate::error::EngineError;
use crate::sink::ResultSink;
use crate::state_store::StateStore;
use crate::verifier::PrecisionVerifier;
use std::sync::Arc;
use std::time::Duration;
use zetahunt_backend::NumericBackend;
use zetahunt_ledger::RegionLedger;
use zetahunt_types::{
    AnomalyRecord, Command, CommandEffect, Region, ScanSummary, SearchState, VerifiedResult,
};

/// First retry delay after a transient backend failure.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Retry delays double up to this cap.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Engine construction options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Plant one synthetic off-line candidate per scanned region, to
    /// exercise the full verification path end to end
    pub inject_test_anomaly: bool,
}

/// Summary of one engine run (this session only; the ledger holds
/// lifetime totals).
#[derive(Debug, Clone)]
pub struct EngineReport {
    /// Regions completed this session
    pub regions_scanned: u64,
    /// Anomalies flagged this session
    pub anomalies_flagged: u64,
    /// Candidates verified this session
    pub results_verified: u64,
    /// Counterexamples confirmed this session
    pub counterexamples: u64,
    /// Ledger frontier at stop
    pub frontier: f64,
    /// Search state at stop
    pub final_state: SearchState,
}

/// Outcome of a suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Continue,
    Shutdown,
}

/// The continuous scan loop over ledger, backend, and sink.
pub struct ScanEngine<B> {
    ledger: RegionLedger,
    detector: AnomalyDetector<B>,
    verifier: PrecisionVerifier<B>,
    sink: Arc<dyn ResultSink>,
    state: SearchState,
    state_store: StateStore,
    inbox: CommandInbox,
    options: EngineOptions,
}

impl<B: NumericBackend> ScanEngine<B> {
    /// Assemble an engine.
    ///
    /// The search state is re-derived from the persisted store plus the
    /// ledger's replayed domain, never from volatile memory alone.
    ///
    /// # Errors
    /// `EngineError::StatePersist` if the state file is unreadable.
    pub fn new(
        ledger: RegionLedger,
        backend: Arc<B>,
        sink: Arc<dyn ResultSink>,
        state_store: StateStore,
        inbox: CommandInbox,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let mut state = state_store.load_or_default()?;
        state.domain = ledger.domain();

        Ok(Self {
            ledger,
            detector: AnomalyDetector::new(backend.clone()),
            verifier: PrecisionVerifier::new(backend),
            sink,
            state,
            state_store,
            inbox,
            options,
        })
    }

    /// Current search state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Run the scan loop until shutdown or domain exhaustion.
    ///
    /// # Errors
    /// Fatal errors only: ledger failures, non-transient backend
    /// failures, sink or state-persistence failures. Transient backend
    /// failures are retried with backoff and never surface here.
    pub async fn run(mut self) -> Result<EngineReport, EngineError> {
        tracing::info!(
            frontier = self.ledger.frontier(),
            points = self.state.points_per_region,
            digits = self.state.effective_digits(),
            "scan loop starting"
        );

        let mut regions_scanned = 0u64;
        let mut anomalies_flagged = 0u64;
        let mut results_verified = 0u64;
        let mut counterexamples = 0u64;

        'scan: loop {
            // Suspension point: pause check
            if self.checkpoint().await? == Signal::Shutdown {
                break;
            }

            // Suspension point: region claim
            let width = self.state.region_width();
            let points = self.state.points_per_region;
            let Some(region) = self.ledger.claim_next(width, points)? else {
                tracing::info!(frontier = self.ledger.frontier(), "scan domain exhausted");
                break;
            };
            tracing::debug!(
                region = %region.id,
                t_lo = region.t_lo,
                t_hi = region.t_hi,
                "region claimed"
            );

            // Suspension point: before approximate evaluation. A
            // shutdown here abandons the region as in-progress.
            if self.checkpoint().await? == Signal::Shutdown {
                break;
            }

            let Some(mut anomalies) = self.scan_with_retry(&region).await? else {
                break;
            };

            if self.options.inject_test_anomaly {
                let planted = AnomalyRecord::new(region.id, 0.55, 3.1e12, 1e-6);
                tracing::info!("planting synthetic test anomaly at sigma=0.55 t=3.1e12");
                self.sink.record_anomaly(&planted)?;
                anomalies.push(planted);
            }

            let summary = ScanSummary {
                points_scanned: region.points,
                anomalies: anomalies.len() as u32,
            };

            for anomaly in &anomalies {
                // Suspension point: before each precision call
                if self.checkpoint().await? == Signal::Shutdown {
                    break 'scan;
                }
                let Some(result) = self.verify_with_retry(anomaly).await? else {
                    break 'scan;
                };

                // Record-before-acknowledge: the ledger append is
                // fsynced before the result counts as progress, so a
                // counterexample can never be lost to a later crash
                self.ledger.record_verified(&result)?;
                self.sink.record_verified(&result)?;
                results_verified += 1;
                if result.classification.is_counterexample() {
                    counterexamples += 1;
                    tracing::error!(
                        sigma = result.sigma,
                        t = result.t,
                        zeta_abs = result.zeta_abs,
                        "counterexample durably recorded"
                    );
                }
            }

            self.ledger.complete(&region, summary)?;
            regions_scanned += 1;
            anomalies_flagged += u64::from(summary.anomalies);
            tracing::info!(
                region = %region.id,
                anomalies = summary.anomalies,
                frontier = self.ledger.frontier(),
                "region scanned"
            );
        }

        let report = EngineReport {
            regions_scanned,
            anomalies_flagged,
            results_verified,
            counterexamples,
            frontier: self.ledger.frontier(),
            final_state: self.state,
        };
        tracing::info!(
            regions = report.regions_scanned,
            anomalies = report.anomalies_flagged,
            counterexamples = report.counterexamples,
            frontier = report.frontier,
            "scan loop stopped"
        );
        Ok(report)
    }

    /// Drain pending commands; while paused, block until a controller
    /// resumes or shuts down.
    async fn checkpoint(&mut self) -> Result<Signal, EngineError> {
        for command in self.inbox.try_drain() {
            if self.apply_command(command)? == Signal::Shutdown {
                return Ok(Signal::Shutdown);
            }
        }

        while self.state.paused {
            tracing::info!("paused; waiting for controller");
            let Some(command) = self.inbox.recv().await else {
                tracing::warn!("all controllers dropped while paused; shutting down");
                return Ok(Signal::Shutdown);
            };
            if self.apply_command(command)? == Signal::Shutdown {
                return Ok(Signal::Shutdown);
            }
        }

        Ok(Signal::Continue)
    }

    fn apply_command(&mut self, command: Command) -> Result<Signal, EngineError> {
        match self.state.apply(command) {
            Ok(CommandEffect::Shutdown) => {
                tracing::info!("shutdown requested");
                Ok(Signal::Shutdown)
            }
            Ok(CommandEffect::DomainReset { t_lo, t_hi }) => {
                self.ledger.reset_domain(t_lo, t_hi)?;
                self.state_store.persist(&self.state)?;
                Ok(Signal::Continue)
            }
            Ok(CommandEffect::Updated) => {
                self.state_store.persist(&self.state)?;
                tracing::info!(?command, "search state updated");
                Ok(Signal::Continue)
            }
            Err(rejected) => {
                tracing::warn!(%rejected, ?command, "command rejected; state unchanged");
                Ok(Signal::Continue)
            }
        }
    }

    /// Run the detector over a region, retrying transient backend
    /// failures with exponential backoff. Returns `None` on shutdown
    /// mid-retry (the region stays in-progress).
    async fn scan_with_retry(
        &mut self,
        region: &Region,
    ) -> Result<Option<Vec<AnomalyRecord>>, EngineError> {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self
                .detector
                .scan(region, &self.state, self.sink.as_ref())
                .await
            {
                Ok(anomalies) => return Ok(Some(anomalies)),
                Err(EngineError::Backend(e)) if e.is_transient() => {
                    tracing::warn!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        region = %region.id,
                        "transient backend failure; region will be retried"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    if self.checkpoint().await? == Signal::Shutdown {
                        return Ok(None);
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Verify one candidate, retrying transient backend failures.
    async fn verify_with_retry(
        &mut self,
        anomaly: &AnomalyRecord,
    ) -> Result<Option<VerifiedResult>, EngineError> {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self.verifier.verify(anomaly, &self.state).await {
                Ok(result) => return Ok(Some(result)),
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        error = %e,
                        backoff_secs = backoff.as_secs(),
                        t = anomaly.t,
                        "transient backend failure during verification; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    if self.checkpoint().await? == Signal::Shutdown {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(EngineError::Backend(e)),
            }
        }
    }
}
