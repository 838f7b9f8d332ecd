//! Zetahunt scan engine
//!
//! Drives the two-stage detect/verify pipeline over the durable region
//! ledger:
//! 1. **Detect**: cheap approximate evaluation over a claimed region
//!    flags sub-threshold candidates
//! 2. **Verify**: each candidate is re-evaluated at high precision and
//!    classified
//!
//! The loop is a single continuous scan that yields at named suspension
//! points, where controller commands (pause/resume/reset/granularity/
//! precision/shutdown) take effect. Committed ledger state survives a
//! kill between any two suspension points.

pub mod command;
pub mod detector;
pub mod engine;
pub mod error;
pub mod sink;
pub mod state_store;
pub mod verifier;

pub use command::{command_channel, CommandInbox, Controller};
pub use detector::AnomalyDetector;
pub use engine::{EngineOptions, EngineReport, ScanEngine};
pub use error::EngineError;
pub use sink::{JsonlSink, ResultSink, SinkError};
pub use state_store::StateStore;
pub use verifier::PrecisionVerifier;
