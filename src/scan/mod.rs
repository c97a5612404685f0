//! Scan module - submission and result polling against the remote service.
//!
//! - **Types**: [`ScanMode`], [`ScanState`], [`ScanOutcome`], [`ScanError`]
//! - **Orchestrator**: [`pipeline::ScanOrchestrator`], which submits a
//!   [`ScanRequest`](crate::model::ScanRequest) and drives the bounded poll loop

pub mod pipeline;
pub mod traits;

pub use pipeline::ScanOrchestrator;
pub use traits::{ScanError, ScanMode, ScanOutcome, ScanState};
