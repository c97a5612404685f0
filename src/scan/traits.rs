//! Types shared by the scan orchestrator: modes, states, outcomes and errors.

use crate::model::{ScanHandle, ScanResult};
use crate::traits::TransportError;
use std::time::Duration;
use thiserror::Error;

/// How a scan is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// `Scan`: one call that resolves with the full result.
    #[default]
    Immediate,

    /// `ScheduleScan`: resolves with a handle; results are polled for.
    Deferred,
}

/// Orchestrator state for the current scan run.
///
/// ```text
/// Idle -> Submitting -> SubmitFailed
///                    -> AwaitingResult -> Polling{n} -> ResultReady
///                                                    -> Failed | Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Submitting,
    SubmitFailed,
    AwaitingResult,
    Polling { attempt: u32 },
    ResultReady,
    Failed,
    Cancelled,
}

impl ScanState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanState::SubmitFailed | ScanState::ResultReady | ScanState::Failed | ScanState::Cancelled
        )
    }
}

/// A completed scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub result: ScanResult,

    /// Present for deferred scans
    pub handle: Option<ScanHandle>,

    /// Number of `GetScanResults` calls issued (zero for immediate scans)
    pub poll_attempts: u32,

    pub elapsed: Duration,
}

#[derive(Error, Debug)]
pub enum ScanError {
    /// The orchestrator was torn down; nothing was sent
    #[error("Scanning service is unavailable")]
    Unavailable,

    #[error("A scan is already in flight")]
    AlreadyInFlight,

    #[error("Scan submission via '{method}' failed: {source}")]
    Submit {
        method: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Polling scan '{handle}' failed on attempt {attempt}: {source}")]
    Poll {
        handle: ScanHandle,
        attempt: u32,
        #[source]
        source: TransportError,
    },

    #[error("Remote call '{method}' timed out after {timeout_ms}ms")]
    CallTimeout {
        method: &'static str,
        timeout_ms: u64,
    },

    #[error("Scan '{handle}' produced no result within {waited_secs}s ({attempts} polls)")]
    PollTimeout {
        handle: ScanHandle,
        waited_secs: u64,
        attempts: u32,
    },

    #[error("Scan '{handle}' produced no result after {attempts} polls")]
    AttemptsExhausted { handle: ScanHandle, attempts: u32 },

    #[error("Polling scan '{handle}' was cancelled")]
    Cancelled { handle: ScanHandle },
}
