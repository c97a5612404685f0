//! Scan orchestrator.
//!
//! [`ScanOrchestrator`] submits one [`ScanRequest`] at a time and, for deferred
//! scans, polls `GetScanResults` until the service returns a non-empty payload:
//! - Every remote call is bounded by `tokio::time::timeout`
//! - Polls are strictly sequential; the next one is issued only after the
//!   previous one resolved and the backoff delay elapsed
//! - The loop gives up after `PollPolicy::max_wait` (and `max_attempts`, if set)
//! - [`ScanOrchestrator::teardown`] stops any running loop, dropping its
//!   pending call and timer

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::PollPolicy;
use crate::model::{ScanHandle, ScanRequest, ScanResult};
use crate::scan::traits::{ScanError, ScanMode, ScanOutcome, ScanState};
use crate::traits::{ResultPresenter, ScanProxy, TransportError};

// ============================================================================
// Orchestrator
// ============================================================================

pub struct ScanOrchestrator<P: ScanProxy> {
    proxy: Arc<P>,
    policy: PollPolicy,
    call_timeout: Duration,
    state: watch::Sender<ScanState>,
    shutdown: watch::Sender<bool>,
}

impl<P: ScanProxy> ScanOrchestrator<P> {
    /// Creates an orchestrator with the default poll policy and a 10 minute call timeout.
    pub fn new(proxy: Arc<P>) -> Self {
        Self {
            proxy,
            policy: PollPolicy::default(),
            call_timeout: Duration::from_secs(600),
            state: watch::channel(ScanState::Idle).0,
            shutdown: watch::channel(false).0,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Watches the state of the current run.
    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// Stops any running poll loop. Later submissions are rejected before any remote call.
    pub fn teardown(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Scan orchestrator torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Submits `request` and forwards the result to `presenter` exactly once.
    ///
    /// A failure is logged once here and returned; nothing is retried.
    #[instrument(skip(self, request, presenter), fields(scanner = %request.scanner(), scan_type = %request.scan_type()))]
    pub async fn submit(
        &self,
        mode: ScanMode,
        request: ScanRequest,
        presenter: &dyn ResultPresenter,
    ) -> Result<ScanOutcome, ScanError> {
        if self.is_torn_down() {
            warn!("Scan rejected; orchestrator is torn down");
            self.set_state(ScanState::Cancelled);
            return Err(ScanError::Unavailable);
        }

        let start = Instant::now();
        self.set_state(ScanState::Submitting);

        let run = match mode {
            ScanMode::Immediate => self.run_immediate(&request).await,
            ScanMode::Deferred => self.run_deferred(&request).await,
        };

        match run {
            Ok((result, handle, poll_attempts)) => {
                presenter.present_result(&result);
                self.set_state(ScanState::ResultReady);
                let elapsed = start.elapsed();
                info!(
                    duration_ms = elapsed.as_millis() as u64,
                    poll_attempts, "Scan result delivered"
                );
                Ok(ScanOutcome {
                    result,
                    handle,
                    poll_attempts,
                    elapsed,
                })
            }
            Err(e) => {
                let failed = match (self.state(), &e) {
                    (_, ScanError::Cancelled { .. }) => ScanState::Cancelled,
                    (ScanState::Submitting, _) => ScanState::SubmitFailed,
                    _ => ScanState::Failed,
                };
                warn!(error = %e, state = ?failed, "Scan failed");
                self.set_state(failed);
                Err(e)
            }
        }
    }

    /// Immediate scan: `Scan` resolves with the whole result.
    pub async fn scan(
        &self,
        request: ScanRequest,
        presenter: &dyn ResultPresenter,
    ) -> Result<ScanOutcome, ScanError> {
        self.submit(ScanMode::Immediate, request, presenter).await
    }

    /// Deferred scan: `ScheduleScan` followed by the poll loop.
    pub async fn schedule(
        &self,
        request: ScanRequest,
        presenter: &dyn ResultPresenter,
    ) -> Result<ScanOutcome, ScanError> {
        self.submit(ScanMode::Deferred, request, presenter).await
    }

    async fn run_immediate(
        &self,
        request: &ScanRequest,
    ) -> Result<(ScanResult, Option<ScanHandle>, u32), ScanError> {
        let payload = self
            .call(
                "Scan",
                self.proxy.scan(
                    request.targets(),
                    request.scanner(),
                    request.scan_type(),
                    request.options(),
                    request.flags(),
                ),
            )
            .await?
            .map_err(|source| ScanError::Submit {
                method: "Scan",
                source,
            })?;

        Ok((ScanResult::from(payload), None, 0))
    }

    async fn run_deferred(
        &self,
        request: &ScanRequest,
    ) -> Result<(ScanResult, Option<ScanHandle>, u32), ScanError> {
        let handle = self
            .call(
                "ScheduleScan",
                self.proxy.schedule_scan(
                    request.targets(),
                    request.scanner(),
                    request.scan_type(),
                    request.rootfs_path(),
                    request.flags(),
                ),
            )
            .await?
            .map_err(|source| ScanError::Submit {
                method: "ScheduleScan",
                source,
            })?;

        info!(%handle, "Scan scheduled");
        self.set_state(ScanState::AwaitingResult);

        let (result, attempts) = self.poll_until_ready(&handle).await?;
        Ok((result, Some(handle), attempts))
    }

    // ========================================================================
    // Poll loop
    // ========================================================================

    async fn poll_until_ready(&self, handle: &ScanHandle) -> Result<(ScanResult, u32), ScanError> {
        let mut shutdown = self.shutdown.subscribe();
        let started = Instant::now();
        let deadline = started + self.policy.max_wait();
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return Err(ScanError::Cancelled {
                    handle: handle.clone(),
                });
            }
            if let Some(max) = self.policy.max_attempts {
                if attempt >= max {
                    return Err(ScanError::AttemptsExhausted {
                        handle: handle.clone(),
                        attempts: attempt,
                    });
                }
            }

            attempt += 1;
            self.set_state(ScanState::Polling { attempt });

            // A poll never outlives max_wait, even when call_timeout is longer.
            let call_deadline = Instant::now() + self.call_timeout;
            let bounded_by_wait = deadline < call_deadline;
            let poll = timeout_at(
                deadline.min(call_deadline),
                self.proxy.get_scan_results(handle),
            );

            let resolved = tokio::select! {
                _ = shutdown.changed() => None,
                r = poll => Some(r),
            };
            let payload = match resolved {
                None => {
                    return Err(ScanError::Cancelled {
                        handle: handle.clone(),
                    })
                }
                Some(Err(_)) if bounded_by_wait => {
                    return Err(ScanError::PollTimeout {
                        handle: handle.clone(),
                        waited_secs: started.elapsed().as_secs(),
                        attempts: attempt,
                    })
                }
                Some(Err(_)) => {
                    return Err(ScanError::CallTimeout {
                        method: "GetScanResults",
                        timeout_ms: self.call_timeout_ms(),
                    })
                }
                Some(Ok(r)) => r.map_err(|source| ScanError::Poll {
                    handle: handle.clone(),
                    attempt,
                    source,
                })?,
            };

            let result = ScanResult::from(payload);
            if !result.is_empty() {
                return Ok((result, attempt));
            }

            let delay = self.policy.delay_for(attempt);
            if Instant::now() + delay > deadline {
                return Err(ScanError::PollTimeout {
                    handle: handle.clone(),
                    waited_secs: started.elapsed().as_secs(),
                    attempts: attempt,
                });
            }
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Scan result not ready");

            tokio::select! {
                _ = shutdown.changed() => {
                    return Err(ScanError::Cancelled { handle: handle.clone() });
                }
                _ = sleep(delay) => {}
            }
        }
    }

    /// Runs one remote call under the call timeout.
    async fn call<T, F>(
        &self,
        method: &'static str,
        fut: F,
    ) -> Result<Result<T, TransportError>, ScanError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        timeout(self.call_timeout, fut)
            .await
            .map_err(|_| ScanError::CallTimeout {
                method,
                timeout_ms: self.call_timeout_ms(),
            })
    }

    fn call_timeout_ms(&self) -> u64 {
        u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn set_state(&self, state: ScanState) {
        self.state.send_replace(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
