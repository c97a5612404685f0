//! Scripted proxy and recording presenter shared by the unit tests.

use crate::model::{Image, ScanFlags, ScanHandle, ScanResult, Scanner};
use crate::traits::{ResultPresenter, ScanProxy, TransportError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Arguments the proxy saw for a `Scan` or `ScheduleScan` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedScan {
    pub targets: Vec<String>,
    pub scanner: String,
    pub scan_type: String,
    pub options: Vec<String>,
    pub rootfs: Option<String>,
    pub flags: ScanFlags,
}

pub fn failure(method: &'static str) -> TransportError {
    TransportError::CallFailed {
        method,
        message: "org.freedesktop.DBus.Error.Failed".to_string(),
    }
}

pub struct MockProxy {
    pub valid: bool,
    pub scanners: Result<String, TransportError>,
    pub images: Result<String, TransportError>,
    pub scan_result: Result<Value, TransportError>,
    pub handle: Result<ScanHandle, TransportError>,
    /// Poll responses in order; an exhausted script keeps answering "not ready".
    pub polls: Mutex<VecDeque<Result<Value, TransportError>>>,
    pub poll_latency: Duration,
    pub scan_latency: Duration,
    pub vulnerable: Result<Value, TransportError>,
    pub update_result: Result<(), TransportError>,

    pub calls: Mutex<Vec<&'static str>>,
    pub submitted: Mutex<Vec<SubmittedScan>>,
    pub updated: Mutex<Vec<String>>,
    pub polls_in_flight: AtomicUsize,
    pub max_polls_in_flight: AtomicUsize,
}

impl Default for MockProxy {
    fn default() -> Self {
        Self {
            valid: true,
            scanners: Ok("[]".to_string()),
            images: Ok("[]".to_string()),
            scan_result: Ok(Value::Null),
            handle: Ok(ScanHandle("token-1".to_string())),
            polls: Mutex::new(VecDeque::new()),
            poll_latency: Duration::ZERO,
            scan_latency: Duration::ZERO,
            vulnerable: Ok(Value::Null),
            update_result: Ok(()),
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            updated: Mutex::new(Vec::new()),
            polls_in_flight: AtomicUsize::new(0),
            max_polls_in_flight: AtomicUsize::new(0),
        }
    }
}

impl MockProxy {
    pub fn with_polls(self, polls: Vec<Result<Value, TransportError>>) -> Self {
        *self.polls.lock().unwrap() = polls.into();
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|m| **m == method).count()
    }

    fn record(&self, method: &'static str) {
        self.calls.lock().unwrap().push(method);
    }
}

#[async_trait]
impl ScanProxy for MockProxy {
    async fn wait_ready(&self) -> bool {
        self.record("wait_ready");
        self.valid
    }

    async fn list_scanners(&self) -> Result<String, TransportError> {
        self.record("ListScanners");
        self.scanners.clone()
    }

    async fn list_images(&self) -> Result<String, TransportError> {
        self.record("ListImages");
        self.images.clone()
    }

    async fn scan(
        &self,
        targets: &[String],
        scanner: &str,
        scan_type: &str,
        options: &[String],
        flags: ScanFlags,
    ) -> Result<Value, TransportError> {
        self.record("Scan");
        self.submitted.lock().unwrap().push(SubmittedScan {
            targets: targets.to_vec(),
            scanner: scanner.to_string(),
            scan_type: scan_type.to_string(),
            options: options.to_vec(),
            rootfs: None,
            flags,
        });
        if !self.scan_latency.is_zero() {
            tokio::time::sleep(self.scan_latency).await;
        }
        self.scan_result.clone()
    }

    async fn schedule_scan(
        &self,
        targets: &[String],
        scanner: &str,
        scan_type: &str,
        rootfs: &str,
        flags: ScanFlags,
    ) -> Result<ScanHandle, TransportError> {
        self.record("ScheduleScan");
        self.submitted.lock().unwrap().push(SubmittedScan {
            targets: targets.to_vec(),
            scanner: scanner.to_string(),
            scan_type: scan_type.to_string(),
            options: Vec::new(),
            rootfs: Some(rootfs.to_string()),
            flags,
        });
        self.handle.clone()
    }

    async fn get_scan_results(&self, _handle: &ScanHandle) -> Result<Value, TransportError> {
        self.record("GetScanResults");
        let in_flight = self.polls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_polls_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.poll_latency.is_zero() {
            tokio::time::sleep(self.poll_latency).await;
        }
        self.polls_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }

    async fn vulnerable_info(&self) -> Result<Value, TransportError> {
        self.record("VulnerableInfo");
        self.vulnerable.clone()
    }

    async fn update(&self, image: &str) -> Result<(), TransportError> {
        self.record("Update");
        self.updated.lock().unwrap().push(image.to_string());
        self.update_result.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Presented {
    Operational,
    Unavailable,
    Scanners(Vec<String>),
    Images { repositories: Vec<String>, listing: String },
    Result(String),
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub events: Mutex<Vec<Presented>>,
}

impl RecordingPresenter {
    pub fn events(&self) -> Vec<Presented> {
        self.events.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Presented::Result(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

impl ResultPresenter for RecordingPresenter {
    fn show_operational(&self) {
        self.events.lock().unwrap().push(Presented::Operational);
    }

    fn show_unavailable(&self) {
        self.events.lock().unwrap().push(Presented::Unavailable);
    }

    fn present_scanners(&self, scanners: &[Scanner]) {
        self.events
            .lock()
            .unwrap()
            .push(Presented::Scanners(scanners.iter().map(|s| s.name.clone()).collect()));
    }

    fn present_images(&self, images: &[Image], listing: &str) {
        self.events.lock().unwrap().push(Presented::Images {
            repositories: images.iter().map(|i| i.repository.clone()).collect(),
            listing: listing.to_string(),
        });
    }

    fn present_result(&self, result: &ScanResult) {
        self.events
            .lock()
            .unwrap()
            .push(Presented::Result(result.to_string()));
    }
}

/// Counts `WARN` events seen while installed as the thread's default subscriber.
#[derive(Clone, Default)]
pub struct WarnCounter(pub std::sync::Arc<AtomicUsize>);

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Installs a registry with this counter for the current thread.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
