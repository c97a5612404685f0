use crate::model::{Image, ScanFlags, ScanHandle, ScanResult, Scanner};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the RPC transport. Logged, never parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Remote call '{method}' failed: {message}")]
    CallFailed {
        method: &'static str,
        message: String,
    },
    #[error("Proxy to the remote object is no longer valid")]
    ProxyInvalid,
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Asynchronous proxy to the remote scanning object.
///
/// Each method is one RPC call. The transport may resolve concurrent calls in
/// any order; callers must not rely on cross-call ordering.
#[async_trait]
pub trait ScanProxy: Send + Sync {
    /// Resolves once the proxy has settled, returning whether the remote object is valid.
    async fn wait_ready(&self) -> bool;

    /// `ListScanners`: JSON array of `{scanner_name, scans: [{name}, ...]}`.
    async fn list_scanners(&self) -> Result<String, TransportError>;

    /// `ListImages`: JSON array of image records, two reserved leading entries.
    async fn list_images(&self) -> Result<String, TransportError>;

    async fn scan(
        &self,
        targets: &[String],
        scanner: &str,
        scan_type: &str,
        options: &[String],
        flags: ScanFlags,
    ) -> Result<serde_json::Value, TransportError>;

    async fn schedule_scan(
        &self,
        targets: &[String],
        scanner: &str,
        scan_type: &str,
        rootfs: &str,
        flags: ScanFlags,
    ) -> Result<ScanHandle, TransportError>;

    /// Returns an empty payload until the scan behind `handle` has finished.
    async fn get_scan_results(
        &self,
        handle: &ScanHandle,
    ) -> Result<serde_json::Value, TransportError>;

    async fn vulnerable_info(&self) -> Result<serde_json::Value, TransportError>;

    async fn update(&self, image: &str) -> Result<(), TransportError>;
}

/// UI collaborator that renders orchestration output.
///
/// Presenters only receive data; they never issue calls of their own.
pub trait ResultPresenter: Send + Sync {
    fn show_operational(&self);

    fn show_unavailable(&self);

    fn present_scanners(&self, scanners: &[Scanner]);

    /// `listing` is the rendered table produced by [`crate::catalog::render_image_listing`].
    fn present_images(&self, images: &[Image], listing: &str);

    fn present_result(&self, result: &ScanResult);
}
