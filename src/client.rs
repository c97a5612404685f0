//! Client facade wiring the session guard, catalog loader and orchestrator.

use crate::auxiliary;
use crate::catalog::{render_scanner_listing, CatalogLoader};
use crate::config::ClientConfig;
use crate::executor::ScanExecutor;
use crate::model::{Image, Scanner};
use crate::scan::{ScanError, ScanMode, ScanOrchestrator, ScanOutcome, ScanState};
use crate::selection::Selection;
use crate::session::{Availability, SessionGuard};
use crate::traits::{ResultPresenter, ScanProxy, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Scanning service is unavailable")]
    Unavailable,

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Entry point for a UI session against the scanning service.
///
/// ```ignore
/// let client = ScanClient::new(proxy, presenter, ClientConfig::default());
/// if client.start().await == Availability::Available {
///     let mut selection = client.default_selection().await;
///     selection.toggle_target("docker.io/busybox");
///     client.run_scan(&selection, ScanMode::Deferred).await?;
/// }
/// ```
pub struct ScanClient<P: ScanProxy> {
    proxy: Arc<P>,
    presenter: Arc<dyn ResultPresenter>,
    config: ClientConfig,
    guard: SessionGuard<P>,
    catalog: CatalogLoader<P>,
    orchestrator: ScanOrchestrator<P>,
    executor: ScanExecutor,
}

impl<P: ScanProxy> ScanClient<P> {
    pub fn new(proxy: Arc<P>, presenter: Arc<dyn ResultPresenter>, config: ClientConfig) -> Self {
        let orchestrator = ScanOrchestrator::new(proxy.clone())
            .with_poll_policy(config.poll.clone())
            .with_call_timeout(config.call_timeout());

        Self {
            guard: SessionGuard::new(proxy.clone()),
            catalog: CatalogLoader::new(proxy.clone(), config.image_header_entries),
            orchestrator,
            executor: ScanExecutor::new(),
            proxy,
            presenter,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Settles availability and, when the service is reachable, loads the catalogs.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Availability {
        let availability = self.guard.check_availability(self.presenter.as_ref()).await;
        if availability == Availability::Available {
            self.catalog.refresh(self.presenter.as_ref()).await;
        }
        availability
    }

    /// Reloads both catalogs.
    pub async fn refresh_catalog(&self) -> Result<(), ClientError> {
        self.ensure_available()?;
        self.catalog.refresh(self.presenter.as_ref()).await;
        Ok(())
    }

    pub async fn scanners(&self) -> Arc<Vec<Scanner>> {
        self.catalog.scanners().await
    }

    pub async fn images(&self) -> Arc<Vec<Image>> {
        self.catalog.images().await
    }

    pub async fn scanner_listing(&self) -> String {
        let scanners = self.catalog.scanners().await;
        render_scanner_listing(&scanners, self.config.default_scanner.as_deref())
    }

    /// A selection with the configured default scanner and its default type.
    pub async fn default_selection(&self) -> Selection {
        let scanners = self.catalog.scanners().await;
        Selection::with_defaults(&scanners, self.config.default_scanner.as_deref())
    }

    /// Snapshots `selection` and runs one scan. Rejected while another is in flight.
    #[instrument(skip(self, selection))]
    pub async fn run_scan(
        &self,
        selection: &Selection,
        mode: ScanMode,
    ) -> Result<ScanOutcome, ClientError> {
        self.ensure_available()?;
        let request = selection.snapshot(&self.config.rootfs_path);
        let outcome = self
            .executor
            .execute(
                self.orchestrator
                    .submit(mode, request, self.presenter.as_ref()),
            )
            .await?;
        Ok(outcome)
    }

    pub fn scan_state(&self) -> watch::Receiver<ScanState> {
        self.orchestrator.subscribe()
    }

    pub fn is_scanning(&self) -> bool {
        self.executor.is_busy()
    }

    pub async fn vulnerability_info(&self) -> Result<serde_json::Value, ClientError> {
        self.ensure_available()?;
        Ok(auxiliary::fetch_vulnerability_info(self.proxy.as_ref()).await?)
    }

    pub async fn update_image(&self, repository: &str) -> Result<(), ClientError> {
        self.ensure_available()?;
        Ok(auxiliary::update_image(self.proxy.as_ref(), repository).await?)
    }

    /// Stops any running poll loop; further scans are cancelled immediately.
    pub fn teardown(&self) {
        self.orchestrator.teardown();
    }

    fn ensure_available(&self) -> Result<(), ClientError> {
        if self.guard.is_available() {
            Ok(())
        } else {
            Err(ClientError::Unavailable)
        }
    }
}

impl<P: ScanProxy> Drop for ScanClient<P> {
    fn drop(&mut self) {
        if !self.orchestrator.is_torn_down() {
            info!("Scan client dropped; tearing down");
            self.orchestrator.teardown();
        }
    }
}
