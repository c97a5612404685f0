//! Catalog loader: scanner and image discovery.
//!
//! Both catalogs are read-only snapshots shared behind an `Arc`. A load swaps
//! the whole snapshot, so readers either see the previous catalog or the new
//! one, never a partial update.

use crate::model::{Image, Scanner};
use crate::traits::{ResultPresenter, ScanProxy, TransportError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

const IMAGE_LISTING_HEADER: &str = "Repository            Last Scanned";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Malformed catalog payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog payload is not a JSON array")]
    NotAnArray,
}

/// Parses a `ListScanners` payload.
///
/// Malformed scanner records are skipped with a warning.
pub fn parse_scanners(payload: &str) -> Result<Vec<Scanner>, CatalogError> {
    let entries = match serde_json::from_str::<serde_json::Value>(payload)? {
        serde_json::Value::Array(entries) => entries,
        _ => return Err(CatalogError::NotAnArray),
    };

    let mut scanners = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Scanner>(entry) {
            Ok(scanner) => {
                if !scanner.has_selectable_type() {
                    warn!(scanner = %scanner.name, "Scanner lists no scan types");
                }
                scanners.push(scanner);
            }
            Err(e) => warn!(index, error = %e, "Skipping malformed scanner record"),
        }
    }
    Ok(scanners)
}

/// Parses a `ListImages` payload, dropping the first `skip` entries.
///
/// Entries that are not JSON objects are skipped with a warning.
pub fn parse_images(payload: &str, skip: usize) -> Result<Vec<Image>, CatalogError> {
    let entries = match serde_json::from_str::<serde_json::Value>(payload)? {
        serde_json::Value::Array(entries) => entries,
        _ => return Err(CatalogError::NotAnArray),
    };

    let mut images = Vec::with_capacity(entries.len().saturating_sub(skip));
    for (index, entry) in entries.into_iter().enumerate().skip(skip) {
        match serde_json::from_value::<Image>(entry) {
            Ok(image) => images.push(image),
            Err(e) => warn!(index, error = %e, "Skipping malformed image record"),
        }
    }
    Ok(images)
}

/// Renders the image table shown next to the target checkboxes.
pub fn render_image_listing(images: &[Image]) -> String {
    let mut text = String::from(IMAGE_LISTING_HEADER);
    text.push('\n');
    for image in images {
        text.push_str(&image.display_line());
        text.push('\n');
    }
    text
}

/// Renders the scanner listing; `* ` marks the default scanner and each
/// scanner's default scan type.
pub fn render_scanner_listing(scanners: &[Scanner], default_scanner: Option<&str>) -> String {
    if scanners.is_empty() {
        return "There are no scanners configured for this system.\n".to_string();
    }

    let mut text = String::new();
    for scanner in scanners {
        let marker = if default_scanner == Some(scanner.name.as_str()) {
            "* "
        } else {
            ""
        };
        text.push_str(&format!("Scanner: {} {}\n", scanner.name, marker));
        if let Some(image_name) = &scanner.image_name {
            text.push_str(&format!("  Image Name: {}\n", image_name));
        }
        for scan_type in &scanner.scan_types {
            let marker = if scanner.default_scan.as_deref() == Some(scan_type.name.as_str()) {
                "* "
            } else {
                ""
            };
            text.push_str(&format!("     Scan type: {} {}\n", scan_type.name, marker));
            if let Some(description) = &scan_type.description {
                text.push_str(&format!("     Description: {}\n", description));
            }
            text.push('\n');
        }
    }
    text.push_str("\n* denotes defaults\n");
    text
}

/// Loads and holds the scanner and image catalogs.
pub struct CatalogLoader<P: ScanProxy> {
    proxy: Arc<P>,
    image_header_entries: usize,
    scanners: RwLock<Arc<Vec<Scanner>>>,
    images: RwLock<Arc<Vec<Image>>>,
}

impl<P: ScanProxy> CatalogLoader<P> {
    pub fn new(proxy: Arc<P>, image_header_entries: usize) -> Self {
        Self {
            proxy,
            image_header_entries,
            scanners: RwLock::new(Arc::new(Vec::new())),
            images: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub async fn scanners(&self) -> Arc<Vec<Scanner>> {
        self.scanners.read().await.clone()
    }

    pub async fn images(&self) -> Arc<Vec<Image>> {
        self.images.read().await.clone()
    }

    /// Loads scanners, then images, regardless of how the scanner load went.
    pub async fn refresh(&self, presenter: &dyn ResultPresenter) {
        self.load_scanners(presenter).await;
        self.load_images(presenter).await;
    }

    /// Issues `ListScanners` and replaces the scanner catalog on success.
    ///
    /// On failure a warning is logged and the current snapshot is returned unchanged.
    #[instrument(skip_all)]
    pub async fn load_scanners(&self, presenter: &dyn ResultPresenter) -> Arc<Vec<Scanner>> {
        let loaded = match self.proxy.list_scanners().await {
            Ok(payload) => parse_scanners(&payload),
            Err(e) => Err(e.into()),
        };

        match loaded {
            Ok(scanners) => {
                info!(count = scanners.len(), "Scanner catalog loaded");
                let snapshot = Arc::new(scanners);
                *self.scanners.write().await = snapshot.clone();
                presenter.present_scanners(&snapshot);
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "Failed to load scanner catalog");
                self.scanners().await
            }
        }
    }

    /// Issues `ListImages` and replaces the image catalog on success.
    #[instrument(skip_all)]
    pub async fn load_images(&self, presenter: &dyn ResultPresenter) -> Arc<Vec<Image>> {
        let loaded = match self.proxy.list_images().await {
            Ok(payload) => parse_images(&payload, self.image_header_entries),
            Err(e) => Err(e.into()),
        };

        match loaded {
            Ok(images) => {
                info!(count = images.len(), "Image catalog loaded");
                let snapshot = Arc::new(images);
                *self.images.write().await = snapshot.clone();
                let listing = render_image_listing(&snapshot);
                debug!(%listing, "Rendered image listing");
                presenter.present_images(&snapshot, &listing);
                snapshot
            }
            Err(e) => {
                warn!(error = %e, "Failed to load image catalog");
                self.images().await
            }
        }
    }
}
