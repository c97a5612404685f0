//! Operator selection state and its snapshot into a [`ScanRequest`].

use crate::model::{ScanRequest, Scanner};

/// A scan type, qualified by the scanner that offers it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanTypeKey {
    pub scanner: String,
    pub scan_type: String,
}

impl ScanTypeKey {
    pub fn new(scanner: impl Into<String>, scan_type: impl Into<String>) -> Self {
        Self {
            scanner: scanner.into(),
            scan_type: scan_type.into(),
        }
    }
}

/// Zero-or-one scanner, zero-or-one scan type, zero-or-more targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    scanner: Option<String>,
    scan_type: Option<ScanTypeKey>,
    targets: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-selects `default_scanner` and its default scan type when the
    /// catalog offers them.
    pub fn with_defaults(scanners: &[Scanner], default_scanner: Option<&str>) -> Self {
        let mut selection = Self::new();
        let Some(scanner) = default_scanner.and_then(|name| scanners.iter().find(|s| s.name == name))
        else {
            return selection;
        };

        selection.select_scanner(&scanner.name);
        if let Some(scan_type) = scanner.default_scan_type() {
            selection.select_scan_type(ScanTypeKey::new(&scanner.name, &scan_type.name));
        }
        selection
    }

    /// Selects a scanner, dropping a scan type that belongs to another scanner.
    pub fn select_scanner(&mut self, scanner: impl Into<String>) {
        let scanner = scanner.into();
        if self
            .scan_type
            .as_ref()
            .is_some_and(|key| key.scanner != scanner)
        {
            self.scan_type = None;
        }
        self.scanner = Some(scanner);
    }

    /// Selects a scan type; its scanner becomes the selected scanner.
    pub fn select_scan_type(&mut self, key: ScanTypeKey) {
        self.scanner = Some(key.scanner.clone());
        self.scan_type = Some(key);
    }

    /// Adds `repository` to the targets, or removes it if already present.
    /// Returns whether it is selected afterwards.
    pub fn toggle_target(&mut self, repository: impl Into<String>) -> bool {
        let repository = repository.into();
        if let Some(pos) = self.targets.iter().position(|t| *t == repository) {
            self.targets.remove(pos);
            false
        } else {
            self.targets.push(repository);
            true
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn scanner(&self) -> Option<&str> {
        self.scanner.as_deref()
    }

    pub fn scan_type(&self) -> Option<&ScanTypeKey> {
        self.scan_type.as_ref()
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Freezes the current choices into a request.
    pub fn snapshot(&self, rootfs_path: &str) -> ScanRequest {
        ScanRequest::new(
            self.targets.iter().cloned(),
            self.scanner.clone(),
            self.scan_type.as_ref().map(|key| key.scan_type.clone()),
        )
        .with_rootfs(rootfs_path)
    }
}
