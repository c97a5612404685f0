use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the repository column and the last-scanned column.
const LISTING_GAP: &str = "            ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanType {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A scanning backend as reported by `ListScanners`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scanner {
    #[serde(rename = "scanner_name")]
    pub name: String,

    #[serde(rename = "scans", default)]
    pub scan_types: Vec<ScanType>,

    /// Container image the scanner runs from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,

    /// Name of the scan type used when none is chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_scan: Option<String>,
}

impl Scanner {
    pub fn has_selectable_type(&self) -> bool {
        !self.scan_types.is_empty()
    }

    pub fn scan_type(&self, name: &str) -> Option<&ScanType> {
        self.scan_types.iter().find(|t| t.name == name)
    }

    /// The declared default scan type, if it names one of this scanner's types.
    pub fn default_scan_type(&self) -> Option<&ScanType> {
        self.default_scan.as_deref().and_then(|name| self.scan_type(name))
    }
}

/// A container image as reported by `ListImages`.
///
/// Every field defaults, so any JSON object in the response is accepted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "repo", default)]
    pub repository: String,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub vulnerable: bool,

    /// Service-defined vulnerability blob; carries `Time` once scanned
    #[serde(rename = "vuln_info", default)]
    pub vulnerability_detail: Option<serde_json::Value>,
}

impl Image {
    /// Last scan time, taken from the `Time` key of the vulnerability blob.
    pub fn last_scanned(&self) -> Option<String> {
        match self.vulnerability_detail.as_ref()?.get("Time")? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// One row of the image listing: repository, last scan time, `*` if vulnerable.
    pub fn display_line(&self) -> String {
        let mut line = format!("{}{}", self.repository, LISTING_GAP);
        if let Some(time) = self.last_scanned() {
            line.push_str(&time);
            line.push(' ');
        }
        if self.vulnerable {
            line.push('*');
        }
        line
    }
}

/// Feature switches forwarded with every scan submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanFlags {
    pub remote: bool,
    pub docker: bool,
    pub driver_remote: bool,
}

/// An immutable scan submission.
///
/// Built once from a selection snapshot and passed by value into the
/// orchestrator. Omitted choices become empty strings; the remote service
/// decides what an empty scanner, scan type or target list means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    targets: Vec<String>,
    scanner: String,
    scan_type: String,
    rootfs_path: String,
    options: Vec<String>,
    flags: ScanFlags,
}

impl ScanRequest {
    pub fn new<I, S>(targets: I, scanner: Option<String>, scan_type: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for target in targets {
            let target = target.into();
            if !unique.contains(&target) {
                unique.push(target);
            }
        }

        Self {
            targets: unique,
            scanner: scanner.unwrap_or_default(),
            scan_type: scan_type.unwrap_or_default(),
            rootfs_path: String::new(),
            options: Vec::new(),
            flags: ScanFlags::default(),
        }
    }

    pub fn with_rootfs(mut self, rootfs_path: impl Into<String>) -> Self {
        self.rootfs_path = rootfs_path.into();
        self
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_flags(mut self, flags: ScanFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn scanner(&self) -> &str {
        &self.scanner
    }

    pub fn scan_type(&self) -> &str {
        &self.scan_type
    }

    pub fn rootfs_path(&self) -> &str {
        &self.rootfs_path
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn flags(&self) -> ScanFlags {
        self.flags
    }
}

/// Opaque token identifying a deferred scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanHandle(pub String);

impl fmt::Display for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Service-defined scan output. Never interpreted beyond emptiness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanResult(pub serde_json::Value);

impl ScanResult {
    /// Whether the payload is the service's "not ready yet" signal.
    ///
    /// Only a non-empty string, array or object counts as a result; null,
    /// booleans and numbers carry no length and mean "not ready".
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::String(s) => s.is_empty(),
            serde_json::Value::Array(a) => a.is_empty(),
            serde_json::Value::Object(o) => o.is_empty(),
            serde_json::Value::Null | serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
                true
            }
        }
    }
}

impl From<serde_json::Value> for ScanResult {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
