//! Client configuration.
//!
//! [`ClientConfig`] is plain serde data so it can be read from a JSON file;
//! every field has a default, and a missing file section falls back to it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or checking configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Backoff and bounds for the deferred-scan poll loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay after the first empty poll (milliseconds)
    pub initial_delay_ms: u64,

    /// Multiplier applied to the delay after each further empty poll
    pub backoff_factor: u32,

    /// Upper bound for a single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Total time allowed from the first poll until a result (seconds)
    pub max_wait_secs: u64,

    /// Optional cap on the number of poll calls
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            backoff_factor: 2,
            max_delay_ms: 10_000,
            max_wait_secs: 900,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the `attempt`-th (1-based) poll came back empty.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let scaled = Duration::from_millis(self.initial_delay_ms)
            .saturating_mul(self.backoff_factor.saturating_pow(exponent));
        scaled.min(Duration::from_millis(self.max_delay_ms))
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backoff_factor == 0 {
            return Err(ConfigError::Invalid(
                "poll.backoff_factor must be at least 1".to_string(),
            ));
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "poll.max_delay_ms ({}) is below poll.initial_delay_ms ({})",
                self.max_delay_ms, self.initial_delay_ms
            )));
        }
        if self.max_wait_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.max_wait_secs must be positive".to_string(),
            ));
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "poll.max_attempts must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scanner pre-selected and marked as default in listings
    pub default_scanner: Option<String>,

    /// Leading `ListImages` entries that are not image records
    pub image_header_entries: usize,

    /// Root filesystem path sent with deferred scans
    pub rootfs_path: String,

    /// Timeout for any single remote call (milliseconds)
    pub call_timeout_ms: u64,

    pub poll: PollPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_scanner: None,
            image_header_entries: 2,
            rootfs_path: String::new(),
            call_timeout_ms: 600_000,
            poll: PollPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "call_timeout_ms must be positive".to_string(),
            ));
        }
        self.poll.validate()
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn with_default_scanner(mut self, scanner: impl Into<String>) -> Self {
        self.default_scanner = Some(scanner.into());
        self
    }

    pub fn with_image_header_entries(mut self, entries: usize) -> Self {
        self.image_header_entries = entries;
        self
    }

    pub fn with_rootfs_path(mut self, path: impl Into<String>) -> Self {
        self.rootfs_path = path.into();
        self
    }

    /// Sets the per-call timeout, rounded up to at least one millisecond.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).max(1);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}
