pub mod auxiliary;
pub mod catalog;
pub mod client;
pub mod config;
pub mod executor;
pub mod logging;
pub mod model;
pub mod scan;
pub mod selection;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export common types for convenience
pub use client::{ClientError, ScanClient};
pub use config::{ClientConfig, ConfigError, PollPolicy};
pub use executor::ScanExecutor;
pub use model::*;
pub use scan::{ScanError, ScanMode, ScanOrchestrator, ScanOutcome, ScanState};
pub use selection::{ScanTypeKey, Selection};
pub use session::{Availability, SessionGuard};
pub use traits::*;
