//! Session guard: gates every remote call behind proxy validity.

use crate::traits::{ResultPresenter, ScanProxy};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
}

/// Settles proxy availability once per session.
///
/// The first [`SessionGuard::check_availability`] waits for the proxy and
/// switches the presenter to either the operational or the unavailable view.
/// The outcome is never re-checked; a new session is needed to retry.
pub struct SessionGuard<P: ScanProxy> {
    proxy: Arc<P>,
    availability: OnceCell<Availability>,
}

impl<P: ScanProxy> SessionGuard<P> {
    pub fn new(proxy: Arc<P>) -> Self {
        Self {
            proxy,
            availability: OnceCell::new(),
        }
    }

    #[instrument(skip_all)]
    pub async fn check_availability(&self, presenter: &dyn ResultPresenter) -> Availability {
        *self
            .availability
            .get_or_init(|| async {
                if self.proxy.wait_ready().await {
                    info!("Scanning service proxy is valid");
                    presenter.show_operational();
                    Availability::Available
                } else {
                    warn!("Scanning service proxy is invalid; service unavailable");
                    presenter.show_unavailable();
                    Availability::Unavailable
                }
            })
            .await
    }

    /// Settled availability, or `None` before the first check.
    pub fn current(&self) -> Option<Availability> {
        self.availability.get().copied()
    }

    pub fn is_available(&self) -> bool {
        self.current() == Some(Availability::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockProxy, Presented, RecordingPresenter};

    #[tokio::test]
    async fn test_valid_proxy_is_available() {
        let proxy = Arc::new(MockProxy::default());
        let guard = SessionGuard::new(proxy.clone());
        let presenter = RecordingPresenter::default();

        assert_eq!(guard.current(), None);
        assert_eq!(guard.check_availability(&presenter).await, Availability::Available);
        assert!(guard.is_available());
        assert_eq!(presenter.events(), vec![Presented::Operational]);
    }

    #[tokio::test]
    async fn test_invalid_proxy_is_unavailable_and_final() {
        let proxy = Arc::new(MockProxy {
            valid: false,
            ..MockProxy::default()
        });
        let guard = SessionGuard::new(proxy.clone());
        let presenter = RecordingPresenter::default();

        assert_eq!(guard.check_availability(&presenter).await, Availability::Unavailable);
        assert_eq!(guard.check_availability(&presenter).await, Availability::Unavailable);

        assert_eq!(proxy.calls(), vec!["wait_ready"]);
        assert_eq!(presenter.events(), vec![Presented::Unavailable]);
    }
}
