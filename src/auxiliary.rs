//! Single-call operations outside the scan state machine.
//!
//! These may run while a scan is in flight.

use crate::traits::{ScanProxy, TransportError};
use tracing::{info, instrument, warn};

/// `VulnerableInfo`: vulnerability details for all scanned images.
#[instrument(skip_all)]
pub async fn fetch_vulnerability_info<P>(proxy: &P) -> Result<serde_json::Value, TransportError>
where
    P: ScanProxy + ?Sized,
{
    match proxy.vulnerable_info().await {
        Ok(info) => {
            info!(%info, "Vulnerability info received");
            Ok(info)
        }
        Err(e) => {
            warn!(error = %e, "Failed to fetch vulnerability info");
            Err(e)
        }
    }
}

/// `Update`: asks the service to update one image.
#[instrument(skip(proxy))]
pub async fn update_image<P>(proxy: &P, repository: &str) -> Result<(), TransportError>
where
    P: ScanProxy + ?Sized,
{
    match proxy.update(repository).await {
        Ok(()) => {
            info!("Image update succeeded");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Image update failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failure, MockProxy};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_vulnerability_info() {
        let proxy = MockProxy {
            vulnerable: Ok(json!({"sha256:abc": {"Time": "T1"}})),
            ..MockProxy::default()
        };
        let info = fetch_vulnerability_info(&proxy).await.unwrap();
        assert_eq!(info["sha256:abc"]["Time"], "T1");

        let proxy = MockProxy {
            vulnerable: Err(failure("VulnerableInfo")),
            ..MockProxy::default()
        };
        assert!(fetch_vulnerability_info(&proxy).await.is_err());
    }

    #[tokio::test]
    async fn test_update_image() {
        let proxy = MockProxy::default();
        update_image(&proxy, "docker.io/busybox").await.unwrap();
        assert_eq!(*proxy.updated.lock().unwrap(), vec!["docker.io/busybox".to_string()]);

        let proxy = MockProxy {
            update_result: Err(failure("Update")),
            ..MockProxy::default()
        };
        assert_eq!(
            update_image(&proxy, "fedora").await,
            Err(failure("Update"))
        );
    }
}
