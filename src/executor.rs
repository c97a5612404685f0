use crate::scan::ScanError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

/// Admits at most one scan run at a time.
///
/// A second submission while one is in flight is rejected rather than queued,
/// so a repeated click never produces a duplicate scan.
pub struct ScanExecutor {
    semaphore: Arc<Semaphore>,
}

impl Default for ScanExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanExecutor {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn admit(&self) -> Result<OwnedSemaphorePermit, ScanError> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| ScanError::AlreadyInFlight)
    }

    pub fn is_busy(&self) -> bool {
        self.semaphore.available_permits() == 0
    }

    #[instrument(skip_all)]
    pub async fn execute<F, T>(&self, run: F) -> Result<T, ScanError>
    where
        F: Future<Output = Result<T, ScanError>>,
    {
        let _permit = self.admit()?;

        debug!("Scan run admitted");
        let result = run.await;
        debug!(ok = result.is_ok(), "Scan run finished");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[test]
    fn test_second_admission_rejected_until_release() {
        let executor = ScanExecutor::new();

        let permit = executor.admit().unwrap();
        assert!(executor.is_busy());
        assert!(matches!(executor.admit(), Err(ScanError::AlreadyInFlight)));

        drop(permit);
        assert!(!executor.is_busy());
        assert!(executor.admit().is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_execute_rejects_duplicate() {
        let executor = Arc::new(ScanExecutor::new());
        let (release, released) = oneshot::channel::<()>();

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .execute(async move {
                        released.await.ok();
                        Ok::<u32, ScanError>(1)
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;

        let second = executor.execute(async { Ok::<u32, ScanError>(2) }).await;
        assert!(matches!(second, Err(ScanError::AlreadyInFlight)));

        release.send(()).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), 1);
        assert_eq!(executor.execute(async { Ok::<u32, ScanError>(3) }).await.unwrap(), 3);
    }
}
