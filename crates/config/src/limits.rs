//! Fan-out limits shared by listing and fetching
//!
//! One semaphore per downloader bounds the requests in flight across all
//! nodes, sized from `downloader.max_concurrency`.

use std::sync::Arc;
use strand_errors::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::DownloaderConfig;

/// Semaphore sized for `config`, never smaller than one permit
#[must_use]
pub fn request_limiter(config: &DownloaderConfig) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(config.max_concurrency.max(1)))
}

/// Wait for a request slot
///
/// # Errors
///
/// Returns `Cancelled` once the limiter has been closed for shutdown.
pub async fn acquire_request_permit(
    limiter: Arc<Semaphore>,
    operation: &str,
) -> Result<OwnedSemaphorePermit, Error> {
    limiter.acquire_owned().await.map_err(|_| {
        tracing::debug!(operation, "request limiter closed");
        Error::Cancelled
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_limiter_bounds_permits() {
        let config = DownloaderConfig {
            max_concurrency: 2,
            ..DownloaderConfig::default()
        };
        let limiter = request_limiter(&config);
        let _a = acquire_request_permit(limiter.clone(), "a").await.unwrap();
        let _b = acquire_request_permit(limiter.clone(), "b").await.unwrap();
        assert_eq!(limiter.available_permits(), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_makes_progress() {
        let config = DownloaderConfig {
            max_concurrency: 0,
            ..DownloaderConfig::default()
        };
        let limiter = request_limiter(&config);
        assert_eq!(limiter.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_closed_limiter_reports_cancelled() {
        let limiter = request_limiter(&DownloaderConfig::default());
        limiter.close();
        let err = acquire_request_permit(limiter, "list").await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
