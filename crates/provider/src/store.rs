//! Key/value object storage backends

use async_trait::async_trait;
use bytes::Bytes;
use strand_errors::ProviderError;
use thiserror::Error;

/// Failure of a single object store request, before node context is known
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("object not found: {key}")]
    NotFound { key: String },

    #[error("request for {key} failed: {message}")]
    Transient { key: String, message: String },

    #[error("request for {key} rejected: {message}")]
    Permanent { key: String, message: String },

    #[error("rate limited for {seconds}s")]
    RateLimited { seconds: u64 },
}

impl StoreError {
    /// Attach node, filename and source context
    #[must_use]
    pub fn into_provider_error(self, node: &str, filename: &str, source_name: &str) -> ProviderError {
        match self {
            Self::NotFound { .. } => ProviderError::not_found(node, filename),
            Self::Transient { message, .. } => {
                ProviderError::transient(node, filename, source_name, message)
            }
            Self::Permanent { message, .. } => {
                ProviderError::permanent(node, filename, source_name, message)
            }
            Self::RateLimited { seconds } => ProviderError::RateLimited {
                source_name: source_name.to_string(),
                seconds,
            },
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }
}

/// A bucket-like store addressed by `/`-separated keys
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Label used in logs and errors
    fn name(&self) -> &str;

    /// Fetch the object stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no object exists under the key.
    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Keys directly under `prefix`, ascending, strictly after `start_after`
    /// and at most `max` of them
    ///
    /// An absent prefix lists as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or refuses the
    /// request.
    async fn list_objects(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max: usize,
    ) -> Result<Vec<String>, StoreError>;
}
