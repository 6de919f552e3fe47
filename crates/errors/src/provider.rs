//! Stream file provider error types

use std::borrow::Cow;

use crate::{ErrorKind, UserFacingError};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("{filename} not found for node {node}")]
    NotFound { node: String, filename: String },

    #[error("transient failure fetching {filename} for node {node} from {source_name}: {message}")]
    Transient {
        node: String,
        filename: String,
        source_name: String,
        message: String,
    },

    #[error("permanent failure fetching {filename} for node {node} from {source_name}: {message}")]
    Permanent {
        node: String,
        filename: String,
        source_name: String,
        message: String,
    },

    #[error("rate limited by {source_name}: retry after {seconds} seconds")]
    RateLimited { source_name: String, seconds: u64 },

    #[error("no stream file sources configured")]
    NoSources,
}

impl ProviderError {
    #[must_use]
    pub fn not_found(node: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::NotFound {
            node: node.into(),
            filename: filename.into(),
        }
    }

    #[must_use]
    pub fn transient(
        node: impl Into<String>,
        filename: impl Into<String>,
        source_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transient {
            node: node.into(),
            filename: filename.into(),
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permanent(
        node: impl Into<String>,
        filename: impl Into<String>,
        source_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Permanent {
            node: node.into(),
            filename: filename.into(),
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// The object the failed request asked for, when it named one
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::NotFound { filename, .. }
            | Self::Transient { filename, .. }
            | Self::Permanent { filename, .. } => Some(filename),
            Self::RateLimited { .. } | Self::NoSources => None,
        }
    }

    /// Taxonomy tag for this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transient { .. } | Self::RateLimited { .. } => ErrorKind::Transient,
            Self::Permanent { .. } | Self::NoSources => ErrorKind::Permanent,
        }
    }
}

impl UserFacingError for ProviderError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Permanent { .. } => {
                Some("Check the source credentials and bucket name in the configuration.")
            }
            Self::NoSources => Some("Add at least one [[sources]] entry to the configuration."),
            Self::RateLimited { .. } => Some("Lower max_concurrency or add another source."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::RateLimited { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "provider.not_found",
            Self::Transient { .. } => "provider.transient",
            Self::Permanent { .. } => "provider.permanent",
            Self::RateLimited { .. } => "provider.rate_limited",
            Self::NoSources => "provider.no_sources",
        };
        Some(code)
    }
}
