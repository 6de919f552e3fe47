#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for the strand stream ingestion pipeline
//!
//! This crate provides fine-grained error types organized by domain.
//! Every domain error maps onto one [`ErrorKind`] tag so that callers can
//! decide between failover, retry-next-cycle and halting without inspecting
//! concrete variants.

use std::borrow::Cow;

use thiserror::Error;

pub mod chain;
pub mod config;
pub mod consensus;
pub mod parse;
pub mod provider;
pub mod signing;

// Re-export all error types at the root
pub use chain::ChainError;
pub use config::ConfigError;
pub use consensus::ConsensusError;
pub use parse::ParseError;
pub use provider::ProviderError;
pub use signing::SigningError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("hash chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("downstream commit failed for {filename}: {message}")]
    Commit { filename: String, message: String },

    #[error("another cycle is already running for stream {stream}")]
    CycleInProgress { stream: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {message}")]
    Io {
        kind: std::io::ErrorKind,
        message: String,
        path: Option<std::path::PathBuf>,
    },
}

/// Coarse classification used to drive failover, retry and halt decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Authoritative absence; never failed over.
    NotFound,
    /// Network or throttling trouble; fail over to the next source.
    Transient,
    /// Bad credentials, missing bucket; surfaced and the cycle aborts.
    Permanent,
    /// Malformed or unrecognized file content.
    Parse,
    /// Signature quorum not reached or signed hash not matched.
    Consensus,
    /// Previous-hash linkage broken; stream halts.
    ChainBreak,
    Config,
    InvalidArgument,
    Cancelled,
    Internal,
}

impl Error {
    /// Create an internal error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid-argument error with a message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: msg.into(),
        }
    }

    /// Create an Io error with an associated path
    pub fn io_with_path(err: &std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: Some(path.into()),
        }
    }

    /// Classify this error into the pipeline taxonomy
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(err) => err.kind(),
            Self::Parse(_) => ErrorKind::Parse,
            Self::Consensus(_) | Self::Signing(_) => ErrorKind::Consensus,
            Self::Chain(_) => ErrorKind::ChainBreak,
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Commit { .. } | Self::CycleInProgress { .. } | Self::Io { .. } => {
                ErrorKind::Transient
            }
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// True for authoritative absence of an artifact
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {err}"))
    }
}

/// Result type alias for strand operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Provider(err) => err.user_message(),
            Error::Chain(err) => err.user_message(),
            Error::Io {
                message,
                path: Some(path),
                ..
            } => Cow::Owned(format!("{}: {message}", path.display())),
            Error::Io { message, .. } => Cow::Owned(message.clone()),
            _ => Cow::Owned(self.to_string()),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Provider(err) => err.user_hint(),
            Error::Parse(err) => err.user_hint(),
            Error::Consensus(err) => err.user_hint(),
            Error::Chain(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::CycleInProgress { .. } => {
                Some("Wait for the running cycle to finish before starting another.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Provider(err) => err.is_retryable(),
            Error::Consensus(err) => err.is_retryable(),
            Error::Commit { .. } | Error::CycleInProgress { .. } | Error::Io { .. } => true,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Provider(err) => err.user_code(),
            Error::Parse(err) => err.user_code(),
            Error::Consensus(err) => err.user_code(),
            Error::Chain(err) => err.user_code(),
            Error::Signing(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::InvalidArgument { .. } => Some("error.invalid_argument"),
            Error::Commit { .. } => Some("error.commit"),
            Error::CycleInProgress { .. } => Some("error.cycle_in_progress"),
            Error::Internal(_) => Some("error.internal"),
            Error::Cancelled => Some("error.cancelled"),
            Error::Io { .. } => Some("error.io"),
        }
    }
}
