//! Signature quorum error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConsensusError {
    #[error("no signatures collected for {filename}")]
    NoSignatures { filename: String },

    #[error(
        "quorum not reached for {filename}: best hash {best_hash} has weight {best_weight}, needs more than {required} of {total}"
    )]
    QuorumNotReached {
        filename: String,
        best_hash: String,
        best_weight: u64,
        required: String,
        total: u64,
    },

    #[error("no consensus node served {filename} with the signed hash {expected}")]
    DataHashMismatch { filename: String, expected: String },

    #[error("signed metadata hash {expected} does not match {actual} computed for {filename}")]
    MetadataHashMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    #[error("sidecar {sidecar} of {filename} unavailable: {message}")]
    SidecarUnavailable {
        filename: String,
        sidecar: String,
        message: String,
    },
}

impl UserFacingError for ConsensusError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoSignatures { .. } | Self::QuorumNotReached { .. } => {
                Some("Late signatures are expected; the file is retried on the next cycle.")
            }
            Self::DataHashMismatch { .. } | Self::MetadataHashMismatch { .. } => {
                Some("Nodes are serving inconsistent copies; add sources or wait for propagation.")
            }
            Self::SidecarUnavailable { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        true
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NoSignatures { .. } => "consensus.no_signatures",
            Self::QuorumNotReached { .. } => "consensus.quorum_not_reached",
            Self::DataHashMismatch { .. } => "consensus.data_hash_mismatch",
            Self::MetadataHashMismatch { .. } => "consensus.metadata_hash_mismatch",
            Self::SidecarUnavailable { .. } => "consensus.sidecar_unavailable",
        };
        Some(code)
    }
}
