//! Signing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SigningError {
    #[error("signature verification failed for node {node}: {reason}")]
    VerificationFailed { node: String, reason: String },

    #[error("no public key known for node {node}")]
    NoTrustedKeyFound { node: String },

    #[error("unsupported signature algorithm {algorithm}")]
    UnsupportedAlgorithm { algorithm: i32 },

    #[error("invalid signature format: {0}")]
    InvalidSignatureFormat(String),

    #[error("invalid public key for node {node}: {reason}")]
    InvalidPublicKey { node: String, reason: String },
}

impl UserFacingError for SigningError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::VerificationFailed { .. } => "signing.verification_failed",
            Self::NoTrustedKeyFound { .. } => "signing.no_trusted_key",
            Self::UnsupportedAlgorithm { .. } => "signing.unsupported_algorithm",
            Self::InvalidSignatureFormat(_) => "signing.invalid_signature",
            Self::InvalidPublicKey { .. } => "signing.invalid_public_key",
        })
    }
}
