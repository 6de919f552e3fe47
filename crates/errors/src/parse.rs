//! Stream and signature file decoding errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("unsupported file version {version} in {filename}")]
    UnknownVersion { filename: String, version: i32 },

    #[error("malformed {filename}: {reason}")]
    Malformed { filename: String, reason: String },

    #[error("unexpected end of {filename}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        filename: String,
        needed: usize,
        remaining: usize,
    },

    #[error("{what} hash mismatch in {filename}: expected {expected}, computed {actual}")]
    HashMismatch {
        filename: String,
        what: String,
        expected: String,
        actual: String,
    },

    #[error("invalid stream filename {filename}: {reason}")]
    InvalidFilename { filename: String, reason: String },

    #[error("failed to decompress {filename}: {message}")]
    Decompression { filename: String, message: String },
}

impl ParseError {
    #[must_use]
    pub fn malformed(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_filename(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilename {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Filename the error is scoped to
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::UnknownVersion { filename, .. }
            | Self::Malformed { filename, .. }
            | Self::Truncated { filename, .. }
            | Self::HashMismatch { filename, .. }
            | Self::InvalidFilename { filename, .. }
            | Self::Decompression { filename, .. } => filename,
        }
    }
}

impl UserFacingError for ParseError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::UnknownVersion { .. } => {
                Some("Upgrade strand to a release that understands this file version.")
            }
            _ => Some("Set parse_failure = \"skip\" to step over the file, or inspect it with `strand parse`."),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::UnknownVersion { .. } => "parse.unknown_version",
            Self::Malformed { .. } => "parse.malformed",
            Self::Truncated { .. } => "parse.truncated",
            Self::HashMismatch { .. } => "parse.hash_mismatch",
            Self::InvalidFilename { .. } => "parse.invalid_filename",
            Self::Decompression { .. } => "parse.decompression",
        };
        Some(code)
    }
}
