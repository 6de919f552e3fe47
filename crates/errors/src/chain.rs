//! Hash chain error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ChainError {
    #[error(
        "hash chain broken at {filename}: previous hash {actual} does not match last accepted {expected} ({last_filename})"
    )]
    Broken {
        filename: String,
        last_filename: String,
        expected: String,
        actual: String,
    },

    #[error("{filename} is not after last accepted {last_filename}")]
    OutOfOrder {
        filename: String,
        last_filename: String,
    },
}

impl UserFacingError for ChainError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some("The stream is halted at this file; inspect the pointer and sources before resetting it.")
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::Broken { .. } => "chain.broken",
            Self::OutOfOrder { .. } => "chain.out_of_order",
        })
    }
}
