//! Configuration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: String },

    /// The file is not valid TOML or does not match the schema
    #[error("config syntax: {message}")]
    Syntax { message: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Each value is fine alone but two of them contradict each other
    #[error("inconsistent config: {message}")]
    Inconsistent { message: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl UserFacingError for ConfigError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "Pass --config, set STRAND_CONFIG, or create ~/.config/strand/config.toml.",
            Self::Syntax { .. } => "Check the TOML against the documented [downloader], [[sources]] and [[nodes]] tables.",
            Self::MissingField { field } => match field.as_str() {
                "sources" => "Add at least one [[sources]] entry to the configuration file.",
                "nodes" => "Add the address book as [[nodes]] entries.",
                _ => "Add the missing configuration field noted in the error message.",
            },
            Self::InvalidValue { field, .. } => match field.as_str() {
                "quorum" => "Write the quorum as a fraction like \"1/3\", between 0 and 1.",
                "path_type" | "STRAND_PATH_TYPE" => "Use one of legacy, current or auto.",
                _ => "Fix the configuration value and retry the command.",
            },
            Self::Inconsistent { .. } => "Adjust one of the two settings named in the error message.",
        })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "config.not_found",
            Self::Syntax { .. } => "config.syntax",
            Self::MissingField { .. } => "config.missing_field",
            Self::InvalidValue { .. } => "config.invalid_value",
            Self::Inconsistent { .. } => "config.inconsistent",
        })
    }
}
