//! Stream file source entries

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strand_errors::{ConfigError, Error};

/// Backend a source reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Directory laid out like a bucket
    Local,
    /// S3-compatible HTTP endpoint
    Http,
}

/// One entry of the ordered failover list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    /// Directory for `local`, bucket base URL for `http`
    pub uri: String,
    /// How long the source is skipped after a failure
    #[serde(default = "default_backoff")]
    pub backoff_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

fn default_backoff() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl SourceConfig {
    #[must_use]
    pub fn local(name: impl Into<String>, dir: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: SourceKind::Local,
            uri: dir.into(),
            backoff_secs: default_backoff(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn http(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Http,
            ..Self::local(name, base_url)
        }
    }

    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_secs(self.backoff_secs)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// # Errors
    ///
    /// Returns an error for an empty name or URI, or an `http` source whose
    /// URI is not an http(s) URL.
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "sources.name".to_string(),
            }
            .into());
        }
        if self.uri.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: format!("sources.{}.uri", self.name),
            }
            .into());
        }
        if self.kind == SourceKind::Http
            && !(self.uri.starts_with("http://") || self.uri.starts_with("https://"))
        {
            return Err(
                ConfigError::invalid_value(format!("sources.{}.uri", self.name), self.uri.as_str())
                    .into(),
            );
        }
        Ok(())
    }
}
