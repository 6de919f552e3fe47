#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for strand
//!
//! Settings are layered, later layers winning: built-in defaults, the TOML
//! file (`~/.config/strand/config.toml` unless a path is given), `STRAND_*`
//! environment variables, then whatever flags the binary applies.
//! [`Config::validate`] runs last and checks cross-field constraints.

pub mod limits;
mod sources;

pub use sources::{SourceConfig, SourceKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strand_errors::{ConfigError, Error};
use strand_types::{ConsensusNode, PathType, QuorumFraction};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub downloader: DownloaderConfig,

    #[serde(default)]
    pub path: PathConfig,

    /// Ordered failover list; the last entry is always tried
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Address book of consensus nodes
    #[serde(default)]
    pub nodes: Vec<ConsensusNode>,

    #[serde(default)]
    pub pointer: PointerConfig,

    #[serde(default)]
    pub sidecars: SidecarConfig,
}

/// What to do with a file no reader can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// Stop advancing the stream at the file
    #[default]
    Halt,
    /// Advance past the file and waive the next file's chain check
    Skip,
}

/// Download cycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Label used in logs and for the single-writer lock
    #[serde(default = "default_stream")]
    pub stream: String,
    #[serde(default = "default_network")]
    pub network: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_cycle_timeout")]
    pub cycle_timeout_secs: u64,
    #[serde(default = "default_signature_timeout")]
    pub signature_timeout_secs: u64,
    /// Pause between cycles when running continuously
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub quorum: QuorumFraction,
    #[serde(default)]
    pub parse_failure: ParseFailurePolicy,
    /// Where to start when no file has been accepted yet
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Files after this instant are not processed
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

/// Storage layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default)]
    pub path_type: PathType,
    /// How long a per-node layout observation stays fresh
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// Legacy top-level folder, e.g. `recordstreams`
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    /// Legacy per-node folder prefix, e.g. `record` in `record0.0.3`
    #[serde(default = "default_node_prefix")]
    pub node_prefix: String,
    /// Current-layout folder under the node id, e.g. `record`
    #[serde(default = "default_node_prefix")]
    pub current_suffix: String,
}

/// Pointer persistence
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PointerConfig {
    /// JSON file holding the last accepted file; in-memory when unset
    pub path: Option<PathBuf>,
}

/// Sidecar acquisition
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SidecarConfig {
    #[serde(default)]
    pub enabled: bool,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            stream: default_stream(),
            network: default_network(),
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
            cycle_timeout_secs: default_cycle_timeout(),
            signature_timeout_secs: default_signature_timeout(),
            interval_secs: default_interval(),
            quorum: QuorumFraction::default(),
            parse_failure: ParseFailurePolicy::Halt,
            start_date: None,
            end_date: None,
        }
    }
}

impl DownloaderConfig {
    #[must_use]
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }

    #[must_use]
    pub fn signature_timeout(&self) -> Duration {
        Duration::from_secs(self.signature_timeout_secs)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            path_type: PathType::Auto,
            refresh_interval_secs: default_refresh_interval(),
            stream_path: default_stream_path(),
            node_prefix: default_node_prefix(),
            current_suffix: default_node_prefix(),
        }
    }
}

impl PathConfig {
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

// Default value functions for serde
fn default_stream() -> String {
    "record".to_string()
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_concurrency() -> usize {
    32
}

fn default_cycle_timeout() -> u64 {
    30
}

fn default_signature_timeout() -> u64 {
    10
}

fn default_interval() -> u64 {
    2
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_stream_path() -> String {
    "recordstreams".to_string()
}

fn default_node_prefix() -> String {
    "record".to_string()
}

impl Config {
    /// `<config dir>/strand/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on platforms without a per-user config directory.
    pub fn default_path() -> Result<PathBuf, Error> {
        dirs::config_dir()
            .map(|dir| dir.join("strand").join("config.toml"))
            .ok_or_else(|| {
                ConfigError::NotFound {
                    path: "per-user config directory".to_string(),
                }
                .into()
            })
    }

    /// # Errors
    ///
    /// `NotFound` if `path` cannot be read, `Syntax` if it is not a valid
    /// config document.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let Ok(contents) = fs::read_to_string(path).await else {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        };
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns a parse error for invalid TOML or values of the wrong type.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::Syntax {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Read the per-user file if there is one, defaults otherwise
    ///
    /// # Errors
    ///
    /// Fails when the file exists but does not load.
    pub async fn load() -> Result<Self, Error> {
        let default_path = Self::default_path()?;
        if !default_path.exists() {
            tracing::debug!(path = %default_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(&default_path).await
    }

    /// An explicit path must exist; without one fall back to [`Config::load`]
    ///
    /// # Errors
    ///
    /// See [`Config::load_from_file`].
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }
        Self::load().await
    }

    /// Apply `STRAND_*` overrides on top of the loaded file
    ///
    /// # Errors
    ///
    /// `InvalidValue` naming the variable that does not parse.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // STRAND_BATCH_SIZE
        if let Ok(size) = std::env::var("STRAND_BATCH_SIZE") {
            self.downloader.batch_size = size
                .parse()
                .map_err(|_| ConfigError::invalid_value("STRAND_BATCH_SIZE", size))?;
        }

        // STRAND_MAX_CONCURRENCY
        if let Ok(limit) = std::env::var("STRAND_MAX_CONCURRENCY") {
            self.downloader.max_concurrency = limit
                .parse()
                .map_err(|_| ConfigError::invalid_value("STRAND_MAX_CONCURRENCY", limit))?;
        }

        // STRAND_PATH_TYPE
        if let Ok(path_type) = std::env::var("STRAND_PATH_TYPE") {
            self.path.path_type = path_type
                .parse()
                .map_err(|_| ConfigError::invalid_value("STRAND_PATH_TYPE", path_type))?;
        }

        // STRAND_NETWORK
        if let Ok(network) = std::env::var("STRAND_NETWORK") {
            self.downloader.network = network;
        }

        // STRAND_PARSE_FAILURE
        if let Ok(policy) = std::env::var("STRAND_PARSE_FAILURE") {
            self.downloader.parse_failure = match policy.as_str() {
                "halt" => ParseFailurePolicy::Halt,
                "skip" => ParseFailurePolicy::Skip,
                _ => {
                    return Err(ConfigError::invalid_value("STRAND_PARSE_FAILURE", policy).into())
                }
            };
        }

        Ok(())
    }

    /// Check the values a download cycle depends on
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), Error> {
        if self.sources.is_empty() {
            return Err(ConfigError::MissingField {
                field: "sources".to_string(),
            }
            .into());
        }
        if self.nodes.is_empty() {
            return Err(ConfigError::MissingField {
                field: "nodes".to_string(),
            }
            .into());
        }

        let downloader = &self.downloader;
        if downloader.batch_size == 0 {
            return Err(invalid("downloader.batch_size", "0"));
        }
        if downloader.max_concurrency == 0 {
            return Err(invalid("downloader.max_concurrency", "0"));
        }
        if downloader.cycle_timeout_secs == 0 {
            return Err(invalid("downloader.cycle_timeout_secs", "0"));
        }
        if downloader.signature_timeout_secs >= downloader.cycle_timeout_secs {
            return Err(ConfigError::Inconsistent {
                message: format!(
                    "signature_timeout_secs ({}) must be shorter than cycle_timeout_secs ({})",
                    downloader.signature_timeout_secs, downloader.cycle_timeout_secs
                ),
            }
            .into());
        }
        if let (Some(start), Some(end)) = (downloader.start_date, downloader.end_date) {
            if start >= end {
                return Err(ConfigError::Inconsistent {
                    message: format!("start_date {start} is not before end_date {end}"),
                }
                .into());
            }
        }

        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if !node_ids.insert(node.node_id) {
                return Err(invalid("nodes.node_id", &node.node_id.to_string()));
            }
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(invalid("sources.name", &source.name));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str) -> Error {
    ConfigError::invalid_value(field, value).into()
}
