//! Storage layout selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strand_errors::ConfigError;

/// Storage key-prefix convention a node publishes under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PathType {
    /// `<streamPath>/<nodePrefix><accountId>/`
    Legacy,
    /// `<network>/0/<nodeId>/<suffix>/`
    Current,
    /// Start at legacy and switch per node once current files appear
    #[default]
    Auto,
}

impl fmt::Display for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Current => write!(f, "current"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for PathType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "current" => Ok(Self::Current),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::invalid_value("path_type", s)),
        }
    }
}

impl clap::ValueEnum for PathType {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Legacy, Self::Current, Self::Auto]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Legacy => clap::builder::PossibleValue::new("legacy"),
            Self::Current => clap::builder::PossibleValue::new("current"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
        })
    }
}
