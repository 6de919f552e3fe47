//! Envelope attached to events when they leave the channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Level;
use uuid::Uuid;

/// Context the consumer stamps on a received event
///
/// Events themselves stay small; the consumer knows which stream it drains
/// and which cycle is running, so it adds both here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventMeta {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub severity: Severity,
    pub domain: EventDomain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
    /// Sequence number of the cycle the event belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<u64>,
}

impl EventMeta {
    #[must_use]
    pub fn new(severity: impl Into<Severity>, domain: EventDomain) -> Self {
        Self {
            id: Uuid::new_v4(),
            received_at: Utc::now(),
            severity: severity.into(),
            domain,
            stream: None,
            cycle: None,
        }
    }

    #[must_use]
    pub fn for_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = Some(stream.into());
        self
    }

    #[must_use]
    pub fn in_cycle(mut self, cycle: u64) -> Self {
        self.cycle = Some(cycle);
        self
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.severity.into()
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Trace => Level::TRACE,
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warn => Level::WARN,
            Severity::Error => Level::ERROR,
        }
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        if level == Level::ERROR {
            Severity::Error
        } else if level == Level::WARN {
            Severity::Warn
        } else if level == Level::INFO {
            Severity::Info
        } else if level == Level::DEBUG {
            Severity::Debug
        } else {
            Severity::Trace
        }
    }
}

/// Pipeline stage an event reports on
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EventDomain {
    General,
    Acquisition,
    Verification,
    Stream,
}

impl EventDomain {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Acquisition => "acquisition",
            Self::Verification => "verification",
            Self::Stream => "stream",
        }
    }
}

impl std::fmt::Display for EventDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
