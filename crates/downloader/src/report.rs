//! Outcome of one download cycle

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use strand_types::{StreamFileSummary, StreamFilename, StreamPointer};

/// Why a cycle stopped before running out of candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stop", rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    /// The per-cycle deadline passed before every candidate was verified
    Deadline,
    /// Remaining files lie after the configured end date
    EndDateReached,
    /// No signature quorum or the signed content could not be matched
    Unverified { filename: String, reason: String },
    /// The file or its signatures could not be fetched right now
    Unavailable { filename: String, reason: String },
    /// The signed file could not be decoded and the halt policy applies
    ParseFailure { filename: String, reason: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::Deadline => write!(f, "cycle deadline reached"),
            Self::EndDateReached => write!(f, "end date reached"),
            Self::Unverified { filename, reason } => write!(f, "{filename} unverified: {reason}"),
            Self::Unavailable { filename, reason } => {
                write!(f, "{filename} unavailable: {reason}")
            }
            Self::ParseFailure { filename, reason } => {
                write!(f, "{filename} undecodable: {reason}")
            }
        }
    }
}

/// Summary of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub stream: String,
    /// Filenames selected after discovery
    pub candidates: usize,
    pub committed: Vec<StreamFileSummary>,
    pub skipped: Vec<StreamFilename>,
    pub stopped: Option<StopReason>,
    /// Pointer at the end of the cycle
    pub pointer: Option<StreamPointer>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl CycleReport {
    #[must_use]
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            candidates: 0,
            committed: Vec::new(),
            skipped: Vec::new(),
            stopped: None,
            pointer: None,
            duration: Duration::ZERO,
        }
    }

    /// Record the first reason the cycle stopped
    pub fn stop(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            self.stopped = Some(reason);
        }
    }

    /// True when every candidate was handled
    #[must_use]
    pub fn caught_up(&self) -> bool {
        self.stopped.is_none()
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_report_serializes_with_reason_text() {
        let mut report = CycleReport::new("record");
        report.stop(StopReason::Unverified {
            filename: "2022-06-21T09_15_38.325469003Z.rcd.gz".into(),
            reason: "1 of 4 stake signed".into(),
        });
        report.stop(StopReason::Deadline);
        report.duration = Duration::from_millis(1500);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stopped"]["stop"], "unverified");
        assert_eq!(json["stopped"]["reason"], "1 of 4 stake signed");
        assert_eq!(json["duration"], 1500);
        assert!(!report.caught_up());
    }

    #[test]
    fn test_unit_stop_reasons_serialize_as_tag_only() {
        let json = serde_json::to_value(StopReason::EndDateReached).unwrap();
        assert_eq!(json, serde_json::json!({ "stop": "end_date_reached" }));
    }
}
