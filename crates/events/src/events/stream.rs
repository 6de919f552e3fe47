use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Download cycle progress of one stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    CycleStarted {
        stream: String,
        after: Option<String>,
    },

    /// A file was handed downstream and the pointer advanced
    FileCommitted {
        stream: String,
        filename: String,
        index: Option<i64>,
        hash: String,
        items: usize,
    },

    /// An undecodable file was stepped over
    FileSkipped {
        stream: String,
        filename: String,
        failure: FailureContext,
    },

    /// The previous-hash link broke; the stream does not advance past it
    ChainBroken {
        stream: String,
        filename: String,
        failure: FailureContext,
    },

    CycleCompleted {
        stream: String,
        committed: usize,
        duration_ms: u64,
        stopped: Option<String>,
    },
}
