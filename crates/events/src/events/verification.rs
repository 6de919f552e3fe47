use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Signature quorum and content checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VerificationEvent {
    /// Enough stake signed one hash
    QuorumReached {
        filename: String,
        file_hash: String,
        weight: u64,
        total_stake: u64,
        signatures: usize,
    },

    /// No hash gathered enough stake; retried next cycle
    QuorumFailed {
        filename: String,
        failure: FailureContext,
    },

    /// A node disagreed with consensus or served bytes that do not match it
    NodeFlagged {
        filename: String,
        node: String,
        reason: String,
    },

    /// A sidecar matched the hash listed in its data file
    SidecarVerified { filename: String, sidecar: String },
}
