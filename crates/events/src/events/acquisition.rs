use serde::{Deserialize, Serialize};
use strand_types::PathType;

use super::FailureContext;

/// Listing and fetching artifacts from node storage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AcquisitionEvent {
    /// A node listing finished
    Listed {
        node: String,
        after: String,
        count: usize,
    },

    /// A node listing failed and the node is left out of this cycle
    ListingFailed {
        node: String,
        failure: FailureContext,
    },

    /// A source failed and the next one is tried
    SourceFailedOver {
        node: String,
        filename: String,
        source_name: String,
        failure: FailureContext,
    },

    /// Artifact bytes retrieved
    Downloaded {
        node: String,
        filename: String,
        source_name: String,
        size: usize,
    },

    /// A node's storage layout observation changed
    PathSwitched {
        node: String,
        from: PathType,
        to: PathType,
    },
}
