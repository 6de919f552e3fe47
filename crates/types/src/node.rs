//! Consensus node address book entries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric node identifier used by the current storage layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A consensus node as supplied by the address book
///
/// Immutable for the duration of a download cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusNode {
    pub node_id: NodeId,
    /// Legacy account-style identifier such as `0.0.3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Hex-encoded public key used to verify the node's signature files
    pub public_key: String,
    #[serde(default)]
    pub stake: u64,
}

impl ConsensusNode {
    #[must_use]
    pub fn new(node_id: u64, public_key: impl Into<String>, stake: u64) -> Self {
        Self {
            node_id: NodeId(node_id),
            account_id: None,
            public_key: public_key.into(),
            stake,
        }
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Legacy account id, defaulting to `0.0.<node_id + 3>` when the address
    /// book does not carry one
    #[must_use]
    pub fn account_id(&self) -> String {
        self.account_id
            .clone()
            .unwrap_or_else(|| format!("0.0.{}", self.node_id.0 + 3))
    }
}

impl fmt::Display for ConsensusNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.account_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_defaults_from_node_id() {
        let node = ConsensusNode::new(0, "aa", 10);
        assert_eq!(node.account_id(), "0.0.3");
        let node = node.with_account_id("0.0.99");
        assert_eq!(node.account_id(), "0.0.99");
        assert_eq!(node.to_string(), "0.0.99");
    }
}
