//! Deterministic node keys

use ed25519_dalek::SigningKey;
use strand_types::ConsensusNode;

/// Signing key derived from the node id, stable across test runs
///
/// # Panics
///
/// Panics for node ids above 254.
#[must_use]
pub fn signing_key(node_id: u64) -> SigningKey {
    let seed = u8::try_from(node_id + 1).expect("fixture node ids stay below 255");
    SigningKey::from_bytes(&[seed; 32])
}

#[must_use]
pub fn consensus_node(node_id: u64, stake: u64) -> ConsensusNode {
    let public_key = hex::encode(signing_key(node_id).verifying_key().to_bytes());
    ConsensusNode::new(node_id, public_key, stake)
}

/// One node per stake entry, numbered from zero
#[must_use]
pub fn address_book(stakes: &[u64]) -> Vec<ConsensusNode> {
    (0u64..)
        .zip(stakes)
        .map(|(id, stake)| consensus_node(id, *stake))
        .collect()
}
