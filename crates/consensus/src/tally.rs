//! Per-candidate accumulation of signature weight

use std::collections::{BTreeMap, HashMap, HashSet};

use strand_errors::{ConsensusError, SigningError};
use strand_hash::Hash;
use strand_signing::verify_signature;
use strand_types::{ConsensusNode, NodeId, QuorumFraction, StreamFileSignature, StreamFilename};
use tracing::{debug, warn};

/// Progress of a candidate's signature collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumState {
    Pending,
    Reached,
    TimedOut,
}

/// The hashes a signature group attests to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignedHashes {
    pub file_hash: Hash,
    pub metadata_hash: Option<Hash>,
}

#[derive(Debug, Default)]
struct Group {
    weight: u64,
    signatures: Vec<StreamFileSignature>,
}

/// Accepted result of a quorum check
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub filename: StreamFilename,
    pub file_hash: Hash,
    pub metadata_hash: Option<Hash>,
    pub weight: u64,
    pub total_stake: u64,
    /// Nodes in the winning group, heaviest first
    pub consensus_nodes: Vec<NodeId>,
    /// Nodes whose valid signatures attest to a different hash
    pub flagged: Vec<NodeId>,
    /// Nodes whose signatures failed verification
    pub invalid: Vec<NodeId>,
    /// Highest signature file version seen in the winning group
    pub signature_version: u8,
}

impl ConsensusOutcome {
    /// Whether the data file is published gzip-compressed
    #[must_use]
    pub fn data_compressed(&self) -> bool {
        self.signature_version >= 6
    }
}

/// Running tally for one candidate file
#[derive(Debug)]
pub struct QuorumTally {
    filename: StreamFilename,
    quorum: QuorumFraction,
    nodes: HashMap<NodeId, ConsensusNode>,
    total_stake: u64,
    count_based: bool,
    groups: BTreeMap<SignedHashes, Group>,
    counted: HashSet<NodeId>,
    invalid: Vec<NodeId>,
    timed_out: bool,
}

impl QuorumTally {
    /// An address book with zero total stake falls back to one vote per node
    #[must_use]
    pub fn new(filename: StreamFilename, quorum: QuorumFraction, nodes: &[ConsensusNode]) -> Self {
        let nodes: HashMap<NodeId, ConsensusNode> =
            nodes.iter().map(|n| (n.node_id, n.clone())).collect();
        let stake: u64 = nodes.values().map(|n| n.stake).fold(0, u64::saturating_add);
        let count_based = stake == 0;
        let total_stake = if count_based {
            u64::try_from(nodes.len()).unwrap_or(u64::MAX)
        } else {
            stake
        };
        Self {
            filename,
            quorum,
            nodes,
            total_stake,
            count_based,
            groups: BTreeMap::new(),
            counted: HashSet::new(),
            invalid: Vec::new(),
            timed_out: false,
        }
    }

    /// Verify and count one signature, returning whether it was counted
    ///
    /// Signatures from unknown nodes, repeated signatures from the same node
    /// and signatures that fail verification are not counted.
    pub fn record(&mut self, signature: StreamFileSignature) -> bool {
        let node_id = signature.node;
        if self.counted.contains(&node_id) {
            return false;
        }
        let Some(node) = self.nodes.get(&node_id) else {
            warn!(filename = %self.filename, node = %node_id, "signature from node outside the address book");
            return false;
        };

        if let Err(e) = check(node, &signature) {
            warn!(filename = %self.filename, node = %node, error = %e, "invalid signature excluded");
            self.invalid.push(node_id);
            return false;
        }

        let weight = if self.count_based { 1 } else { node.stake };
        debug!(filename = %self.filename, node = %node, weight, hash = %signature.file_hash, "signature counted");
        let key = SignedHashes {
            file_hash: signature.file_hash.clone(),
            metadata_hash: signature.metadata_hash.clone(),
        };
        let group = self.groups.entry(key).or_default();
        group.weight = group.weight.saturating_add(weight);
        group.signatures.push(signature);
        self.counted.insert(node_id);
        true
    }

    /// Stop collecting; a quorum already reached is kept
    pub fn time_out(&mut self) {
        self.timed_out = true;
    }

    #[must_use]
    pub fn state(&self) -> QuorumState {
        match self.best() {
            Some((_, group)) if self.quorum.is_exceeded_by(group.weight, self.total_stake) => {
                QuorumState::Reached
            }
            _ if self.timed_out => QuorumState::TimedOut,
            _ => QuorumState::Pending,
        }
    }

    /// Number of signatures counted so far
    #[must_use]
    pub fn counted(&self) -> usize {
        self.counted.len()
    }

    #[must_use]
    pub fn total_stake(&self) -> u64 {
        self.total_stake
    }

    /// Heaviest group; ties go to the lowest hash so the choice is stable
    fn best(&self) -> Option<(&SignedHashes, &Group)> {
        self.groups
            .iter()
            .max_by(|a, b| a.1.weight.cmp(&b.1.weight).then_with(|| b.0.cmp(a.0)))
    }

    /// Resolve the tally into the accepted group
    ///
    /// # Errors
    ///
    /// Returns `NoSignatures` if nothing was counted and `QuorumNotReached`
    /// if the heaviest group is not above the threshold.
    pub fn into_outcome(mut self) -> Result<ConsensusOutcome, ConsensusError> {
        let filename = self.filename.to_string();
        let Some((hashes, weight)) = self.best().map(|(k, g)| (k.clone(), g.weight)) else {
            return Err(ConsensusError::NoSignatures { filename });
        };
        if !self.quorum.is_exceeded_by(weight, self.total_stake) {
            return Err(ConsensusError::QuorumNotReached {
                filename,
                best_hash: hashes.file_hash.to_hex(),
                best_weight: weight,
                required: self.quorum.to_string(),
                total: self.total_stake,
            });
        }

        let winners = self.groups.remove(&hashes).unwrap_or_default();
        let mut flagged: Vec<NodeId> = self
            .groups
            .values()
            .flat_map(|g| g.signatures.iter().map(|s| s.node))
            .collect();
        flagged.sort_unstable();
        for node in &flagged {
            warn!(filename = %self.filename, node = %node, "node signed a hash outside the consensus group");
        }

        let signature_version = winners
            .signatures
            .iter()
            .map(|s| s.version)
            .max()
            .unwrap_or_default();
        let mut consensus_nodes: Vec<(u64, NodeId)> = winners
            .signatures
            .iter()
            .map(|s| (self.nodes.get(&s.node).map_or(0, |n| n.stake), s.node))
            .collect();
        consensus_nodes.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(ConsensusOutcome {
            filename: self.filename,
            file_hash: hashes.file_hash,
            metadata_hash: hashes.metadata_hash,
            weight,
            total_stake: self.total_stake,
            consensus_nodes: consensus_nodes.into_iter().map(|(_, id)| id).collect(),
            flagged,
            invalid: self.invalid,
            signature_version,
        })
    }
}

fn check(node: &ConsensusNode, signature: &StreamFileSignature) -> Result<(), SigningError> {
    verify_signature(
        node,
        signature.algorithm,
        &signature.file_hash,
        &signature.file_signature,
    )?;
    match (&signature.metadata_hash, &signature.metadata_signature) {
        (Some(hash), Some(sig)) => verify_signature(node, signature.algorithm, hash, sig),
        (None, None) => Ok(()),
        _ => Err(SigningError::InvalidSignatureFormat(
            "metadata hash and signature must both be present".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use proptest::prelude::*;
    use strand_types::SignatureAlgorithm;

    fn key(id: u64) -> SigningKey {
        let seed = u8::try_from(id + 1).unwrap();
        SigningKey::from_bytes(&[seed; 32])
    }

    fn node(id: u64, stake: u64) -> ConsensusNode {
        ConsensusNode::new(id, hex::encode(key(id).verifying_key().to_bytes()), stake)
    }

    fn filename() -> StreamFilename {
        StreamFilename::parse("2022-06-21T09_15_38.325469003Z.rcd_sig").unwrap()
    }

    fn signed(id: u64, file_hash: &Hash) -> StreamFileSignature {
        let meta = Hash::from_data(file_hash.as_bytes());
        StreamFileSignature {
            node: NodeId(id),
            filename: filename(),
            file_hash: file_hash.clone(),
            file_signature: key(id).sign(file_hash.as_bytes()).to_bytes().to_vec(),
            metadata_signature: Some(key(id).sign(meta.as_bytes()).to_bytes().to_vec()),
            metadata_hash: Some(meta),
            algorithm: SignatureAlgorithm::Ed25519,
            version: 6,
        }
    }

    #[test]
    fn test_quorum_strictly_above_one_third() {
        let nodes = [node(0, 1), node(1, 1), node(2, 1)];
        let hash = Hash::from_data(b"good");
        let verifier = crate::NodeSignatureVerifier::default();

        let err = verifier
            .verify(&filename(), [signed(0, &hash)], &nodes)
            .unwrap_err();
        assert!(matches!(err, ConsensusError::QuorumNotReached { best_weight: 1, total: 3, .. }));

        let outcome = verifier
            .verify(&filename(), [signed(0, &hash), signed(2, &hash)], &nodes)
            .unwrap();
        assert_eq!(outcome.file_hash, hash);
        assert_eq!(outcome.weight, 2);
        assert_eq!(outcome.consensus_nodes, vec![NodeId(0), NodeId(2)]);
        assert!(outcome.data_compressed());
    }

    #[test]
    fn test_stake_weighting_and_flagging() {
        let nodes = [node(0, 10), node(1, 50), node(2, 40)];
        let good = Hash::from_data(b"good");
        let bad = Hash::from_data(b"bad");
        let outcome = crate::NodeSignatureVerifier::default()
            .verify(
                &filename(),
                [signed(0, &bad), signed(1, &good), signed(2, &good)],
                &nodes,
            )
            .unwrap();
        assert_eq!(outcome.file_hash, good);
        assert_eq!(outcome.weight, 90);
        assert_eq!(outcome.consensus_nodes, vec![NodeId(1), NodeId(2)]);
        assert_eq!(outcome.flagged, vec![NodeId(0)]);
    }

    #[test]
    fn test_invalid_signature_excluded_not_fatal() {
        let nodes = [node(0, 1), node(1, 1), node(2, 1)];
        let hash = Hash::from_data(b"good");
        let mut forged = signed(1, &hash);
        forged.file_signature = key(2).sign(hash.as_bytes()).to_bytes().to_vec();

        let mut tally = QuorumTally::new(filename(), QuorumFraction::default(), &nodes);
        assert!(tally.record(signed(0, &hash)));
        assert!(!tally.record(forged));
        assert_eq!(tally.state(), QuorumState::Pending);
        assert!(tally.record(signed(2, &hash)));
        assert_eq!(tally.state(), QuorumState::Reached);

        let outcome = tally.into_outcome().unwrap();
        assert_eq!(outcome.invalid, vec![NodeId(1)]);
        assert!(outcome.flagged.is_empty());
    }

    #[test]
    fn test_duplicate_and_unknown_signers_ignored() {
        let nodes = [node(0, 1), node(1, 1), node(2, 1)];
        let hash = Hash::from_data(b"good");
        let mut tally = QuorumTally::new(filename(), QuorumFraction::default(), &nodes);
        assert!(tally.record(signed(0, &hash)));
        assert!(!tally.record(signed(0, &hash)));
        assert!(!tally.record(signed(7, &hash)));
        assert_eq!(tally.counted(), 1);
        tally.time_out();
        assert_eq!(tally.state(), QuorumState::TimedOut);
    }

    #[test]
    fn test_reached_survives_timeout() {
        let nodes = [node(0, 1), node(1, 1)];
        let hash = Hash::from_data(b"good");
        let mut tally = QuorumTally::new(filename(), QuorumFraction::default(), &nodes);
        tally.record(signed(1, &hash));
        tally.time_out();
        assert_eq!(tally.state(), QuorumState::Reached);
    }

    #[test]
    fn test_zero_stake_counts_nodes() {
        let nodes = [node(0, 0), node(1, 0), node(2, 0), node(3, 0)];
        let hash = Hash::from_data(b"good");
        let tally = {
            let mut t = QuorumTally::new(filename(), QuorumFraction::default(), &nodes);
            t.record(signed(0, &hash));
            t.record(signed(3, &hash));
            t
        };
        assert_eq!(tally.total_stake(), 4);
        assert_eq!(tally.state(), QuorumState::Reached);
    }

    #[test]
    fn test_no_signatures() {
        let err = crate::NodeSignatureVerifier::default()
            .verify(&filename(), Vec::new(), &[node(0, 1)])
            .unwrap_err();
        assert!(matches!(err, ConsensusError::NoSignatures { .. }));
    }

    proptest! {
        #[test]
        fn prop_adding_signatures_never_loses_quorum(
            stakes in proptest::collection::vec(0u64..1_000, 1..8),
            order in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let nodes: Vec<ConsensusNode> = stakes
                .iter()
                .enumerate()
                .map(|(i, s)| node(i as u64, *s))
                .collect();
            let good = Hash::from_data(b"good");
            let bad = Hash::from_data(b"bad");
            let mut tally = QuorumTally::new(filename(), QuorumFraction::default(), &nodes);
            let mut reached = false;
            for (i, _) in nodes.iter().enumerate() {
                let hash = if order[i] { &good } else { &bad };
                tally.record(signed(i as u64, hash));
                let now = tally.state() == QuorumState::Reached;
                prop_assert!(now || !reached);
                reached = now;
            }
        }
    }
}
