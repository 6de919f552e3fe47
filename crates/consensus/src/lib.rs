#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Stake-weighted signature quorum
//!
//! Signatures are grouped by the file and metadata hashes they attest to.
//! Each group sums the stake of the nodes whose signatures verify, and the
//! heaviest group is accepted once it is strictly above the configured
//! fraction of total stake. Invalid signatures are dropped from the tally
//! rather than failing it.

mod tally;

pub use tally::{ConsensusOutcome, QuorumState, QuorumTally, SignedHashes};

use strand_errors::ConsensusError;
use strand_types::{ConsensusNode, QuorumFraction, StreamFileSignature, StreamFilename};

/// Verifies collected node signatures against the address book
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeSignatureVerifier {
    quorum: QuorumFraction,
}

impl NodeSignatureVerifier {
    #[must_use]
    pub fn new(quorum: QuorumFraction) -> Self {
        Self { quorum }
    }

    #[must_use]
    pub fn quorum(&self) -> QuorumFraction {
        self.quorum
    }

    /// Start an incremental tally for one candidate file
    #[must_use]
    pub fn tally(&self, filename: &StreamFilename, nodes: &[ConsensusNode]) -> QuorumTally {
        QuorumTally::new(filename.clone(), self.quorum, nodes)
    }

    /// Verify a complete set of signatures for one candidate file
    ///
    /// # Errors
    ///
    /// Returns `NoSignatures` if no signature verifies and
    /// `QuorumNotReached` if no group is heavy enough.
    pub fn verify(
        &self,
        filename: &StreamFilename,
        signatures: impl IntoIterator<Item = StreamFileSignature>,
        nodes: &[ConsensusNode],
    ) -> Result<ConsensusOutcome, ConsensusError> {
        let mut tally = self.tally(filename, nodes);
        for signature in signatures {
            tally.record(signature);
        }
        tally.time_out();
        tally.into_outcome()
    }
}
