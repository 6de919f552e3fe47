//! Node signatures over stream file hashes

use serde::{Deserialize, Serialize};
use std::fmt;
use strand_hash::Hash;

use crate::{NodeId, StreamFilename};

/// Signature scheme used by a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    Ed25519,
}

impl SignatureAlgorithm {
    /// Resolve an algorithm from the wire signature type
    #[must_use]
    pub fn from_type(sig_type: i32) -> Option<Self> {
        match sig_type {
            1 => Some(Self::Ed25519),
            _ => None,
        }
    }

    #[must_use]
    pub fn type_id(self) -> i32 {
        match self {
            Self::Ed25519 => 1,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// Decoded content of one node's signature artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFileSignature {
    pub node: NodeId,
    /// Signature filename the entry was read from
    pub filename: StreamFilename,
    pub file_hash: Hash,
    pub file_signature: Vec<u8>,
    /// Present from signature file version 5 onwards
    pub metadata_hash: Option<Hash>,
    pub metadata_signature: Option<Vec<u8>>,
    pub algorithm: SignatureAlgorithm,
    /// Version byte of the raw artifact
    pub version: u8,
}

impl StreamFileSignature {
    /// Whether the matching data file is stored gzip-compressed
    #[must_use]
    pub fn data_compressed(&self) -> bool {
        self.version >= 6
    }
}
