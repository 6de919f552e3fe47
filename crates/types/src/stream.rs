//! Raw and decoded stream files

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strand_hash::{DigestAlgorithm, Hash};

use crate::{NodeId, StreamFilename};

/// Raw artifact bytes as returned by a provider
///
/// Produced once by a provider and consumed once by a reader.
#[derive(Debug, Clone)]
pub struct StreamFileData {
    pub filename: StreamFilename,
    pub bytes: Bytes,
    pub retrieved_at: DateTime<Utc>,
    pub node: NodeId,
    /// Name of the source that served the bytes
    pub source: String,
}

impl StreamFileData {
    #[must_use]
    pub fn new(
        filename: StreamFilename,
        bytes: impl Into<Bytes>,
        node: NodeId,
        source: impl Into<String>,
    ) -> Self {
        Self {
            filename,
            bytes: bytes.into(),
            retrieved_at: Utc::now(),
            node,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Services API version that produced a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HapiVersion {
    pub major: i32,
    pub minor: i32,
    pub patch: i32,
}

impl std::fmt::Display for HapiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// One transaction and its record, kept opaque apart from the timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem {
    pub transaction: Bytes,
    pub record: Bytes,
    /// Consensus timestamp in nanoseconds, when the record carries one
    pub consensus_timestamp: Option<i64>,
}

/// Sidecar reference listed inside a data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarMetadata {
    pub id: u8,
    pub hash: Hash,
}

/// Downloaded sidecar bytes verified against their metadata hash
#[derive(Debug, Clone)]
pub struct SidecarFile {
    pub filename: StreamFilename,
    pub hash: Hash,
    pub bytes: Bytes,
}

/// A decoded stream file
///
/// Built by a reader. The downloader only fills in `index` (when the format
/// does not carry one), `node` and `sidecars` before committing it.
#[derive(Debug, Clone)]
pub struct StreamFile {
    pub filename: StreamFilename,
    pub version: i32,
    pub hapi_version: Option<HapiVersion>,
    /// Block or record index within the stream
    pub index: Option<i64>,
    pub consensus_start: i64,
    pub consensus_end: i64,
    /// Hash the next file must carry as its previous hash
    pub hash: Hash,
    pub previous_hash: Hash,
    /// Hash of the file as signed by the nodes
    pub file_hash: Hash,
    pub metadata_hash: Option<Hash>,
    pub digest_algorithm: DigestAlgorithm,
    pub items: Vec<StreamItem>,
    pub sidecar_metadata: Vec<SidecarMetadata>,
    pub sidecars: Vec<SidecarFile>,
    pub size: usize,
    pub node: Option<NodeId>,
}

impl StreamFile {
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Serializable digest of this file for logs and CLI output
    #[must_use]
    pub fn summary(&self) -> StreamFileSummary {
        StreamFileSummary {
            filename: self.filename.clone(),
            version: self.version,
            hapi_version: self.hapi_version.map(|v| v.to_string()),
            index: self.index,
            consensus_start: self.consensus_start,
            consensus_end: self.consensus_end,
            hash: self.hash.clone(),
            previous_hash: self.previous_hash.clone(),
            file_hash: self.file_hash.clone(),
            metadata_hash: self.metadata_hash.clone(),
            digest_algorithm: self.digest_algorithm,
            item_count: self.items.len(),
            sidecar_count: self.sidecars.len(),
            size: self.size,
            node: self.node,
        }
    }
}

/// JSON-friendly view of a [`StreamFile`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFileSummary {
    pub filename: StreamFilename,
    pub version: i32,
    pub hapi_version: Option<String>,
    pub index: Option<i64>,
    pub consensus_start: i64,
    pub consensus_end: i64,
    pub hash: Hash,
    pub previous_hash: Hash,
    pub file_hash: Hash,
    pub metadata_hash: Option<Hash>,
    pub digest_algorithm: DigestAlgorithm,
    pub item_count: usize,
    pub sidecar_count: usize,
    pub size: usize,
    pub node: Option<NodeId>,
}
