//! Protobuf messages of the serialized-message file revisions
//!
//! Only the fields the pipeline reads are declared; unknown fields are
//! skipped by the decoder.

use strand_errors::ParseError;
use strand_hash::{Hash, HASH_LEN};

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SemanticVersion {
    #[prost(int32, tag = "1")]
    pub major: i32,
    #[prost(int32, tag = "2")]
    pub minor: i32,
    #[prost(int32, tag = "3")]
    pub patch: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HashAlgorithm {
    Unknown = 0,
    Sha384 = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HashObject {
    #[prost(enumeration = "HashAlgorithm", tag = "1")]
    pub algorithm: i32,
    #[prost(int32, tag = "2")]
    pub length: i32,
    #[prost(bytes = "vec", tag = "3")]
    pub hash: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordStreamItem {
    #[prost(bytes = "vec", tag = "1")]
    pub transaction: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub record: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SidecarMetadata {
    #[prost(message, optional, tag = "1")]
    pub hash: Option<HashObject>,
    #[prost(int32, tag = "2")]
    pub id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordStreamFile {
    #[prost(message, optional, tag = "1")]
    pub hapi_proto_version: Option<SemanticVersion>,
    #[prost(message, optional, tag = "2")]
    pub start_object_running_hash: Option<HashObject>,
    #[prost(message, repeated, tag = "3")]
    pub record_stream_items: Vec<RecordStreamItem>,
    #[prost(message, optional, tag = "4")]
    pub end_object_running_hash: Option<HashObject>,
    #[prost(int64, tag = "5")]
    pub block_number: i64,
    #[prost(message, repeated, tag = "6")]
    pub sidecars: Vec<SidecarMetadata>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SignatureType {
    Unknown = 0,
    Ed25519 = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureObject {
    #[prost(enumeration = "SignatureType", tag = "1")]
    pub r#type: i32,
    #[prost(int32, tag = "2")]
    pub length: i32,
    #[prost(int32, tag = "3")]
    pub checksum: i32,
    #[prost(bytes = "vec", tag = "4")]
    pub signature: Vec<u8>,
    #[prost(message, optional, tag = "5")]
    pub hash_object: Option<HashObject>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureFile {
    #[prost(message, optional, tag = "1")]
    pub file_signature: Option<SignatureObject>,
    #[prost(message, optional, tag = "2")]
    pub metadata_signature: Option<SignatureObject>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// The slice of a transaction record carrying its consensus timestamp
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TransactionRecordTimestamp {
    #[prost(message, optional, tag = "3")]
    pub consensus_timestamp: Option<Timestamp>,
}

impl Timestamp {
    /// Nanoseconds since the Unix epoch, saturating on overflow
    #[must_use]
    pub fn to_nanos(&self) -> i64 {
        self.seconds
            .saturating_mul(1_000_000_000)
            .saturating_add(i64::from(self.nanos))
    }

    #[must_use]
    pub fn from_nanos(nanos: i64) -> Self {
        // rem_euclid keeps the value below 1e9
        #[allow(clippy::cast_possible_truncation)]
        let sub = nanos.rem_euclid(1_000_000_000) as i32;
        Self {
            seconds: nanos.div_euclid(1_000_000_000),
            nanos: sub,
        }
    }
}

impl HashObject {
    #[must_use]
    pub fn from_hash(hash: &Hash) -> Self {
        Self {
            algorithm: HashAlgorithm::Sha384 as i32,
            length: 48,
            hash: hash.as_bytes().to_vec(),
        }
    }

    /// Convert into a [`Hash`], checking algorithm and length
    ///
    /// # Errors
    ///
    /// Returns `Malformed` naming `filename` if the object is not a SHA-384
    /// digest.
    pub fn to_hash(&self, filename: &str) -> Result<Hash, ParseError> {
        if self.algorithm != HashAlgorithm::Sha384 as i32 {
            return Err(ParseError::malformed(
                filename,
                format!("unsupported hash algorithm {}", self.algorithm),
            ));
        }
        let bytes: [u8; HASH_LEN] = self.hash.as_slice().try_into().map_err(|_| {
            ParseError::malformed(
                filename,
                format!("hash object carries {} bytes", self.hash.len()),
            )
        })?;
        Ok(Hash::from_bytes(bytes))
    }
}
