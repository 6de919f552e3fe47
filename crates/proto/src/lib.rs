#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Wire formats of record stream and signature files
//!
//! The oldest revisions use a fixed big-endian layout handled by
//! [`legacy`]; later revisions are protobuf messages declared in
//! [`messages`].

pub mod legacy;
pub mod messages;

pub use legacy::{ByteReader, ByteWriter};
pub use messages::{
    HashAlgorithm, HashObject, RecordStreamFile, RecordStreamItem, SemanticVersion,
    SidecarMetadata, SignatureFile, SignatureObject, SignatureType, Timestamp,
    TransactionRecordTimestamp,
};

/// Re-exported so dependents encode and decode with the same prost version
pub use prost::Message;
