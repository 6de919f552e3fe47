#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for strand
//!
//! This crate provides the value types shared by providers, readers, the
//! consensus verifier and the downloader: filenames, nodes, raw and decoded
//! stream files, signatures, storage layouts and the stream pointer.

pub mod filename;
pub mod node;
pub mod path;
pub mod pointer;
pub mod quorum;
pub mod signature;
pub mod stream;

pub use filename::{block_filename, block_number, FileKind, StreamFilename};
pub use node::{ConsensusNode, NodeId};
pub use path::PathType;
pub use pointer::StreamPointer;
pub use quorum::QuorumFraction;
pub use signature::{SignatureAlgorithm, StreamFileSignature};
pub use stream::{
    HapiVersion, SidecarFile, SidecarMetadata, StreamFile, StreamFileData, StreamFileSummary,
    StreamItem,
};
pub use strand_hash::{DigestAlgorithm, Hash};
