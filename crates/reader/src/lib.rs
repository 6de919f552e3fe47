#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Record stream file decoding
//!
//! Each file revision has its own [`StreamFileReader`]. The
//! [`CompositeReader`] inflates compressed files, reads the big-endian
//! version number at offset zero and hands the content to the reader
//! registered for that version.

mod composite;
mod items;
mod v2;
mod v5;
mod v6;

pub use composite::CompositeReader;
pub use v2::RecordFileReaderV2;
pub use v5::RecordFileReaderV5;
pub use v6::RecordFileReaderV6;

use strand_errors::ParseError;
use strand_hash::Hash;
use strand_types::{StreamFile, StreamFilename};

/// A stored file ready for decoding
#[derive(Debug, Clone, Copy)]
pub struct StreamContent<'a> {
    pub filename: &'a StreamFilename,
    /// Bytes exactly as served by the provider
    pub stored: &'a [u8],
    /// Inflated bytes, identical to `stored` for uncompressed files
    pub bytes: &'a [u8],
}

/// Decoder for one record file revision
pub trait StreamFileReader: Send + Sync {
    /// Version number this reader owns
    fn version(&self) -> i32;

    /// Decode and validate a file of this reader's version
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] for malformed content or a hash that does
    /// not validate.
    fn parse(&self, content: StreamContent<'_>) -> Result<StreamFile, ParseError>;

    /// The file hash nodes sign for this content, computed without decoding
    /// past the fixed header
    ///
    /// Lets a caller tell signed-but-undecodable content apart from a copy
    /// that was tampered with.
    fn stored_hash(&self, content: StreamContent<'_>) -> Hash {
        Hash::from_data(content.stored)
    }
}
