//! Version dispatch

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use flate2::read::GzDecoder;
use strand_errors::ParseError;
use strand_hash::Hash;
use strand_types::{StreamFile, StreamFileData};
use tracing::debug;

use crate::{
    RecordFileReaderV2, RecordFileReaderV5, RecordFileReaderV6, StreamContent, StreamFileReader,
};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Dispatches to the reader registered for a file's version number
#[derive(Clone)]
pub struct CompositeReader {
    readers: BTreeMap<i32, Arc<dyn StreamFileReader>>,
}

impl CompositeReader {
    /// A composite with no readers registered
    #[must_use]
    pub fn empty() -> Self {
        Self {
            readers: BTreeMap::new(),
        }
    }

    /// Register a reader, replacing any reader for the same version
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn StreamFileReader>) -> Self {
        self.readers.insert(reader.version(), reader);
        self
    }

    /// Versions this composite can decode
    #[must_use]
    pub fn versions(&self) -> Vec<i32> {
        self.readers.keys().copied().collect()
    }

    /// Decode a raw file
    ///
    /// # Errors
    ///
    /// Returns `UnknownVersion` when no reader owns the file's version,
    /// `Decompression` for corrupt gzip content and whatever the selected
    /// reader reports otherwise.
    pub fn parse(&self, data: &StreamFileData) -> Result<StreamFile, ParseError> {
        let name = data.filename.as_str();
        let bytes = inflate(data)?;
        let version = version_of(&bytes).ok_or_else(|| ParseError::Truncated {
            filename: name.to_string(),
            needed: 4,
            remaining: bytes.len(),
        })?;
        let reader = self
            .readers
            .get(&version)
            .ok_or_else(|| ParseError::UnknownVersion {
                filename: name.to_string(),
                version,
            })?;
        debug!(filename = name, version, size = data.bytes.len(), "decoding stream file");

        let mut file = reader.parse(StreamContent {
            filename: &data.filename,
            stored: &data.bytes,
            bytes: &bytes,
        })?;
        file.node = Some(data.node);
        Ok(file)
    }

    /// The file hash a node would have signed for these bytes
    ///
    /// Uses the hashing rule of the version found in the header and does not
    /// require the rest of the file to decode. Content whose version cannot
    /// be determined is hashed as stored.
    #[must_use]
    pub fn signed_hash(&self, data: &StreamFileData) -> Hash {
        let Ok(bytes) = inflate(data) else {
            return Hash::from_data(&data.bytes);
        };
        match version_of(&bytes).and_then(|version| self.readers.get(&version)) {
            Some(reader) => reader.stored_hash(StreamContent {
                filename: &data.filename,
                stored: &data.bytes,
                bytes: &bytes,
            }),
            None => Hash::from_data(&data.bytes),
        }
    }
}

impl Default for CompositeReader {
    /// Readers for versions 2, 5 and 6
    fn default() -> Self {
        Self::empty()
            .with_reader(Arc::new(RecordFileReaderV2))
            .with_reader(Arc::new(RecordFileReaderV5))
            .with_reader(Arc::new(RecordFileReaderV6))
    }
}

impl std::fmt::Debug for CompositeReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeReader")
            .field("versions", &self.versions())
            .finish()
    }
}

fn inflate(data: &StreamFileData) -> Result<Cow<'_, [u8]>, ParseError> {
    if data.filename.is_compressed() || data.bytes.starts_with(&GZIP_MAGIC) {
        gunzip(&data.bytes, data.filename.as_str()).map(Cow::Owned)
    } else {
        Ok(Cow::Borrowed(&data.bytes[..]))
    }
}

/// Big-endian version number at offset zero
fn version_of(bytes: &[u8]) -> Option<i32> {
    bytes
        .get(..4)
        .and_then(|b| <[u8; 4]>::try_from(b).ok())
        .map(i32::from_be_bytes)
}

fn gunzip(bytes: &[u8], filename: &str) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| ParseError::Decompression {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;
    Ok(out)
}
