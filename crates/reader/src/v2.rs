//! Version 2: fixed header followed by marker-prefixed records

use strand_errors::ParseError;
use strand_hash::{DigestAlgorithm, Hash, HashBuilder};
use strand_proto::legacy::{ByteReader, TYPE_PREV_HASH, TYPE_RECORD};
use strand_types::{HapiVersion, StreamFile};

use crate::items::{consensus_bounds, stream_item};
use crate::{StreamContent, StreamFileReader};

/// `i32 version`, `i32 hapi version`, previous-hash marker and hash
const HEADER_LEN: usize = 4 + 4 + 1 + 48;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFileReaderV2;

/// `SHA384(header || SHA384(body))`; callers ensure the header is present
fn header_body_hash(bytes: &[u8]) -> Hash {
    let (header, body) = bytes.split_at(HEADER_LEN);
    let mut builder = HashBuilder::new();
    builder.update(header).update(Hash::from_data(body).as_bytes());
    builder.finish()
}

impl StreamFileReader for RecordFileReaderV2 {
    fn version(&self) -> i32 {
        2
    }

    fn stored_hash(&self, content: StreamContent<'_>) -> Hash {
        if content.bytes.len() < HEADER_LEN {
            return Hash::from_data(content.stored);
        }
        header_body_hash(content.bytes)
    }

    fn parse(&self, content: StreamContent<'_>) -> Result<StreamFile, ParseError> {
        let name = content.filename.as_str();
        let mut reader = ByteReader::new(content.bytes, name);
        let version = reader.read_i32()?;
        if version != self.version() {
            return Err(ParseError::UnknownVersion {
                filename: name.to_string(),
                version,
            });
        }
        let hapi = reader.read_i32()?;
        reader.expect_u8(TYPE_PREV_HASH, "previous hash")?;
        let previous_hash = reader.read_hash()?;

        let mut items = Vec::new();
        while !reader.is_empty() {
            reader.expect_u8(TYPE_RECORD, "record")?;
            let transaction = reader.read_length_prefixed()?;
            let record = reader.read_length_prefixed()?;
            items.push(stream_item(transaction, record));
        }

        let file_hash = header_body_hash(content.bytes);
        let (consensus_start, consensus_end) = consensus_bounds(content.filename, &items);

        Ok(StreamFile {
            filename: content.filename.clone(),
            version,
            hapi_version: Some(HapiVersion {
                major: hapi,
                minor: 0,
                patch: 0,
            }),
            index: None,
            consensus_start,
            consensus_end,
            hash: file_hash.clone(),
            previous_hash,
            file_hash,
            metadata_hash: None,
            digest_algorithm: DigestAlgorithm::Sha384,
            items,
            sidecar_metadata: Vec::new(),
            sidecars: Vec::new(),
            size: content.stored.len(),
            node: None,
        })
    }
}
