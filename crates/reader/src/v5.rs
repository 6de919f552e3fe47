//! Version 5: object stream framed by start and end running hashes

use strand_errors::ParseError;
use strand_hash::{DigestAlgorithm, Hash, HashBuilder, RunningHash};
use strand_proto::legacy::{ByteReader, OBJECT_STREAM_VERSION, RECORD_STREAM_OBJECT_CLASS_ID};
use strand_types::{HapiVersion, StreamFile};

use crate::items::{consensus_bounds, expect_hash, stream_item};
use crate::{StreamContent, StreamFileReader};

/// Version and the three HAPI version components
const VERSION_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFileReaderV5;

impl StreamFileReader for RecordFileReaderV5 {
    fn version(&self) -> i32 {
        5
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
        let hapi_version = HapiVersion {
            major: reader.read_i32()?,
            minor: reader.read_i32()?,
            patch: reader.read_i32()?,
        };
        let stream_version = reader.read_i32()?;
        if stream_version != OBJECT_STREAM_VERSION {
            return Err(reader.malformed(format!(
                "unsupported object stream version {stream_version}"
            )));
        }

        let start_pos = reader.position();
        let start = reader.read_hash_object()?;
        let start_object = reader.consumed(start_pos);

        let mut running = RunningHash::new(start.clone());
        let mut items = Vec::new();
        while reader.peek_i64() == Some(RECORD_STREAM_OBJECT_CLASS_ID) {
            let item_pos = reader.position();
            reader.expect_class(RECORD_STREAM_OBJECT_CLASS_ID, "record stream object")?;
            let record = reader.read_length_prefixed()?;
            let transaction = reader.read_length_prefixed()?;
            running.add(reader.consumed(item_pos));
            items.push(stream_item(transaction, record));
        }

        let end_pos = reader.position();
        let end = reader.read_hash_object()?;
        let end_object = reader.consumed(end_pos);
        if !reader.is_empty() {
            return Err(reader.malformed("trailing bytes after end running hash"));
        }
        expect_hash(content.filename, "end running", &end, running.current())?;

        let mut metadata = HashBuilder::new();
        metadata
            .update(&content.bytes[..VERSION_HEADER_LEN])
            .update(start_object)
            .update(end_object);
        let (consensus_start, consensus_end) = consensus_bounds(content.filename, &items);

        Ok(StreamFile {
            filename: content.filename.clone(),
            version,
            hapi_version: Some(hapi_version),
            index: None,
            consensus_start,
            consensus_end,
            hash: end,
            previous_hash: start,
            file_hash: Hash::from_data(content.stored),
            metadata_hash: Some(metadata.finish()),
            digest_algorithm: DigestAlgorithm::Sha384,
            items,
            sidecar_metadata: Vec::new(),
            sidecars: Vec::new(),
            size: content.stored.len(),
            node: None,
        })
    }
}
