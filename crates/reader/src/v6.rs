//! Version 6: protobuf `RecordStreamFile` after a version prefix

use strand_errors::ParseError;
use strand_hash::{DigestAlgorithm, Hash, HashBuilder, RunningHash};
use strand_proto::legacy::ByteReader;
use strand_proto::{HashObject, Message, RecordStreamFile};
use strand_types::{HapiVersion, SidecarMetadata, StreamFile, StreamFilename};

use crate::items::{consensus_bounds, expect_hash, stream_item};
use crate::{StreamContent, StreamFileReader};

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFileReaderV6;

impl StreamFileReader for RecordFileReaderV6 {
    fn version(&self) -> i32 {
        6
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
        let file = RecordStreamFile::decode(&content.bytes[reader.position()..])
            .map_err(|e| reader.malformed(format!("invalid record stream file: {e}")))?;

        let hapi = file.hapi_proto_version.clone().unwrap_or_default();
        let hapi_version = HapiVersion {
            major: hapi.major,
            minor: hapi.minor,
            patch: hapi.patch,
        };
        let start = required_hash(file.start_object_running_hash.as_ref(), name, "start")?;
        let end = required_hash(file.end_object_running_hash.as_ref(), name, "end")?;

        let mut running = RunningHash::new(start.clone());
        let mut items = Vec::with_capacity(file.record_stream_items.len());
        for item in &file.record_stream_items {
            running.add(&item.encode_to_vec());
            items.push(stream_item(&item.transaction, &item.record));
        }
        expect_hash(content.filename, "end running", &end, running.current())?;

        let mut metadata = HashBuilder::new();
        metadata
            .update_i32(version)
            .update_i32(hapi_version.major)
            .update_i32(hapi_version.minor)
            .update_i32(hapi_version.patch)
            .update(start.as_bytes())
            .update(end.as_bytes())
            .update_i64(file.block_number);

        let sidecar_metadata = sidecars(&file, content.filename)?;
        let (consensus_start, consensus_end) = consensus_bounds(content.filename, &items);

        Ok(StreamFile {
            filename: content.filename.clone(),
            version,
            hapi_version: Some(hapi_version),
            index: Some(file.block_number),
            consensus_start,
            consensus_end,
            hash: end,
            previous_hash: start,
            file_hash: Hash::from_data(content.stored),
            metadata_hash: Some(metadata.finish()),
            digest_algorithm: DigestAlgorithm::Sha384,
            items,
            sidecar_metadata,
            sidecars: Vec::new(),
            size: content.stored.len(),
            node: None,
        })
    }
}

fn required_hash(
    object: Option<&HashObject>,
    filename: &str,
    which: &str,
) -> Result<Hash, ParseError> {
    object
        .ok_or_else(|| ParseError::malformed(filename, format!("missing {which} running hash")))?
        .to_hash(filename)
}

fn sidecars(
    file: &RecordStreamFile,
    filename: &StreamFilename,
) -> Result<Vec<SidecarMetadata>, ParseError> {
    file.sidecars
        .iter()
        .map(|sidecar| {
            let id = u8::try_from(sidecar.id).map_err(|_| {
                ParseError::malformed(
                    filename.as_str(),
                    format!("sidecar id {} out of range", sidecar.id),
                )
            })?;
            let hash = sidecar
                .hash
                .as_ref()
                .ok_or_else(|| {
                    ParseError::malformed(filename.as_str(), format!("sidecar {id} has no hash"))
                })?
                .to_hash(filename.as_str())?;
            Ok(SidecarMetadata { id, hash })
        })
        .collect()
}
