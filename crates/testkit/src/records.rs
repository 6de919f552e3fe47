//! Chained record files in every supported revision

use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use strand_hash::{Hash, HashBuilder, RunningHash};
use strand_proto::legacy::{
    ByteWriter, CLASS_VERSION, OBJECT_STREAM_VERSION, RECORD_STREAM_OBJECT_CLASS_ID,
    TYPE_PREV_HASH, TYPE_RECORD,
};
use strand_proto::{
    HashObject, Message, RecordStreamFile, RecordStreamItem, SemanticVersion, SidecarMetadata,
    Timestamp, TransactionRecordTimestamp,
};
use strand_types::{FileKind, NodeId, StreamFileData, StreamFilename};

/// 2022-06-21T09:15:38.325469003Z
pub const BASE_TIMESTAMP: i64 = 1_655_802_938_325_469_003;
/// Two seconds between consecutive fixture files
pub const FILE_INTERVAL: i64 = 2_000_000_000;

const HAPI: (i32, i32, i32) = (0, 30, 0);
const ITEM_SPACING: i64 = 1_000;

/// A generated record file together with the values a reader must derive
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub filename: StreamFilename,
    pub version: i32,
    /// Bytes as stored in a bucket
    pub bytes: Bytes,
    pub file_hash: Hash,
    pub metadata_hash: Option<Hash>,
    /// Hash the next file in the chain links to
    pub hash: Hash,
    pub previous_hash: Hash,
    pub index: Option<i64>,
    pub item_count: usize,
    /// Sidecar filenames and their stored bytes
    pub sidecars: Vec<(StreamFilename, Bytes)>,
}

impl FixtureFile {
    #[must_use]
    pub fn signature_filename(&self) -> StreamFilename {
        self.filename.signature_filename()
    }

    /// Raw data as a provider would return it for `node`
    #[must_use]
    pub fn data(&self, node: u64) -> StreamFileData {
        StreamFileData::new(self.filename.clone(), self.bytes.clone(), NodeId(node), "fixture")
    }

    /// A copy whose stored bytes differ from what the nodes signed
    #[must_use]
    pub fn corrupted(&self) -> Self {
        let mut bytes = self.bytes.to_vec();
        if let Some(last) = bytes.last_mut() {
            *last ^= 0xff;
        }
        Self {
            bytes: bytes.into(),
            ..self.clone()
        }
    }
}

/// Serialized record carrying only a consensus timestamp
#[must_use]
pub fn record_bytes(consensus_timestamp: i64) -> Vec<u8> {
    TransactionRecordTimestamp {
        consensus_timestamp: Some(Timestamp::from_nanos(consensus_timestamp)),
    }
    .encode_to_vec()
}

fn transaction_bytes(consensus_timestamp: i64) -> Vec<u8> {
    format!("transaction@{consensus_timestamp}").into_bytes()
}

fn items(timestamp: i64, count: usize) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> {
    (0i64..)
        .take(count)
        .map(move |i| timestamp + i * ITEM_SPACING)
        .map(|ts| (transaction_bytes(ts), record_bytes(ts)))
}

/// # Panics
///
/// Panics if gzip encoding into memory fails.
#[must_use]
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("in-memory gzip");
    encoder.finish().expect("in-memory gzip")
}

/// Legacy fixed-layout file linking to `previous`
#[must_use]
pub fn record_file_v2(timestamp: i64, previous: &Hash, count: usize) -> FixtureFile {
    let mut header = ByteWriter::new();
    header
        .put_i32(2)
        .put_i32(HAPI.1)
        .put_u8(TYPE_PREV_HASH)
        .put_slice(previous.as_bytes());
    let mut body = ByteWriter::new();
    for (transaction, record) in items(timestamp, count) {
        body.put_u8(TYPE_RECORD)
            .put_length_prefixed(&transaction)
            .put_length_prefixed(&record);
    }

    let mut builder = HashBuilder::new();
    builder
        .update(header.as_slice())
        .update(Hash::from_data(body.as_slice()).as_bytes());
    let file_hash = builder.finish();
    let mut bytes = header.as_slice().to_vec();
    bytes.extend_from_slice(body.as_slice());

    FixtureFile {
        filename: StreamFilename::from_timestamp(timestamp, FileKind::Data, false),
        version: 2,
        bytes: bytes.into(),
        file_hash: file_hash.clone(),
        metadata_hash: None,
        hash: file_hash,
        previous_hash: previous.clone(),
        index: None,
        item_count: count,
        sidecars: Vec::new(),
    }
}

/// Object-stream file whose running hash starts at `start`
#[must_use]
pub fn record_file_v5(timestamp: i64, start: &Hash, count: usize) -> FixtureFile {
    let mut writer = ByteWriter::new();
    writer
        .put_i32(5)
        .put_i32(HAPI.0)
        .put_i32(HAPI.1)
        .put_i32(HAPI.2)
        .put_i32(OBJECT_STREAM_VERSION);
    let mut start_object = ByteWriter::new();
    start_object.put_hash_object(start);
    writer.put_slice(start_object.as_slice());

    let mut running = RunningHash::new(start.clone());
    for (transaction, record) in items(timestamp, count) {
        let mut object = ByteWriter::new();
        object
            .put_i64(RECORD_STREAM_OBJECT_CLASS_ID)
            .put_i32(CLASS_VERSION)
            .put_length_prefixed(&record)
            .put_length_prefixed(&transaction);
        running.add(object.as_slice());
        writer.put_slice(object.as_slice());
    }
    let end = running.into_hash();
    let mut end_object = ByteWriter::new();
    end_object.put_hash_object(&end);
    writer.put_slice(end_object.as_slice());

    let mut metadata = HashBuilder::new();
    metadata
        .update(&writer.as_slice()[..16])
        .update(start_object.as_slice())
        .update(end_object.as_slice());
    let bytes = writer.into_bytes();

    FixtureFile {
        filename: StreamFilename::from_timestamp(timestamp, FileKind::Data, false),
        version: 5,
        file_hash: Hash::from_data(&bytes),
        bytes,
        metadata_hash: Some(metadata.finish()),
        hash: end,
        previous_hash: start.clone(),
        index: None,
        item_count: count,
        sidecars: Vec::new(),
    }
}

/// Gzip-compressed protobuf file for `block` with `sidecar_count` sidecars
#[must_use]
pub fn record_file_v6(
    timestamp: i64,
    start: &Hash,
    count: usize,
    block: i64,
    sidecar_count: u8,
) -> FixtureFile {
    let filename = StreamFilename::from_timestamp(timestamp, FileKind::Data, true);
    let sidecars: Vec<(StreamFilename, Bytes)> = (1..=sidecar_count)
        .map(|id| {
            let content = format!("sidecar {id} of block {block}");
            (
                filename.sidecar_filename(id),
                Bytes::from(gzip(content.as_bytes())),
            )
        })
        .collect();

    let stream_items: Vec<RecordStreamItem> = items(timestamp, count)
        .map(|(transaction, record)| RecordStreamItem {
            transaction,
            record,
        })
        .collect();
    let mut running = RunningHash::new(start.clone());
    for item in &stream_items {
        running.add(&item.encode_to_vec());
    }
    let end = running.into_hash();

    let message = RecordStreamFile {
        hapi_proto_version: Some(SemanticVersion {
            major: HAPI.0,
            minor: HAPI.1,
            patch: HAPI.2,
        }),
        start_object_running_hash: Some(HashObject::from_hash(start)),
        record_stream_items: stream_items,
        end_object_running_hash: Some(HashObject::from_hash(&end)),
        block_number: block,
        sidecars: sidecars
            .iter()
            .zip(1..)
            .map(|((_, bytes), id)| SidecarMetadata {
                hash: Some(HashObject::from_hash(&Hash::from_data(bytes))),
                id,
            })
            .collect(),
    };
    let mut raw = 6i32.to_be_bytes().to_vec();
    raw.extend(message.encode_to_vec());
    let stored = Bytes::from(gzip(&raw));

    let mut metadata = HashBuilder::new();
    metadata
        .update_i32(6)
        .update_i32(HAPI.0)
        .update_i32(HAPI.1)
        .update_i32(HAPI.2)
        .update(start.as_bytes())
        .update(end.as_bytes())
        .update_i64(block);

    FixtureFile {
        filename,
        version: 6,
        file_hash: Hash::from_data(&stored),
        bytes: stored,
        metadata_hash: Some(metadata.finish()),
        hash: end,
        previous_hash: start.clone(),
        index: Some(block),
        item_count: count,
        sidecars,
    }
}

/// `count` linked files of one version starting from the zero hash
///
/// # Panics
///
/// Panics for versions other than 2, 5 and 6.
#[must_use]
pub fn chain(version: i32, count: usize) -> Vec<FixtureFile> {
    let mut files: Vec<FixtureFile> = Vec::with_capacity(count);
    for block in (0i64..).take(count) {
        let timestamp = BASE_TIMESTAMP + block * FILE_INTERVAL;
        let previous = files.last().map_or(Hash::ZERO, |f| f.hash.clone());
        let file = match version {
            2 => record_file_v2(timestamp, &previous, 3),
            5 => record_file_v5(timestamp, &previous, 3),
            6 => record_file_v6(timestamp, &previous, 3, block, 0),
            other => panic!("no fixture writer for version {other}"),
        };
        files.push(file);
    }
    files
}
