//! Helpers shared by the record file readers

use bytes::Bytes;
use strand_errors::ParseError;
use strand_hash::Hash;
use strand_proto::{Message, TransactionRecordTimestamp};
use strand_types::{StreamFilename, StreamItem};

/// Consensus timestamp carried by a serialized transaction record
pub(crate) fn consensus_timestamp(record: &[u8]) -> Option<i64> {
    TransactionRecordTimestamp::decode(record)
        .ok()?
        .consensus_timestamp
        .map(|ts| ts.to_nanos())
}

pub(crate) fn stream_item(transaction: &[u8], record: &[u8]) -> StreamItem {
    StreamItem {
        transaction: Bytes::copy_from_slice(transaction),
        record: Bytes::copy_from_slice(record),
        consensus_timestamp: consensus_timestamp(record),
    }
}

/// First and last item timestamps, falling back to the filename instant
pub(crate) fn consensus_bounds(filename: &StreamFilename, items: &[StreamItem]) -> (i64, i64) {
    let start = items
        .first()
        .and_then(|item| item.consensus_timestamp)
        .unwrap_or_else(|| filename.timestamp());
    let end = items
        .last()
        .and_then(|item| item.consensus_timestamp)
        .unwrap_or(start);
    (start, end)
}

pub(crate) fn expect_hash(
    filename: &StreamFilename,
    what: &str,
    expected: &Hash,
    actual: &Hash,
) -> Result<(), ParseError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ParseError::HashMismatch {
            filename: filename.to_string(),
            what: what.to_string(),
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        })
    }
}
