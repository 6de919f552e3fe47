//! Fixture builders for strand tests
//!
//! This crate provides:
//! - Deterministic node keys and address books
//! - Chained record files in every supported revision
//! - Signature files signed by those keys
//! - A temporary bucket to lay the artifacts out on disk

pub mod bucket;
pub mod keys;
pub mod records;
pub mod signatures;

pub use bucket::TempBucket;
pub use keys::{address_book, consensus_node, signing_key};
pub use records::{
    chain, gzip, record_bytes, record_file_v2, record_file_v5, record_file_v6, FixtureFile,
    BASE_TIMESTAMP, FILE_INTERVAL,
};
pub use signatures::{signature_file, signature_file_with_key};
