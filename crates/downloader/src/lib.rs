#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Stream download orchestration for strand
//!
//! A [`Downloader`] lists signature files on every node, merges the listings
//! into the next batch of logical files, collects a stake-weighted quorum of
//! signatures for each, downloads content that hashes to the signed value,
//! checks the previous-hash link and hands the file to a
//! [`StreamFileSink`]. The [`StreamPointer`](strand_types::StreamPointer)
//! only advances after the sink accepted the file.

mod discover;
mod downloader;
mod pointer;
mod report;
mod sink;
mod verify;

pub use downloader::Downloader;
pub use pointer::{InMemoryPointerStore, JsonFilePointerStore, PointerStore};
pub use report::{CycleReport, StopReason};
pub use sink::{MemorySink, StreamFileSink};
