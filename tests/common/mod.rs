//! Shared environment for end-to-end download tests
//!
//! Builds a bucket laid out like a real record stream deployment, a TOML
//! configuration pointing at it and helpers to inspect what was emitted.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use strand_config::Config;
use strand_downloader::{Downloader, JsonFilePointerStore, MemorySink};
use strand_events::{AppEvent, EventReceiver, EventSender};
use strand_provider::{PathResolver, StorageLayout};
use strand_testkit::{address_book, signature_file, FixtureFile, TempBucket};
use strand_types::{ConsensusNode, PathType, StreamFilename};
use tempfile::TempDir;

pub struct TestEnvironment {
    pub bucket: TempBucket,
    pub state_dir: TempDir,
    pub nodes: Vec<ConsensusNode>,
    pub sink: Arc<MemorySink>,
    pub event_sender: EventSender,
    pub event_receiver: EventReceiver,
}

impl TestEnvironment {
    pub fn new(stakes: &[u64]) -> Self {
        let (event_sender, event_receiver) = strand_events::channel();
        Self {
            bucket: TempBucket::new(),
            state_dir: TempDir::new().expect("state dir"),
            nodes: address_book(stakes),
            sink: Arc::new(MemorySink::new()),
            event_sender,
            event_receiver,
        }
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.state_dir.path().join("pointer.json")
    }

    /// Configuration as an operator would write it, with `extra` appended
    pub fn config_toml(&self, extra: &str) -> String {
        let mut toml = format!(
            r#"
[downloader]
stream = "record"
network = "mainnet"
batch_size = 10
signature_timeout_secs = 5
cycle_timeout_secs = 30
quorum = "1/3"

[pointer]
path = "{pointer}"

[[sources]]
name = "bucket"
kind = "local"
uri = "{bucket}"
"#,
            pointer = self.pointer_path().display(),
            bucket = self.bucket.root().display(),
        );
        for node in &self.nodes {
            toml.push_str(&format!(
                "\n[[nodes]]\nnode_id = {}\npublic_key = \"{}\"\nstake = {}\n",
                node.node_id, node.public_key, node.stake
            ));
        }
        toml.push_str(extra);
        toml
    }

    pub fn config(&self, extra: &str) -> Config {
        let config = Config::from_toml(&self.config_toml(extra)).expect("valid config");
        config.validate().expect("config validates");
        config
    }

    pub fn key(&self, node: &ConsensusNode, path_type: PathType, filename: &StreamFilename) -> String {
        StorageLayout::default().key(node, path_type, filename)
    }

    /// Publish data and a signature on every node under `path_type`
    pub fn publish(&self, files: &[FixtureFile], path_type: PathType) {
        for file in files {
            let version = match file.version {
                2 => 4,
                5 => 5,
                _ => 6,
            };
            for node in &self.nodes {
                self.bucket
                    .put(&self.key(node, path_type, &file.filename), &file.bytes);
                self.bucket.put(
                    &self.key(node, path_type, &file.signature_filename()),
                    signature_file(version, node.node_id.0, file),
                );
            }
        }
    }

    /// Downloader wired exactly as the binary wires it
    pub fn downloader(&self, config: &Config) -> Downloader {
        let resolver = Arc::new(
            PathResolver::from_config(&config.path).with_events(self.event_sender.clone()),
        );
        let provider = strand_provider::from_config(config, resolver, Some(self.event_sender.clone()))
            .expect("provider from config");
        let pointer_path = config.pointer.path.clone().expect("pointer path configured");
        Downloader::new(
            config,
            Arc::new(provider),
            Arc::new(JsonFilePointerStore::new(pointer_path)),
            self.sink.clone(),
        )
        .expect("downloader")
        .with_events(self.event_sender.clone())
    }

    pub fn committed(&self) -> Vec<StreamFilename> {
        self.sink.files().into_iter().map(|f| f.filename).collect()
    }

    pub fn drain_events(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn filenames(files: &[FixtureFile]) -> Vec<StreamFilename> {
    files.iter().map(|f| f.filename.clone()).collect()
}
