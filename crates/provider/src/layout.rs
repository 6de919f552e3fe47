//! Bucket key layout of node stream folders

use strand_config::{Config, PathConfig};
use strand_types::{ConsensusNode, FileKind, PathType, StreamFilename};

/// Folder holding sidecar files under a node folder
pub const SIDECAR_FOLDER: &str = "sidecar";

/// Maps a node and filename onto an object key
///
/// Legacy: `<streamPath>/<nodePrefix><accountId>/<filename>`.
/// Current: `<network>/0/<nodeId>/<suffix>/<filename>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub network: String,
    pub stream_path: String,
    pub node_prefix: String,
    pub current_suffix: String,
}

impl StorageLayout {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.downloader.network, &config.path)
    }

    #[must_use]
    pub fn new(network: &str, path: &PathConfig) -> Self {
        Self {
            network: network.to_string(),
            stream_path: path.stream_path.clone(),
            node_prefix: path.node_prefix.clone(),
            current_suffix: path.current_suffix.clone(),
        }
    }

    /// Folder of a node's files, with a trailing `/`
    ///
    /// `Auto` is resolved to a concrete layout before keys are built and is
    /// treated as legacy here.
    #[must_use]
    pub fn node_folder(&self, node: &ConsensusNode, path_type: PathType) -> String {
        match path_type {
            PathType::Current => format!(
                "{}/0/{}/{}/",
                self.network, node.node_id, self.current_suffix
            ),
            PathType::Legacy | PathType::Auto => format!(
                "{}/{}{}/",
                self.stream_path,
                self.node_prefix,
                node.account_id()
            ),
        }
    }

    /// Folder to list for artifacts of `kind`
    #[must_use]
    pub fn list_prefix(&self, node: &ConsensusNode, path_type: PathType, kind: FileKind) -> String {
        let folder = self.node_folder(node, path_type);
        match kind {
            FileKind::Sidecar => format!("{folder}{SIDECAR_FOLDER}/"),
            FileKind::Data | FileKind::Signature => folder,
        }
    }

    /// Object key of `filename` in a node's folder
    #[must_use]
    pub fn key(&self, node: &ConsensusNode, path_type: PathType, filename: &StreamFilename) -> String {
        format!(
            "{}{}",
            self.list_prefix(node, path_type, filename.kind()),
            filename.as_str()
        )
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> StreamFilename {
        StreamFilename::parse(s).unwrap()
    }

    #[test]
    fn test_legacy_and_current_keys() {
        let layout = StorageLayout::default();
        let node = ConsensusNode::new(0, "", 1);
        let data = name("2022-06-21T09_15_38.325469003Z.rcd.gz");

        assert_eq!(
            layout.key(&node, PathType::Legacy, &data),
            "recordstreams/record0.0.3/2022-06-21T09_15_38.325469003Z.rcd.gz"
        );
        assert_eq!(
            layout.key(&node, PathType::Current, &data),
            "mainnet/0/0/record/2022-06-21T09_15_38.325469003Z.rcd.gz"
        );
    }

    #[test]
    fn test_sidecars_live_in_sub_folder() {
        let layout = StorageLayout::default();
        let node = ConsensusNode::new(2, "", 1);
        let sidecar = name("2022-06-21T09_15_38.325469003Z_01.rcd.gz");
        assert_eq!(
            layout.key(&node, PathType::Current, &sidecar),
            "mainnet/0/2/record/sidecar/2022-06-21T09_15_38.325469003Z_01.rcd.gz"
        );
    }
}
