#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Stream file acquisition for strand
//!
//! Object stores hold each node's folder of data, signature and sidecar
//! files. A [`StorageStreamFileProvider`] maps nodes onto keys in one store,
//! following the layout a [`PathResolver`] has observed for the node, and a
//! [`CompositeStreamFileProvider`] fails over across several of them.

mod composite;
mod http;
mod layout;
mod local;
mod resolver;
mod retry;
mod storage;
mod store;

pub use composite::CompositeStreamFileProvider;
pub use http::{HttpObjectStore, HttpStoreConfig};
pub use layout::{StorageLayout, SIDECAR_FOLDER};
pub use local::LocalStore;
pub use resolver::{PathObservation, PathResolver};
pub use retry::{calculate_backoff_delay, RetryConfig};
pub use storage::StorageStreamFileProvider;
pub use store::{ObjectStore, StoreError};

use async_trait::async_trait;
use std::sync::Arc;
use strand_config::{Config, SourceConfig, SourceKind};
use strand_errors::{Error, ProviderError};
use strand_events::EventSender;
use strand_types::{ConsensusNode, StreamFileData, StreamFilename};

/// Fetches and lists one node's stream artifacts
#[async_trait]
pub trait StreamFileProvider: Send + Sync {
    /// Label used in logs, events and errors
    fn name(&self) -> &str;

    /// Fetch `filename` from `node`'s folder
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the node does not have the file, `Transient`
    /// for failures worth retrying elsewhere and `Permanent` for rejected
    /// requests.
    async fn get(
        &self,
        node: &ConsensusNode,
        filename: &StreamFilename,
    ) -> Result<StreamFileData, ProviderError>;

    /// Filenames of the same kind as `after`, strictly greater than it, in
    /// ascending order and at most `limit` of them
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be obtained.
    async fn list(
        &self,
        node: &ConsensusNode,
        after: &StreamFilename,
        limit: usize,
    ) -> Result<Vec<StreamFilename>, ProviderError>;
}

/// Build the object store a source entry describes
///
/// # Errors
///
/// Returns an error if an HTTP source has an invalid URL or its client
/// cannot be created.
pub fn object_store(source: &SourceConfig) -> Result<Arc<dyn ObjectStore>, Error> {
    Ok(match source.kind {
        SourceKind::Local => Arc::new(LocalStore::new(&source.name, &source.uri)),
        SourceKind::Http => {
            let config = HttpStoreConfig {
                timeout: source.timeout(),
                bearer_token: source.bearer_token.clone(),
                retry: RetryConfig::default().with_max_retries(source.max_retries),
                ..HttpStoreConfig::default()
            };
            Arc::new(HttpObjectStore::new(&source.name, &source.uri, config)?)
        }
    })
}

/// Assemble the failover provider for every configured source, sharing one
/// path resolver
///
/// # Errors
///
/// Returns an error if no sources are configured or a source cannot be
/// built.
pub fn from_config(
    config: &Config,
    resolver: Arc<PathResolver>,
    events: Option<EventSender>,
) -> Result<CompositeStreamFileProvider, Error> {
    let layout = StorageLayout::from_config(config);
    let sources = config
        .sources
        .iter()
        .map(|source| {
            let store = object_store(source)?;
            let provider = StorageStreamFileProvider::new(store, layout.clone(), resolver.clone())
                .with_events(events.clone());
            Ok((
                Arc::new(provider) as Arc<dyn StreamFileProvider>,
                source.backoff(),
            ))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    Ok(CompositeStreamFileProvider::new(sources)?.with_events(events))
}
