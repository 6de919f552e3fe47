//! Stream file provider over an object store

use async_trait::async_trait;
use std::sync::Arc;
use strand_errors::ProviderError;
use strand_events::{AcquisitionEvent, EventEmitter, EventSender};
use strand_types::{ConsensusNode, PathType, StreamFileData, StreamFilename};
use tracing::{debug, trace};

use crate::layout::StorageLayout;
use crate::resolver::PathResolver;
use crate::store::ObjectStore;
use crate::StreamFileProvider;

const MAX_PAGE: usize = 1000;

/// Reads node folders out of one bucket, following each node's layout
pub struct StorageStreamFileProvider {
    store: Arc<dyn ObjectStore>,
    layout: StorageLayout,
    resolver: Arc<PathResolver>,
    events: Option<EventSender>,
}

impl StorageStreamFileProvider {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        layout: StorageLayout,
        resolver: Arc<PathResolver>,
    ) -> Self {
        Self {
            store,
            layout,
            resolver,
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    async fn path_type(&self, node: &ConsensusNode) -> PathType {
        self.resolver
            .resolve(node, || async {
                let prefix = self.layout.node_folder(node, PathType::Current);
                match self.store.list_objects(&prefix, None, 1).await {
                    Ok(keys) => !keys.is_empty(),
                    Err(e) => {
                        debug!(node = %node, error = %e, "current layout lookup failed");
                        false
                    }
                }
            })
            .await
    }
}

impl std::fmt::Debug for StorageStreamFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageStreamFileProvider")
            .field("store", &self.store.name())
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamFileProvider for StorageStreamFileProvider {
    fn name(&self) -> &str {
        self.store.name()
    }

    async fn get(
        &self,
        node: &ConsensusNode,
        filename: &StreamFilename,
    ) -> Result<StreamFileData, ProviderError> {
        let path_type = self.path_type(node).await;
        let key = self.layout.key(node, path_type, filename);
        trace!(node = %node, key, source = self.name(), "fetching object");

        let bytes = self.store.get_object(&key).await.map_err(|e| {
            e.into_provider_error(&node.to_string(), filename.as_str(), self.name())
        })?;

        self.events.emit_acquisition(AcquisitionEvent::Downloaded {
            node: node.to_string(),
            filename: filename.to_string(),
            source_name: self.name().to_string(),
            size: bytes.len(),
        });
        Ok(StreamFileData::new(
            filename.clone(),
            bytes,
            node.node_id,
            self.name(),
        ))
    }

    async fn list(
        &self,
        node: &ConsensusNode,
        after: &StreamFilename,
        limit: usize,
    ) -> Result<Vec<StreamFilename>, ProviderError> {
        let path_type = self.path_type(node).await;
        let kind = after.kind();
        let prefix = self.layout.list_prefix(node, path_type, kind);
        let page_size = limit.saturating_mul(2).clamp(1, MAX_PAGE);

        let mut names = Vec::new();
        let mut start_after = format!("{prefix}{after}");
        'pages: while names.len() < limit {
            let page = self
                .store
                .list_objects(&prefix, Some(&start_after), page_size)
                .await
                .map_err(|e| e.into_provider_error(&node.to_string(), &prefix, self.name()))?;
            let exhausted = page.len() < page_size;

            for key in page {
                if let Some(name) = key
                    .strip_prefix(&prefix)
                    .and_then(|name| StreamFilename::parse(name).ok())
                    .filter(|name| name.kind() == kind && name > after)
                {
                    names.push(name);
                    if names.len() == limit {
                        break 'pages;
                    }
                }
                start_after = key;
            }
            if exhausted {
                break;
            }
        }

        // keys sort by text, which matches filename order within one kind
        names.sort();
        self.events.emit_acquisition(AcquisitionEvent::Listed {
            node: node.to_string(),
            after: after.to_string(),
            count: names.len(),
        });
        Ok(names)
    }
}
