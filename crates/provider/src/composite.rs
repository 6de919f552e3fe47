//! Ordered failover across stream file sources

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strand_errors::ProviderError;
use strand_events::{AcquisitionEvent, EventEmitter, EventSender, FailureContext};
use strand_types::{ConsensusNode, StreamFileData, StreamFilename};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::StreamFileProvider;

struct Source {
    provider: Arc<dyn StreamFileProvider>,
    backoff: Duration,
    backoff_until: Mutex<Option<Instant>>,
}

impl Source {
    fn in_backoff(&self, now: Instant) -> bool {
        self.backoff_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|until| now < until)
    }

    fn enter_backoff(&self) {
        if self.backoff.is_zero() {
            return;
        }
        *self
            .backoff_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now() + self.backoff);
    }

    fn clear_backoff(&self) {
        *self
            .backoff_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Tries each source in order until one answers
///
/// `NotFound` is authoritative and returned as-is. Any other failure puts
/// the source into backoff and moves on to the next source that is not
/// backing off. The last source is always tried so at least one source is
/// usable. When every source fails, the last error is returned.
pub struct CompositeStreamFileProvider {
    sources: Vec<Source>,
    events: Option<EventSender>,
}

impl CompositeStreamFileProvider {
    /// # Errors
    ///
    /// Returns `NoSources` when `sources` is empty.
    pub fn new(
        sources: Vec<(Arc<dyn StreamFileProvider>, Duration)>,
    ) -> Result<Self, ProviderError> {
        if sources.is_empty() {
            return Err(ProviderError::NoSources);
        }
        Ok(Self {
            sources: sources
                .into_iter()
                .map(|(provider, backoff)| Source {
                    provider,
                    backoff,
                    backoff_until: Mutex::new(None),
                })
                .collect(),
            events: None,
        })
    }

    #[must_use]
    pub fn with_events(mut self, events: Option<EventSender>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Whether the source at `index` is currently skipped
    #[must_use]
    pub fn is_backing_off(&self, index: usize) -> bool {
        self.sources
            .get(index)
            .is_some_and(|source| source.in_backoff(Instant::now()))
    }

    async fn failover<'a, T, F>(
        &'a self,
        node: &ConsensusNode,
        filename: &str,
        op: F,
    ) -> Result<T, ProviderError>
    where
        F: Fn(&'a dyn StreamFileProvider) -> BoxFuture<'a, Result<T, ProviderError>>,
    {
        let mut last_error = None;
        let count = self.sources.len();

        for (index, source) in self.sources.iter().enumerate() {
            let is_last = index + 1 == count;
            let name = source.provider.name();
            if !is_last && source.in_backoff(Instant::now()) {
                debug!(source = name, node = %node, filename, "source in backoff, skipping");
                continue;
            }

            match op(source.provider.as_ref()).await {
                Ok(value) => {
                    source.clear_backoff();
                    return Ok(value);
                }
                Err(err @ ProviderError::NotFound { .. }) => return Err(err),
                Err(err) => {
                    source.enter_backoff();
                    if !is_last {
                        warn!(source = name, node = %node, filename, error = %err, "source failed, trying next");
                        self.events
                            .emit_acquisition(AcquisitionEvent::SourceFailedOver {
                                node: node.to_string(),
                                filename: filename.to_string(),
                                source_name: name.to_string(),
                                failure: FailureContext::from_error(&err),
                            });
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::NoSources))
    }
}

impl std::fmt::Debug for CompositeStreamFileProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.provider.name()).collect();
        f.debug_struct("CompositeStreamFileProvider")
            .field("sources", &names)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StreamFileProvider for CompositeStreamFileProvider {
    fn name(&self) -> &str {
        "composite"
    }

    async fn get(
        &self,
        node: &ConsensusNode,
        filename: &StreamFilename,
    ) -> Result<StreamFileData, ProviderError> {
        self.failover(node, filename.as_str(), |provider| {
            provider.get(node, filename)
        })
        .await
    }

    async fn list(
        &self,
        node: &ConsensusNode,
        after: &StreamFilename,
        limit: usize,
    ) -> Result<Vec<StreamFilename>, ProviderError> {
        self.failover(node, after.as_str(), |provider| {
            provider.list(node, after, limit)
        })
        .await
    }
}
