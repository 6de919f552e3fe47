//! DISCOVER and SELECT: merge node listings into candidate filenames

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use strand_config::limits::acquire_request_permit;
use strand_errors::{Error, ErrorKind};
use strand_events::{AcquisitionEvent, EventEmitter, FailureContext};
use strand_types::{ConsensusNode, StreamFilename};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::Downloader;

impl Downloader {
    /// List signature files after `after` on every node and merge them into
    /// the earliest `batch_size` logical filenames
    ///
    /// Nodes that fail or do not answer before `deadline` are left out. The
    /// cycle only fails when a source rejects the request outright or no
    /// node answers at all.
    pub(crate) async fn discover(
        &self,
        after: &StreamFilename,
        deadline: Instant,
    ) -> Result<Vec<StreamFilename>, Error> {
        let limit = self.config.batch_size;
        let mut pending: FuturesUnordered<_> = self
            .nodes
            .iter()
            .map(|node| async move { (node, self.list_node(node, after, limit).await) })
            .collect();

        let mut merged = BTreeSet::new();
        let mut answered = 0usize;
        let mut last_error = None;
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => {
                    warn!(stream = %self.config.stream, pending = pending.len(), "listing deadline reached");
                    break;
                }
                next = pending.next() => match next {
                    Some((_, Ok(names))) => {
                        answered += 1;
                        merged.extend(names);
                    }
                    Some((node, Err(err))) => {
                        if err.kind() == ErrorKind::Permanent {
                            return Err(err);
                        }
                        warn!(node = %node, error = %err, "listing failed");
                        self.emit_acquisition(AcquisitionEvent::ListingFailed {
                            node: node.to_string(),
                            failure: FailureContext::from_error(&err),
                        });
                        last_error = Some(err);
                    }
                    None => break,
                },
            }
        }

        if answered == 0 {
            if let Some(err) = last_error {
                return Err(err);
            }
        }
        debug!(stream = %self.config.stream, answered, distinct = merged.len(), "listings merged");
        Ok(merged.into_iter().take(limit).collect())
    }

    async fn list_node(
        &self,
        node: &ConsensusNode,
        after: &StreamFilename,
        limit: usize,
    ) -> Result<Vec<StreamFilename>, Error> {
        let _permit = acquire_request_permit(self.semaphore.clone(), "list").await?;
        Ok(self.provider.list(node, after, limit).await?)
    }
}
