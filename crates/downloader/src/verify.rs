//! FETCH and VERIFY of one candidate file

use futures::stream::{FuturesUnordered, StreamExt};
use strand_config::limits::acquire_request_permit;
use strand_consensus::ConsensusOutcome;
use strand_errors::{ConsensusError, Error};
use strand_events::{EventEmitter, VerificationEvent};
use strand_hash::Hash;
use strand_types::{
    ConsensusNode, NodeId, SidecarFile, StreamFile, StreamFileData, StreamFileSignature,
    StreamFilename,
};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::Downloader;

impl Downloader {
    /// Collect signatures, reach quorum and fetch the matching content
    pub(crate) async fn verify_candidate(
        &self,
        signature_name: &StreamFilename,
    ) -> Result<StreamFile, Error> {
        let outcome = self.collect_signatures(signature_name).await?;
        let mut file = self.fetch_data(signature_name, &outcome).await?;
        check_metadata(&file, &outcome)?;
        if self.sidecars && !file.sidecar_metadata.is_empty() {
            self.fetch_sidecars(signature_name, &outcome, &mut file)
                .await?;
        }
        Ok(file)
    }

    /// Gather signatures from every node until all answered or the
    /// signature deadline passes, then resolve the quorum
    async fn collect_signatures(
        &self,
        signature_name: &StreamFilename,
    ) -> Result<ConsensusOutcome, Error> {
        let mut tally = self.verifier.tally(signature_name, &self.nodes);

        // the window opens once this candidate can issue requests, not while
        // it queues behind other candidates for the limiter
        drop(acquire_request_permit(self.semaphore.clone(), "signatures").await?);
        let window_start = Instant::now();
        let mut pending: FuturesUnordered<_> = self
            .nodes
            .iter()
            .map(|node| self.fetch_signature(node, signature_name))
            .collect();

        let sleep = tokio::time::sleep_until(window_start + self.config.signature_timeout());
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => {
                    debug!(filename = %signature_name, missing = pending.len(), counted = tally.counted(), "signature collection timed out");
                    break;
                }
                next = pending.next() => match next {
                    Some(Some(signature)) => {
                        tally.record(signature);
                    }
                    Some(None) => {}
                    None => break,
                },
            }
        }
        drop(pending);
        tally.time_out();

        let outcome = tally.into_outcome()?;
        self.emit_verification(VerificationEvent::QuorumReached {
            filename: signature_name.to_string(),
            file_hash: outcome.file_hash.to_hex(),
            weight: outcome.weight,
            total_stake: outcome.total_stake,
            signatures: outcome.consensus_nodes.len(),
        });
        for node in &outcome.flagged {
            self.flag(*node, signature_name, "signed a hash outside the consensus group");
        }
        for node in &outcome.invalid {
            self.flag(*node, signature_name, "signature failed verification");
        }
        Ok(outcome)
    }

    async fn fetch_signature(
        &self,
        node: &ConsensusNode,
        signature_name: &StreamFilename,
    ) -> Option<StreamFileSignature> {
        let data = match self.fetch(node, signature_name).await {
            Ok(data) => data,
            Err(err) if err.is_not_found() => {
                trace!(node = %node, filename = %signature_name, "signature not published yet");
                return None;
            }
            Err(err) => {
                debug!(node = %node, filename = %signature_name, error = %err, "signature fetch failed");
                return None;
            }
        };
        match self.signatures.read(&data) {
            Ok(signature) => Some(signature),
            Err(err) => {
                warn!(node = %node, filename = %signature_name, error = %err, "unreadable signature file");
                None
            }
        }
    }

    /// Download the data file from consensus nodes until one copy hashes to
    /// the signed file hash
    async fn fetch_data(
        &self,
        signature_name: &StreamFilename,
        outcome: &ConsensusOutcome,
    ) -> Result<StreamFile, Error> {
        let data_name = signature_name.data_filename(outcome.data_compressed());
        let mut last_error = None;
        let mut mismatched = false;

        for node in outcome.consensus_nodes.iter().filter_map(|id| self.node(*id)) {
            let data = match self.fetch(node, &data_name).await {
                Ok(data) => data,
                Err(err) => {
                    debug!(node = %node, filename = %data_name, error = %err, "data fetch failed");
                    last_error = Some(err);
                    continue;
                }
            };

            match self.reader.parse(&data) {
                Ok(file) if file.file_hash == outcome.file_hash => return Ok(file),
                Ok(file) => {
                    mismatched = true;
                    self.flag(
                        node.node_id,
                        &data_name,
                        &format!("served {} instead of signed {}", file.file_hash, outcome.file_hash),
                    );
                }
                // the signed bytes themselves do not decode
                Err(err) if self.reader.signed_hash(&data) == outcome.file_hash => {
                    return Err(err.into());
                }
                Err(err) => {
                    mismatched = true;
                    self.flag(node.node_id, &data_name, &format!("unreadable copy: {err}"));
                }
            }
        }

        if mismatched || last_error.is_none() {
            return Err(ConsensusError::DataHashMismatch {
                filename: data_name.to_string(),
                expected: outcome.file_hash.to_hex(),
            }
            .into());
        }
        Err(last_error.unwrap_or_else(|| Error::internal("no consensus node to fetch from")))
    }

    async fn fetch_sidecars(
        &self,
        signature_name: &StreamFilename,
        outcome: &ConsensusOutcome,
        file: &mut StreamFile,
    ) -> Result<(), Error> {
        for metadata in &file.sidecar_metadata {
            let name = signature_name.sidecar_filename(metadata.id);
            let mut found = None;
            let mut reason = String::from("no consensus node has it");

            for node in outcome.consensus_nodes.iter().filter_map(|id| self.node(*id)) {
                match self.fetch(node, &name).await {
                    Ok(data) if Hash::from_data(&data.bytes) == metadata.hash => {
                        found = Some(SidecarFile {
                            filename: name.clone(),
                            hash: metadata.hash.clone(),
                            bytes: data.bytes,
                        });
                        break;
                    }
                    Ok(_) => {
                        reason = "hash mismatch".to_string();
                        self.flag(node.node_id, &name, "sidecar does not match its listed hash");
                    }
                    Err(err) => reason = err.to_string(),
                }
            }

            let Some(sidecar) = found else {
                return Err(ConsensusError::SidecarUnavailable {
                    filename: file.filename.to_string(),
                    sidecar: name.to_string(),
                    message: reason,
                }
                .into());
            };
            self.emit_verification(VerificationEvent::SidecarVerified {
                filename: file.filename.to_string(),
                sidecar: name.to_string(),
            });
            file.sidecars.push(sidecar);
        }
        Ok(())
    }

    async fn fetch(
        &self,
        node: &ConsensusNode,
        filename: &StreamFilename,
    ) -> Result<StreamFileData, Error> {
        let _permit = acquire_request_permit(self.semaphore.clone(), "fetch").await?;
        Ok(self.provider.get(node, filename).await?)
    }

    fn node(&self, id: NodeId) -> Option<&ConsensusNode> {
        self.nodes.iter().find(|node| node.node_id == id)
    }

    fn flag(&self, id: NodeId, filename: &StreamFilename, reason: &str) {
        let node = self
            .node(id)
            .map_or_else(|| id.to_string(), ConsensusNode::to_string);
        warn!(node = %node, filename = %filename, reason, "node flagged");
        self.emit_verification(VerificationEvent::NodeFlagged {
            filename: filename.to_string(),
            node,
            reason: reason.to_string(),
        });
    }
}

/// The signed metadata hash must match the one recomputed from content
fn check_metadata(file: &StreamFile, outcome: &ConsensusOutcome) -> Result<(), ConsensusError> {
    let Some(expected) = &outcome.metadata_hash else {
        return Ok(());
    };
    match &file.metadata_hash {
        Some(actual) if actual == expected => Ok(()),
        actual => Err(ConsensusError::MetadataHashMismatch {
            filename: file.filename.to_string(),
            expected: expected.to_hex(),
            actual: actual.as_ref().map_or_else(|| "none".to_string(), Hash::to_hex),
        }),
    }
}
