//! The per-stream download cycle

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use strand_config::limits::request_limiter;
use strand_config::{Config, DownloaderConfig, ParseFailurePolicy};
use strand_consensus::NodeSignatureVerifier;
use strand_errors::{ChainError, ConfigError, Error, ErrorKind};
use strand_events::{
    EventEmitter, EventSender, FailureContext, StreamEvent, VerificationEvent,
};
use strand_provider::StreamFileProvider;
use strand_reader::CompositeReader;
use strand_signing::SignatureFileReader;
use strand_types::{ConsensusNode, FileKind, StreamFile, StreamFilename, StreamPointer};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::pointer::PointerStore;
use crate::report::{CycleReport, StopReason};
use crate::sink::StreamFileSink;

type Verified = BTreeMap<StreamFilename, Result<StreamFile, Error>>;

/// Drives one stream through INIT, DISCOVER, SELECT, FETCH, VERIFY, LINK and
/// COMMIT
///
/// Each call to [`Downloader::run_cycle`] handles at most one batch and
/// returns; the caller schedules the next cycle. Only one cycle runs at a
/// time per downloader, which makes it the single writer of the pointer.
pub struct Downloader {
    pub(crate) config: DownloaderConfig,
    pub(crate) sidecars: bool,
    pub(crate) nodes: Vec<ConsensusNode>,
    pub(crate) provider: Arc<dyn StreamFileProvider>,
    pub(crate) reader: Arc<CompositeReader>,
    pub(crate) signatures: SignatureFileReader,
    pub(crate) verifier: NodeSignatureVerifier,
    pub(crate) semaphore: Arc<Semaphore>,
    pointers: Arc<dyn PointerStore>,
    sink: Arc<dyn StreamFileSink>,
    cycle_lock: Mutex<()>,
    cancel: CancellationToken,
    events: Option<EventSender>,
}

impl Downloader {
    /// # Errors
    ///
    /// Returns an error if the address book is empty.
    pub fn new(
        config: &Config,
        provider: Arc<dyn StreamFileProvider>,
        pointers: Arc<dyn PointerStore>,
        sink: Arc<dyn StreamFileSink>,
    ) -> Result<Self, Error> {
        if config.nodes.is_empty() {
            return Err(ConfigError::MissingField {
                field: "nodes".to_string(),
            }
            .into());
        }
        Ok(Self {
            config: config.downloader.clone(),
            sidecars: config.sidecars.enabled,
            nodes: config.nodes.clone(),
            provider,
            reader: Arc::new(CompositeReader::default()),
            signatures: SignatureFileReader::new(),
            verifier: NodeSignatureVerifier::new(config.downloader.quorum),
            semaphore: request_limiter(&config.downloader),
            pointers,
            sink,
            cycle_lock: Mutex::new(()),
            cancel: CancellationToken::new(),
            events: None,
        })
    }

    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Cancel in-flight work when `cancel` fires
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_reader(mut self, reader: CompositeReader) -> Self {
        self.reader = Arc::new(reader);
        self
    }

    #[must_use]
    pub fn stream(&self) -> &str {
        &self.config.stream
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one cycle
    ///
    /// Files that cannot be verified yet stop the cycle without an error and
    /// are retried next time; the report says why it stopped.
    ///
    /// # Errors
    ///
    /// Returns `CycleInProgress` if another cycle is running, a chain error
    /// when the next file does not link to the last accepted one, and
    /// provider, pointer or commit failures that abort the cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, Error> {
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            return Err(Error::CycleInProgress {
                stream: self.config.stream.clone(),
            });
        };

        let started = Instant::now();
        let deadline = started + self.config.cycle_timeout();
        let mut report = CycleReport::new(&self.config.stream);

        // INIT
        let mut pointer = self.pointers.load().await?;
        let after = self.list_after(pointer.as_ref());
        self.emit_stream(StreamEvent::CycleStarted {
            stream: self.config.stream.clone(),
            after: pointer.as_ref().map(|p| p.filename.to_string()),
        });

        let result = self
            .cycle(&mut pointer, &after, deadline, &mut report)
            .await;

        report.pointer = pointer;
        report.duration = started.elapsed();
        self.emit_stream(StreamEvent::CycleCompleted {
            stream: self.config.stream.clone(),
            committed: report.committed.len(),
            duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
            stopped: report.stopped.as_ref().map(ToString::to_string),
        });
        info!(
            stream = %self.config.stream,
            committed = report.committed.len(),
            skipped = report.skipped.len(),
            stopped = ?report.stopped,
            "cycle completed"
        );
        result.map(|()| report)
    }

    async fn cycle(
        &self,
        pointer: &mut Option<StreamPointer>,
        after: &StreamFilename,
        deadline: Instant,
        report: &mut CycleReport,
    ) -> Result<(), Error> {
        // DISCOVER
        let listed = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                report.stop(StopReason::Cancelled);
                return Ok(());
            }
            listed = self.discover(after, deadline) => listed?,
        };
        if Instant::now() >= deadline {
            report.stop(StopReason::Deadline);
            return Ok(());
        }

        // SELECT
        let end = self.config.end_date.and_then(|d| d.timestamp_nanos_opt());
        let (candidates, beyond_end): (Vec<_>, Vec<_>) = listed
            .into_iter()
            .partition(|name| end.is_none_or(|end| name.timestamp() <= end));
        report.candidates = candidates.len();

        // FETCH + VERIFY
        let (mut verified, interrupted) = self.verify_all(&candidates, deadline).await;

        // LINK + COMMIT, strictly in filename order
        for name in &candidates {
            if self.cancel.is_cancelled() {
                report.stop(StopReason::Cancelled);
                return Ok(());
            }
            let Some(result) = verified.remove(name) else {
                report.stop(interrupted.clone().unwrap_or(StopReason::Deadline));
                return Ok(());
            };
            match result {
                Ok(file) => self.link_and_commit(file, pointer, report).await?,
                Err(err) => {
                    if !self.handle_failure(name, err, pointer, report).await? {
                        return Ok(());
                    }
                }
            }
        }

        if !beyond_end.is_empty() {
            report.stop(StopReason::EndDateReached);
        }
        Ok(())
    }

    /// Verify every candidate concurrently until done, cancelled or past
    /// the cycle deadline
    async fn verify_all(
        &self,
        candidates: &[StreamFilename],
        deadline: Instant,
    ) -> (Verified, Option<StopReason>) {
        let mut pending: FuturesUnordered<_> = candidates
            .iter()
            .map(|name| async move { (name, self.verify_candidate(name).await) })
            .collect();
        let mut verified = Verified::new();

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);
        let interrupted = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break Some(StopReason::Cancelled),
                () = &mut sleep => {
                    warn!(stream = %self.config.stream, pending = pending.len(), "cycle deadline reached during verification");
                    self.emit_warning(format!(
                        "cycle deadline reached with {} files still verifying",
                        pending.len()
                    ));
                    break Some(StopReason::Deadline);
                }
                next = pending.next() => match next {
                    Some((name, result)) => {
                        verified.insert(name.clone(), result);
                    }
                    None => break None,
                },
            }
        };
        (verified, interrupted)
    }

    /// LINK the file to the pointer and COMMIT it downstream
    async fn link_and_commit(
        &self,
        mut file: StreamFile,
        pointer: &mut Option<StreamPointer>,
        report: &mut CycleReport,
    ) -> Result<(), Error> {
        if let Some(last) = pointer.as_ref() {
            if file.filename.timestamp() <= last.filename.timestamp() {
                return Err(self.chain_broken(ChainError::OutOfOrder {
                    filename: file.filename.to_string(),
                    last_filename: last.filename.to_string(),
                }));
            }
            if let Some(expected) = &last.hash {
                if file.previous_hash != *expected {
                    return Err(self.chain_broken(ChainError::Broken {
                        filename: file.filename.to_string(),
                        last_filename: last.filename.to_string(),
                        expected: expected.to_hex(),
                        actual: file.previous_hash.to_hex(),
                    }));
                }
            }
        }

        if file.index.is_none() {
            file.index = Some(pointer.as_ref().map_or(0, StreamPointer::next_index));
        }

        self.sink.commit(&file).await.map_err(|e| Error::Commit {
            filename: file.filename.to_string(),
            message: e.to_string(),
        })?;
        let next = StreamPointer::accepted(&file);
        self.pointers.save(&next).await?;
        *pointer = Some(next);

        info!(
            stream = %self.config.stream,
            filename = %file.filename,
            index = ?file.index,
            items = file.item_count(),
            "file committed"
        );
        self.emit_stream(StreamEvent::FileCommitted {
            stream: self.config.stream.clone(),
            filename: file.filename.to_string(),
            index: file.index,
            hash: file.hash.to_hex(),
            items: file.item_count(),
        });
        report.committed.push(file.summary());
        Ok(())
    }

    /// Decide what a failed candidate means for the rest of the cycle,
    /// returning whether to carry on with the next one
    async fn handle_failure(
        &self,
        name: &StreamFilename,
        err: Error,
        pointer: &mut Option<StreamPointer>,
        report: &mut CycleReport,
    ) -> Result<bool, Error> {
        let filename = name.to_string();
        match err.kind() {
            ErrorKind::Parse if self.config.parse_failure == ParseFailurePolicy::Skip => {
                warn!(stream = %self.config.stream, filename, error = %err, "skipping undecodable file");
                let index = pointer.as_ref().map_or(0, StreamPointer::next_index);
                let next = StreamPointer::skipped(name.clone(), Some(index));
                self.pointers.save(&next).await?;
                *pointer = Some(next);
                self.emit_stream(StreamEvent::FileSkipped {
                    stream: self.config.stream.clone(),
                    filename,
                    failure: FailureContext::from_error(&err),
                });
                report.skipped.push(name.clone());
                Ok(true)
            }
            ErrorKind::Parse => {
                error!(stream = %self.config.stream, filename, error = %err, "stream halted at undecodable file");
                self.emit_operation_failed(format!("decode {filename}"), &err);
                report.stop(StopReason::ParseFailure {
                    filename,
                    reason: err.to_string(),
                });
                Ok(false)
            }
            ErrorKind::Consensus => {
                warn!(stream = %self.config.stream, filename, error = %err, "file not verified this cycle");
                self.emit_verification(VerificationEvent::QuorumFailed {
                    filename: filename.clone(),
                    failure: FailureContext::from_error(&err),
                });
                report.stop(StopReason::Unverified {
                    filename,
                    reason: err.to_string(),
                });
                Ok(false)
            }
            ErrorKind::NotFound | ErrorKind::Transient => {
                warn!(stream = %self.config.stream, filename, error = %err, "file unavailable this cycle");
                // name the object that was missing, not the signature it was listed under
                let missing = match &err {
                    Error::Provider(provider) => provider.filename(),
                    _ => None,
                };
                self.emit_file_warning(missing.unwrap_or(&filename), err.to_string());
                report.stop(StopReason::Unavailable {
                    filename,
                    reason: err.to_string(),
                });
                Ok(false)
            }
            _ => Err(err),
        }
    }

    fn chain_broken(&self, err: ChainError) -> Error {
        let filename = match &err {
            ChainError::Broken { filename, .. } | ChainError::OutOfOrder { filename, .. } => {
                filename.clone()
            }
            _ => String::new(),
        };
        error!(stream = %self.config.stream, error = %err, "hash chain broken, stream halted");
        self.emit_stream(StreamEvent::ChainBroken {
            stream: self.config.stream.clone(),
            filename,
            failure: FailureContext::from_error(&err),
        });
        err.into()
    }

    /// Signature filename to list after: the pointer, else the configured
    /// start date, else the epoch
    fn list_after(&self, pointer: Option<&StreamPointer>) -> StreamFilename {
        if let Some(pointer) = pointer {
            return pointer.list_after();
        }
        match self.config.start_date.and_then(|d| d.timestamp_nanos_opt()) {
            // one nanosecond earlier so a file at the start instant is included
            Some(start) => {
                StreamFilename::from_timestamp(start.saturating_sub(1), FileKind::Signature, false)
            }
            None => StreamFilename::epoch(FileKind::Signature),
        }
    }
}

impl EventEmitter for Downloader {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("stream", &self.config.stream)
            .field("nodes", &self.nodes.len())
            .field("sidecars", &self.sidecars)
            .finish_non_exhaustive()
    }
}
