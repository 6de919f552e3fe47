//! Tracing setup and the bridge from domain events to log records

use strand_events::{
    AcquisitionEvent, AppEvent, EventMeta, EventReceiver, GeneralEvent, StreamEvent,
    VerificationEvent,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,strand=info";
const DEBUG_FILTER: &str = "info,strand=debug,strand_downloader=debug,strand_provider=debug";

/// Install the global subscriber
///
/// `RUST_LOG` wins over both defaults. Logs go to stderr so that stdout
/// stays free for committed file summaries.
pub fn init_tracing(json: bool, debug_enabled: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug_enabled {
            DEBUG_FILTER
        } else {
            DEFAULT_FILTER
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(debug_enabled).init();
    }
}

/// Log every event until all senders are gone
pub async fn drain_events(mut receiver: EventReceiver, stream: String) {
    let mut cycle = 0u64;
    while let Some(event) = receiver.recv().await {
        if matches!(event, AppEvent::Stream(StreamEvent::CycleStarted { .. })) {
            cycle += 1;
        }
        let meta = EventMeta::new(event.log_level(), event.domain())
            .for_stream(stream.as_str())
            .in_cycle(cycle);
        log_event(&event, &meta);
    }
}

/// Log an `AppEvent` with structured fields at the level it declares
#[allow(clippy::too_many_lines)]
pub fn log_event(event: &AppEvent, meta: &EventMeta) {
    let domain = meta.domain.as_str();
    let cycle = meta.cycle.unwrap_or_default();
    match event {
        AppEvent::Stream(stream_event) => match stream_event {
            StreamEvent::CycleStarted { stream, after } => {
                info!(domain, cycle, stream = %stream, after = ?after, "Cycle started");
            }
            StreamEvent::FileCommitted {
                filename,
                index,
                hash,
                items,
                ..
            } => {
                info!(domain, cycle, filename = %filename, index = ?index, hash = %hash, items, "File committed");
            }
            StreamEvent::FileSkipped {
                filename, failure, ..
            } => {
                warn!(domain, cycle, filename = %filename, code = ?failure.code, message = %failure.message, "File skipped");
            }
            StreamEvent::ChainBroken {
                filename, failure, ..
            } => {
                error!(domain, cycle, filename = %filename, code = ?failure.code, message = %failure.message, hint = ?failure.hint, "Hash chain broken");
            }
            StreamEvent::CycleCompleted {
                committed,
                duration_ms,
                stopped,
                ..
            } => {
                info!(domain, cycle, committed, duration_ms, stopped = ?stopped, "Cycle completed");
            }
        },

        AppEvent::Verification(verification_event) => match verification_event {
            VerificationEvent::QuorumReached {
                filename,
                file_hash,
                weight,
                total_stake,
                signatures,
            } => {
                debug!(domain, cycle, filename = %filename, file_hash = %file_hash, weight, total_stake, signatures, "Quorum reached");
            }
            VerificationEvent::QuorumFailed { filename, failure } => {
                warn!(domain, cycle, filename = %filename, code = ?failure.code, message = %failure.message, "Quorum not reached");
            }
            VerificationEvent::NodeFlagged {
                filename,
                node,
                reason,
            } => {
                warn!(domain, cycle, filename = %filename, node = %node, reason = %reason, "Node flagged");
            }
            VerificationEvent::SidecarVerified { filename, sidecar } => {
                debug!(domain, cycle, filename = %filename, sidecar = %sidecar, "Sidecar verified");
            }
        },

        AppEvent::Acquisition(acquisition_event) => match acquisition_event {
            AcquisitionEvent::Listed { node, after, count } => {
                debug!(domain, cycle, node = %node, after = %after, count, "Listed");
            }
            AcquisitionEvent::ListingFailed { node, failure } => {
                warn!(domain, cycle, node = %node, code = ?failure.code, message = %failure.message, retryable = failure.retryable, "Listing failed");
            }
            AcquisitionEvent::SourceFailedOver {
                node,
                filename,
                source_name,
                failure,
            } => {
                warn!(domain, cycle, node = %node, filename = %filename, from = %source_name, message = %failure.message, "Source failed over");
            }
            AcquisitionEvent::Downloaded {
                node,
                filename,
                source_name,
                size,
            } => {
                debug!(domain, cycle, node = %node, filename = %filename, from = %source_name, size, "Downloaded");
            }
            AcquisitionEvent::PathSwitched { node, from, to } => {
                info!(domain, cycle, node = %node, from = ?from, to = ?to, "Storage layout switched");
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::OperationFailed { operation, failure } => {
                if failure.retryable {
                    warn!(domain, cycle, operation = %operation, code = ?failure.code, message = %failure.message, hint = ?failure.hint, "Operation failed");
                } else {
                    error!(domain, cycle, operation = %operation, code = ?failure.code, message = %failure.message, hint = ?failure.hint, "Operation failed");
                }
            }
            GeneralEvent::Warning { message, filename } => {
                warn!(domain, cycle, filename = ?filename, message = %message, "Warning");
            }
        },
    }
}
