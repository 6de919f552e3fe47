#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in strand
//!
//! Library crates never log or print for the operator directly. They emit
//! domain events over an unbounded channel and the binary decides how to
//! render them.
//!
//! ## Architecture
//!
//! - **Domain-driven events**: grouped by acquisition, verification and stream progress
//! - **Unified `EventEmitter` trait**: one API whether you hold a sender or a struct that owns one
//! - **Tracing integration**: every event knows its own log level and target

pub mod meta;
pub use meta::{EventDomain, EventMeta, Severity};

pub mod events;
pub use events::{
    AcquisitionEvent, AppEvent, FailureContext, GeneralEvent, StreamEvent, VerificationEvent,
};

use strand_errors::UserFacingError;
use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout strand
///
/// Components that may run without a listener return `None` from
/// [`EventEmitter::event_sender`] and every emission becomes a no-op.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    fn emit_file_warning(&self, filename: impl Into<String>, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::file_warning(filename, message)));
    }

    /// Emit an operation failed event
    fn emit_operation_failed<E>(&self, operation: impl Into<String>, error: &E)
    where
        E: UserFacingError + ?Sized,
    {
        self.emit(AppEvent::General(GeneralEvent::OperationFailed {
            operation: operation.into(),
            failure: FailureContext::from_error(error),
        }));
    }

    fn emit_acquisition(&self, event: AcquisitionEvent) {
        self.emit(AppEvent::Acquisition(event));
    }

    fn emit_verification(&self, event: VerificationEvent) {
        self.emit(AppEvent::Verification(event));
    }

    fn emit_stream(&self, event: StreamEvent) {
        self.emit(AppEvent::Stream(event));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
