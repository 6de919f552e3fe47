use serde::{Deserialize, Serialize};

use crate::EventDomain;
use strand_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    /// Stable error code such as `provider.not_found`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether retrying the operation might succeed.
    pub retryable: bool,
}

impl FailureContext {
    /// Construct a new failure context.
    #[must_use]
    pub fn new(
        code: Option<impl Into<String>>,
        message: impl Into<String>,
        hint: Option<impl Into<String>>,
        retryable: bool,
    ) -> Self {
        Self {
            code: code.map(Into::into),
            message: message.into(),
            hint: hint.map(Into::into),
            retryable,
        }
    }

    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self::new(
            error.user_code(),
            error.user_message().into_owned(),
            error.user_hint(),
            error.is_retryable(),
        )
    }
}

pub mod acquisition;
pub mod general;
pub mod stream;
pub mod verification;

pub use acquisition::*;
pub use general::*;
pub use stream::*;
pub use verification::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, operations)
    General(GeneralEvent),

    /// Listing and fetching from node storage
    Acquisition(AcquisitionEvent),

    /// Signature quorum and content checks
    Verification(VerificationEvent),

    /// Cycle and commit progress
    Stream(StreamEvent),
}

impl AppEvent {
    #[must_use]
    pub fn domain(&self) -> EventDomain {
        match self {
            Self::General(_) => EventDomain::General,
            Self::Acquisition(_) => EventDomain::Acquisition,
            Self::Verification(_) => EventDomain::Verification,
            Self::Stream(_) => EventDomain::Stream,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            // Error-level events
            Self::General(GeneralEvent::OperationFailed { .. })
            | Self::Stream(StreamEvent::ChainBroken { .. }) => Level::ERROR,

            // Warning-level events
            Self::General(GeneralEvent::Warning { .. })
            | Self::Acquisition(
                AcquisitionEvent::ListingFailed { .. } | AcquisitionEvent::SourceFailedOver { .. },
            )
            | Self::Verification(
                VerificationEvent::QuorumFailed { .. } | VerificationEvent::NodeFlagged { .. },
            )
            | Self::Stream(StreamEvent::FileSkipped { .. }) => Level::WARN,

            // Debug-level events (per-node chatter)
            Self::Acquisition(
                AcquisitionEvent::Listed { .. } | AcquisitionEvent::Downloaded { .. },
            )
            | Self::Verification(VerificationEvent::SidecarVerified { .. }) => Level::DEBUG,

            // Default to INFO for most events
            _ => Level::INFO,
        }
    }

    /// Get the log target for this event (for structured logging)
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "strand::events::general",
            Self::Acquisition(_) => "strand::events::acquisition",
            Self::Verification(_) => "strand::events::verification",
            Self::Stream(_) => "strand::events::stream",
        }
    }
}
