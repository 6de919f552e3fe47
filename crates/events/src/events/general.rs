use serde::{Deserialize, Serialize};

use super::FailureContext;

/// Events that do not belong to a single pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    Warning {
        message: String,
        /// Stream file the warning is about, if any
        filename: Option<String>,
    },

    /// An operation gave up and the cycle stopped because of it
    OperationFailed {
        operation: String,
        failure: FailureContext,
    },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            filename: None,
        }
    }

    pub fn file_warning(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            filename: Some(filename.into()),
        }
    }
}
