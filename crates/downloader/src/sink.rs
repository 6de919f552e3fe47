//! Downstream consumer of verified stream files

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use strand_errors::Error;
use strand_types::StreamFile;

/// Receives verified files in stream order
///
/// The pointer advances only after `commit` returns `Ok`. A failing commit
/// aborts the cycle and the same file is offered again next cycle.
#[async_trait]
pub trait StreamFileSink: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the file could not be accepted downstream.
    async fn commit(&self, file: &StreamFile) -> Result<(), Error>;
}

/// Keeps every committed file in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<StreamFile>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn files(&self) -> Vec<StreamFile> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StreamFileSink for MemorySink {
    async fn commit(&self, file: &StreamFile) -> Result<(), Error> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(file.clone());
        Ok(())
    }
}
