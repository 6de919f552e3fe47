//! Last accepted stream position

use serde::{Deserialize, Serialize};
use strand_hash::Hash;

use crate::{FileKind, StreamFile, StreamFilename};

/// The most recently committed file of a stream
///
/// `hash` is `None` only when the file was skipped unparsed, in which case
/// the next file's previous-hash check is waived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPointer {
    pub filename: StreamFilename,
    pub hash: Option<Hash>,
    #[serde(default)]
    pub index: Option<i64>,
}

impl StreamPointer {
    /// Pointer to a file that was committed downstream
    #[must_use]
    pub fn accepted(file: &StreamFile) -> Self {
        Self {
            filename: file.filename.clone(),
            hash: Some(file.hash.clone()),
            index: file.index,
        }
    }

    /// Pointer past a file whose content could not be decoded
    #[must_use]
    pub fn skipped(filename: StreamFilename, index: Option<i64>) -> Self {
        Self {
            filename,
            hash: None,
            index,
        }
    }

    /// Signature filename to list after
    #[must_use]
    pub fn list_after(&self) -> StreamFilename {
        match self.filename.kind() {
            FileKind::Signature => self.filename.clone(),
            _ => self.filename.signature_filename(),
        }
    }

    /// Index the next file receives when its format carries none
    #[must_use]
    pub fn next_index(&self) -> i64 {
        self.index.map_or(0, |index| index + 1)
    }
}
