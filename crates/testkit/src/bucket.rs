//! Temporary on-disk bucket

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A directory standing in for an object store bucket
#[derive(Debug)]
pub struct TempBucket {
    dir: TempDir,
}

impl TempBucket {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temporary bucket"),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.path().join(key)
    }

    /// Store `bytes` under a `/`-separated key
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn put(&self, key: &str, bytes: impl AsRef<[u8]>) {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create bucket prefix");
        }
        std::fs::write(&path, bytes).expect("write bucket object");
    }

    /// Remove the object under `key` if present
    pub fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path(key));
    }
}

impl Default for TempBucket {
    fn default() -> Self {
        Self::new()
    }
}
