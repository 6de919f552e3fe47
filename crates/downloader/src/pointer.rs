//! Persistence of the last accepted stream position

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use strand_errors::Error;
use strand_types::StreamPointer;
use tokio::fs;

/// Storage for a stream's [`StreamPointer`]
///
/// Only the downloader holding the cycle lock writes to it.
#[async_trait]
pub trait PointerStore: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the stored pointer cannot be read or decoded.
    async fn load(&self) -> Result<Option<StreamPointer>, Error>;

    /// # Errors
    ///
    /// Returns an error if the pointer cannot be persisted.
    async fn save(&self, pointer: &StreamPointer) -> Result<(), Error>;
}

/// Pointer kept for the life of the process
#[derive(Debug, Default)]
pub struct InMemoryPointerStore {
    pointer: Mutex<Option<StreamPointer>>,
}

impl InMemoryPointerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pointer(pointer: StreamPointer) -> Self {
        Self {
            pointer: Mutex::new(Some(pointer)),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<StreamPointer> {
        self.pointer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PointerStore for InMemoryPointerStore {
    async fn load(&self) -> Result<Option<StreamPointer>, Error> {
        Ok(self.current())
    }

    async fn save(&self, pointer: &StreamPointer) -> Result<(), Error> {
        *self.pointer.lock().unwrap_or_else(PoisonError::into_inner) = Some(pointer.clone());
        Ok(())
    }
}

/// Pointer stored as a JSON document, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonFilePointerStore {
    path: PathBuf,
}

impl JsonFilePointerStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PointerStore for JsonFilePointerStore {
    async fn load(&self) -> Result<Option<StreamPointer>, Error> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io_with_path(&e, &self.path)),
        }
    }

    async fn save(&self, pointer: &StreamPointer) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_path(&e, parent))?;
        }
        let json = serde_json::to_vec_pretty(pointer)?;
        let temp = self.temp_path();
        fs::write(&temp, json)
            .await
            .map_err(|e| Error::io_with_path(&e, &temp))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| Error::io_with_path(&e, &self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_types::{FileKind, Hash, StreamFilename};
    use tempfile::TempDir;

    fn pointer() -> StreamPointer {
        StreamPointer {
            filename: StreamFilename::from_timestamp(5_000_000_000, FileKind::Data, true),
            hash: Some(Hash::from_data(b"file")),
            index: Some(4),
        }
    }

    #[tokio::test]
    async fn test_json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFilePointerStore::new(dir.path().join("state").join("pointer.json"));
        assert!(store.load().await.unwrap().is_none());

        store.save(&pointer()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(pointer()));
        assert!(!store.temp_path().exists(), "temp file is renamed into place");
    }

    #[tokio::test]
    async fn test_corrupt_pointer_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pointer.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(JsonFilePointerStore::new(path).load().await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = InMemoryPointerStore::new();
        assert!(store.load().await.unwrap().is_none());
        store.save(&pointer()).await.unwrap();
        assert_eq!(store.current(), Some(pointer()));
    }
}
