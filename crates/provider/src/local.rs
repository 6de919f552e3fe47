//! Filesystem-backed object store

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use crate::store::{ObjectStore, StoreError};

/// A directory laid out like a bucket, one file per key
#[derive(Debug, Clone)]
pub struct LocalStore {
    name: String,
    base: PathBuf,
}

impl LocalStore {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(name: impl Into<String>, base: P) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }
}

fn io_error(key: &str, err: &std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound {
            key: key.to_string(),
        },
        ErrorKind::PermissionDenied => StoreError::Permanent {
            key: key.to_string(),
            message: err.to_string(),
        },
        _ => StoreError::Transient {
            key: key.to_string(),
            message: err.to_string(),
        },
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) => Err(io_error(key, &e)),
        }
    }

    async fn list_objects(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        max: usize,
    ) -> Result<Vec<String>, StoreError> {
        let dir = self.path_for(prefix);
        let mut rd = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(prefix, &e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = rd.next_entry().await.map_err(|e| io_error(prefix, &e))? {
            let file_type = entry.file_type().await.map_err(|e| io_error(prefix, &e))?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                let key = format!("{prefix}{name}");
                if start_after.is_none_or(|after| key.as_str() > after) {
                    keys.push(key);
                }
            }
        }
        keys.sort_unstable();
        keys.truncate(max);
        Ok(keys)
    }
}
