//! Key-value storage backends for the rule collection

use crate::error::BackendError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Blob store the rule store persists into
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the blob stored under `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Replace the blob stored under `key`
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BackendError>;
}

/// One JSON file per key inside a data directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(contents) => {
                tracing::debug!("Read {} bytes from {:?}", contents.len(), path);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No file found at {:?}, starting fresh", path);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BackendError> {
        let path = self.path_for(key);

        // Ensure parent directory exists
        fs::create_dir_all(&self.dir).await?;

        // Write atomically: write to temp file, then rename
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, &value).await?;
        fs::rename(&tmp_path, &path).await?;

        tracing::debug!("Saved {} bytes to {:?}", value.len(), path);
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Raw stored bytes for `key`
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).map(|v| v.value().clone())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), BackendError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
