//! Durable storage for the per-kind watch list documents.
//!
//! Each kind owns one flat JSON document that is rewritten wholesale on every
//! mutation. The registry is the only writer.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::RegistryError;
use crate::registry::model::{ResourceKind, WatchEntry};

#[async_trait]
pub trait WatchListStore: Send + Sync {
    /// Reads the persisted watch list for `kind`. An absent document is an empty
    /// list; a malformed one is a persistence failure, never an empty list.
    async fn load(&self, kind: ResourceKind) -> Result<Vec<WatchEntry>, RegistryError>;

    /// Replaces the persisted watch list for `kind`. A reader never observes a
    /// partially written document.
    async fn save(&self, kind: ResourceKind, entries: &[WatchEntry]) -> Result<(), RegistryError>;
}

/// One pretty-printed JSON file per kind, kept human-editable, under a single
/// configured directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn document_path(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(kind.document_name())
    }
}

#[async_trait]
impl WatchListStore for JsonFileStore {
    async fn load(&self, kind: ResourceKind) -> Result<Vec<WatchEntry>, RegistryError> {
        let path = self.document_path(kind);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(RegistryError::persistence(format!(
                    "failed to read watch list {}: {err}",
                    path.display()
                )))
            }
        };

        serde_json::from_slice(&raw).map_err(|err| {
            RegistryError::persistence(format!(
                "watch list {} is malformed: {err}",
                path.display()
            ))
        })
    }

    async fn save(&self, kind: ResourceKind, entries: &[WatchEntry]) -> Result<(), RegistryError> {
        let path = self.document_path(kind);
        let raw = serde_json::to_vec_pretty(entries).map_err(|err| {
            RegistryError::persistence(format!("failed to serialize watch list: {err}"))
        })?;

        // Write a sibling temp file and rename it into place so readers see either
        // the old document or the new one, never a torn write.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &raw).await.map_err(|err| {
            RegistryError::persistence(format!(
                "failed to write watch list {}: {err}",
                tmp.display()
            ))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|err| {
            RegistryError::persistence(format!(
                "failed to replace watch list {}: {err}",
                path.display()
            ))
        })
    }
}
