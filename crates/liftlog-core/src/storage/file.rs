use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::SlotStorage;
use crate::error::StoreError;

pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }

    fn io_error(slot: &str, source: std::io::Error) -> StoreError {
        StoreError::Io {
            slot: slot.to_string(),
            source,
        }
    }
}

#[async_trait]
impl SlotStorage for FileStorage {
    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.slot_path(slot)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(slot, e)),
        }
    }

    async fn write(&self, slot: &str, blob: String) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(slot, e))?;

        // Write beside the target, then rename over it
        let path = self.slot_path(slot);
        let tmp = self.dir.join(format!("{}.json.tmp", slot));
        tokio::fs::write(&tmp, blob.as_bytes())
            .await
            .map_err(|e| Self::io_error(slot, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(slot, e))?;

        debug!(slot, bytes = blob.len(), "Wrote storage slot");
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.slot_path(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(slot, e)),
        }
    }
}
