use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::SlotStorage;
use crate::error::StoreError;

/// Slots kept in process memory. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot before a store is initialized from it.
    pub fn with_slot(self, slot: &str, blob: impl Into<String>) -> Self {
        self.lock().insert(slot.to_string(), blob.into());
        self
    }

    /// Make every following write fail until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current contents of a slot, read synchronously.
    pub fn blob(&self, slot: &str) -> Option<String> {
        self.lock().get(slot).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map is still a valid map
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SlotStorage for MemoryStorage {
    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blob(slot))
    }

    async fn write(&self, slot: &str, blob: String) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                slot: slot.to_string(),
                reason: "storage quota exceeded".to_string(),
            });
        }
        self.lock().insert(slot.to_string(), blob);
        Ok(())
    }

    async fn remove(&self, slot: &str) -> Result<(), StoreError> {
        self.lock().remove(slot);
        Ok(())
    }
}
