//! Durable storage slots.
//!
//! A slot is one opaque named blob. Stores read their slot once at startup
//! and overwrite it completely on every mutation.
//!
//! - `FileStorage`: one `<slot>.json` file per slot in a directory
//! - `MemoryStorage`: process-local map, used by tests and throwaway sessions

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait SlotStorage: Send + Sync {
    /// Read the blob in `slot`, or `None` if nothing was ever written.
    async fn read(&self, slot: &str) -> Result<Option<String>, StoreError>;

    /// Replace the blob in `slot`.
    async fn write(&self, slot: &str, blob: String) -> Result<(), StoreError>;

    /// Remove `slot` entirely. Removing a missing slot is not an error.
    async fn remove(&self, slot: &str) -> Result<(), StoreError>;
}
