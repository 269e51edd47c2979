//! In-memory keyed stores mirrored to durable slots.
//!
//! A `Store<T>` owns the id -> entity mapping for one entity kind. Reads
//! never touch storage. Every mutation updates memory, queues a full
//! snapshot write on the store's background writer, then notifies
//! subscribers in the same call.

pub mod keyed;
pub mod observer;
pub mod writer;

pub use keyed::{Snapshot, Store};
pub use observer::Subscribers;
pub use writer::{PendingWrite, SyncState};
