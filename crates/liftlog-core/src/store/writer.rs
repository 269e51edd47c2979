use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::storage::SlotStorage;

pub(crate) enum WriteOp {
    Write(String),
    Remove,
}

struct WriteRequest {
    generation: u64,
    op: WriteOp,
    done: oneshot::Sender<Result<(), StoreError>>,
}

/// Durability bookkeeping for one store.
///
/// Every mutation issues a new generation; the writer records the newest
/// generation that reached storage. The store is dirty while those differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    pub issued: u64,
    pub persisted: u64,
}

impl SyncState {
    pub fn is_dirty(&self) -> bool {
        self.persisted < self.issued
    }
}

#[derive(Default)]
struct Counters {
    issued: AtomicU64,
    persisted: AtomicU64,
}

/// Handle to one queued write.
///
/// Dropping it is fine: the write still happens. Awaiting `wait` reports
/// whether that particular snapshot reached storage.
#[derive(Debug)]
pub struct PendingWrite {
    slot: String,
    generation: u64,
    rx: Option<oneshot::Receiver<Result<(), StoreError>>>,
}

impl PendingWrite {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn wait(self) -> Result<(), StoreError> {
        match self.rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(StoreError::WriterClosed(self.slot))),
            None => Err(StoreError::WriterClosed(self.slot)),
        }
    }
}

/// Single background task that applies a store's writes in issue order.
pub(crate) struct Writer {
    slot: String,
    tx: mpsc::UnboundedSender<WriteRequest>,
    counters: Arc<Counters>,
}

impl Writer {
    /// Spawn the writer task. Must be called from within a Tokio runtime.
    pub(crate) fn spawn(slot: &str, storage: Arc<dyn SlotStorage>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());

        tokio::spawn(run(slot.to_string(), storage, rx, counters.clone()));

        Self {
            slot: slot.to_string(),
            tx,
            counters,
        }
    }

    pub(crate) fn submit(&self, op: WriteOp) -> PendingWrite {
        let generation = self.next_generation();
        let (done, rx) = oneshot::channel();

        let rx = match self.tx.send(WriteRequest { generation, op, done }) {
            Ok(()) => Some(rx),
            Err(_) => {
                warn!(slot = %self.slot, generation, "Writer task gone, write dropped");
                None
            }
        };

        PendingWrite {
            slot: self.slot.clone(),
            generation,
            rx,
        }
    }

    /// Record a mutation that could not even be queued (e.g. serialization failed).
    pub(crate) fn mark_unsynced(&self) {
        self.next_generation();
    }

    pub(crate) fn state(&self) -> SyncState {
        SyncState {
            issued: self.counters.issued.load(Ordering::SeqCst),
            persisted: self.counters.persisted.load(Ordering::SeqCst),
        }
    }

    fn next_generation(&self) -> u64 {
        self.counters.issued.fetch_add(1, Ordering::SeqCst) + 1
    }
}

async fn run(
    slot: String,
    storage: Arc<dyn SlotStorage>,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
    counters: Arc<Counters>,
) {
    while let Some(request) = rx.recv().await {
        let result = match request.op {
            WriteOp::Write(blob) => storage.write(&slot, blob).await,
            WriteOp::Remove => storage.remove(&slot).await,
        };

        match &result {
            Ok(()) => {
                counters.persisted.fetch_max(request.generation, Ordering::SeqCst);
                debug!(slot = %slot, generation = request.generation, "Persisted store snapshot");
            }
            Err(e) => {
                warn!(slot = %slot, generation = request.generation, error = %e, "Failed to persist store snapshot");
            }
        }

        // Receiver is gone when the caller chose fire-and-forget
        let _ = request.done.send(result);
    }
    debug!(slot = %slot, "Store writer stopped");
}
