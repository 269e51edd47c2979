//! Process-wide application context.
//!
//! Constructed once in `main`, initialized once, then handed to commands.
//! Holds the workout store, the history database, and every write queued
//! during the run so they can be settled before exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{info, warn};

use liftlog_core::{Config, Database, FileStorage, PendingWrite, Store, Workout, WORKOUTS_SLOT};

pub struct App {
    pub config: Config,
    pub data_dir: PathBuf,
    pub db: Database,
    pub workouts: Store<Workout>,
    pending: Vec<PendingWrite>,
}

impl App {
    pub fn new(config: Config, data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join("history.db");
        let db = Database::open(&db_path)
            .with_context(|| format!("Failed to open history database: {:?}", db_path))?;
        let storage = Arc::new(FileStorage::new(data_dir.join("stores")));

        Ok(Self {
            config,
            data_dir,
            db,
            workouts: Store::new(WORKOUTS_SLOT, storage),
            pending: Vec::new(),
        })
    }

    /// Load durable snapshots into the stores. Call once, before any command.
    pub async fn initialize(&mut self) -> Result<()> {
        self.workouts
            .initialize()
            .await
            .context("Failed to load workouts")?;
        info!(
            data_dir = ?self.data_dir,
            slot = self.workouts.slot(),
            workouts = self.workouts.len(),
            "Liftlog initialized"
        );
        Ok(())
    }

    /// Remember a queued write so `settle` can report its outcome.
    pub fn track(&mut self, write: PendingWrite) {
        self.pending.push(write);
    }

    /// Wait for every tracked write, then retry once if the store is
    /// still out of sync with disk.
    pub async fn settle(&mut self) -> Result<()> {
        let writes = self.pending.drain(..).map(|write| async move {
            let generation = write.generation();
            (generation, write.wait().await)
        });
        for (generation, result) in join_all(writes).await {
            if let Err(e) = result {
                warn!(generation, error = %e, "Write did not persist");
            }
        }

        if self.workouts.is_dirty() {
            // A full snapshot covers every earlier failed generation
            self.workouts
                .flush()
                .await
                .context("Changes were kept in memory but could not be saved")?;
        }
        Ok(())
    }
}
