use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::observer::Subscribers;
use super::writer::{PendingWrite, SyncState, WriteOp, Writer};
use crate::error::StoreError;
use crate::models::{Entity, Exercise};
use crate::resolver::ExerciseResolver;
use crate::storage::SlotStorage;
use crate::utils::derive_id;

/// The store's whole mapping, as handed to subscribers.
pub type Snapshot<T> = BTreeMap<String, T>;

/// Accepted blob layouts. Pairs are what we write; the object form is
/// read for compatibility with older data.
#[derive(Deserialize)]
#[serde(untagged)]
enum Blob<T> {
    Pairs(Vec<(String, T)>),
    Object(BTreeMap<String, T>),
}

pub struct Store<T: Entity> {
    slot: String,
    storage: Arc<dyn SlotStorage>,
    cache: Snapshot<T>,
    subscribers: Subscribers<Snapshot<T>>,
    writer: Option<Writer>,
}

impl<T: Entity> Store<T> {
    pub fn new(slot: impl Into<String>, storage: Arc<dyn SlotStorage>) -> Self {
        Self {
            slot: slot.into(),
            storage,
            cache: BTreeMap::new(),
            subscribers: Subscribers::new(),
            writer: None,
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn is_initialized(&self) -> bool {
        self.writer.is_some()
    }

    /// Load the durable slot into memory and start the background writer.
    ///
    /// Call once at process entry, inside the Tokio runtime. A missing or
    /// malformed blob yields an empty store; a storage read error is returned.
    pub async fn initialize(&mut self) -> Result<(), StoreError> {
        if self.is_initialized() {
            debug!(slot = %self.slot, "Store already initialized");
            return Ok(());
        }

        self.cache = match self.storage.read(&self.slot).await? {
            None => {
                debug!(slot = %self.slot, "No stored data, starting empty");
                BTreeMap::new()
            }
            Some(blob) => match serde_json::from_str::<Blob<T>>(&blob) {
                Ok(Blob::Pairs(pairs)) => pairs.into_iter().collect(),
                Ok(Blob::Object(map)) => map,
                Err(e) => {
                    warn!(slot = %self.slot, error = %e, "Stored data is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
        };

        self.writer = Some(Writer::spawn(&self.slot, self.storage.clone()));
        info!(slot = %self.slot, entries = self.cache.len(), "Store initialized");
        Ok(())
    }

    // ===== Reads =====

    pub fn get(&self, id: &str) -> Option<&T> {
        self.cache.get(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.cache.contains_key(id)
    }

    /// The id an entity with this name gets. Independent of store contents.
    pub fn name_to_id(name: &str) -> String {
        derive_id(name)
    }

    pub fn name_exists(&self, name: &str) -> bool {
        self.has(&Self::name_to_id(name))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.cache.values()
    }

    pub fn snapshot(&self) -> &Snapshot<T> {
        &self.cache
    }

    // ===== Mutations =====

    /// Insert or overwrite by id, then queue persistence and notify.
    ///
    /// Returns once the write is queued. The in-memory change stands even
    /// if persistence later fails; see `sync_state`.
    pub fn put(&mut self, entity: T) -> Result<PendingWrite, StoreError> {
        self.ensure_initialized()?;
        self.cache.insert(entity.id().to_string(), entity);
        self.commit()
    }

    /// Insert several entities with a single persisted write.
    pub fn put_many(&mut self, entities: impl IntoIterator<Item = T>) -> Result<PendingWrite, StoreError> {
        self.ensure_initialized()?;
        for entity in entities {
            self.cache.insert(entity.id().to_string(), entity);
        }
        self.commit()
    }

    pub fn delete(&mut self, id: &str) -> Result<PendingWrite, StoreError> {
        self.ensure_initialized()?;
        if self.cache.remove(id).is_none() {
            debug!(slot = %self.slot, id, "Delete of missing id");
        }
        self.commit()
    }

    /// Empty the mapping and remove the durable slot.
    pub fn clear(&mut self) -> Result<PendingWrite, StoreError> {
        let writer = self.ensure_initialized()?;
        let pending = writer.submit(WriteOp::Remove);
        self.cache.clear();
        self.subscribers.notify(&self.cache);
        Ok(pending)
    }

    /// Re-persist the current snapshot and wait for it.
    ///
    /// This is the retry path after a failed background write.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.persist()?.wait().await
    }

    pub fn sync_state(&self) -> SyncState {
        self.writer
            .as_ref()
            .map(Writer::state)
            .unwrap_or(SyncState { issued: 0, persisted: 0 })
    }

    /// True while some mutation has not reached durable storage.
    pub fn is_dirty(&self) -> bool {
        self.sync_state().is_dirty()
    }

    // ===== Subscribers =====

    pub fn subscribe(&mut self, id: impl Into<String>, callback: impl Fn(&Snapshot<T>) + Send + 'static) {
        self.subscribers.subscribe(id, callback);
    }

    pub fn unsubscribe(&mut self, id: &str) {
        self.subscribers.unsubscribe(id);
    }

    fn ensure_initialized(&self) -> Result<&Writer, StoreError> {
        self.writer
            .as_ref()
            .ok_or_else(|| StoreError::NotInitialized(self.slot.clone()))
    }

    fn commit(&mut self) -> Result<PendingWrite, StoreError> {
        let pending = self.persist();
        self.subscribers.notify(&self.cache);
        pending
    }

    fn persist(&self) -> Result<PendingWrite, StoreError> {
        let writer = self.ensure_initialized()?;
        let pairs: Vec<(&String, &T)> = self.cache.iter().collect();
        match serde_json::to_string(&pairs) {
            Ok(blob) => Ok(writer.submit(WriteOp::Write(blob))),
            Err(source) => {
                writer.mark_unsynced();
                Err(StoreError::Serialization {
                    slot: self.slot.clone(),
                    source,
                })
            }
        }
    }
}

impl ExerciseResolver for Store<Exercise> {
    fn get_exercise(&self, id: &str) -> Option<Exercise> {
        self.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MuscleGroup, Workout};
    use crate::storage::MemoryStorage;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn exercise(id: &str, name: &str) -> Exercise {
        Exercise::new(id, name, [MuscleGroup::Quads])
    }

    async fn open(storage: &Arc<MemoryStorage>) -> Store<Exercise> {
        let mut store = Store::new("exercises", storage.clone());
        store.initialize().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_missing_slot_is_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let store = open(&storage).await;
        assert!(store.is_empty());
        assert!(store.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_corrupt_slot_fails_open() {
        let storage = Arc::new(MemoryStorage::new().with_slot("exercises", "{not json"));
        let store = open(&storage).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_reads_object_layout() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_slot("exercises", r#"{"squat":{"id":"squat","name":"Squat","muscleGroups":["quads"]}}"#),
        );
        let store = open(&storage).await;
        assert_eq!(store.get("squat").map(|e| e.name.as_str()), Some("Squat"));
    }

    #[tokio::test]
    async fn test_initialize_uses_own_slot() {
        let storage = Arc::new(
            MemoryStorage::new()
                .with_slot("exercises", r#"[["squat",{"id":"squat","name":"Squat"}]]"#),
        );
        let mut workouts: Store<Workout> = Store::new("workouts", storage.clone());
        workouts.initialize().await.unwrap();
        assert!(workouts.is_empty());
    }

    #[tokio::test]
    async fn test_put_before_initialize_fails() {
        let mut store: Store<Exercise> = Store::new("exercises", Arc::new(MemoryStorage::new()));
        let err = store.put(exercise("squat", "Squat")).unwrap_err();
        assert!(matches!(err, StoreError::NotInitialized(slot) if slot == "exercises"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_is_visible_immediately_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        let pending = store.put(exercise("squat", "Squat")).unwrap();
        assert!(store.has("squat"));
        pending.wait().await.unwrap();
        assert!(!store.is_dirty());

        let reloaded = open(&storage).await;
        assert_eq!(reloaded.snapshot(), store.snapshot());
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        store.put(exercise("squat", "Squat")).unwrap();
        store.put(exercise("squat", "Back Squat")).unwrap().wait().await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("squat").unwrap().name, "Back Squat");
    }

    #[tokio::test]
    async fn test_subscribers_see_new_state_synchronously() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        store.subscribe("list", move |snapshot: &Snapshot<Exercise>| {
            s.lock().unwrap().push(snapshot.len());
        });

        let _ = store.put(exercise("squat", "Squat")).unwrap();
        let _ = store.put(exercise("bench", "Bench")).unwrap();
        let _ = store.delete("squat").unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);

        store.unsubscribe("list");
        let _ = store.delete("bench").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_panicking_subscriber_does_not_abort_mutation() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;
        let hits = Arc::new(AtomicUsize::new(0));

        store.subscribe("broken", |_: &Snapshot<Exercise>| panic!("bad render"));
        let h = hits.clone();
        store.subscribe("ok", move |_: &Snapshot<Exercise>| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        store.put(exercise("squat", "Squat")).unwrap().wait().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(store.has("squat"));
    }

    #[tokio::test]
    async fn test_delete_persists_removal() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        store
            .put_many([exercise("squat", "Squat"), exercise("bench", "Bench")])
            .unwrap()
            .wait()
            .await
            .unwrap();
        store.delete("squat").unwrap().wait().await.unwrap();

        let reloaded = open(&storage).await;
        assert!(!reloaded.has("squat"));
        assert!(reloaded.has("bench"));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_memory_and_marks_dirty() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        storage.set_fail_writes(true);
        let err = store.put(exercise("squat", "Squat")).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.has("squat"));
        assert!(store.is_dirty());

        storage.set_fail_writes(false);
        store.flush().await.unwrap();
        assert!(!store.is_dirty());
        assert!(open(&storage).await.has("squat"));
    }

    #[tokio::test]
    async fn test_unawaited_writes_land_in_order() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        for i in 0..10 {
            let _ = store.put(exercise(&format!("ex{}", i), "Exercise")).unwrap();
        }
        store.delete("ex3").unwrap().wait().await.unwrap();

        let reloaded = open(&storage).await;
        assert_eq!(reloaded.len(), 9);
        assert!(!reloaded.has("ex3"));
        assert_eq!(store.sync_state().issued, 11);
    }

    #[tokio::test]
    async fn test_clear_removes_slot() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        store.put(exercise("squat", "Squat")).unwrap().wait().await.unwrap();
        store.clear().unwrap().wait().await.unwrap();

        assert!(store.is_empty());
        assert_eq!(storage.blob("exercises"), None);
    }

    #[tokio::test]
    async fn test_name_lookups() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = open(&storage).await;

        assert_eq!(Store::<Exercise>::name_to_id("Front  Squat"), "front_squat");
        store.put(exercise("front_squat", "Front Squat")).unwrap();
        assert!(store.name_exists("front squat"));
        assert!(!store.name_exists("back squat"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Put(u8, u32),
        Delete(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..5, 0u32..100).prop_map(|(k, v)| Op::Put(k, v)),
            (0u8..5).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn test_mutations_match_naive_replay(ops in proptest::collection::vec(op(), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (actual, reloaded) = rt.block_on(async {
                let storage = Arc::new(MemoryStorage::new());
                let mut store = open(&storage).await;
                let mut last = None;
                for op in &ops {
                    last = Some(match op {
                        Op::Put(k, v) => store.put(exercise(&format!("k{}", k), &v.to_string())).unwrap(),
                        Op::Delete(k) => store.delete(&format!("k{}", k)).unwrap(),
                    });
                }
                if let Some(pending) = last {
                    pending.wait().await.unwrap();
                }
                let reloaded = open(&storage).await;
                (store.snapshot().clone(), reloaded.snapshot().clone())
            });

            let mut expected = BTreeMap::new();
            for op in &ops {
                match op {
                    Op::Put(k, v) => {
                        let id = format!("k{}", k);
                        expected.insert(id.clone(), exercise(&id, &v.to_string()));
                    }
                    Op::Delete(k) => {
                        expected.remove(&format!("k{}", k));
                    }
                }
            }

            prop_assert_eq!(&actual, &expected);
            prop_assert_eq!(&reloaded, &expected);
        }
    }
}
