//! In-process document store.
//!
//! Same upsert semantics as [`PgStore`](crate::PgStore); used for dry runs
//! and to exercise pipelines without a database.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use plebis_core::ExternalId;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::{DocumentStore, merge_top_level};

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<ExternalId, Value>>,
    writes: AtomicUsize,
    /// Remaining `exists` calls that fail with `Unavailable`
    failing_exists: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `exists` fail
    pub fn fail_next_exists(&self, n: usize) {
        self.failing_exists.store(n, Ordering::SeqCst);
    }

    /// Number of upserts performed
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every stored document, in ID order
    pub fn snapshot(&self) -> BTreeMap<ExternalId, Value> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ExternalId, Value>> {
        // A panic while holding the lock cannot leave a half-written map
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn exists(&self, id: ExternalId) -> Result<bool, StoreError> {
        let injected = self
            .failing_exists
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if injected.is_ok() {
            return Err(StoreError::Unavailable(format!("exists({id})")));
        }
        Ok(self.lock().contains_key(&id))
    }

    async fn upsert(&self, id: ExternalId, doc: &Value) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut docs = self.lock();
        match docs.get_mut(&id) {
            Some(stored) => merge_top_level(stored, doc),
            None => {
                docs.insert(id, doc.clone());
            }
        }
        Ok(())
    }

    async fn get(&self, id: ExternalId) -> Result<Option<Value>, StoreError> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn scan_published(
        &self,
        after: ExternalId,
        limit: usize,
    ) -> Result<Vec<(ExternalId, Value)>, StoreError> {
        let docs = self.lock();
        Ok(docs
            .range(after.saturating_add(1)..)
            .filter(|(_, doc)| doc["meta"]["available"] == Value::Bool(true))
            .take(limit)
            .map(|(id, doc)| (*id, doc.clone()))
            .collect())
    }
}
