//! In-memory record store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use perch_types::ToolKind;

use super::{RecordKey, RecordStore, StoreError};

/// Volatile record store. Supports raw inserts and injected write failures so
/// the recovery paths of [`super::ConfigStore`] can be exercised.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: Mutex<HashMap<RecordKey, String>>,
    failing_writes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RecordKey, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a blob verbatim, bypassing serialization
    pub fn insert_raw(&self, key: RecordKey, blob: &str) {
        self.entries().insert(key, blob.to_string());
    }

    /// Make the next `count` writes (puts or deletes) fail
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Number of stored records, defaults included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.entries().contains_key(key)
    }

    fn check_write(&self) -> Result<(), StoreError> {
        let injected = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &RecordKey) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &RecordKey, blob: &str) -> Result<(), StoreError> {
        self.check_write()?;
        self.entries().insert(*key, blob.to_string());
        Ok(())
    }

    fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        self.check_write()?;
        self.entries().remove(key);
        Ok(())
    }

    fn instance_keys(&self, tool: ToolKind) -> Result<Vec<RecordKey>, StoreError> {
        let mut keys: Vec<RecordKey> = self
            .entries()
            .keys()
            .filter(|k| matches!(k, RecordKey::Instance(t, _) if *t == tool))
            .copied()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
