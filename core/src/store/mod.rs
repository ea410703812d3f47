//! Persisted config store
//!
//! Instance records and per-tool default records live in a generic key-value
//! [`RecordStore`]. [`ConfigStore`] layers the record semantics on top:
//!
//! - unreadable or corrupt records are treated as missing and logged
//! - writes are idempotent upserts, retried once before the error surfaces
//! - blocking backend I/O can be pushed onto tokio's blocking pool with
//!   [`ConfigStore::run`] so the caller can await completion

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::{FileRecordStore, default_store_dir};
pub use memory::MemoryRecordStore;

use std::fmt;
use std::sync::Arc;

use perch_types::{DefaultRecord, InstanceId, InstanceRecord, ToolConfig, ToolKind};

// ─────────────────────────────────────────────────────────────────────────────
// Storage Boundary
// ─────────────────────────────────────────────────────────────────────────────

/// Composite key of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    Instance(ToolKind, InstanceId),
    Default(ToolKind),
}

impl RecordKey {
    pub fn tool(&self) -> ToolKind {
        match self {
            RecordKey::Instance(tool, _) | RecordKey::Default(tool) => *tool,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Instance(tool, id) => write!(f, "{tool}/{id}"),
            RecordKey::Default(tool) => write!(f, "{tool}/default"),
        }
    }
}

/// Durable key-value storage for serialized records.
///
/// Implementations must survive process restart; serialization is handled by
/// [`ConfigStore`], so backends only move opaque text around.
pub trait RecordStore: Send + Sync {
    /// Fetch a blob, `Ok(None)` when absent
    fn get(&self, key: &RecordKey) -> Result<Option<String>, StoreError>;

    /// Insert or overwrite a blob
    fn put(&self, key: &RecordKey, blob: &str) -> Result<(), StoreError>;

    /// Remove a blob; removing a missing key succeeds
    fn delete(&self, key: &RecordKey) -> Result<(), StoreError>;

    /// All instance keys stored for a tool kind
    fn instance_keys(&self, tool: ToolKind) -> Result<Vec<RecordKey>, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Store
// ─────────────────────────────────────────────────────────────────────────────

/// Record-level access to instance and default configuration
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn RecordStore>,
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self { backend }
    }

    /// Store backed by TOML files under `dir`
    pub fn open_dir(dir: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(FileRecordStore::new(dir)))
    }

    /// Volatile store, mostly useful for tests
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRecordStore::new()))
    }

    /// Load an instance record. Missing, unreadable and corrupt records all
    /// come back as `None`.
    pub fn load(&self, tool: ToolKind, id: InstanceId) -> Option<InstanceRecord> {
        let key = RecordKey::Instance(tool, id);
        let record: InstanceRecord = self.read(&key)?;
        if record.tool != tool || record.id != id {
            tracing::warn!(%key, stored_tool = %record.tool, stored_id = %record.id, "Record key mismatch, ignoring");
            return None;
        }
        Some(record)
    }

    /// Upsert an instance record
    pub fn save(&self, record: &InstanceRecord) -> Result<(), StoreError> {
        let key = RecordKey::Instance(record.tool, record.id);
        let blob = toml::to_string(record)?;
        self.retry_once(&key, || self.backend.put(&key, &blob))
    }

    pub fn delete(&self, tool: ToolKind, id: InstanceId) -> Result<(), StoreError> {
        let key = RecordKey::Instance(tool, id);
        self.retry_once(&key, || self.backend.delete(&key))
    }

    pub fn load_default(&self, tool: ToolKind) -> Option<DefaultRecord> {
        let key = RecordKey::Default(tool);
        let record: DefaultRecord = self.read(&key)?;
        if record.tool != tool {
            tracing::warn!(%key, stored_tool = %record.tool, "Default record key mismatch, ignoring");
            return None;
        }
        Some(record)
    }

    pub fn save_default(&self, tool: ToolKind, config: &ToolConfig) -> Result<(), StoreError> {
        let key = RecordKey::Default(tool);
        let record = DefaultRecord {
            tool,
            config: config.clone(),
        };
        let blob = toml::to_string(&record)?;
        self.retry_once(&key, || self.backend.put(&key, &blob))
    }

    /// Delete the default record of a tool kind (explicit reset)
    pub fn reset_default(&self, tool: ToolKind) -> Result<(), StoreError> {
        let key = RecordKey::Default(tool);
        self.retry_once(&key, || self.backend.delete(&key))
    }

    /// Every readable instance record of a tool kind, ordered by id
    pub fn list_all(&self, tool: ToolKind) -> Vec<InstanceRecord> {
        let keys = match self.backend.instance_keys(tool) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(%tool, error = %e, "Failed to list records");
                return Vec::new();
            }
        };

        let mut records: Vec<InstanceRecord> = keys
            .into_iter()
            .filter_map(|key| match key {
                RecordKey::Instance(tool, id) => self.load(tool, id),
                RecordKey::Default(_) => None,
            })
            .collect();
        records.sort_by_key(|r| r.id);
        records
    }

    /// Record for a newly allocated instance: the stored record for that id if
    /// one survived a previous session, otherwise a fresh record seeded from
    /// the tool's default record, otherwise from `fallback`.
    pub fn seed(&self, tool: ToolKind, id: InstanceId, fallback: &ToolConfig) -> SeededRecord {
        if let Some(existing) = self.load(tool, id) {
            return SeededRecord {
                record: existing.clone(),
                previous: Some(existing),
            };
        }

        let config = self
            .load_default(tool)
            .map(|d| d.config)
            .unwrap_or_else(|| fallback.clone());
        SeededRecord {
            record: InstanceRecord::new(tool, id, config),
            previous: None,
        }
    }

    /// Run blocking store work on the blocking pool and wait for it
    pub async fn run<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&ConfigStore) -> T + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| StoreError::Worker(e.to_string()))
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &RecordKey) -> Option<T> {
        let blob = match self.backend.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "Failed to read record, using defaults");
                return None;
            }
        };

        match toml::from_str(&blob) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(%key, error = %e, "Corrupt record, using defaults");
                None
            }
        }
    }

    fn retry_once<F>(&self, key: &RecordKey, mut op: F) -> Result<(), StoreError>
    where
        F: FnMut() -> Result<(), StoreError>,
    {
        match op() {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(%key, error = %first, "Record write failed, retrying");
                op().inspect_err(|e| {
                    tracing::warn!(%key, error = %e, "Record write failed after retry");
                })
            }
        }
    }
}

/// Outcome of [`ConfigStore::seed`]
#[derive(Debug, Clone)]
pub struct SeededRecord {
    /// Record to present
    pub record: InstanceRecord,
    /// What was stored under this key before seeding, used for rollback
    pub previous: Option<InstanceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_types::{ConfigValue, Dimension, Geometry};

    fn id(n: u32) -> InstanceId {
        InstanceId::new(n).unwrap()
    }

    fn sample_record() -> InstanceRecord {
        let mut record = InstanceRecord::new(
            ToolKind::Clock,
            id(2),
            ToolConfig::new()
                .with("display_mode", ConfigValue::Text("digital".into()))
                .with("show_seconds", ConfigValue::Bool(true))
                .with("scale", ConfigValue::Float(1.25))
                .with("utc_offset", ConfigValue::Int(-5)),
        );
        record.set_geometry(Geometry::new(-30, 400, Dimension::Natural, Dimension::Pixels(90)));
        record.is_locked = true;
        record.is_active = true;
        record
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = ConfigStore::in_memory();
        let record = sample_record();
        store.save(&record).unwrap();
        assert_eq!(store.load(ToolKind::Clock, id(2)), Some(record));
    }

    #[test]
    fn natural_size_round_trips() {
        let store = ConfigStore::in_memory();
        let mut record = sample_record();
        record.set_geometry(Geometry::new(0, 0, Dimension::Natural, Dimension::Natural));
        store.save(&record).unwrap();
        let loaded = store.load(ToolKind::Clock, id(2)).unwrap();
        assert_eq!(loaded.window_width, Dimension::Natural);
        assert_eq!(loaded.window_height, Dimension::Natural);
    }

    #[test]
    fn oversized_pixels_load_back_unchanged() {
        let store = ConfigStore::in_memory();
        let mut record = sample_record();
        record.set_geometry(Geometry::new(
            0,
            0,
            Dimension::Pixels(u32::MAX),
            Dimension::Pixels(i32::MAX as u32 + 1),
        ));
        store.save(&record).unwrap();
        assert_eq!(store.load(ToolKind::Clock, id(2)), Some(record));
    }

    #[test]
    fn save_overwrites_existing_record() {
        let store = ConfigStore::in_memory();
        let mut record = sample_record();
        store.save(&record).unwrap();
        record.window_x = 999;
        store.save(&record).unwrap();
        assert_eq!(store.load(ToolKind::Clock, id(2)).unwrap().window_x, 999);
        assert_eq!(store.list_all(ToolKind::Clock).len(), 1);
    }

    #[test]
    fn corrupt_record_is_not_found() {
        let backend = Arc::new(MemoryRecordStore::new());
        backend.insert_raw(RecordKey::Instance(ToolKind::Dice, id(1)), "this is = = not toml");
        backend.insert_raw(RecordKey::Default(ToolKind::Dice), "tool = 42");
        let store = ConfigStore::new(backend);

        assert!(store.load(ToolKind::Dice, id(1)).is_none());
        assert!(store.load_default(ToolKind::Dice).is_none());
        assert!(store.list_all(ToolKind::Dice).is_empty());
    }

    #[test]
    fn record_stored_under_wrong_key_is_ignored() {
        let backend = Arc::new(MemoryRecordStore::new());
        let record = sample_record();
        let blob = toml::to_string(&record).unwrap();
        backend.insert_raw(RecordKey::Instance(ToolKind::Clock, id(7)), &blob);
        let store = ConfigStore::new(backend);
        assert!(store.load(ToolKind::Clock, id(7)).is_none());
    }

    #[test]
    fn default_record_round_trip_and_reset() {
        let store = ConfigStore::in_memory();
        let config = ToolConfig::new().with("sides", ConfigValue::Int(12));
        store.save_default(ToolKind::Dice, &config).unwrap();
        assert_eq!(store.load_default(ToolKind::Dice).unwrap().config, config);

        store.reset_default(ToolKind::Dice).unwrap();
        assert!(store.load_default(ToolKind::Dice).is_none());
    }

    #[test]
    fn seed_prefers_existing_then_default_then_fallback() {
        let store = ConfigStore::in_memory();
        let fallback = ToolConfig::new().with("sides", ConfigValue::Int(6));

        let seeded = store.seed(ToolKind::Dice, id(1), &fallback);
        assert!(seeded.previous.is_none());
        assert_eq!(seeded.record.config, fallback);

        let default = ToolConfig::new().with("sides", ConfigValue::Int(20));
        store.save_default(ToolKind::Dice, &default).unwrap();
        let seeded = store.seed(ToolKind::Dice, id(1), &fallback);
        assert_eq!(seeded.record.config, default);

        let mut existing = seeded.record.clone();
        existing.window_x = 77;
        store.save(&existing).unwrap();
        let seeded = store.seed(ToolKind::Dice, id(1), &fallback);
        assert_eq!(seeded.previous.as_ref(), Some(&existing));
        assert_eq!(seeded.record.window_x, 77);
    }

    #[test]
    fn failed_write_is_retried_once() {
        let backend = Arc::new(MemoryRecordStore::new());
        let store = ConfigStore::new(backend.clone());
        let record = sample_record();

        backend.fail_next_writes(1);
        store.save(&record).unwrap();
        assert_eq!(store.load(ToolKind::Clock, id(2)), Some(record.clone()));

        backend.fail_next_writes(2);
        assert!(store.save(&record).is_err());
    }

    #[test]
    fn list_all_is_sorted_and_scoped() {
        let store = ConfigStore::in_memory();
        for n in [3, 1, 2] {
            store
                .save(&InstanceRecord::new(ToolKind::Coin, id(n), ToolConfig::new()))
                .unwrap();
        }
        store
            .save(&InstanceRecord::new(ToolKind::Dice, id(9), ToolConfig::new()))
            .unwrap();
        store.save_default(ToolKind::Coin, &ToolConfig::new()).unwrap();

        let ids: Vec<u32> = store
            .list_all(ToolKind::Coin)
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn run_executes_on_blocking_pool() {
        let store = ConfigStore::in_memory();
        let record = sample_record();
        let saved = record.clone();
        store.run(move |s| s.save(&saved)).await.unwrap().unwrap();
        let loaded = store
            .run(|s| s.load(ToolKind::Clock, InstanceId::new(2).unwrap()))
            .await
            .unwrap();
        assert_eq!(loaded, Some(record));
    }
}
