//! Perch core
//!
//! Instance bookkeeping shared by every overlay tool:
//!
//! - [`registry`] - live instance ids per tool kind, bounded per kind
//! - [`store`] - durable instance and default records
//! - [`channel`] - latest-value-wins state pipeline per instance
//! - [`settings`] - persisted application settings

pub mod channel;
pub mod registry;
pub mod settings;
pub mod store;

pub use channel::{StatePublisher, Subscription};
pub use registry::{InstanceRegistry, RegistryError};
pub use settings::{PerchSettingsExt, SettingsError};
pub use store::{
    ConfigStore, FileRecordStore, MemoryRecordStore, RecordKey, RecordStore, SeededRecord,
    StoreError,
};

pub use perch_types::{
    ConfigValue, DefaultRecord, Dimension, Geometry, GestureSettings, InstanceId, InstanceRecord,
    PerchSettings, ToolConfig, ToolKind,
};
