//! TOML file record store
//!
//! Layout: `{root}/{tool}/{id}.toml` for instances and
//! `{root}/{tool}/default.toml` for the tool's default record. Writes go to a
//! temporary sibling first and are renamed into place, so a crash mid-write
//! leaves either the old record or the new one.

use std::path::{Path, PathBuf};

use perch_types::{InstanceId, ToolKind};

use super::{RecordKey, RecordStore, StoreError};

const DEFAULT_FILE_STEM: &str = "default";

/// Default directory for instance records: `~/.config/perch/instances` on
/// Linux, `%APPDATA%/perch/instances` on Windows.
pub fn default_store_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("perch")
        .join("instances")
}

/// Record store writing one TOML file per record
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tool_dir(&self, tool: ToolKind) -> PathBuf {
        self.root.join(tool.config_key())
    }

    fn path_for(&self, key: &RecordKey) -> PathBuf {
        match key {
            RecordKey::Instance(tool, id) => self.tool_dir(*tool).join(format!("{id}.toml")),
            RecordKey::Default(tool) => self
                .tool_dir(*tool)
                .join(format!("{DEFAULT_FILE_STEM}.toml")),
        }
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, key: &RecordKey) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn put(&self, key: &RecordKey, blob: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, blob).map_err(|source| StoreError::Write {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })
    }

    fn delete(&self, key: &RecordKey) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { path, source }),
        }
    }

    fn instance_keys(&self, tool: ToolKind) -> Result<Vec<RecordKey>, StoreError> {
        let dir = self.tool_dir(tool);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path: dir, source }),
        };

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            // Skips default.toml and anything else that isn't a positive id
            let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<InstanceId>().ok())
            else {
                continue;
            };
            keys.push(RecordKey::Instance(tool, id));
        }
        keys.sort();
        Ok(keys)
    }
}
