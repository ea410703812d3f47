//! Error types for record storage

use std::path::PathBuf;

use perch_types::{InstanceId, ToolKind};
use thiserror::Error;

/// Errors during record storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read record {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write record {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove record {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create record directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record")]
    Serialize(#[from] toml::ser::Error),

    #[error("record for {tool} #{id} is not live")]
    StaleRecord { tool: ToolKind, id: InstanceId },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage worker failed: {0}")]
    Worker(String),
}
