use perch_core::{RegistryError, StoreError};
use perch_overlay::SurfaceError;
use perch_types::{InstanceId, ToolKind};
use thiserror::Error;

/// Errors reported by coordinator commands
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("{tool} #{id} is not running")]
    UnknownInstance { tool: ToolKind, id: InstanceId },

    #[error("overlay coordinator has stopped")]
    Stopped,
}
