//! Coordinator commands and the handle that sends them

use perch_overlay::PointerEvent;
use perch_types::{ConfigValue, Dimension, Geometry, InstanceId, InstanceRecord, ToolKind};
use tokio::sync::{mpsc, oneshot};

use super::error::CoordinatorError;
use super::presence::Presence;

type Reply<T> = oneshot::Sender<Result<T, CoordinatorError>>;

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Messages processed by the coordinator, strictly in arrival order
#[derive(Debug)]
pub enum CoordinatorCommand {
    AddInstance {
        tool: ToolKind,
        reply: Reply<InstanceId>,
    },
    /// Replies `false` when the instance was not live
    RemoveInstance {
        tool: ToolKind,
        id: InstanceId,
        reply: Reply<bool>,
    },
    CloneInstance {
        tool: ToolKind,
        from: InstanceId,
        reply: Reply<InstanceId>,
    },
    /// Replies whether the value actually changed
    UpdateConfig {
        tool: ToolKind,
        id: InstanceId,
        field: String,
        value: ConfigValue,
        reply: Reply<bool>,
    },
    MoveInstance {
        tool: ToolKind,
        id: InstanceId,
        dx: i32,
        dy: i32,
        reply: Reply<Geometry>,
    },
    ResizeInstance {
        tool: ToolKind,
        id: InstanceId,
        width: Dimension,
        height: Dimension,
        reply: Reply<Geometry>,
    },
    SetLocked {
        tool: ToolKind,
        id: InstanceId,
        locked: bool,
        reply: Reply<bool>,
    },
    InjectPointer {
        tool: ToolKind,
        id: InstanceId,
        event: PointerEvent,
        reply: Reply<()>,
    },
    /// Re-present every stored record still marked active
    Restore {
        reply: Reply<Vec<(ToolKind, InstanceId)>>,
    },
    ResetDefault {
        tool: ToolKind,
        reply: Reply<()>,
    },
    List {
        reply: oneshot::Sender<Vec<InstanceRecord>>,
    },
    /// Tear down every surface, keep the records for the next launch
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to communicate with the overlay coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    cmd_tx: mpsc::Sender<CoordinatorCommand>,
    presence: Presence,
}

impl CoordinatorHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<CoordinatorCommand>, presence: Presence) -> Self {
        Self { cmd_tx, presence }
    }

    async fn send<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CoordinatorCommand,
    ) -> Result<T, CoordinatorError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply))
            .await
            .map_err(|_| CoordinatorError::Stopped)?;
        rx.await.map_err(|_| CoordinatorError::Stopped)
    }

    pub async fn add_instance(&self, tool: ToolKind) -> Result<InstanceId, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::AddInstance { tool, reply })
            .await?
    }

    pub async fn remove_instance(
        &self,
        tool: ToolKind,
        id: InstanceId,
    ) -> Result<bool, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::RemoveInstance { tool, id, reply })
            .await?
    }

    pub async fn clone_instance(
        &self,
        tool: ToolKind,
        from: InstanceId,
    ) -> Result<InstanceId, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::CloneInstance { tool, from, reply })
            .await?
    }

    pub async fn update_config(
        &self,
        tool: ToolKind,
        id: InstanceId,
        field: impl Into<String>,
        value: ConfigValue,
    ) -> Result<bool, CoordinatorError> {
        let field = field.into();
        self.send(|reply| CoordinatorCommand::UpdateConfig {
            tool,
            id,
            field,
            value,
            reply,
        })
        .await?
    }

    pub async fn move_instance(
        &self,
        tool: ToolKind,
        id: InstanceId,
        dx: i32,
        dy: i32,
    ) -> Result<Geometry, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::MoveInstance {
            tool,
            id,
            dx,
            dy,
            reply,
        })
        .await?
    }

    pub async fn resize_instance(
        &self,
        tool: ToolKind,
        id: InstanceId,
        width: Dimension,
        height: Dimension,
    ) -> Result<Geometry, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::ResizeInstance {
            tool,
            id,
            width,
            height,
            reply,
        })
        .await?
    }

    pub async fn set_locked(
        &self,
        tool: ToolKind,
        id: InstanceId,
        locked: bool,
    ) -> Result<bool, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::SetLocked {
            tool,
            id,
            locked,
            reply,
        })
        .await?
    }

    pub async fn inject_pointer(
        &self,
        tool: ToolKind,
        id: InstanceId,
        event: PointerEvent,
    ) -> Result<(), CoordinatorError> {
        self.send(|reply| CoordinatorCommand::InjectPointer {
            tool,
            id,
            event,
            reply,
        })
        .await?
    }

    pub async fn restore(&self) -> Result<Vec<(ToolKind, InstanceId)>, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::Restore { reply })
            .await?
    }

    pub async fn reset_default(&self, tool: ToolKind) -> Result<(), CoordinatorError> {
        self.send(|reply| CoordinatorCommand::ResetDefault { tool, reply })
            .await?
    }

    /// Current records of every live instance
    pub async fn list(&self) -> Result<Vec<InstanceRecord>, CoordinatorError> {
        self.send(|reply| CoordinatorCommand::List { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), CoordinatorError> {
        self.send(|reply| CoordinatorCommand::Shutdown { reply })
            .await
    }

    /// Whether the background presence indicator is raised
    pub fn presence_active(&self) -> bool {
        self.presence.is_active()
    }
}
