//! Overlay coordinator
//!
//! A single task owns the registry, the config store, the surface controller
//! and the table of live instances. Commands from [`CoordinatorHandle`]s and
//! events coming back from the UI thread are handled one at a time, so no two
//! operations on an instance ever interleave.
//!
//! Store I/O runs on the blocking pool and is awaited before the command that
//! caused it completes. A failed write is retried once by the store, then
//! logged; the in-memory record stays authoritative.

use std::sync::Arc;

use perch_core::{ConfigStore, InstanceRegistry};
use perch_overlay::{
    PointerEvent, SurfaceController, SurfaceEvent, SurfaceEventKind, default_config,
    requires_rebuild,
};
use perch_types::{
    ConfigValue, Dimension, Geometry, InstanceId, InstanceRecord, PerchSettings, ToolKind,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use super::command::{CoordinatorCommand, CoordinatorHandle};
use super::error::CoordinatorError;
use super::presence::Presence;
use super::state::{InstanceTable, LiveInstance};

const COMMAND_QUEUE: usize = 64;

pub struct OverlayCoordinator {
    registry: Arc<InstanceRegistry>,
    store: ConfigStore,
    surfaces: SurfaceController,
    surface_events: UnboundedReceiver<SurfaceEvent>,
    cmd_rx: mpsc::Receiver<CoordinatorCommand>,
    instances: InstanceTable,
    presence: Presence,
    clone_offset: i32,
    min_size: (u32, u32),
}

impl OverlayCoordinator {
    /// Create a coordinator and return a handle to communicate with it
    pub fn new(
        settings: &PerchSettings,
        registry: Arc<InstanceRegistry>,
        store: ConfigStore,
        surfaces: SurfaceController,
        surface_events: UnboundedReceiver<SurfaceEvent>,
        presence: Presence,
    ) -> (Self, CoordinatorHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let handle = CoordinatorHandle::new(cmd_tx, presence.clone());

        let coordinator = Self {
            registry,
            store,
            surfaces,
            surface_events,
            cmd_rx,
            instances: InstanceTable::default(),
            presence,
            clone_offset: settings.clone_offset_px,
            min_size: (settings.gesture.min_width, settings.gesture.min_height),
        };
        (coordinator, handle)
    }

    /// Run the coordinator on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process commands and surface events until shutdown
    pub async fn run(mut self) {
        tracing::info!("Overlay coordinator started");
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        // Every handle is gone
                        self.shutdown().await;
                        break;
                    };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                Some(event) = self.surface_events.recv() => self.on_surface_event(event).await,
            }
        }
        tracing::info!("Overlay coordinator stopped");
    }

    /// Returns false once the coordinator should stop
    async fn handle_command(&mut self, cmd: CoordinatorCommand) -> bool {
        match cmd {
            CoordinatorCommand::AddInstance { tool, reply } => {
                let _ = reply.send(self.add_instance(tool).await);
            }
            CoordinatorCommand::RemoveInstance { tool, id, reply } => {
                let _ = reply.send(self.remove_instance(tool, id).await);
            }
            CoordinatorCommand::CloneInstance { tool, from, reply } => {
                let _ = reply.send(self.clone_instance(tool, from).await);
            }
            CoordinatorCommand::UpdateConfig {
                tool,
                id,
                field,
                value,
                reply,
            } => {
                let _ = reply.send(self.update_config(tool, id, field, value).await);
            }
            CoordinatorCommand::MoveInstance {
                tool,
                id,
                dx,
                dy,
                reply,
            } => {
                let _ = reply.send(self.move_instance(tool, id, dx, dy).await);
            }
            CoordinatorCommand::ResizeInstance {
                tool,
                id,
                width,
                height,
                reply,
            } => {
                let _ = reply.send(self.resize_instance(tool, id, width, height).await);
            }
            CoordinatorCommand::SetLocked {
                tool,
                id,
                locked,
                reply,
            } => {
                let _ = reply.send(self.set_locked(tool, id, locked).await);
            }
            CoordinatorCommand::InjectPointer {
                tool,
                id,
                event,
                reply,
            } => {
                let _ = reply.send(self.inject_pointer(tool, id, event).await);
            }
            CoordinatorCommand::Restore { reply } => {
                let _ = reply.send(self.restore().await);
            }
            CoordinatorCommand::ResetDefault { tool, reply } => {
                let _ = reply.send(self.reset_default(tool).await);
            }
            CoordinatorCommand::List { reply } => {
                let _ = reply.send(self.instances.records());
            }
            CoordinatorCommand::Shutdown { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    fn live(&self, tool: ToolKind, id: InstanceId) -> Result<&LiveInstance, CoordinatorError> {
        self.instances
            .get(tool, id)
            .ok_or(CoordinatorError::UnknownInstance { tool, id })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    async fn add_instance(&mut self, tool: ToolKind) -> Result<InstanceId, CoordinatorError> {
        let id = self.registry.allocate(tool)?;
        let fallback = default_config(tool);
        let seeded = match self
            .store
            .run(move |store| store.seed(tool, id, &fallback))
            .await
        {
            Ok(seeded) => seeded,
            Err(e) => {
                self.registry.release(tool, id);
                return Err(e.into());
            }
        };

        let mut record = seeded.record;
        record.is_active = true;
        self.launch(record, seeded.previous).await?;
        Ok(id)
    }

    async fn clone_instance(
        &mut self,
        tool: ToolKind,
        from: InstanceId,
    ) -> Result<InstanceId, CoordinatorError> {
        let source = self.live(tool, from)?.record();
        let id = self.registry.allocate(tool)?;
        let previous = match self.store.run(move |store| store.load(tool, id)).await {
            Ok(previous) => previous,
            Err(e) => {
                self.registry.release(tool, id);
                return Err(e.into());
            }
        };

        let mut record = source.clone();
        record.id = id;
        record.set_geometry(
            source
                .geometry()
                .translated(self.clone_offset, self.clone_offset),
        );
        record.is_locked = false;
        record.is_active = true;
        self.launch(record, previous).await?;
        tracing::debug!(%tool, %from, %id, "Instance cloned");
        Ok(id)
    }

    /// Persist a record for an allocated id and present it. On failure the
    /// stored record is rolled back to `previous` and the id is released.
    async fn launch(
        &mut self,
        record: InstanceRecord,
        previous: Option<InstanceRecord>,
    ) -> Result<(), CoordinatorError> {
        let (tool, id) = (record.tool, record.id);
        self.persist(record.clone()).await;

        let surface = match self.surfaces.create(&record).await {
            Ok(surface) => surface,
            Err(e) => {
                tracing::error!(%tool, %id, error = %e, "Surface creation failed, rolling back");
                self.roll_back(tool, id, previous).await;
                return Err(e.into());
            }
        };

        let sink = self.surfaces.state_sink(surface);
        self.instances
            .insert(tool, id, LiveInstance::attach(record, surface, sink));
        self.sync_presence();
        tracing::info!(%tool, %id, %surface, "Instance added");
        Ok(())
    }

    async fn roll_back(&mut self, tool: ToolKind, id: InstanceId, previous: Option<InstanceRecord>) {
        let result = self
            .store
            .run(move |store| match previous {
                Some(previous) => store.save(&previous),
                None => store.delete(tool, id),
            })
            .await
            .and_then(|r| r);
        if let Err(e) = result {
            tracing::warn!(%tool, %id, error = %e, "Failed to roll back instance record");
        }
        self.registry.release(tool, id);
    }

    async fn remove_instance(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
    ) -> Result<bool, CoordinatorError> {
        let Some(mut live) = self.instances.remove(tool, id) else {
            tracing::debug!(%tool, %id, "Remove for unknown instance ignored");
            return Ok(false);
        };

        live.detach();
        self.surfaces.destroy(live.surface()).await;

        let record = live.record();
        let sole = self.registry.is_sole(tool, id);
        let result = self
            .store
            .run(move |store| {
                let promoted = if sole {
                    store.save_default(tool, &record.to_default().config)
                } else {
                    Ok(())
                };
                promoted.and(store.delete(tool, id))
            })
            .await
            .and_then(|r| r);
        if let Err(e) = result {
            tracing::warn!(%tool, %id, error = %e, "Failed to persist instance removal");
        }

        // Only once the writes above have completed
        self.registry.release(tool, id);
        self.sync_presence();
        tracing::info!(%tool, %id, promoted = sole, "Instance removed");
        Ok(true)
    }

    /// Destroy and recreate an instance's surface, resubscribing its state
    async fn rebuild(&mut self, tool: ToolKind, id: InstanceId) -> Result<(), CoordinatorError> {
        let live = self
            .instances
            .get_mut(tool, id)
            .ok_or(CoordinatorError::UnknownInstance { tool, id })?;
        live.detach();
        self.surfaces.destroy(live.surface()).await;

        let record = live.record();
        match self.surfaces.create(&record).await {
            Ok(surface) => {
                live.reattach(surface, self.surfaces.state_sink(surface));
                tracing::info!(%tool, %id, %surface, "Surface rebuilt");
                Ok(())
            }
            Err(e) => {
                tracing::error!(%tool, %id, error = %e, "Surface rebuild failed, closing instance");
                self.instances.remove(tool, id);
                let mut record = record;
                record.is_active = false;
                self.persist(record).await;
                self.registry.release(tool, id);
                self.sync_presence();
                Err(e.into())
            }
        }
    }

    async fn restore(&mut self) -> Result<Vec<(ToolKind, InstanceId)>, CoordinatorError> {
        let stored = self
            .store
            .run(|store| {
                ToolKind::all()
                    .iter()
                    .flat_map(|tool| store.list_all(*tool))
                    .collect::<Vec<_>>()
            })
            .await?;

        let mut restored = Vec::new();
        for record in stored.into_iter().filter(|r| r.is_active) {
            let (tool, id) = (record.tool, record.id);
            if self.instances.contains(tool, id) {
                continue;
            }
            match self.registry.claim(tool, id) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::warn!(%tool, %id, error = %e, "Skipping stored instance");
                    continue;
                }
            }

            let previous = Some(record.clone());
            match self.launch(record, previous).await {
                Ok(()) => restored.push((tool, id)),
                Err(e) => tracing::warn!(%tool, %id, error = %e, "Failed to restore instance"),
            }
        }

        tracing::info!(count = restored.len(), "Instances restored");
        Ok(restored)
    }

    /// Tear everything down but keep the records, marked inactive
    async fn shutdown(&mut self) {
        for mut live in self.instances.drain() {
            live.detach();
            self.surfaces.destroy(live.surface()).await;

            let mut record = live.record();
            record.is_active = false;
            let (tool, id) = (record.tool, record.id);
            self.persist(record).await;
            self.registry.release(tool, id);
        }
        self.sync_presence();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Updates
    // ─────────────────────────────────────────────────────────────────────────

    async fn update_config(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
        field: String,
        value: ConfigValue,
    ) -> Result<bool, CoordinatorError> {
        let live = self.live(tool, id)?;
        let changed = live.update(|record| record.config.set(field.clone(), value));
        if !changed {
            return Ok(false);
        }

        let record = live.record();
        self.persist(record).await;
        if requires_rebuild(tool, &field) {
            self.rebuild(tool, id).await?;
        }
        Ok(true)
    }

    async fn move_instance(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
        dx: i32,
        dy: i32,
    ) -> Result<Geometry, CoordinatorError> {
        let live = self.live(tool, id)?;
        live.update(|record| {
            let moved = record.geometry().translated(dx, dy);
            replace_geometry(record, moved)
        });
        let record = live.record();
        let geometry = record.geometry();
        self.persist(record).await;
        Ok(geometry)
    }

    async fn resize_instance(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
        width: Dimension,
        height: Dimension,
    ) -> Result<Geometry, CoordinatorError> {
        let width = at_least(width, self.min_size.0);
        let height = at_least(height, self.min_size.1);
        let live = self.live(tool, id)?;
        live.update(|record| {
            let resized = record.geometry().with_size(width, height);
            replace_geometry(record, resized)
        });
        let record = live.record();
        let geometry = record.geometry();
        self.persist(record).await;
        Ok(geometry)
    }

    async fn set_locked(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
        locked: bool,
    ) -> Result<bool, CoordinatorError> {
        let live = self.live(tool, id)?;
        let changed = live.update(|record| std::mem::replace(&mut record.is_locked, locked) != locked);
        if changed {
            let record = live.record();
            self.persist(record).await;
            tracing::debug!(%tool, %id, locked, "Lock changed");
        }
        Ok(changed)
    }

    async fn inject_pointer(
        &mut self,
        tool: ToolKind,
        id: InstanceId,
        event: PointerEvent,
    ) -> Result<(), CoordinatorError> {
        let surface = self.live(tool, id)?.surface();
        self.surfaces.inject_pointer(surface, event).await?;
        Ok(())
    }

    async fn reset_default(&mut self, tool: ToolKind) -> Result<(), CoordinatorError> {
        self.store
            .run(move |store| store.reset_default(tool))
            .await
            .and_then(|r| r)?;
        tracing::info!(%tool, "Default record reset");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Surface Events
    // ─────────────────────────────────────────────────────────────────────────

    async fn on_surface_event(&mut self, event: SurfaceEvent) {
        let SurfaceEvent {
            handle,
            tool,
            instance: id,
            kind,
        } = event;
        let Some(live) = self
            .instances
            .get(tool, id)
            .filter(|live| live.surface() == handle)
        else {
            tracing::debug!(%tool, %id, %handle, "Event from detached surface ignored");
            return;
        };

        let commit = kind.is_commit();
        let mut rebuild = false;
        match kind {
            SurfaceEventKind::Moved { x, y, .. } => {
                live.update(|record| {
                    let moved = record.geometry().with_position(x, y);
                    replace_geometry(record, moved)
                });
            }
            SurfaceEventKind::Resized { rect, .. } => {
                let geometry = Geometry::pixels(rect.x, rect.y, rect.width, rect.height);
                live.update(|record| replace_geometry(record, geometry));
            }
            SurfaceEventKind::ConfigRequested { changes, .. } => {
                rebuild = changes.iter().any(|c| requires_rebuild(tool, &c.field));
                live.update(|record| {
                    changes.into_iter().fold(false, |changed, change| {
                        record.config.set(change.field, change.value) | changed
                    })
                });
            }
            SurfaceEventKind::CloseRequested => {
                if let Err(e) = self.remove_instance(tool, id).await {
                    tracing::warn!(%tool, %id, error = %e, "Close failed");
                }
                return;
            }
            SurfaceEventKind::CloneRequested => {
                if let Err(e) = self.clone_instance(tool, id).await {
                    tracing::warn!(%tool, %id, error = %e, "Add-another failed");
                }
                return;
            }
        }

        if commit {
            let record = live.record();
            self.persist(record).await;
        }
        if rebuild && let Err(e) = self.rebuild(tool, id).await {
            tracing::warn!(%tool, %id, error = %e, "Rebuild after content change failed");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Save a record, logging instead of failing
    async fn persist(&self, record: InstanceRecord) -> bool {
        let (tool, id) = (record.tool, record.id);
        match self
            .store
            .run(move |store| store.save(&record))
            .await
            .and_then(|r| r)
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%tool, %id, error = %e, "Failed to persist instance, keeping in-memory state");
                false
            }
        }
    }

    fn sync_presence(&self) {
        self.presence.sync(self.instances.len());
    }
}

/// Swap in a new geometry, reporting whether it differs
fn replace_geometry(record: &mut InstanceRecord, geometry: Geometry) -> bool {
    if record.geometry() == geometry {
        return false;
    }
    record.set_geometry(geometry);
    true
}

fn at_least(dimension: Dimension, min: u32) -> Dimension {
    match dimension {
        Dimension::Pixels(px) => Dimension::Pixels(px.max(min)),
        Dimension::Natural => Dimension::Natural,
    }
}
