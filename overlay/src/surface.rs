//! Surface controller
//!
//! Owns every overlay surface through a single UI thread. Callers on any
//! thread talk to it over a command channel; the UI thread applies commands,
//! polls the presentation backend for pointer input, runs each surface's
//! gesture recognizer and reports what happened as [`SurfaceEvent`]s.
//!
//! # Threading Model
//!
//! Native window handles generally must be used from the thread that created
//! them, so the backend is created INSIDE the UI thread via a factory and
//! never leaves it. The same holds for tool content.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use perch_types::{
    Dimension, Geometry, GestureSettings, InstanceId, InstanceRecord, PerchSettings, ToolConfig,
    ToolKind,
};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

use crate::gesture::{
    ControlId, GestureEvent, GesturePhase, GestureRecognizer, PointerEvent, PointerPhase,
    SurfaceRect,
};
use crate::overlays::{ConfigChange, ContentHitTest, OverlayContent, compose, content_for};
use crate::platform::{PlatformError, PresentationBackend, SurfaceConfig, SurfaceFlags};

// ─────────────────────────────────────────────────────────────────────────────
// Handles, Errors, Events
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque reference to a live surface. Invalid once the surface is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to create surface for {tool} #{instance}")]
    CreationFailed {
        tool: ToolKind,
        instance: InstanceId,
        #[source]
        source: PlatformError,
    },

    #[error("stale surface handle {0}")]
    StaleHandle(SurfaceHandle),

    #[error("surface UI thread is gone")]
    UiThreadGone,

    #[error("presentation backend unavailable")]
    Backend(#[source] PlatformError),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Something the user did to a surface
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEventKind {
    /// Surface was dragged to a new position
    Moved { x: i32, y: i32, commit: bool },
    /// Surface was resized (edge band or pinch)
    Resized { rect: SurfaceRect, commit: bool },
    /// Content asked for config changes
    ConfigRequested {
        changes: Vec<ConfigChange>,
        commit: bool,
    },
    /// Close control activated
    CloseRequested,
    /// Add-another control activated
    CloneRequested,
}

impl SurfaceEventKind {
    /// True once the interaction is over and the result should be persisted
    pub fn is_commit(&self) -> bool {
        match self {
            SurfaceEventKind::Moved { commit, .. }
            | SurfaceEventKind::Resized { commit, .. }
            | SurfaceEventKind::ConfigRequested { commit, .. } => *commit,
            SurfaceEventKind::CloseRequested | SurfaceEventKind::CloneRequested => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEvent {
    pub handle: SurfaceHandle,
    pub tool: ToolKind,
    pub instance: InstanceId,
    pub kind: SurfaceEventKind,
}

/// Point-in-time view of a surface as the UI thread sees it
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSnapshot {
    pub tool: ToolKind,
    pub instance: InstanceId,
    pub geometry: Geometry,
    pub rect: SurfaceRect,
    pub flags: SurfaceFlags,
    pub locked: bool,
    pub phase: GesturePhase,
}

/// Tunables for the UI thread
#[derive(Debug, Clone)]
pub struct SurfaceSettings {
    pub gesture: GestureSettings,
    /// How long input pass-through stays on after being enabled
    pub pass_through_restore: Duration,
    /// Sleep between UI loop iterations
    pub poll_interval: Duration,
}

impl SurfaceSettings {
    pub fn from_settings(settings: &PerchSettings) -> Self {
        Self {
            gesture: settings.gesture,
            pass_through_restore: Duration::from_millis(settings.pass_through_restore_ms),
            ..Self::default()
        }
    }
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            gesture: GestureSettings::default(),
            pass_through_restore: Duration::from_millis(40),
            poll_interval: Duration::from_millis(8),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

enum UiCommand {
    Create {
        handle: SurfaceHandle,
        record: InstanceRecord,
        reply: oneshot::Sender<Result<(), PlatformError>>,
    },
    UpdateGeometry {
        handle: SurfaceHandle,
        geometry: Geometry,
        reply: oneshot::Sender<Result<bool, SurfaceError>>,
    },
    ApplyState {
        handle: SurfaceHandle,
        record: InstanceRecord,
    },
    SetPassThrough {
        handle: SurfaceHandle,
        enabled: bool,
        reply: oneshot::Sender<Result<(), SurfaceError>>,
    },
    InjectPointer {
        handle: SurfaceHandle,
        event: PointerEvent,
        reply: oneshot::Sender<Result<(), SurfaceError>>,
    },
    Snapshot {
        handle: SurfaceHandle,
        reply: oneshot::Sender<Option<SurfaceSnapshot>>,
    },
    Destroy {
        handle: SurfaceHandle,
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-side handle to the UI thread
#[derive(Debug)]
pub struct SurfaceController {
    tx: UnboundedSender<UiCommand>,
    next_handle: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Fire-and-forget state delivery for one surface, handed to the instance's
/// state channel subscription
#[derive(Debug, Clone)]
pub struct StateSink {
    tx: UnboundedSender<UiCommand>,
    handle: SurfaceHandle,
}

impl StateSink {
    pub fn apply(&self, record: InstanceRecord) {
        let _ = self.tx.send(UiCommand::ApplyState {
            handle: self.handle,
            record,
        });
    }
}

impl fmt::Debug for UiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UiCommand::Create { .. } => "Create",
            UiCommand::UpdateGeometry { .. } => "UpdateGeometry",
            UiCommand::ApplyState { .. } => "ApplyState",
            UiCommand::SetPassThrough { .. } => "SetPassThrough",
            UiCommand::InjectPointer { .. } => "InjectPointer",
            UiCommand::Snapshot { .. } => "Snapshot",
            UiCommand::Destroy { .. } => "Destroy",
            UiCommand::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl SurfaceController {
    /// Start the UI thread. The backend is created inside it by `create_backend`.
    ///
    /// Returns `Err` if backend creation fails (confirmed via channel from the
    /// spawned thread).
    pub fn spawn<B, F>(
        create_backend: F,
        settings: SurfaceSettings,
    ) -> Result<(Self, UnboundedReceiver<SurfaceEvent>), SurfaceError>
    where
        B: PresentationBackend,
        F: FnOnce() -> Result<B, PlatformError> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<UiCommand>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (confirm_tx, confirm_rx) = std::sync::mpsc::channel::<Result<(), PlatformError>>();

        let thread = thread::Builder::new()
            .name("perch-ui".to_string())
            .spawn(move || {
                // Create the backend INSIDE this thread
                let backend = match create_backend() {
                    Ok(b) => {
                        let _ = confirm_tx.send(Ok(()));
                        b
                    }
                    Err(e) => {
                        let _ = confirm_tx.send(Err(e));
                        return;
                    }
                };

                let poll_interval = settings.poll_interval;
                let mut ui = UiThread::new(backend, event_tx, settings);

                loop {
                    // Process all pending commands
                    loop {
                        match rx.try_recv() {
                            Ok(UiCommand::Shutdown) => {
                                ui.destroy_all();
                                return;
                            }
                            Ok(cmd) => ui.handle_command(cmd),
                            Err(TryRecvError::Empty) => break,
                            Err(TryRecvError::Disconnected) => {
                                ui.destroy_all();
                                return;
                            }
                        }
                    }

                    for (handle, event) in ui.backend.poll_events() {
                        if let Err(e) = ui.pointer(handle, event) {
                            tracing::debug!(%handle, error = %e, "Dropping pointer event");
                        }
                    }

                    ui.restore_pass_through(Instant::now());

                    thread::sleep(poll_interval);
                }
            })
            .map_err(|e| SurfaceError::Backend(PlatformError::Other(e.to_string())))?;

        // Wait for confirmation from the spawned thread
        match confirm_rx.recv() {
            Ok(Ok(())) => Ok((
                Self {
                    tx,
                    next_handle: AtomicU64::new(1),
                    thread: Mutex::new(Some(thread)),
                },
                event_rx,
            )),
            Ok(Err(e)) => Err(SurfaceError::Backend(e)),
            Err(_) => Err(SurfaceError::UiThreadGone),
        }
    }

    fn send(&self, cmd: UiCommand) -> Result<(), SurfaceError> {
        self.tx.send(cmd).map_err(|_| SurfaceError::UiThreadGone)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> UiCommand,
    ) -> Result<T, SurfaceError> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply))?;
        rx.await.map_err(|_| SurfaceError::UiThreadGone)
    }

    /// Present a surface for an instance record. Non-focus-stealing and
    /// passing outside touches through; the caller rolls back on failure.
    pub async fn create(&self, record: &InstanceRecord) -> Result<SurfaceHandle, SurfaceError> {
        let handle = SurfaceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let record = record.clone();
        let (tool, instance) = (record.tool, record.id);
        self.request(|reply| UiCommand::Create {
            handle,
            record,
            reply,
        })
        .await?
        .map_err(|source| SurfaceError::CreationFailed {
            tool,
            instance,
            source,
        })?;
        Ok(handle)
    }

    /// Move/resize a surface. Returns whether anything actually changed.
    pub async fn update_geometry(
        &self,
        handle: SurfaceHandle,
        geometry: Geometry,
    ) -> Result<bool, SurfaceError> {
        self.request(|reply| UiCommand::UpdateGeometry {
            handle,
            geometry,
            reply,
        })
        .await?
    }

    /// Let touches fall through the surface. Enabling is undone automatically
    /// after the configured restore delay.
    pub async fn set_input_pass_through(
        &self,
        handle: SurfaceHandle,
        enabled: bool,
    ) -> Result<(), SurfaceError> {
        self.request(|reply| UiCommand::SetPassThrough {
            handle,
            enabled,
            reply,
        })
        .await?
    }

    /// Feed a raw pointer event to a surface as if the platform delivered it
    pub async fn inject_pointer(
        &self,
        handle: SurfaceHandle,
        event: PointerEvent,
    ) -> Result<(), SurfaceError> {
        self.request(|reply| UiCommand::InjectPointer {
            handle,
            event,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self, handle: SurfaceHandle) -> Result<SurfaceSnapshot, SurfaceError> {
        self.request(|reply| UiCommand::Snapshot { handle, reply })
            .await?
            .ok_or(SurfaceError::StaleHandle(handle))
    }

    /// Tear a surface down. Returns false for an already-detached handle.
    pub async fn destroy(&self, handle: SurfaceHandle) -> bool {
        self.request(|reply| UiCommand::Destroy { handle, reply })
            .await
            .unwrap_or(false)
    }

    /// State delivery for a surface's subscription
    pub fn state_sink(&self, handle: SurfaceHandle) -> StateSink {
        StateSink {
            tx: self.tx.clone(),
            handle,
        }
    }

    /// Destroy every surface and stop the UI thread
    pub fn shutdown(&self) {
        let _ = self.tx.send(UiCommand::Shutdown);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread
            && thread.join().is_err()
        {
            tracing::error!("Surface UI thread panicked");
        }
    }
}

impl Drop for SurfaceController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// UI Thread
// ─────────────────────────────────────────────────────────────────────────────

struct LiveSurface {
    tool: ToolKind,
    instance: InstanceId,
    content: Box<dyn OverlayContent>,
    recognizer: GestureRecognizer,
    config: ToolConfig,
    geometry: Geometry,
    rect: SurfaceRect,
    flags: SurfaceFlags,
    locked: bool,
    restore_at: Option<Instant>,
}

impl LiveSurface {
    fn resolve(&self, geometry: Geometry) -> SurfaceRect {
        SurfaceRect::from_geometry(geometry, self.content.natural_size())
    }

    fn apply_changes(&mut self, changes: &[ConfigChange]) -> bool {
        let mut changed = false;
        for change in changes {
            changed |= self.config.set(change.field.clone(), change.value.clone());
        }
        if changed {
            self.content.update(&self.config);
        }
        changed
    }

    fn snapshot(&self) -> SurfaceSnapshot {
        SurfaceSnapshot {
            tool: self.tool,
            instance: self.instance,
            geometry: self.geometry,
            rect: self.rect,
            flags: self.flags,
            locked: self.locked,
            phase: self.recognizer.phase(),
        }
    }
}

struct UiThread<B> {
    backend: B,
    surfaces: HashMap<SurfaceHandle, LiveSurface>,
    events: UnboundedSender<SurfaceEvent>,
    settings: SurfaceSettings,
}

impl<B: PresentationBackend> UiThread<B> {
    fn new(backend: B, events: UnboundedSender<SurfaceEvent>, settings: SurfaceSettings) -> Self {
        Self {
            backend,
            surfaces: HashMap::new(),
            events,
            settings,
        }
    }

    fn handle_command(&mut self, cmd: UiCommand) {
        match cmd {
            UiCommand::Create {
                handle,
                record,
                reply,
            } => {
                let _ = reply.send(self.create(handle, record));
            }
            UiCommand::UpdateGeometry {
                handle,
                geometry,
                reply,
            } => {
                let _ = reply.send(self.update_geometry(handle, geometry));
            }
            UiCommand::ApplyState { handle, record } => self.apply_state(handle, record),
            UiCommand::SetPassThrough {
                handle,
                enabled,
                reply,
            } => {
                let _ = reply.send(self.set_pass_through(handle, enabled));
            }
            UiCommand::InjectPointer {
                handle,
                event,
                reply,
            } => {
                let _ = reply.send(self.pointer(handle, event));
            }
            UiCommand::Snapshot { handle, reply } => {
                let _ = reply.send(self.surfaces.get(&handle).map(LiveSurface::snapshot));
            }
            UiCommand::Destroy { handle, reply } => {
                let _ = reply.send(self.destroy(handle));
            }
            UiCommand::Shutdown => self.destroy_all(),
        }
    }

    fn create(&mut self, handle: SurfaceHandle, record: InstanceRecord) -> Result<(), PlatformError> {
        let mut content = content_for(record.tool);
        content.update(&record.config);
        let geometry = record.geometry();
        let rect = SurfaceRect::from_geometry(geometry, content.natural_size());
        let flags = SurfaceFlags::default();

        self.backend.create_surface(
            handle,
            &SurfaceConfig {
                rect,
                namespace: record.tool.namespace().to_string(),
                flags,
            },
        )?;

        let mut recognizer = GestureRecognizer::new(self.settings.gesture);
        recognizer.set_locked(record.is_locked);

        let surface = LiveSurface {
            tool: record.tool,
            instance: record.id,
            content,
            recognizer,
            config: record.config,
            geometry,
            rect,
            flags,
            locked: record.is_locked,
            restore_at: None,
        };
        tracing::debug!(%handle, tool = %surface.tool, instance = %surface.instance, ?rect, "Surface created");
        self.surfaces.insert(handle, surface);
        self.present(handle);
        Ok(())
    }

    fn update_geometry(
        &mut self,
        handle: SurfaceHandle,
        geometry: Geometry,
    ) -> Result<bool, SurfaceError> {
        let surface = self
            .surfaces
            .get_mut(&handle)
            .ok_or(SurfaceError::StaleHandle(handle))?;
        let rect = surface.resolve(geometry);
        if rect == surface.rect {
            surface.geometry = geometry;
            tracing::debug!(%handle, "Geometry unchanged, skipping update");
            return Ok(false);
        }

        let resized = rect.size() != surface.rect.size();
        self.backend.set_geometry(handle, rect)?;
        surface.geometry = geometry;
        surface.rect = rect;
        if resized {
            self.present(handle);
        }
        Ok(true)
    }

    fn apply_state(&mut self, handle: SurfaceHandle, record: InstanceRecord) {
        let Some(surface) = self.surfaces.get_mut(&handle) else {
            tracing::debug!(%handle, "State for detached surface ignored");
            return;
        };

        let config_changed = surface.config != record.config;
        if config_changed {
            surface.config = record.config.clone();
            surface.content.update(&surface.config);
        }

        if surface.locked != record.is_locked {
            surface.locked = record.is_locked;
            surface.recognizer.set_locked(record.is_locked);
        }

        // A surface under the finger owns its own geometry until the gesture ends
        let geometry = if surface.recognizer.phase() == GesturePhase::Idle {
            record.geometry()
        } else {
            surface.geometry
        };

        if let Err(e) = self.update_geometry(handle, geometry) {
            tracing::warn!(%handle, error = %e, "Failed to apply geometry");
        }
        if config_changed {
            self.present(handle);
        }
    }

    fn set_pass_through(&mut self, handle: SurfaceHandle, enabled: bool) -> Result<(), SurfaceError> {
        let surface = self
            .surfaces
            .get_mut(&handle)
            .ok_or(SurfaceError::StaleHandle(handle))?;
        surface.restore_at = enabled.then(|| Instant::now() + self.settings.pass_through_restore);
        if surface.flags.input_pass_through != enabled {
            surface.flags.input_pass_through = enabled;
            self.backend.set_flags(handle, surface.flags)?;
        }
        Ok(())
    }

    fn restore_pass_through(&mut self, now: Instant) {
        let due: Vec<SurfaceHandle> = self
            .surfaces
            .iter()
            .filter(|(_, s)| s.restore_at.is_some_and(|at| at <= now))
            .map(|(h, _)| *h)
            .collect();
        for handle in due {
            if let Err(e) = self.set_pass_through(handle, false) {
                tracing::warn!(%handle, error = %e, "Failed to restore input handling");
            }
        }
    }

    fn pointer(&mut self, handle: SurfaceHandle, event: PointerEvent) -> Result<(), SurfaceError> {
        let surface = self
            .surfaces
            .get_mut(&handle)
            .ok_or(SurfaceError::StaleHandle(handle))?;
        if surface.flags.input_pass_through {
            return Ok(());
        }

        let gestures = surface.recognizer.handle(
            &event,
            surface.rect,
            &ContentHitTest(surface.content.as_ref()),
        );
        for gesture in gestures {
            self.on_gesture(handle, gesture)?;
        }
        Ok(())
    }

    fn on_gesture(&mut self, handle: SurfaceHandle, gesture: GestureEvent) -> Result<(), SurfaceError> {
        let surface = self
            .surfaces
            .get_mut(&handle)
            .ok_or(SurfaceError::StaleHandle(handle))?;

        let kind = match gesture {
            GestureEvent::Tap { target, .. } => {
                let changes = surface.content.on_tap(target, false);
                if changes.is_empty() && surface.content.passes_taps_through() {
                    return self.set_pass_through(handle, true);
                }
                self.content_changes(handle, changes, true)
            }
            GestureEvent::DoubleTap { target } => {
                let changes = surface.content.on_tap(target, true);
                self.content_changes(handle, changes, true)
            }
            GestureEvent::Control {
                control,
                phase: PointerPhase::Up,
            } => match control {
                ControlId::Close => Some(SurfaceEventKind::CloseRequested),
                ControlId::Clone => Some(SurfaceEventKind::CloneRequested),
                ControlId::Action(action) => {
                    let changes = surface.content.on_action(action);
                    self.content_changes(handle, changes, true)
                }
            },
            GestureEvent::Control { .. } => None,
            GestureEvent::Moved { rect, .. } => {
                surface.geometry = surface.geometry.with_position(rect.x, rect.y);
                self.backend.set_geometry(handle, rect)?;
                surface.rect = rect;
                Some(SurfaceEventKind::Moved {
                    x: rect.x,
                    y: rect.y,
                    commit: false,
                })
            }
            GestureEvent::MoveFinished { rect } => Some(SurfaceEventKind::Moved {
                x: rect.x,
                y: rect.y,
                commit: true,
            }),
            GestureEvent::Resized { rect } => {
                surface.geometry = Geometry::new(
                    rect.x,
                    rect.y,
                    Dimension::Pixels(rect.width),
                    Dimension::Pixels(rect.height),
                );
                self.backend.set_geometry(handle, rect)?;
                surface.rect = rect;
                self.present(handle);
                Some(SurfaceEventKind::Resized {
                    rect,
                    commit: false,
                })
            }
            GestureEvent::ResizeFinished { rect } => {
                Some(SurfaceEventKind::Resized { rect, commit: true })
            }
            GestureEvent::ShapeScaled { size, .. } => {
                let changes = surface.content.shape_changes(size);
                self.content_changes(handle, changes, false)
            }
            GestureEvent::ShapeScaleFinished { size } => {
                let changes = surface.content.shape_changes(size);
                self.content_changes(handle, changes, true)
            }
        };

        if let Some(kind) = kind {
            self.emit(handle, kind);
        }
        Ok(())
    }

    /// Apply content-requested changes locally and turn them into an event
    fn content_changes(
        &mut self,
        handle: SurfaceHandle,
        changes: Vec<ConfigChange>,
        commit: bool,
    ) -> Option<SurfaceEventKind> {
        let surface = self.surfaces.get_mut(&handle)?;
        if changes.is_empty() {
            return None;
        }
        if surface.apply_changes(&changes) {
            self.present(handle);
        }
        Some(SurfaceEventKind::ConfigRequested { changes, commit })
    }

    fn emit(&self, handle: SurfaceHandle, kind: SurfaceEventKind) {
        let Some(surface) = self.surfaces.get(&handle) else {
            return;
        };
        let _ = self.events.send(SurfaceEvent {
            handle,
            tool: surface.tool,
            instance: surface.instance,
            kind,
        });
    }

    fn present(&mut self, handle: SurfaceHandle) {
        let Some(surface) = self.surfaces.get(&handle) else {
            return;
        };
        let frame = compose(surface.content.as_ref(), surface.rect.size());
        if let Err(e) = self.backend.present(handle, &frame) {
            tracing::warn!(%handle, error = %e, "Failed to present frame");
        }
    }

    fn destroy(&mut self, handle: SurfaceHandle) -> bool {
        match self.surfaces.remove(&handle) {
            Some(surface) => {
                tracing::debug!(%handle, tool = %surface.tool, instance = %surface.instance, "Surface destroyed");
                self.backend.destroy_surface(handle);
                true
            }
            None => {
                tracing::debug!(%handle, "Destroy of detached surface ignored");
                false
            }
        }
    }

    fn destroy_all(&mut self) {
        let handles: Vec<SurfaceHandle> = self.surfaces.keys().copied().collect();
        for handle in handles {
            self.destroy(handle);
        }
    }
}

#[cfg(test)]
#[path = "surface_tests.rs"]
mod tests;
