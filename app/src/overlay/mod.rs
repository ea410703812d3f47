//! Overlay management module
//!
//! Handles instance lifecycle across every tool kind.
//!
//! # Module Structure
//!
//! - `command` - Commands and the cloneable [`CoordinatorHandle`]
//! - `coordinator` - The [`OverlayCoordinator`] task
//! - `state` - Live instance table
//! - `presence` - Background presence indicator
//! - `error` - [`CoordinatorError`]

mod command;
mod coordinator;
mod error;
mod presence;
mod state;


use std::sync::Arc;

use perch_core::{ConfigStore, InstanceRegistry};
use perch_overlay::{HeadlessBackend, HeadlessProbe, SurfaceController, SurfaceSettings};
use perch_types::PerchSettings;
use tokio::task::JoinHandle;

pub use command::{CoordinatorCommand, CoordinatorHandle};
pub use coordinator::OverlayCoordinator;
pub use error::CoordinatorError;
pub use presence::{LogPresence, Presence, PresenceIndicator};

/// A running coordinator over the headless presentation backend
#[derive(Debug)]
pub struct HeadlessOverlays {
    pub handle: CoordinatorHandle,
    pub registry: Arc<InstanceRegistry>,
    pub probe: HeadlessProbe,
    pub task: JoinHandle<()>,
}

/// Wire up registry, surface controller and coordinator over a headless
/// backend and start the coordinator task. Must be called inside a tokio
/// runtime.
pub fn start_headless(
    settings: &PerchSettings,
    store: ConfigStore,
    presence: Presence,
) -> Result<HeadlessOverlays, CoordinatorError> {
    let (backend, probe) = HeadlessBackend::new();
    let (surfaces, surface_events) =
        SurfaceController::spawn(move || Ok(backend), SurfaceSettings::from_settings(settings))?;

    let registry = Arc::new(InstanceRegistry::from_settings(settings));
    let (coordinator, handle) = OverlayCoordinator::new(
        settings,
        Arc::clone(&registry),
        store,
        surfaces,
        surface_events,
        presence,
    );

    Ok(HeadlessOverlays {
        handle,
        registry,
        probe,
        task: coordinator.spawn(),
    })
}
