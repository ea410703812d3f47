use std::sync::Arc;
use std::time::Instant;

use perch_app::{CoordinatorHandle, Presence, start_headless};
use perch_core::{ConfigStore, InstanceRegistry, PerchSettingsExt};
use perch_overlay::HeadlessProbe;
use perch_types::PerchSettings;
use tokio::task::JoinHandle;

/// Holds all shared state for the CLI application.
/// Overlays run on the headless backend; the probe shows what they display.
pub struct CliContext {
    pub settings: PerchSettings,
    pub overlays: CoordinatorHandle,
    pub registry: Arc<InstanceRegistry>,
    pub probe: HeadlessProbe,
    coordinator: JoinHandle<()>,
    started: Instant,
}

impl CliContext {
    /// Load settings and start the coordinator. Must run inside a tokio runtime.
    pub fn new() -> Result<Self, String> {
        let settings = PerchSettings::load();
        let store = ConfigStore::open_dir(settings.resolved_store_dir());
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: PerchSettings, store: ConfigStore) -> Result<Self, String> {
        let overlays =
            start_headless(&settings, store, Presence::default()).map_err(|e| e.to_string())?;
        Ok(Self {
            settings,
            overlays: overlays.handle,
            registry: overlays.registry,
            probe: overlays.probe,
            coordinator: overlays.task,
            started: Instant::now(),
        })
    }

    /// Pointer timestamp for synthesized events
    pub fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Stop every overlay and wait for the coordinator to finish
    pub async fn shutdown(self) -> Result<(), String> {
        self.overlays.shutdown().await.map_err(|e| e.to_string())?;
        self.coordinator.await.map_err(|e| e.to_string())
    }
}
