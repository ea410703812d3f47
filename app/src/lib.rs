//! Perch application layer
//!
//! Hosts the overlay coordinator that owns every live tool instance, and the
//! logging setup shared by the binaries.

pub mod logging;
pub mod overlay;

pub use overlay::{
    CoordinatorCommand, CoordinatorError, CoordinatorHandle, HeadlessOverlays, LogPresence,
    OverlayCoordinator, Presence, PresenceIndicator, start_headless,
};
