//! Platform abstraction for overlay surfaces
//!
//! This module defines the trait a presentation backend must implement so the
//! surface controller stays platform-agnostic. A backend is created on, and
//! only ever touched from, the UI thread.

mod headless;

pub use headless::{HeadlessBackend, HeadlessProbe, SurfaceRecord};

use thiserror::Error;

use crate::frame::Frame;
use crate::gesture::{PointerEvent, SurfaceRect};
use crate::surface::SurfaceHandle;

/// Window behavior flags for an overlay surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceFlags {
    /// Whether the surface may take keyboard focus
    pub focusable: bool,
    /// Touches outside the surface reach whatever is beneath it
    pub pass_through_outside: bool,
    /// Every touch, even inside the surface, reaches whatever is beneath it
    pub input_pass_through: bool,
}

impl Default for SurfaceFlags {
    fn default() -> Self {
        Self {
            focusable: false,
            pass_through_outside: true,
            input_pass_through: false,
        }
    }
}

/// Configuration for creating an overlay surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub rect: SurfaceRect,
    /// Unique identifier for this kind of surface (used for window rules)
    pub namespace: String,
    pub flags: SurfaceFlags,
}

/// Errors that can occur in platform operations
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("surface creation failed: {0}")]
    CreateFailed(String),

    #[error("surface update failed: {0}")]
    UpdateFailed(String),

    #[error("unknown surface {0}")]
    UnknownSurface(SurfaceHandle),

    #[error("platform error: {0}")]
    Other(String),
}

/// Trait that all presentation backends must implement
pub trait PresentationBackend: 'static {
    /// Create a surface with the given configuration
    fn create_surface(
        &mut self,
        handle: SurfaceHandle,
        config: &SurfaceConfig,
    ) -> Result<(), PlatformError>;

    /// Move and/or resize a surface
    fn set_geometry(&mut self, handle: SurfaceHandle, rect: SurfaceRect)
    -> Result<(), PlatformError>;

    /// Replace the window flags of a surface
    fn set_flags(&mut self, handle: SurfaceHandle, flags: SurfaceFlags)
    -> Result<(), PlatformError>;

    /// Show a freshly rendered frame
    fn present(&mut self, handle: SurfaceHandle, frame: &Frame) -> Result<(), PlatformError>;

    /// Tear a surface down. Unknown handles are ignored.
    fn destroy_surface(&mut self, handle: SurfaceHandle);

    /// Pending raw pointer events (non-blocking), tagged with their surface
    fn poll_events(&mut self) -> Vec<(SurfaceHandle, PointerEvent)>;
}
