//! Perch Overlay Library
//!
//! Floating tool surfaces: gesture recognition, the surface controller that
//! owns them on a single UI thread, and the per-tool content they display.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    overlays/                        │
//! │   Clock, Spotlight, TrafficLight, Shade, Dice...    │
//! │        (per-tool content behind OverlayContent)     │
//! ├─────────────────────────────────────────────────────┤
//! │                    gesture/                         │
//! │        tap, drag, edge resize, two-finger pinch     │
//! ├─────────────────────────────────────────────────────┤
//! │                    surface                          │
//! │     SurfaceController (UI thread, command channel)  │
//! ├─────────────────────────────────────────────────────┤
//! │                    platform/                        │
//! │     PresentationBackend trait, headless backend     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod frame;
pub mod gesture;
pub mod overlays;
pub mod platform;
pub mod surface;

// Re-export commonly used types
pub use frame::{Color, Frame, Primitive};
pub use gesture::{
    ControlId, GestureEvent, GesturePhase, GestureRecognizer, HitTest, PointerEvent, PointerPhase,
    ResizeHandle, ResizeMode, ShapeSize, SurfaceRect, TapTarget,
};
pub use overlays::{ConfigChange, OverlayContent, content_for, default_config, requires_rebuild};
pub use platform::{
    HeadlessBackend, HeadlessProbe, PlatformError, PresentationBackend, SurfaceConfig,
    SurfaceFlags, SurfaceRecord,
};
pub use surface::{
    StateSink, SurfaceController, SurfaceError, SurfaceEvent, SurfaceEventKind, SurfaceHandle,
    SurfaceSettings, SurfaceSnapshot,
};
