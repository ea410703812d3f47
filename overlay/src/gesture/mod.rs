//! Gesture recognition for overlay surfaces
//!
//! One [`GestureRecognizer`] per surface turns the raw pointer stream into
//! taps, drags, edge resizes and two-finger pinches. It runs synchronously on
//! the UI thread, performs no I/O, and keeps at most one session at a time.
//!
//! ```text
//!   IDLE ──down──▶ DOWN ──move > slop──▶ DRAGGING ──up/cancel──▶ IDLE
//!                   │  │                                (move finished)
//!                   │  └──move > slop in edge band──▶ RESIZING ──▶ IDLE
//!                   │  └──second pointer down──────▶ RESIZING (pinch)
//!                   └──up (fast, within slop)──▶ TAP ──▶ IDLE
//! ```
//!
//! Pointer coordinates are screen coordinates, so a surface moving under the
//! finger does not feed back into the deltas.

mod geometry;

#[cfg(test)]
mod recognizer_tests;

pub use geometry::{ResizeHandle, ShapeSize, SurfaceRect};

use perch_types::GestureSettings;

use geometry::{angle_deg, distance, scale_rect, wrap_degrees};

// ─────────────────────────────────────────────────────────────────────────────
// Input
// ─────────────────────────────────────────────────────────────────────────────

/// Phase of a raw pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
    SecondPointerDown,
    SecondPointerUp,
}

/// One raw pointer sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub pointer_id: u32,
    /// Screen X
    pub x: f32,
    /// Screen Y
    pub y: f32,
    /// Milliseconds on a monotonic clock
    pub timestamp_ms: u64,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, pointer_id: u32, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self {
            phase,
            pointer_id,
            x,
            y,
            timestamp_ms,
        }
    }

    fn pos(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Interactive child control of a surface. Touches on a control never start a
/// gesture; they are routed to the control instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// Close this instance
    Close,
    /// Open another instance with this one's settings
    Clone,
    /// Tool-specific action (roll, flip, spin...)
    Action(&'static str),
}

/// Identity of the region a tap landed on, used to pair double taps
pub type TapTarget = u32;

/// How a surface may be resized by single-pointer gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// No edge resizing; pinch still scales the window
    None,
    /// Edge and corner bands resize the window
    #[default]
    Edges,
}

/// What the recognizer needs to know about a surface's content.
/// All points are surface-local.
pub trait HitTest {
    /// Control under the point, if any
    fn control_at(&self, x: f32, y: f32, size: (u32, u32)) -> Option<ControlId>;

    /// Region identity for double-tap pairing
    fn tap_target_at(&self, _x: f32, _y: f32, _size: (u32, u32)) -> TapTarget {
        0
    }

    /// Whether a drag starting here may move the surface
    fn in_drag_region(&self, _x: f32, _y: f32, _size: (u32, u32)) -> bool {
        true
    }

    fn resize_mode(&self) -> ResizeMode {
        ResizeMode::Edges
    }

    /// Scalable shape drawn in the surface. When present, pinches scale the
    /// shape instead of the window.
    fn shape(&self) -> Option<ShapeSize> {
        None
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

/// Recognized gesture output
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Short press without movement (surface-local point)
    Tap { target: TapTarget, x: f32, y: f32 },
    /// Second tap on the same target within the double-tap window
    DoubleTap { target: TapTarget },
    /// Raw pointer phase routed to a control
    Control { control: ControlId, phase: PointerPhase },
    /// Drag step relative to the previous step
    Moved { dx: i32, dy: i32, rect: SurfaceRect },
    /// Drag ended; commit point for persistence
    MoveFinished { rect: SurfaceRect },
    /// Window rectangle during a resize
    Resized { rect: SurfaceRect },
    /// Resize ended; commit point for persistence
    ResizeFinished { rect: SurfaceRect },
    /// Shape size during a pinch, `scale` relative to the pinch start
    ShapeScaled {
        size: ShapeSize,
        scale: f32,
        rotation_deg: f32,
    },
    /// Pinch on a shape ended
    ShapeScaleFinished { size: ShapeSize },
}

impl GestureEvent {
    /// True for events that end a move/resize and should be persisted
    pub fn is_commit(&self) -> bool {
        matches!(
            self,
            GestureEvent::MoveFinished { .. }
                | GestureEvent::ResizeFinished { .. }
                | GestureEvent::ShapeScaleFinished { .. }
        )
    }
}

/// Observable recognizer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GesturePhase {
    #[default]
    Idle,
    Down,
    Dragging,
    Resizing,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Pinch {
    secondary: u32,
    primary_pos: (f32, f32),
    secondary_pos: (f32, f32),
    initial_distance: f32,
    initial_angle: f32,
    start_rect: SurfaceRect,
    start_shape: Option<ShapeSize>,
    last_shape: Option<ShapeSize>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Pending,
    Dragging,
    EdgeResize(ResizeHandle),
    Pinch(Pinch),
}

#[derive(Debug, Clone, Copy)]
struct Session {
    mode: Mode,
    primary: u32,
    anchor: (f32, f32),
    /// Last reported position of the primary pointer
    primary_pos: (f32, f32),
    down_at: u64,
    start: SurfaceRect,
    current: SurfaceRect,
    target: TapTarget,
    handle: Option<ResizeHandle>,
    can_drag: bool,
    exceeded_slop: bool,
}

#[derive(Debug, Clone, Copy)]
struct ControlTouch {
    control: ControlId,
    pointer: u32,
}

/// Per-surface touch state machine
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    settings: GestureSettings,
    locked: bool,
    session: Option<Session>,
    control: Option<ControlTouch>,
    last_tap: Option<(u64, TapTarget)>,
}

impl GestureRecognizer {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            locked: false,
            session: None,
            control: None,
            last_tap: None,
        }
    }

    /// Locked surfaces report taps and controls but never move or resize
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if locked {
            self.session = None;
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn phase(&self) -> GesturePhase {
        match self.session.map(|s| s.mode) {
            None => GesturePhase::Idle,
            Some(Mode::Pending) => GesturePhase::Down,
            Some(Mode::Dragging) => GesturePhase::Dragging,
            Some(Mode::EdgeResize(_)) | Some(Mode::Pinch(_)) => GesturePhase::Resizing,
        }
    }

    /// Number of pointers in the current session (0 when idle)
    pub fn active_pointers(&self) -> usize {
        match self.session.map(|s| s.mode) {
            None => 0,
            Some(Mode::Pinch(_)) => 2,
            Some(_) => 1,
        }
    }

    /// Drop any in-progress session without emitting anything (surface teardown)
    pub fn reset(&mut self) {
        self.session = None;
        self.control = None;
        self.last_tap = None;
    }

    /// Feed one pointer event. `rect` is the surface's current on-screen rect.
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        rect: SurfaceRect,
        content: &dyn HitTest,
    ) -> Vec<GestureEvent> {
        if let Some(touch) = self.control {
            if event.phase != PointerPhase::Down {
                return self.route_to_control(touch, event);
            }
            // The control's UP was lost; start over
            self.control = None;
        }

        match event.phase {
            PointerPhase::Down => self.on_down(event, rect, content),
            PointerPhase::Move => self.on_move(event),
            PointerPhase::Up | PointerPhase::SecondPointerUp => self.on_up(event),
            PointerPhase::Cancel => self.on_cancel(),
            PointerPhase::SecondPointerDown => self.on_second_down(event, content),
        }
    }

    fn route_to_control(&mut self, touch: ControlTouch, event: &PointerEvent) -> Vec<GestureEvent> {
        if event.pointer_id != touch.pointer && event.phase != PointerPhase::Cancel {
            return Vec::new();
        }
        if matches!(
            event.phase,
            PointerPhase::Up | PointerPhase::SecondPointerUp | PointerPhase::Cancel
        ) {
            self.control = None;
        }
        vec![GestureEvent::Control {
            control: touch.control,
            phase: event.phase,
        }]
    }

    fn on_down(
        &mut self,
        event: &PointerEvent,
        rect: SurfaceRect,
        content: &dyn HitTest,
    ) -> Vec<GestureEvent> {
        // A fresh DOWN always replaces a session whose UP was lost
        self.session = None;

        if !rect.contains(event.x, event.y) {
            return Vec::new();
        }

        let (lx, ly) = rect.to_local(event.x, event.y);
        let size = rect.size();

        if let Some(control) = content.control_at(lx, ly, size) {
            self.control = Some(ControlTouch {
                control,
                pointer: event.pointer_id,
            });
            return vec![GestureEvent::Control {
                control,
                phase: PointerPhase::Down,
            }];
        }

        let handle = match (self.locked, content.resize_mode()) {
            (false, ResizeMode::Edges) => ResizeHandle::from_point(
                lx,
                ly,
                rect.width,
                rect.height,
                self.settings.resize_band_px,
            ),
            _ => None,
        };

        self.session = Some(Session {
            mode: Mode::Pending,
            primary: event.pointer_id,
            anchor: event.pos(),
            primary_pos: event.pos(),
            down_at: event.timestamp_ms,
            start: rect,
            current: rect,
            target: content.tap_target_at(lx, ly, size),
            handle,
            can_drag: !self.locked && content.in_drag_region(lx, ly, size),
            exceeded_slop: false,
        });
        Vec::new()
    }

    fn on_move(&mut self, event: &PointerEvent) -> Vec<GestureEvent> {
        let Some(mut session) = self.session else {
            return Vec::new();
        };

        let mut out = Vec::new();
        if event.pointer_id == session.primary {
            session.primary_pos = event.pos();
        }
        match session.mode {
            Mode::Pending => {
                if event.pointer_id != session.primary {
                    return out;
                }
                if distance(session.anchor, event.pos()) > self.settings.touch_slop_px {
                    session.exceeded_slop = true;
                    if let Some(handle) = session.handle {
                        session.mode = Mode::EdgeResize(handle);
                        self.step_resize(&mut session, handle, event, &mut out);
                    } else if session.can_drag {
                        session.mode = Mode::Dragging;
                        self.step_drag(&mut session, event, &mut out);
                    }
                }
            }
            Mode::Dragging => {
                if event.pointer_id == session.primary {
                    self.step_drag(&mut session, event, &mut out);
                }
            }
            Mode::EdgeResize(handle) => {
                if event.pointer_id == session.primary {
                    self.step_resize(&mut session, handle, event, &mut out);
                }
            }
            Mode::Pinch(mut pinch) => {
                if event.pointer_id == session.primary {
                    pinch.primary_pos = event.pos();
                } else if event.pointer_id == pinch.secondary {
                    pinch.secondary_pos = event.pos();
                } else {
                    return out;
                }
                self.step_pinch(&mut session, &mut pinch, &mut out);
                session.mode = Mode::Pinch(pinch);
            }
        }

        self.session = Some(session);
        out
    }

    fn on_up(&mut self, event: &PointerEvent) -> Vec<GestureEvent> {
        let Some(mut session) = self.session else {
            return Vec::new();
        };

        let mut out = Vec::new();
        match session.mode {
            Mode::Pinch(pinch) => {
                // Either finger lifting ends the pinch
                if event.pointer_id != session.primary && event.pointer_id != pinch.secondary {
                    return out;
                }
                self.finish(&session, &mut out);
                self.session = None;
                return out;
            }
            _ if event.pointer_id != session.primary => return out,
            _ => {}
        }

        match session.mode {
            Mode::Pending => {
                let elapsed = event.timestamp_ms.saturating_sub(session.down_at);
                let within_slop = distance(session.anchor, event.pos()) <= self.settings.touch_slop_px;
                if !session.exceeded_slop && within_slop && elapsed <= self.settings.tap_timeout_ms {
                    let (x, y) = session.start.to_local(event.x, event.y);
                    self.emit_tap(session.target, x, y, event.timestamp_ms, &mut out);
                }
            }
            Mode::Dragging => {
                self.step_drag(&mut session, event, &mut out);
                self.finish(&session, &mut out);
            }
            Mode::EdgeResize(handle) => {
                self.step_resize(&mut session, handle, event, &mut out);
                self.finish(&session, &mut out);
            }
            Mode::Pinch(_) => {}
        }

        self.session = None;
        out
    }

    fn on_cancel(&mut self) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        if let Some(session) = self.session.take() {
            self.finish(&session, &mut out);
        }
        out
    }

    fn on_second_down(&mut self, event: &PointerEvent, content: &dyn HitTest) -> Vec<GestureEvent> {
        let Some(mut session) = self.session else {
            return Vec::new();
        };
        if self.locked || event.pointer_id == session.primary {
            return Vec::new();
        }
        // Only the first two pointers take part; a third is ignored
        if matches!(session.mode, Mode::Pinch(_)) {
            return Vec::new();
        }
        let primary_pos = session.primary_pos;

        let shape = content.shape();
        let initial_distance = distance(primary_pos, event.pos());
        if initial_distance < 1.0 {
            return Vec::new();
        }

        // Close out a running drag/resize before switching to the pinch
        let mut out = Vec::new();
        if matches!(session.mode, Mode::Dragging | Mode::EdgeResize(_)) {
            self.finish(&session, &mut out);
        }

        session.exceeded_slop = true;
        session.mode = Mode::Pinch(Pinch {
            secondary: event.pointer_id,
            primary_pos,
            secondary_pos: event.pos(),
            initial_distance,
            initial_angle: angle_deg(primary_pos, event.pos()),
            start_rect: session.current,
            start_shape: shape,
            last_shape: shape,
        });
        self.session = Some(session);
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Steps
    // ─────────────────────────────────────────────────────────────────────────

    fn step_drag(&self, session: &mut Session, event: &PointerEvent, out: &mut Vec<GestureEvent>) {
        // Position is derived from the anchor, the delta from the previous
        // emitted rect, so deltas always sum to the net displacement
        let total_dx = (event.x - session.anchor.0).round() as i32;
        let total_dy = (event.y - session.anchor.1).round() as i32;
        let next = session.start.translated(total_dx, total_dy);
        let dx = next.x - session.current.x;
        let dy = next.y - session.current.y;
        if dx != 0 || dy != 0 {
            session.current = next;
            out.push(GestureEvent::Moved { dx, dy, rect: next });
        }
    }

    fn step_resize(
        &self,
        session: &mut Session,
        handle: ResizeHandle,
        event: &PointerEvent,
        out: &mut Vec<GestureEvent>,
    ) {
        let dx = (event.x - session.anchor.0).round() as i32;
        let dy = (event.y - session.anchor.1).round() as i32;
        let next = handle.apply(
            session.start,
            dx,
            dy,
            self.settings.min_width,
            self.settings.min_height,
        );
        if next != session.current {
            session.current = next;
            out.push(GestureEvent::Resized { rect: next });
        }
    }

    fn step_pinch(&self, session: &mut Session, pinch: &mut Pinch, out: &mut Vec<GestureEvent>) {
        let scale = distance(pinch.primary_pos, pinch.secondary_pos) / pinch.initial_distance;
        if let Some(start_shape) = pinch.start_shape {
            let size = start_shape.scaled(scale);
            pinch.last_shape = Some(size);
            let rotation_deg =
                wrap_degrees(angle_deg(pinch.primary_pos, pinch.secondary_pos) - pinch.initial_angle);
            out.push(GestureEvent::ShapeScaled {
                size,
                scale,
                rotation_deg,
            });
        } else {
            let next = scale_rect(
                pinch.start_rect,
                scale,
                self.settings.min_width,
                self.settings.min_height,
            );
            if next != session.current {
                session.current = next;
                out.push(GestureEvent::Resized { rect: next });
            }
        }
    }

    fn finish(&self, session: &Session, out: &mut Vec<GestureEvent>) {
        match session.mode {
            Mode::Pending => {}
            Mode::Dragging => out.push(GestureEvent::MoveFinished {
                rect: session.current,
            }),
            Mode::EdgeResize(_) => out.push(GestureEvent::ResizeFinished {
                rect: session.current,
            }),
            Mode::Pinch(pinch) => match pinch.last_shape {
                Some(size) => out.push(GestureEvent::ShapeScaleFinished { size }),
                None => out.push(GestureEvent::ResizeFinished {
                    rect: session.current,
                }),
            },
        }
    }

    fn emit_tap(&mut self, target: TapTarget, x: f32, y: f32, at: u64, out: &mut Vec<GestureEvent>) {
        out.push(GestureEvent::Tap { target, x, y });
        match self.last_tap {
            Some((previous, previous_target))
                if previous_target == target
                    && at.saturating_sub(previous) <= self.settings.double_tap_timeout_ms =>
            {
                out.push(GestureEvent::DoubleTap { target });
                self.last_tap = None;
            }
            _ => self.last_tap = Some((at, target)),
        }
    }
}
