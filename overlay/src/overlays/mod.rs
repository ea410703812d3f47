//! Tool content
//!
//! Each tool renders into a surface through the [`OverlayContent`] trait. The
//! manager never interprets a tool's configuration; it hands the instance's
//! [`ToolConfig`] to the content and forwards whatever config changes the
//! content asks for (tap reactions, action buttons, pinch-scaled shapes).
//!
//! Every surface also carries the shared chrome: a close control in the top
//! right corner, an add-another control in the top left, and a row of
//! tool-specific action buttons along the bottom edge.

mod chance;
mod clock;
mod shade;
mod spotlight;
mod traffic_light;

pub use chance::{CoinContent, DiceContent, RandomizerContent};
pub use clock::ClockContent;
pub use shade::ShadeContent;
pub use spotlight::SpotlightContent;
pub use traffic_light::TrafficLightContent;

use perch_types::{ConfigValue, ToolConfig, ToolKind};

use crate::frame::{Frame, colors};
use crate::gesture::{ControlId, HitTest, ResizeMode, ShapeSize, TapTarget};

/// Side length of the chrome controls
pub const CONTROL_SIZE: f32 = 28.0;
const ACTION_WIDTH: f32 = 72.0;
const ACTION_GAP: f32 = 8.0;
const ACTION_MARGIN: f32 = 8.0;

// ─────────────────────────────────────────────────────────────────────────────
// Config Changes
// ─────────────────────────────────────────────────────────────────────────────

/// A config update requested by content
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigChange {
    pub field: String,
    pub value: ConfigValue,
}

impl ConfigChange {
    pub fn new(field: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    pub fn text(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, ConfigValue::Text(value.into()))
    }
}

/// Read a numeric field, falling back to `default` when missing or mistyped
pub(crate) fn config_f64(config: &ToolConfig, field: &str, default: f64) -> f64 {
    config.get(field).and_then(ConfigValue::as_f64).unwrap_or(default)
}

pub(crate) fn config_str<'a>(config: &'a ToolConfig, field: &str, default: &'a str) -> &'a str {
    config.get(field).and_then(ConfigValue::as_str).unwrap_or(default)
}

pub(crate) fn config_bool(config: &ToolConfig, field: &str, default: bool) -> bool {
    config.get(field).and_then(ConfigValue::as_bool).unwrap_or(default)
}

// ─────────────────────────────────────────────────────────────────────────────
// Content Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Per-tool behavior behind a surface
///
/// Content is created on the UI thread by [`content_for`] and never leaves it,
/// so implementations need not be `Send`.
pub trait OverlayContent: 'static {
    fn tool(&self) -> ToolKind;

    /// Adopt the instance's latest configuration. Called before every render.
    fn update(&mut self, config: &ToolConfig);

    /// Preferred size when the instance geometry uses the natural-size sentinel
    fn natural_size(&self) -> (u32, u32);

    /// Draw the tool into a frame of the given size (chrome is added separately)
    fn render(&self, size: (u32, u32)) -> Frame;

    /// Action buttons: `(action id, label)`
    fn actions(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Region identity used to pair double taps
    fn tap_target_at(&self, _x: f32, _y: f32, _size: (u32, u32)) -> TapTarget {
        0
    }

    fn resize_mode(&self) -> ResizeMode {
        ResizeMode::Edges
    }

    /// Freely scalable shape, if pinches should scale it instead of the window
    fn shape(&self) -> Option<ShapeSize> {
        None
    }

    /// Whether a tap on the body should fall through to whatever is beneath
    fn passes_taps_through(&self) -> bool {
        false
    }

    fn on_tap(&mut self, _target: TapTarget, _double: bool) -> Vec<ConfigChange> {
        Vec::new()
    }

    fn on_action(&mut self, _action: &'static str) -> Vec<ConfigChange> {
        Vec::new()
    }

    /// Config fields holding a shape size
    fn shape_changes(&self, size: ShapeSize) -> Vec<ConfigChange> {
        match size {
            ShapeSize::Circle { radius } => {
                vec![ConfigChange::new("radius", ConfigValue::Float(radius as f64))]
            }
            ShapeSize::Rect { width, height } => vec![
                ConfigChange::new("shape_width", ConfigValue::Float(width as f64)),
                ConfigChange::new("shape_height", ConfigValue::Float(height as f64)),
            ],
        }
    }
}

/// Fresh content for a tool kind
pub fn content_for(tool: ToolKind) -> Box<dyn OverlayContent> {
    match tool {
        ToolKind::Clock => Box::new(ClockContent::new()),
        ToolKind::Spotlight => Box::new(SpotlightContent::new()),
        ToolKind::TrafficLight => Box::new(TrafficLightContent::new()),
        ToolKind::ScreenShade => Box::new(ShadeContent::new()),
        ToolKind::Dice => Box::new(DiceContent::new()),
        ToolKind::Coin => Box::new(CoinContent::new()),
        ToolKind::Randomizer => Box::new(RandomizerContent::new()),
    }
}

/// Hard-coded configuration for a tool's first ever instance
pub fn default_config(tool: ToolKind) -> ToolConfig {
    match tool {
        ToolKind::Clock => clock::default_config(),
        ToolKind::Spotlight => spotlight::default_config(),
        ToolKind::TrafficLight => traffic_light::default_config(),
        ToolKind::ScreenShade => shade::default_config(),
        ToolKind::Dice => chance::dice_default_config(),
        ToolKind::Coin => chance::coin_default_config(),
        ToolKind::Randomizer => chance::randomizer_default_config(),
    }
}

/// Fields whose change needs the surface destroyed and recreated
pub fn requires_rebuild(tool: ToolKind, field: &str) -> bool {
    match tool {
        ToolKind::Clock => field == "display_mode",
        ToolKind::TrafficLight => field == "orientation",
        _ => false,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chrome
// ─────────────────────────────────────────────────────────────────────────────

type Bounds = (f32, f32, f32, f32);

fn close_bounds((w, _): (u32, u32)) -> Bounds {
    (w as f32 - CONTROL_SIZE, 0.0, CONTROL_SIZE, CONTROL_SIZE)
}

fn clone_bounds(_size: (u32, u32)) -> Bounds {
    (0.0, 0.0, CONTROL_SIZE, CONTROL_SIZE)
}

fn action_bounds(count: usize, index: usize, (w, h): (u32, u32)) -> Bounds {
    let row = count as f32 * ACTION_WIDTH + count.saturating_sub(1) as f32 * ACTION_GAP;
    let x = (w as f32 - row) / 2.0 + index as f32 * (ACTION_WIDTH + ACTION_GAP);
    let y = h as f32 - CONTROL_SIZE - ACTION_MARGIN;
    (x, y, ACTION_WIDTH, CONTROL_SIZE)
}

fn inside((bx, by, bw, bh): Bounds, x: f32, y: f32) -> bool {
    x >= bx && y >= by && x < bx + bw && y < by + bh
}

/// Control under a surface-local point
pub fn chrome_control_at(
    content: &dyn OverlayContent,
    x: f32,
    y: f32,
    size: (u32, u32),
) -> Option<ControlId> {
    if inside(close_bounds(size), x, y) {
        return Some(ControlId::Close);
    }
    if inside(clone_bounds(size), x, y) {
        return Some(ControlId::Clone);
    }
    let actions = content.actions();
    actions
        .iter()
        .enumerate()
        .find(|(i, _)| inside(action_bounds(actions.len(), *i, size), x, y))
        .map(|(_, (action, _))| ControlId::Action(*action))
}

/// Content frame plus chrome controls
pub fn compose(content: &dyn OverlayContent, size: (u32, u32)) -> Frame {
    let mut frame = content.render(size);
    frame.control(ControlId::Clone, clone_bounds(size), "+");
    frame.control(ControlId::Close, close_bounds(size), "x");
    let actions = content.actions();
    for (i, (action, label)) in actions.iter().enumerate() {
        frame.control(
            ControlId::Action(*action),
            action_bounds(actions.len(), i, size),
            *label,
        );
    }
    frame
}

/// Gesture hit testing for a piece of content
pub struct ContentHitTest<'a>(pub &'a dyn OverlayContent);

impl HitTest for ContentHitTest<'_> {
    fn control_at(&self, x: f32, y: f32, size: (u32, u32)) -> Option<ControlId> {
        chrome_control_at(self.0, x, y, size)
    }

    fn tap_target_at(&self, x: f32, y: f32, size: (u32, u32)) -> TapTarget {
        self.0.tap_target_at(x, y, size)
    }

    fn resize_mode(&self) -> ResizeMode {
        self.0.resize_mode()
    }

    fn shape(&self) -> Option<ShapeSize> {
        self.0.shape()
    }
}

/// Panel background shared by the widget-style tools
pub(crate) fn panel(size: (u32, u32)) -> Frame {
    let mut frame = Frame::new(size.0, size.1);
    frame.fill(colors::PANEL_BG);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_has_close_and_clone_controls() {
        for &tool in ToolKind::all() {
            let mut content = content_for(tool);
            content.update(&default_config(tool));
            let size = content.natural_size();
            let frame = compose(content.as_ref(), size);
            let controls: Vec<_> = frame.controls().collect();
            assert!(controls.contains(&ControlId::Close), "{tool}");
            assert!(controls.contains(&ControlId::Clone), "{tool}");
            assert_eq!(content.tool(), tool);
        }
    }

    #[test]
    fn chrome_hit_testing() {
        let content = DiceContent::new();
        let size = (200, 160);
        assert_eq!(
            chrome_control_at(&content, 190.0, 5.0, size),
            Some(ControlId::Close)
        );
        assert_eq!(
            chrome_control_at(&content, 5.0, 5.0, size),
            Some(ControlId::Clone)
        );
        // Single action centered at the bottom
        assert_eq!(
            chrome_control_at(&content, 100.0, 140.0, size),
            Some(ControlId::Action("roll"))
        );
        assert_eq!(chrome_control_at(&content, 100.0, 60.0, size), None);
    }

    #[test]
    fn structural_fields() {
        assert!(requires_rebuild(ToolKind::Clock, "display_mode"));
        assert!(!requires_rebuild(ToolKind::Clock, "show_seconds"));
        assert!(requires_rebuild(ToolKind::TrafficLight, "orientation"));
        assert!(!requires_rebuild(ToolKind::Spotlight, "radius"));
    }

    #[test]
    fn default_shape_changes() {
        let content = SpotlightContent::new();
        assert_eq!(
            content.shape_changes(ShapeSize::Circle { radius: 50.0 }),
            vec![ConfigChange::new("radius", ConfigValue::Float(50.0))]
        );
    }
}
