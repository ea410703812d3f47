//! Screen shade: a translucent mask that lets taps through to what it covers

use perch_types::{ConfigValue, ToolConfig, ToolKind};

use super::{OverlayContent, config_f64};
use crate::frame::{Frame, colors};

const DEFAULT_OPACITY: f64 = 0.85;

pub(super) fn default_config() -> ToolConfig {
    ToolConfig::new().with("opacity", ConfigValue::Float(DEFAULT_OPACITY))
}

#[derive(Debug, Clone)]
pub struct ShadeContent {
    opacity: f64,
}

impl ShadeContent {
    pub fn new() -> Self {
        Self {
            opacity: DEFAULT_OPACITY,
        }
    }
}

impl Default for ShadeContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for ShadeContent {
    fn tool(&self) -> ToolKind {
        ToolKind::ScreenShade
    }

    fn update(&mut self, config: &ToolConfig) {
        self.opacity = config_f64(config, "opacity", DEFAULT_OPACITY).clamp(0.0, 1.0);
    }

    fn natural_size(&self) -> (u32, u32) {
        (480, 320)
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = Frame::new(size.0, size.1);
        frame.fill(colors::BLACK.with_alpha((self.opacity * 255.0).round() as u8));
        frame
    }

    fn passes_taps_through(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Primitive;

    #[test]
    fn opacity_maps_to_alpha() {
        let mut shade = ShadeContent::new();
        shade.update(&default_config().with("opacity", ConfigValue::Float(0.5)));
        let frame = shade.render((100, 100));
        match &frame.items[0] {
            Primitive::Rect { color, .. } => assert_eq!(color.a, 128),
            other => panic!("unexpected primitive {other:?}"),
        }
        assert!(shade.passes_taps_through());
    }
}
