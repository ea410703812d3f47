//! Spotlight: a dimmed mask with a round clear hole the user pinches to size

use perch_types::{ConfigValue, ToolConfig, ToolKind};

use super::{OverlayContent, config_f64};
use crate::frame::{Frame, colors};
use crate::gesture::{ResizeMode, ShapeSize};

const DEFAULT_RADIUS: f64 = 120.0;
const MIN_RADIUS: f32 = 24.0;
const MAX_RADIUS: f32 = 2048.0;
const MARGIN: u32 = 40;

pub(super) fn default_config() -> ToolConfig {
    ToolConfig::new()
        .with("radius", ConfigValue::Float(DEFAULT_RADIUS))
        .with("dim_alpha", ConfigValue::Int(200))
}

#[derive(Debug, Clone)]
pub struct SpotlightContent {
    radius: f32,
    dim_alpha: u8,
}

impl SpotlightContent {
    pub fn new() -> Self {
        Self {
            radius: DEFAULT_RADIUS as f32,
            dim_alpha: 200,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Default for SpotlightContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for SpotlightContent {
    fn tool(&self) -> ToolKind {
        ToolKind::Spotlight
    }

    fn update(&mut self, config: &ToolConfig) {
        self.radius = (config_f64(config, "radius", DEFAULT_RADIUS) as f32).clamp(MIN_RADIUS, MAX_RADIUS);
        self.dim_alpha = config_f64(config, "dim_alpha", 200.0).clamp(0.0, 255.0) as u8;
    }

    fn natural_size(&self) -> (u32, u32) {
        let side = (self.radius * 2.0).ceil() as u32 + MARGIN * 2;
        (side, side)
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = Frame::new(size.0, size.1);
        frame.fill(colors::BLACK.with_alpha(self.dim_alpha));
        frame.circle(
            size.0 as f32 / 2.0,
            size.1 as f32 / 2.0,
            self.radius,
            colors::TRANSPARENT,
        );
        frame
    }

    fn resize_mode(&self) -> ResizeMode {
        ResizeMode::None
    }

    fn shape(&self) -> Option<ShapeSize> {
        Some(ShapeSize::Circle {
            radius: self.radius,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_comes_from_config_and_is_clamped() {
        let mut spot = SpotlightContent::new();
        spot.update(&default_config().with("radius", ConfigValue::Float(60.0)));
        assert_eq!(spot.shape(), Some(ShapeSize::Circle { radius: 60.0 }));
        assert_eq!(spot.natural_size(), (200, 200));

        spot.update(&default_config().with("radius", ConfigValue::Int(2)));
        assert_eq!(spot.radius(), MIN_RADIUS);
    }

    #[test]
    fn renders_hole_over_dim_mask() {
        let mut spot = SpotlightContent::new();
        spot.update(&default_config());
        let frame = spot.render((320, 320));
        assert_eq!(frame.circles().collect::<Vec<_>>(), vec![(120.0, colors::TRANSPARENT)]);
    }
}
