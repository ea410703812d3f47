//! Traffic light: tap a lamp to light it, double tap to switch the light off

use perch_types::{ConfigValue, ToolConfig, ToolKind};

use super::{ConfigChange, OverlayContent, config_str, panel};
use crate::frame::{Color, Frame, colors};
use crate::gesture::TapTarget;

const LAMP_SLOT: u32 = 96;
const BODY_WIDTH: u32 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lamp {
    Red,
    Amber,
    Green,
    Off,
}

impl Lamp {
    fn from_key(key: &str) -> Self {
        match key {
            "red" => Lamp::Red,
            "amber" => Lamp::Amber,
            "green" => Lamp::Green,
            _ => Lamp::Off,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Lamp::Red => "red",
            Lamp::Amber => "amber",
            Lamp::Green => "green",
            Lamp::Off => "off",
        }
    }

    /// Lamp in tap slot 1..=3
    fn from_target(target: TapTarget) -> Option<Self> {
        match target {
            1 => Some(Lamp::Red),
            2 => Some(Lamp::Amber),
            3 => Some(Lamp::Green),
            _ => None,
        }
    }
}

const LAMPS: [(Lamp, Color); 3] = [
    (Lamp::Red, colors::RED),
    (Lamp::Amber, colors::AMBER),
    (Lamp::Green, colors::GREEN),
];

pub(super) fn default_config() -> ToolConfig {
    ToolConfig::new()
        .with("lamp", ConfigValue::Text("red".into()))
        .with("orientation", ConfigValue::Text("vertical".into()))
}

#[derive(Debug, Clone)]
pub struct TrafficLightContent {
    lamp: Lamp,
    horizontal: bool,
}

impl TrafficLightContent {
    pub fn new() -> Self {
        Self {
            lamp: Lamp::Red,
            horizontal: false,
        }
    }

    /// Slot center along the light's long axis
    fn slot_center(index: usize, length: f32) -> f32 {
        length * (index as f32 * 2.0 + 1.0) / 6.0
    }
}

impl Default for TrafficLightContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for TrafficLightContent {
    fn tool(&self) -> ToolKind {
        ToolKind::TrafficLight
    }

    fn update(&mut self, config: &ToolConfig) {
        self.lamp = Lamp::from_key(config_str(config, "lamp", "red"));
        self.horizontal = config_str(config, "orientation", "vertical") == "horizontal";
    }

    fn natural_size(&self) -> (u32, u32) {
        let long = LAMP_SLOT * 3 + 12;
        if self.horizontal {
            (long, BODY_WIDTH)
        } else {
            (BODY_WIDTH, long)
        }
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        let mut frame = panel(size);
        let (w, h) = (size.0 as f32, size.1 as f32);
        let radius = (w.min(h) / 2.0 - 12.0).max(4.0);
        for (i, (lamp, color)) in LAMPS.iter().enumerate() {
            let lit = if *lamp == self.lamp { *color } else { colors::DIM };
            let (cx, cy) = if self.horizontal {
                (Self::slot_center(i, w), h / 2.0)
            } else {
                (w / 2.0, Self::slot_center(i, h))
            };
            frame.circle(cx, cy, radius.min(LAMP_SLOT as f32 / 2.0 - 6.0), lit);
        }
        frame
    }

    fn tap_target_at(&self, x: f32, y: f32, (w, h): (u32, u32)) -> TapTarget {
        let (pos, length) = if self.horizontal {
            (x, w as f32)
        } else {
            (y, h as f32)
        };
        if length <= 0.0 {
            return 0;
        }
        ((pos / length * 3.0).floor().clamp(0.0, 2.0) as TapTarget) + 1
    }

    fn on_tap(&mut self, target: TapTarget, double: bool) -> Vec<ConfigChange> {
        let next = if double {
            Lamp::Off
        } else {
            match Lamp::from_target(target) {
                Some(lamp) => lamp,
                None => return Vec::new(),
            }
        };
        if next == self.lamp {
            return Vec::new();
        }
        self.lamp = next;
        vec![ConfigChange::text("lamp", next.key())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tap_lights_the_lamp_under_the_finger() {
        let mut light = TrafficLightContent::new();
        light.update(&default_config());
        let size = light.natural_size();

        let target = light.tap_target_at(55.0, size.1 as f32 - 10.0, size);
        assert_eq!(target, 3);
        assert_eq!(
            light.on_tap(target, false),
            vec![ConfigChange::text("lamp", "green")]
        );
        // Same lamp again is not a change
        assert!(light.on_tap(target, false).is_empty());
    }

    #[test]
    fn double_tap_turns_the_light_off() {
        let mut light = TrafficLightContent::new();
        light.update(&default_config());
        assert_eq!(light.on_tap(1, true), vec![ConfigChange::text("lamp", "off")]);

        let frame = light.render(light.natural_size());
        assert!(frame.circles().all(|(_, color)| color == colors::DIM));
    }

    #[test]
    fn horizontal_orientation_swaps_axes() {
        let mut light = TrafficLightContent::new();
        light.update(&default_config().with("orientation", ConfigValue::Text("horizontal".into())));
        let size = light.natural_size();
        assert!(size.0 > size.1);
        assert_eq!(light.tap_target_at(10.0, 50.0, size), 1);
    }
}
