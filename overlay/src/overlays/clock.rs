//! Desk clock

use chrono::{Local, NaiveTime, Timelike};
use perch_types::{ConfigValue, ToolConfig, ToolKind};

use super::{OverlayContent, config_bool, config_str, panel};
use crate::frame::{Frame, colors};

const FONT_SIZE: f32 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DisplayMode {
    Digital,
    Analog,
}

pub(super) fn default_config() -> ToolConfig {
    ToolConfig::new()
        .with("display_mode", ConfigValue::Text("digital".into()))
        .with("format_24h", ConfigValue::Bool(true))
        .with("show_seconds", ConfigValue::Bool(true))
}

/// Digital or analog clock face
#[derive(Debug, Clone)]
pub struct ClockContent {
    mode: DisplayMode,
    format_24h: bool,
    show_seconds: bool,
}

impl ClockContent {
    pub fn new() -> Self {
        Self {
            mode: DisplayMode::Digital,
            format_24h: true,
            show_seconds: true,
        }
    }

    fn label(&self, time: NaiveTime) -> String {
        let (hour, suffix) = if self.format_24h {
            (time.hour(), "")
        } else {
            let (pm, h12) = time.hour12();
            (h12, if pm { " PM" } else { " AM" })
        };
        if self.show_seconds {
            format!("{:02}:{:02}:{:02}{}", hour, time.minute(), time.second(), suffix)
        } else {
            format!("{:02}:{:02}{}", hour, time.minute(), suffix)
        }
    }

    fn render_at(&self, time: NaiveTime, size: (u32, u32)) -> Frame {
        let mut frame = panel(size);
        let (w, h) = (size.0 as f32, size.1 as f32);
        match self.mode {
            DisplayMode::Digital => {
                frame.text(w * 0.1, h / 2.0 - FONT_SIZE / 2.0, FONT_SIZE, self.label(time), colors::WHITE);
            }
            DisplayMode::Analog => {
                let radius = w.min(h) / 2.0 - 8.0;
                frame.circle(w / 2.0, h / 2.0, radius, colors::WHITE);
                // Hand angles in degrees clockwise from twelve
                let minute = time.minute() as f32 * 6.0;
                let hour = (time.hour() % 12) as f32 * 30.0 + time.minute() as f32 * 0.5;
                frame.text(
                    w / 2.0,
                    h - 20.0,
                    12.0,
                    format!("{hour:.0}/{minute:.0}"),
                    colors::BLACK,
                );
            }
        }
        frame
    }
}

impl Default for ClockContent {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayContent for ClockContent {
    fn tool(&self) -> ToolKind {
        ToolKind::Clock
    }

    fn update(&mut self, config: &ToolConfig) {
        self.mode = match config_str(config, "display_mode", "digital") {
            "analog" => DisplayMode::Analog,
            _ => DisplayMode::Digital,
        };
        self.format_24h = config_bool(config, "format_24h", true);
        self.show_seconds = config_bool(config, "show_seconds", true);
    }

    fn natural_size(&self) -> (u32, u32) {
        match (self.mode, self.show_seconds) {
            (DisplayMode::Analog, _) => (180, 180),
            (DisplayMode::Digital, true) => (240, 96),
            (DisplayMode::Digital, false) => (180, 96),
        }
    }

    fn render(&self, size: (u32, u32)) -> Frame {
        self.render_at(Local::now().time(), size)
    }
}
