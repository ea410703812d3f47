//! Rendered content of a surface
//!
//! Content renders into a [`Frame`], a flat display list the presentation
//! backend rasterizes (or, headless, simply records). Controls are part of the
//! list so a backend can draw them and tests can find them.

use crate::gesture::ControlId;

/// Straight (non-premultiplied) RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

pub mod colors {
    use super::Color;

    pub const TRANSPARENT: Color = Color::from_rgba8(0, 0, 0, 0);
    pub const BLACK: Color = Color::from_rgba8(0, 0, 0, 255);
    pub const WHITE: Color = Color::from_rgba8(255, 255, 255, 255);
    pub const RED: Color = Color::from_rgba8(220, 40, 40, 255);
    pub const AMBER: Color = Color::from_rgba8(240, 170, 20, 255);
    pub const GREEN: Color = Color::from_rgba8(40, 190, 70, 255);
    /// Unlit lamp
    pub const DIM: Color = Color::from_rgba8(60, 60, 60, 255);
    /// Semi-transparent panel behind tool content
    pub const PANEL_BG: Color = Color::from_rgba8(30, 30, 30, 200);
    /// Chrome buttons (close, add-another, actions)
    pub const CONTROL_BG: Color = Color::from_rgba8(70, 70, 70, 230);
}

/// One drawing primitive, in surface-local pixels
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Circle {
        cx: f32,
        cy: f32,
        radius: f32,
        color: Color,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        text: String,
        color: Color,
    },
    Control {
        control: ControlId,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        label: &'static str,
    },
}

/// Display list for one surface
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub items: Vec<Primitive>,
}

impl Frame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
        }
    }

    pub fn fill(&mut self, color: Color) -> &mut Self {
        let (w, h) = (self.width as f32, self.height as f32);
        self.rect(0.0, 0.0, w, h, color)
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) -> &mut Self {
        self.items.push(Primitive::Rect {
            x,
            y,
            width,
            height,
            color,
        });
        self
    }

    pub fn circle(&mut self, cx: f32, cy: f32, radius: f32, color: Color) -> &mut Self {
        self.items.push(Primitive::Circle {
            cx,
            cy,
            radius,
            color,
        });
        self
    }

    pub fn text(&mut self, x: f32, y: f32, size: f32, text: impl Into<String>, color: Color) -> &mut Self {
        self.items.push(Primitive::Text {
            x,
            y,
            size,
            text: text.into(),
            color,
        });
        self
    }

    pub fn control(
        &mut self,
        control: ControlId,
        (x, y, width, height): (f32, f32, f32, f32),
        label: &'static str,
    ) -> &mut Self {
        self.items.push(Primitive::Control {
            control,
            x,
            y,
            width,
            height,
            label,
        });
        self
    }

    /// All text drawn in the frame, in draw order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Primitive::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Controls drawn in the frame, in draw order
    pub fn controls(&self) -> impl Iterator<Item = ControlId> + '_ {
        self.items.iter().filter_map(|item| match item {
            Primitive::Control { control, .. } => Some(*control),
            _ => None,
        })
    }

    pub fn circles(&self) -> impl Iterator<Item = (f32, Color)> + '_ {
        self.items.iter().filter_map(|item| match item {
            Primitive::Circle { radius, color, .. } => Some((*radius, *color)),
            _ => None,
        })
    }
}
