//! Geometry helpers for gesture recognition: surface rectangles, edge
//! resize handles and pinch math.

use perch_types::Geometry;

/// Resolved on-screen rectangle of a surface (pixels, screen coordinates)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SurfaceRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolve a geometry whose dimensions may be "natural"
    pub fn from_geometry(geometry: Geometry, natural: (u32, u32)) -> Self {
        let (x, y, width, height) = geometry.resolve(natural);
        Self::new(x, y, width, height)
    }

    /// Check if a screen point is inside the rectangle
    pub fn contains(&self, px: f32, py: f32) -> bool {
        let (lx, ly) = self.to_local(px, py);
        lx >= 0.0 && ly >= 0.0 && lx < self.width as f32 && ly < self.height as f32
    }

    /// Convert screen coordinates to surface-local coordinates
    pub fn to_local(&self, px: f32, py: f32) -> (f32, f32) {
        (px - self.x as f32, py - self.y as f32)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    pub fn to_geometry(self) -> Geometry {
        Geometry::pixels(self.x, self.y, self.width, self.height)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Edge Resize
// ─────────────────────────────────────────────────────────────────────────────

/// Edge or corner band a resize started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    /// Classify a surface-local point. `None` means the point is in the
    /// interior (drag region).
    pub fn from_point(lx: f32, ly: f32, width: u32, height: u32, band: f32) -> Option<Self> {
        let (w, h) = (width as f32, height as f32);
        // Never let the bands swallow the whole surface
        let band_x = band.min(w / 3.0);
        let band_y = band.min(h / 3.0);

        let left = lx < band_x;
        let right = lx >= w - band_x;
        let top = ly < band_y;
        let bottom = ly >= h - band_y;

        match (left, right, top, bottom) {
            (true, _, true, _) => Some(ResizeHandle::TopLeft),
            (_, true, true, _) => Some(ResizeHandle::TopRight),
            (true, _, _, true) => Some(ResizeHandle::BottomLeft),
            (_, true, _, true) => Some(ResizeHandle::BottomRight),
            (true, _, _, _) => Some(ResizeHandle::Left),
            (_, true, _, _) => Some(ResizeHandle::Right),
            (_, _, true, _) => Some(ResizeHandle::Top),
            (_, _, _, true) => Some(ResizeHandle::Bottom),
            _ => None,
        }
    }

    fn moves_left_edge(self) -> bool {
        matches!(
            self,
            ResizeHandle::Left | ResizeHandle::TopLeft | ResizeHandle::BottomLeft
        )
    }

    fn moves_right_edge(self) -> bool {
        matches!(
            self,
            ResizeHandle::Right | ResizeHandle::TopRight | ResizeHandle::BottomRight
        )
    }

    fn moves_top_edge(self) -> bool {
        matches!(
            self,
            ResizeHandle::Top | ResizeHandle::TopLeft | ResizeHandle::TopRight
        )
    }

    fn moves_bottom_edge(self) -> bool {
        matches!(
            self,
            ResizeHandle::Bottom | ResizeHandle::BottomLeft | ResizeHandle::BottomRight
        )
    }

    /// New rectangle after dragging this handle by `(dx, dy)` from `start`.
    /// Left/top handles keep the opposite edge fixed, so position moves too.
    pub fn apply(self, start: SurfaceRect, dx: i32, dy: i32, min_w: u32, min_h: u32) -> SurfaceRect {
        let mut rect = start;
        let right = start.x + start.width as i32;
        let bottom = start.y + start.height as i32;

        if self.moves_right_edge() {
            rect.width = clamp_len(start.width as i64 + dx as i64, min_w);
        } else if self.moves_left_edge() {
            rect.width = clamp_len(start.width as i64 - dx as i64, min_w);
            rect.x = right - rect.width as i32;
        }

        if self.moves_bottom_edge() {
            rect.height = clamp_len(start.height as i64 + dy as i64, min_h);
        } else if self.moves_top_edge() {
            rect.height = clamp_len(start.height as i64 - dy as i64, min_h);
            rect.y = bottom - rect.height as i32;
        }

        rect
    }
}

fn clamp_len(value: i64, min: u32) -> u32 {
    value.clamp(min as i64, u32::MAX as i64) as u32
}

// ─────────────────────────────────────────────────────────────────────────────
// Pinch
// ─────────────────────────────────────────────────────────────────────────────

/// Size parameters of a freely scalable shape drawn inside a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeSize {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
}

impl ShapeSize {
    /// Multiply every size parameter by `factor`
    pub fn scaled(self, factor: f32) -> Self {
        match self {
            ShapeSize::Circle { radius } => ShapeSize::Circle {
                radius: radius * factor,
            },
            ShapeSize::Rect { width, height } => ShapeSize::Rect {
                width: width * factor,
                height: height * factor,
            },
        }
    }
}

pub(crate) fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
}

pub(crate) fn angle_deg(a: (f32, f32), b: (f32, f32)) -> f32 {
    (b.1 - a.1).atan2(b.0 - a.0).to_degrees()
}

/// Wrap an angle into (-180, 180]
pub(crate) fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Scale a window rectangle around its center, honoring the minimum size
pub(crate) fn scale_rect(start: SurfaceRect, factor: f32, min_w: u32, min_h: u32) -> SurfaceRect {
    let width = ((start.width as f32 * factor).round() as i64).clamp(min_w as i64, u32::MAX as i64) as u32;
    let height =
        ((start.height as f32 * factor).round() as i64).clamp(min_h as i64, u32::MAX as i64) as u32;
    let cx = start.x as i64 * 2 + start.width as i64;
    let cy = start.y as i64 * 2 + start.height as i64;
    SurfaceRect {
        x: ((cx - width as i64) / 2) as i32,
        y: ((cy - height as i64) / 2) as i32,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_classification() {
        let (w, h, band) = (200, 100, 20.0);
        assert_eq!(ResizeHandle::from_point(100.0, 50.0, w, h, band), None);
        assert_eq!(
            ResizeHandle::from_point(195.0, 50.0, w, h, band),
            Some(ResizeHandle::Right)
        );
        assert_eq!(
            ResizeHandle::from_point(5.0, 5.0, w, h, band),
            Some(ResizeHandle::TopLeft)
        );
        assert_eq!(
            ResizeHandle::from_point(195.0, 95.0, w, h, band),
            Some(ResizeHandle::BottomRight)
        );
        assert_eq!(
            ResizeHandle::from_point(100.0, 90.0, w, h, band),
            Some(ResizeHandle::Bottom)
        );
    }

    #[test]
    fn right_edge_changes_width_only() {
        let start = SurfaceRect::new(10, 10, 200, 100);
        let rect = ResizeHandle::Right.apply(start, 30, 50, 48, 48);
        assert_eq!(rect, SurfaceRect::new(10, 10, 230, 100));
    }

    #[test]
    fn top_left_corner_moves_position() {
        let start = SurfaceRect::new(100, 100, 200, 100);
        let rect = ResizeHandle::TopLeft.apply(start, 20, -10, 48, 48);
        assert_eq!(rect, SurfaceRect::new(120, 90, 180, 110));
    }

    #[test]
    fn minimum_size_is_enforced() {
        let start = SurfaceRect::new(100, 100, 200, 100);
        let rect = ResizeHandle::Left.apply(start, 500, 0, 48, 48);
        assert_eq!(rect.width, 48);
        // Right edge stays put
        assert_eq!(rect.x + rect.width as i32, 300);

        let rect = ResizeHandle::BottomRight.apply(start, -500, -500, 48, 40);
        assert_eq!((rect.width, rect.height), (48, 40));
    }

    #[test]
    fn wrap_degrees_stays_within_half_turn() {
        assert_eq!(wrap_degrees(0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert_eq!(wrap_degrees(-180.0), 180.0);
        assert_eq!(wrap_degrees(190.0), -170.0);
        assert_eq!(wrap_degrees(-350.0), 10.0);
        assert_eq!(wrap_degrees(725.0), 5.0);
    }

    #[test]
    fn scale_rect_keeps_center() {
        let start = SurfaceRect::new(100, 100, 200, 100);
        let rect = scale_rect(start, 2.0, 10, 10);
        assert_eq!(rect, SurfaceRect::new(0, 50, 400, 200));
    }

    #[test]
    fn contains_uses_screen_coordinates() {
        let rect = SurfaceRect::new(50, 50, 10, 10);
        assert!(rect.contains(55.0, 59.0));
        assert!(!rect.contains(60.0, 55.0));
        assert!(!rect.contains(45.0, 55.0));
    }
}
