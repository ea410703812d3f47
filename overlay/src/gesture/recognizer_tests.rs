use super::*;

const RECT: SurfaceRect = SurfaceRect {
    x: 100,
    y: 100,
    width: 200,
    height: 120,
};

/// Plain content: close button in the top-right 20x20, everything else draggable
struct Plain;

impl HitTest for Plain {
    fn control_at(&self, x: f32, y: f32, size: (u32, u32)) -> Option<ControlId> {
        (x >= size.0 as f32 - 20.0 && y < 20.0).then_some(ControlId::Close)
    }
}

/// Circle content: no edge resizing, pinch scales the radius
struct Circle(f32);

impl HitTest for Circle {
    fn control_at(&self, _x: f32, _y: f32, _size: (u32, u32)) -> Option<ControlId> {
        None
    }

    fn resize_mode(&self) -> ResizeMode {
        ResizeMode::None
    }

    fn shape(&self) -> Option<ShapeSize> {
        Some(ShapeSize::Circle { radius: self.0 })
    }
}

/// Two tap regions: left half is 1, right half is 2
struct Halves;

impl HitTest for Halves {
    fn control_at(&self, _x: f32, _y: f32, _size: (u32, u32)) -> Option<ControlId> {
        None
    }

    fn tap_target_at(&self, x: f32, _y: f32, size: (u32, u32)) -> TapTarget {
        if x < size.0 as f32 / 2.0 { 1 } else { 2 }
    }
}

fn recognizer() -> GestureRecognizer {
    GestureRecognizer::new(GestureSettings::default())
}

fn ev(phase: PointerPhase, id: u32, x: f32, y: f32, t: u64) -> PointerEvent {
    PointerEvent::new(phase, id, x, y, t)
}

/// Feed a sequence, tracking the rect the way the UI thread does
fn feed(
    rec: &mut GestureRecognizer,
    rect: &mut SurfaceRect,
    content: &dyn HitTest,
    events: &[PointerEvent],
) -> Vec<GestureEvent> {
    let mut out = Vec::new();
    for event in events {
        for g in rec.handle(event, *rect, content) {
            match g {
                GestureEvent::Moved { rect: r, .. } | GestureEvent::Resized { rect: r } => *rect = r,
                _ => {}
            }
            out.push(g);
        }
    }
    out
}

#[test]
fn down_up_in_place_is_a_single_tap() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 1_000),
            ev(PointerPhase::Move, 0, 152.0, 151.0, 1_050),
            ev(PointerPhase::Up, 0, 152.0, 151.0, 1_100),
        ],
    );
    assert_eq!(
        out,
        vec![GestureEvent::Tap {
            target: 0,
            x: 52.0,
            y: 51.0
        }]
    );
    assert_eq!(rect, RECT);
    assert_eq!(rec.phase(), GesturePhase::Idle);
}

#[test]
fn slow_press_is_not_a_tap() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Up, 0, 150.0, 150.0, 900),
        ],
    );
    assert!(out.is_empty());
}

#[test]
fn drag_deltas_sum_to_net_displacement() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Move, 0, 170.4, 150.0, 10),
            ev(PointerPhase::Move, 0, 183.7, 141.2, 20),
            ev(PointerPhase::Move, 0, 190.2, 130.6, 30),
            ev(PointerPhase::Up, 0, 211.0, 127.0, 40),
        ],
    );

    let (sum_x, sum_y) = out.iter().fold((0, 0), |(sx, sy), g| match g {
        GestureEvent::Moved { dx, dy, .. } => (sx + dx, sy + dy),
        _ => (sx, sy),
    });
    assert_eq!((sum_x, sum_y), (61, -23));
    assert_eq!(
        out.last(),
        Some(&GestureEvent::MoveFinished {
            rect: SurfaceRect::new(161, 77, 200, 120)
        })
    );
    assert!(!out.iter().any(|g| matches!(g, GestureEvent::Tap { .. })));
}

#[test]
fn drag_enters_dragging_only_after_slop() {
    let mut rec = recognizer();
    let mut rect = RECT;
    feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Move, 0, 155.0, 150.0, 10),
        ],
    );
    assert_eq!(rec.phase(), GesturePhase::Down);

    feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[ev(PointerPhase::Move, 0, 190.0, 150.0, 20)],
    );
    assert_eq!(rec.phase(), GesturePhase::Dragging);
    assert_eq!(rect.x, 140);
}

#[test]
fn cancel_finishes_a_drag() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Move, 0, 200.0, 150.0, 10),
            ev(PointerPhase::Cancel, 0, 0.0, 0.0, 20),
        ],
    );
    assert_eq!(
        out.last(),
        Some(&GestureEvent::MoveFinished {
            rect: SurfaceRect::new(150, 100, 200, 120)
        })
    );
    assert_eq!(rec.phase(), GesturePhase::Idle);
}

#[test]
fn touch_on_control_never_starts_a_gesture() {
    let mut rec = recognizer();
    let mut rect = RECT;
    // Close button occupies local (180..200, 0..20)
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 290.0, 105.0, 0),
            ev(PointerPhase::Move, 0, 240.0, 160.0, 10),
            ev(PointerPhase::Up, 0, 240.0, 160.0, 20),
        ],
    );
    assert_eq!(
        out,
        vec![
            GestureEvent::Control {
                control: ControlId::Close,
                phase: PointerPhase::Down
            },
            GestureEvent::Control {
                control: ControlId::Close,
                phase: PointerPhase::Move
            },
            GestureEvent::Control {
                control: ControlId::Close,
                phase: PointerPhase::Up
            },
        ]
    );
    assert_eq!(rect, RECT);
    assert_eq!(rec.phase(), GesturePhase::Idle);
}

#[test]
fn edge_resize_respects_minimum_size() {
    let mut rec = recognizer();
    let mut rect = RECT;
    // Left edge band, vertically centered
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 105.0, 160.0, 0),
            ev(PointerPhase::Move, 0, 145.0, 160.0, 10),
            ev(PointerPhase::Move, 0, 600.0, 160.0, 20),
            ev(PointerPhase::Up, 0, 600.0, 160.0, 30),
        ],
    );

    assert_eq!(
        out[0],
        GestureEvent::Resized {
            rect: SurfaceRect::new(140, 100, 160, 120)
        }
    );
    let finished = SurfaceRect::new(252, 100, 48, 120);
    assert_eq!(out.last(), Some(&GestureEvent::ResizeFinished { rect: finished }));
    assert_eq!(rect, finished);
}

#[test]
fn pinch_scales_circle_radius_by_distance_ratio() {
    for (cx, cy) in [(150.0, 150.0), (260.0, 200.0)] {
        let mut rec = recognizer();
        let mut rect = RECT;
        let out = feed(
            &mut rec,
            &mut rect,
            &Circle(40.0),
            &[
                ev(PointerPhase::Down, 0, cx - 20.0, cy, 0),
                ev(PointerPhase::SecondPointerDown, 1, cx + 20.0, cy, 5),
                ev(PointerPhase::Move, 1, cx + 60.0, cy, 10),
                ev(PointerPhase::SecondPointerUp, 1, cx + 60.0, cy, 20),
            ],
        );

        // 40 -> 80 distance: radius doubles wherever the fingers are
        let scaled = out.iter().find_map(|g| match g {
            GestureEvent::ShapeScaled { size, scale, .. } => Some((*size, *scale)),
            _ => None,
        });
        assert_eq!(scaled, Some((ShapeSize::Circle { radius: 80.0 }, 2.0)));
        assert_eq!(
            out.last(),
            Some(&GestureEvent::ShapeScaleFinished {
                size: ShapeSize::Circle { radius: 80.0 }
            })
        );
        assert_eq!(rect, RECT, "shape pinch leaves the window alone");
        assert_eq!(rec.phase(), GesturePhase::Idle);
    }
}

#[test]
fn pinch_without_shape_scales_window_about_center() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 180.0, 160.0, 0),
            ev(PointerPhase::SecondPointerDown, 1, 220.0, 160.0, 5),
            ev(PointerPhase::Move, 0, 160.0, 160.0, 10),
            ev(PointerPhase::Move, 1, 240.0, 160.0, 15),
            ev(PointerPhase::Up, 0, 160.0, 160.0, 20),
        ],
    );
    assert_eq!(
        out.last(),
        Some(&GestureEvent::ResizeFinished {
            rect: SurfaceRect::new(0, 40, 400, 240)
        })
    );
}

#[test]
fn pinch_after_drag_starts_from_the_finger_position() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Circle(40.0),
        &[
            ev(PointerPhase::Down, 0, 200.0, 160.0, 0),
            ev(PointerPhase::Move, 0, 240.0, 160.0, 10),
            ev(PointerPhase::SecondPointerDown, 1, 300.0, 160.0, 20),
            // Primary reports its position again, spread unchanged
            ev(PointerPhase::Move, 0, 240.0, 160.0, 30),
        ],
    );

    let moved = SurfaceRect::new(140, 100, 200, 120);
    assert_eq!(
        out,
        vec![
            GestureEvent::Moved {
                dx: 40,
                dy: 0,
                rect: moved
            },
            GestureEvent::MoveFinished { rect: moved },
            GestureEvent::ShapeScaled {
                size: ShapeSize::Circle { radius: 40.0 },
                scale: 1.0,
                rotation_deg: 0.0,
            },
        ]
    );
    assert_eq!(rect, moved);
    assert_eq!(rec.phase(), GesturePhase::Resizing);
}

#[test]
fn pinch_after_edge_resize_starts_from_the_finger_position() {
    let mut rec = recognizer();
    let mut rect = RECT;
    // Right edge band: the rect origin stays put while the finger travels
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 295.0, 160.0, 0),
            ev(PointerPhase::Move, 0, 395.0, 160.0, 10),
            ev(PointerPhase::SecondPointerDown, 1, 445.0, 160.0, 20),
            ev(PointerPhase::Move, 0, 395.0, 160.0, 30),
        ],
    );

    let widened = SurfaceRect::new(100, 100, 300, 120);
    assert_eq!(
        out,
        vec![
            GestureEvent::Resized { rect: widened },
            GestureEvent::ResizeFinished { rect: widened },
        ]
    );
    assert_eq!(rect, widened);

    // Doubling the spread doubles the widened window about its center
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Move, 1, 495.0, 160.0, 40),
            ev(PointerPhase::Up, 0, 395.0, 160.0, 50),
        ],
    );
    let doubled = SurfaceRect::new(-50, 40, 600, 240);
    assert_eq!(
        out,
        vec![
            GestureEvent::Resized { rect: doubled },
            GestureEvent::ResizeFinished { rect: doubled },
        ]
    );
}

#[test]
fn pinch_rotation_wraps_across_half_turn() {
    let mut rec = recognizer();
    let mut rect = RECT;
    // Secondary sits just above, then just below, the primary's left side
    let out = feed(
        &mut rec,
        &mut rect,
        &Circle(40.0),
        &[
            ev(PointerPhase::Down, 0, 250.0, 160.0, 0),
            ev(PointerPhase::SecondPointerDown, 1, 150.0, 170.0, 5),
            ev(PointerPhase::Move, 1, 150.0, 150.0, 10),
        ],
    );

    let rotation = out.iter().find_map(|g| match g {
        GestureEvent::ShapeScaled { rotation_deg, .. } => Some(*rotation_deg),
        _ => None,
    });
    let rotation = rotation.unwrap();
    assert!((rotation - 11.42).abs() < 0.1, "rotation was {rotation}");
}

#[test]
fn third_pointer_is_ignored() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let circle = Circle(10.0);
    feed(
        &mut rec,
        &mut rect,
        &circle,
        &[
            ev(PointerPhase::Down, 0, 130.0, 150.0, 0),
            ev(PointerPhase::SecondPointerDown, 1, 170.0, 150.0, 5),
        ],
    );
    let out = feed(
        &mut rec,
        &mut rect,
        &circle,
        &[
            ev(PointerPhase::SecondPointerDown, 2, 250.0, 200.0, 10),
            ev(PointerPhase::Move, 2, 280.0, 200.0, 15),
            ev(PointerPhase::SecondPointerUp, 2, 280.0, 200.0, 20),
        ],
    );
    assert!(out.is_empty());
    assert_eq!(rec.active_pointers(), 2);
}

#[test]
fn double_tap_requires_same_target_within_window() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let tap = |at: u64, x: f32| {
        [
            ev(PointerPhase::Down, 0, x, 150.0, at),
            ev(PointerPhase::Up, 0, x, 150.0, at + 40),
        ]
    };

    let first = feed(&mut rec, &mut rect, &Halves, &tap(0, 120.0));
    assert_eq!(first.len(), 1);

    let second = feed(&mut rec, &mut rect, &Halves, &tap(200, 122.0));
    assert_eq!(second.last(), Some(&GestureEvent::DoubleTap { target: 1 }));

    // A third tap starts a new pair
    let third = feed(&mut rec, &mut rect, &Halves, &tap(400, 122.0));
    assert_eq!(third.len(), 1);

    // Different target does not pair
    let other = feed(&mut rec, &mut rect, &Halves, &tap(450, 280.0));
    assert_eq!(other.len(), 1);

    // Same target but too late
    let late = feed(&mut rec, &mut rect, &Halves, &tap(2_000, 280.0));
    assert_eq!(late.len(), 1);
}

#[test]
fn locked_surface_only_reports_taps_and_controls() {
    let mut rec = recognizer();
    rec.set_locked(true);
    let mut rect = RECT;

    let drag = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Move, 0, 220.0, 190.0, 10),
            ev(PointerPhase::SecondPointerDown, 1, 260.0, 190.0, 15),
            ev(PointerPhase::Up, 0, 220.0, 190.0, 20),
        ],
    );
    assert!(drag.is_empty());
    assert_eq!(rect, RECT);

    let tap = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 100),
            ev(PointerPhase::Up, 0, 150.0, 150.0, 120),
        ],
    );
    assert_eq!(tap.len(), 1);
}

#[test]
fn down_outside_surface_is_ignored() {
    let mut rec = recognizer();
    let mut rect = RECT;
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 10.0, 10.0, 0),
            ev(PointerPhase::Up, 0, 10.0, 10.0, 20),
        ],
    );
    assert!(out.is_empty());
}

#[test]
fn reset_drops_session_silently() {
    let mut rec = recognizer();
    let mut rect = RECT;
    feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[
            ev(PointerPhase::Down, 0, 150.0, 150.0, 0),
            ev(PointerPhase::Move, 0, 200.0, 150.0, 10),
        ],
    );
    rec.reset();
    assert_eq!(rec.phase(), GesturePhase::Idle);
    let out = feed(
        &mut rec,
        &mut rect,
        &Plain,
        &[ev(PointerPhase::Up, 0, 200.0, 150.0, 20)],
    );
    assert!(out.is_empty());
}
