//! Ready-made scenes.

use std::f64::consts::PI;

use crate::core::frame::Frame;
use crate::core::scene::Scene;
use crate::core::weight::Weight;
use crate::error::Result;

pub const CART_MASS: f64 = 250.0;
pub const CART_RESISTANCE: f64 = 5.0;
/// Magnitude of the push a host applies to the rope cart.
pub const CART_FORCE: f64 = 7000.0;
pub const POI_MASS: f64 = 60.0;
pub const POI_DRAG: f64 = 20.0;
pub const ROPE_SEGMENT_LENGTH: f64 = 1.8;
pub const ROPE_SEGMENT_MASS: f64 = 1.0;
pub const ROPE_SEGMENT_DRAG: f64 = 15.0;
pub const ROPE_SEGMENT_RESISTANCE: f64 = 20.0;
pub const ROPE_SEGMENT_COUNT: usize = 8;

/// Cart carrying a double pendulum, plus a ball sliding down a 45° track.
pub fn cart_double_pendulum() -> Result<Scene> {
    let pendulum2 = Frame::rotational("pendulum2")
        .with_initial_state(-0.9, 1.8)
        .with_position(10.0, 0.0)
        .with_weight(Weight::new(8.0).with_position(12.0, 0.0));
    let pendulum1 = Frame::rotational("pendulum1")
        .with_initial_state(0.3, -1.2)
        .with_weight(Weight::new(5.0).with_position(10.0, 0.0))
        .with_child(pendulum2);
    let cart = Frame::track("cart")
        .with_initial_state(5.0, 1.0)
        .with_weight(Weight::new(20.0))
        .with_weight(Weight::new(3.0).with_position(0.0, 5.0))
        .with_child(pendulum1);
    let ball = Frame::track("ball")
        .with_initial_state(0.0, -2.0)
        .with_position(30.0, 0.0)
        .with_angle(PI / 4.0)
        .with_weight(Weight::new(5.0));
    Scene::new(vec![cart, ball])
}

/// Cart dragging a rope of `segment_count` rotational segments.
///
/// `segment0` is the free end and carries the heavy poi; the segment attached
/// to the cart starts tilted by `0.3π`.
pub fn rope_cart(segment_count: usize) -> Result<Scene> {
    let mut rope: Option<Frame> = None;
    for index in 0..segment_count {
        let first = index == 0;
        let last = index + 1 == segment_count;
        let (mass, drag) = if first {
            (POI_MASS, POI_DRAG)
        } else {
            (ROPE_SEGMENT_MASS, ROPE_SEGMENT_DRAG)
        };
        let mut segment = Frame::rotational(format!("segment{index}"))
            .with_position(if last { 0.0 } else { ROPE_SEGMENT_LENGTH }, 0.0)
            .with_initial_state(if last { 0.3 * PI } else { 0.0 }, 0.0)
            .with_resistance(ROPE_SEGMENT_RESISTANCE)
            .with_weight(
                Weight::new(mass)
                    .with_position(ROPE_SEGMENT_LENGTH, 0.0)
                    .with_drag(drag),
            );
        if let Some(inner) = rope.take() {
            segment = segment.with_child(inner);
        }
        rope = Some(segment);
    }

    let mut cart = Frame::track("cart")
        .with_resistance(CART_RESISTANCE)
        .with_weight(Weight::new(CART_MASS));
    if let Some(rope) = rope {
        cart = cart.with_child(rope);
    }
    Scene::new(vec![cart])
}
