use std::fmt;

use glam::{DMat3, DVec3};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::FrameState;
use super::weight::Weight;
use crate::utils::math::{from_rows, point};

/// Stable, unique identifier of a frame within a scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(String);

impl FrameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random 16-character alphanumeric id, used when a description omits one.
    pub fn random() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FrameId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for FrameId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Joint connecting a frame to its parent; one scalar degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Joint {
    /// Rigid placeholder: identity position transform and zero velocity fields.
    Fixed,
    /// Revolute joint; `q` is an angle in radians.
    Rotational,
    /// Prismatic joint; `q` is a signed displacement along `angle`.
    Track { angle: f64 },
}

impl Joint {
    /// Name used for this joint in scene documents.
    pub fn type_name(&self) -> &'static str {
        match self {
            Joint::Fixed => "Frame",
            Joint::Rotational => "RotationalFrame",
            Joint::Track { .. } => "TrackFrame",
        }
    }

    /// Local position transform at coordinate `q` for a joint placed at `offset`.
    pub fn position_transform(&self, offset: DVec3, q: f64) -> DMat3 {
        match *self {
            Joint::Fixed => DMat3::IDENTITY,
            Joint::Rotational => {
                let (s, c) = q.sin_cos();
                from_rows([c, -s, offset.x], [s, c, offset.y], [0.0, 0.0, 1.0])
            }
            Joint::Track { angle } => {
                let (s, c) = angle.sin_cos();
                from_rows(
                    [1.0, 0.0, offset.x + q * c],
                    [0.0, 1.0, offset.y + q * s],
                    [0.0, 0.0, 1.0],
                )
            }
        }
    }

    /// Derivative of [`Joint::position_transform`] with respect to `q`.
    pub fn velocity_transform(&self, q: f64) -> DMat3 {
        match *self {
            Joint::Fixed => DMat3::ZERO,
            Joint::Rotational => {
                let (s, c) = q.sin_cos();
                from_rows([-s, -c, 0.0], [c, -s, 0.0], [0.0, 0.0, 0.0])
            }
            Joint::Track { angle } => {
                let (s, c) = angle.sin_cos();
                from_rows([0.0, 0.0, c], [0.0, 0.0, s], [0.0, 0.0, 0.0])
            }
        }
    }

    /// Second derivative of [`Joint::position_transform`] with respect to `q`.
    pub fn acceleration_transform(&self, q: f64) -> DMat3 {
        match *self {
            Joint::Fixed | Joint::Track { .. } => DMat3::ZERO,
            Joint::Rotational => {
                let (s, c) = q.sin_cos();
                from_rows([-c, s, 0.0], [-s, -c, 0.0], [0.0, 0.0, 0.0])
            }
        }
    }
}

/// Sub-body of a mechanism: a joint, attached point masses and child frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: FrameId,
    pub joint: Joint,
    /// Fixed local offset `[x, y, 1]` of the joint in the parent frame.
    pub position: DVec3,
    /// Linear joint damping opposing `qd`.
    pub resistance: f64,
    pub initial_state: FrameState,
    pub weights: Vec<Weight>,
    pub frames: Vec<Frame>,
}

impl Frame {
    pub fn new(id: impl Into<FrameId>, joint: Joint) -> Self {
        Self {
            id: id.into(),
            joint,
            position: point(0.0, 0.0),
            resistance: 0.0,
            initial_state: FrameState::ZERO,
            weights: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn fixed(id: impl Into<FrameId>) -> Self {
        Self::new(id, Joint::Fixed)
    }

    pub fn rotational(id: impl Into<FrameId>) -> Self {
        Self::new(id, Joint::Rotational)
    }

    /// Track frame travelling along the x axis; see [`Frame::with_angle`].
    pub fn track(id: impl Into<FrameId>) -> Self {
        Self::new(id, Joint::Track { angle: 0.0 })
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = point(x, y);
        self
    }

    /// Sets the travel direction of a track frame; other joints ignore it.
    pub fn with_angle(mut self, angle: f64) -> Self {
        if let Joint::Track { angle: current } = &mut self.joint {
            *current = angle;
        }
        self
    }

    pub fn with_resistance(mut self, resistance: f64) -> Self {
        self.resistance = resistance;
        self
    }

    pub fn with_initial_state(mut self, q: f64, qd: f64) -> Self {
        self.initial_state = FrameState::new(q, qd);
        self
    }

    pub fn with_weight(mut self, weight: Weight) -> Self {
        self.weights.push(weight);
        self
    }

    pub fn with_child(mut self, child: Frame) -> Self {
        self.frames.push(child);
        self
    }

    /// Travel angle of a track frame.
    pub fn angle(&self) -> Option<f64> {
        match self.joint {
            Joint::Track { angle } => Some(angle),
            _ => None,
        }
    }

    pub fn local_position_transform(&self, q: f64) -> DMat3 {
        self.joint.position_transform(self.position, q)
    }

    pub fn local_velocity_transform(&self, q: f64) -> DMat3 {
        self.joint.velocity_transform(q)
    }

    pub fn local_acceleration_transform(&self, q: f64) -> DMat3 {
        self.joint.acceleration_transform(q)
    }

    /// Number of frames in this subtree, self included.
    pub fn subtree_len(&self) -> usize {
        1 + self.frames.iter().map(Frame::subtree_len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::mat3_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn builder_nests_children() {
        let frame = Frame::rotational("a")
            .with_child(Frame::rotational("b").with_position(1.5, 2.6))
            .with_child(Frame::rotational("c").with_position(5.0, 28.0))
            .with_weight(Weight::new(12.0));
        assert_eq!(frame.id, FrameId::from("a"));
        assert_eq!(frame.frames.len(), 2);
        assert_eq!(frame.frames[0].position, point(1.5, 2.6));
        assert_eq!(frame.weights, vec![Weight::new(12.0)]);
        assert_eq!(frame.subtree_len(), 3);
    }

    #[test]
    fn angle_only_applies_to_tracks() {
        assert_eq!(Frame::track("t").with_angle(PI).angle(), Some(PI));
        let rotational = Frame::rotational("r").with_angle(PI);
        assert_eq!(rotational.joint, Joint::Rotational);
        assert_eq!(rotational.angle(), None);
    }

    #[test]
    fn fixed_frame_transforms() {
        let frame = Frame::fixed("f").with_position(3.0, 4.0);
        assert_eq!(frame.local_position_transform(1.0), DMat3::IDENTITY);
        assert_eq!(frame.local_velocity_transform(1.0), DMat3::ZERO);
        assert_eq!(frame.local_acceleration_transform(1.0), DMat3::ZERO);
    }

    #[test]
    fn rotational_position_transform() {
        let frame = Frame::rotational("a");
        assert!(mat3_approx_eq(
            &frame.local_position_transform(0.0),
            &DMat3::IDENTITY,
            1e-12
        ));
        let frame = frame.with_position(3.0, 4.0);
        assert!(mat3_approx_eq(
            &frame.local_position_transform(PI / 3.0),
            &from_rows([0.500, -0.866, 3.0], [0.866, 0.500, 4.0], [0.0, 0.0, 1.0]),
            1e-3
        ));
    }

    #[test]
    fn rotational_velocity_and_acceleration_transforms() {
        let frame = Frame::rotational("a").with_position(3.0, 4.0);
        assert!(mat3_approx_eq(
            &frame.local_velocity_transform(PI / 3.0),
            &from_rows([-0.866, -0.500, 0.0], [0.500, -0.866, 0.0], [0.0, 0.0, 0.0]),
            1e-3
        ));
        assert!(mat3_approx_eq(
            &frame.local_acceleration_transform(PI / 3.0),
            &from_rows([-0.500, 0.866, 0.0], [-0.866, -0.500, 0.0], [0.0, 0.0, 0.0]),
            1e-3
        ));
    }

    #[test]
    fn rotational_velocity_is_numerical_derivative() {
        let frame = Frame::rotational("a").with_position(1.0, -2.0);
        let q = 0.37;
        let h = 1e-6;
        let numeric = (frame.local_position_transform(q + h)
            - frame.local_position_transform(q - h))
            * (0.5 / h);
        assert!(mat3_approx_eq(&numeric, &frame.local_velocity_transform(q), 1e-6));
        let numeric = (frame.local_velocity_transform(q + h)
            - frame.local_velocity_transform(q - h))
            * (0.5 / h);
        assert!(mat3_approx_eq(&numeric, &frame.local_acceleration_transform(q), 1e-6));
    }

    #[test]
    fn track_transforms() {
        let frame = Frame::track("a").with_position(3.0, 4.0);
        assert!(mat3_approx_eq(
            &frame.local_position_transform(7.0),
            &from_rows([1.0, 0.0, 10.0], [0.0, 1.0, 4.0], [0.0, 0.0, 1.0]),
            1e-9
        ));
        assert!(mat3_approx_eq(
            &frame.local_velocity_transform(7.0),
            &from_rows([0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
            1e-9
        ));

        let frame = frame.with_angle(PI / 3.0);
        assert!(mat3_approx_eq(
            &frame.local_position_transform(7.0),
            &from_rows([1.0, 0.0, 6.5], [0.0, 1.0, 10.06], [0.0, 0.0, 1.0]),
            1e-2
        ));
        assert!(mat3_approx_eq(
            &frame.local_velocity_transform(7.0),
            &from_rows([0.0, 0.0, 0.5], [0.0, 0.0, 0.866], [0.0, 0.0, 0.0]),
            1e-3
        ));
        assert_eq!(frame.local_acceleration_transform(7.0), DMat3::ZERO);
    }

    #[test]
    fn random_ids_differ() {
        let a = FrameId::random();
        let b = FrameId::random();
        assert_eq!(a.as_str().len(), 16);
        assert_ne!(a, b);
    }
}
