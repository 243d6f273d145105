//! Global transform fields for every frame at one configuration.
//!
//! Frames are visited in topological order, so a parent's fields are always
//! ready when its children need them.

use glam::{DMat3, DVec3};

use crate::core::scene::Scene;
use crate::core::state::FrameState;
use crate::utils::math::invert;

/// Per-frame transforms, indexed like [`Scene::frames`].
#[derive(Debug, Clone, Default)]
pub struct KinematicFields {
    /// Local-to-global position transform.
    pub positions: Vec<DMat3>,
    pub inverse_positions: Vec<DMat3>,
    /// Unit velocity field of each joint, in global coordinates.
    pub velocities: Vec<DMat3>,
    /// Unit acceleration field of each joint, in global coordinates.
    pub accelerations: Vec<DMat3>,
    /// Actual velocity field of the chain from the root down to each frame.
    pub velocity_sums: Vec<DMat3>,
    /// Actual acceleration field of the chain, Coriolis term included.
    pub acceleration_sums: Vec<DMat3>,
    /// Global position of every weight, grouped by owning frame.
    pub weight_positions: Vec<Vec<DVec3>>,
}

impl KinematicFields {
    pub fn compute(scene: &Scene, states: &[FrameState]) -> Self {
        let mut fields = Self::default();
        fields.compute_into(scene, states);
        fields
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Recomputes every field in place, reusing the existing allocations.
    pub fn compute_into(&mut self, scene: &Scene, states: &[FrameState]) {
        let n = scene.len();
        debug_assert_eq!(states.len(), n);
        self.resize(n);

        for (i, frame) in scene.frames().iter().enumerate() {
            let FrameState { q, qd } = states[i];
            let local_pos = frame.local_position_transform(q);
            let local_vel = frame.local_velocity_transform(q);
            let local_accel = frame.local_acceleration_transform(q);

            let (pos, vel_field, accel_field) = match frame.parent() {
                Some(p) => {
                    let parent_pos = self.positions[p];
                    (parent_pos * local_pos, parent_pos * local_vel, parent_pos * local_accel)
                }
                None => (local_pos, local_vel, local_accel),
            };
            let inv = invert(&pos);
            let vel = vel_field * inv;
            let accel = accel_field * inv;

            let (vel_sum, accel_sum) = match frame.parent() {
                Some(p) => {
                    let parent_vel_sum = self.velocity_sums[p];
                    (
                        vel * qd + parent_vel_sum,
                        accel * (qd * qd)
                            + self.acceleration_sums[p]
                            + (parent_vel_sum * vel) * (2.0 * qd),
                    )
                }
                None => (vel * qd, accel * (qd * qd)),
            };

            self.positions[i] = pos;
            self.inverse_positions[i] = inv;
            self.velocities[i] = vel;
            self.accelerations[i] = accel;
            self.velocity_sums[i] = vel_sum;
            self.acceleration_sums[i] = accel_sum;

            let weights = &mut self.weight_positions[i];
            weights.clear();
            weights.extend(frame.weights.iter().map(|w| pos * w.position));
        }
    }

    fn resize(&mut self, n: usize) {
        self.positions.resize(n, DMat3::IDENTITY);
        self.inverse_positions.resize(n, DMat3::IDENTITY);
        self.velocities.resize(n, DMat3::ZERO);
        self.accelerations.resize(n, DMat3::ZERO);
        self.velocity_sums.resize(n, DMat3::ZERO);
        self.acceleration_sums.resize(n, DMat3::ZERO);
        self.weight_positions.resize_with(n, Vec::new);
    }
}
