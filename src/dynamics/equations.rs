//! Generalized mass matrix and force vector of the scene's Lagrangian.

use glam::{DMat3, DVec2, DVec3};

use super::kinematics::KinematicFields;
use crate::config::PARALLEL_ROW_THRESHOLD;
use crate::core::scene::Scene;
use crate::core::state::FrameState;
use crate::utils::linalg::DenseMatrix;

/// Linear system `A qdd = b` for one configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemOfEquations {
    /// Generalized mass matrix `A`.
    pub coefficients: DenseMatrix,
    /// Generalized force vector `b`.
    pub forces: Vec<f64>,
}

#[inline]
fn planar(field: &DMat3, position: DVec3) -> DVec2 {
    (*field * position).truncate()
}

/// Entry `A[i, h]`: zero unless one frame descends from the other, otherwise
/// the mass-weighted overlap of both unit velocity fields over every weight
/// below the deeper frame.
pub fn coefficient(scene: &Scene, fields: &KinematicFields, i: usize, h: usize) -> f64 {
    let Some(base) = scene.deeper_related(i, h) else {
        return 0.0;
    };
    let (vel_i, vel_h) = (&fields.velocities[i], &fields.velocities[h]);
    scene.frames()[base]
        .descendants()
        .iter()
        .flat_map(|&j| scene.frames()[j].weights.iter().zip(&fields.weight_positions[j]))
        .map(|(weight, &position)| {
            weight.mass * planar(vel_h, position).dot(planar(vel_i, position))
        })
        .sum()
}

fn coefficient_row(scene: &Scene, fields: &KinematicFields, i: usize) -> Vec<f64> {
    (0..scene.len())
        .map(|h| coefficient(scene, fields, i, h))
        .collect()
}

/// Assembles the full generalized mass matrix.
///
/// With the `parallel` feature, rows are computed on the rayon pool once the
/// scene reaches [`PARALLEL_ROW_THRESHOLD`] frames.
pub fn coefficient_matrix(scene: &Scene, fields: &KinematicFields, parallel: bool) -> DenseMatrix {
    let n = scene.len();
    let rows: Vec<Vec<f64>> = if parallel && n >= PARALLEL_ROW_THRESHOLD {
        parallel_rows(scene, fields)
    } else {
        (0..n).map(|i| coefficient_row(scene, fields, i)).collect()
    };

    let mut matrix = DenseMatrix::zeros(n, n);
    for (i, row) in rows.iter().enumerate() {
        for (h, value) in row.iter().enumerate() {
            matrix[(i, h)] = *value;
        }
    }
    matrix
}

#[cfg(feature = "parallel")]
fn parallel_rows(scene: &Scene, fields: &KinematicFields) -> Vec<Vec<f64>> {
    use rayon::prelude::*;

    (0..scene.len())
        .into_par_iter()
        .map(|i| coefficient_row(scene, fields, i))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn parallel_rows(scene: &Scene, fields: &KinematicFields) -> Vec<Vec<f64>> {
    (0..scene.len())
        .map(|i| coefficient_row(scene, fields, i))
        .collect()
}

/// Entry `b[i]`: gravity, inertial reaction and drag projected onto frame
/// `i`'s unit velocity field, minus joint resistance, plus the external force.
pub fn force(
    scene: &Scene,
    fields: &KinematicFields,
    states: &[FrameState],
    external: f64,
    i: usize,
) -> f64 {
    let frame = &scene.frames()[i];
    let gravity = scene.gravity();
    let vel_i = &fields.velocities[i];

    let weight_terms: f64 = frame
        .descendants()
        .iter()
        .map(|&j| {
            let accel_sum = &fields.acceleration_sums[j];
            let vel_sum = &fields.velocity_sums[j];
            scene.frames()[j]
                .weights
                .iter()
                .zip(&fields.weight_positions[j])
                .map(|(weight, &position)| {
                    let unit = planar(vel_i, position);
                    -weight.mass * unit.dot(planar(accel_sum, position))
                        - weight.drag * unit.dot(planar(vel_sum, position))
                        - weight.mass * gravity * unit.y
                })
                .sum::<f64>()
        })
        .sum();

    weight_terms - frame.resistance * states[i].qd + external
}

/// Generalized force vector; `external` holds one force per frame in topological order.
pub fn force_vector(
    scene: &Scene,
    fields: &KinematicFields,
    states: &[FrameState],
    external: &[f64],
) -> Vec<f64> {
    (0..scene.len())
        .map(|i| force(scene, fields, states, external.get(i).copied().unwrap_or(0.0), i))
        .collect()
}

pub fn system_of_equations(
    scene: &Scene,
    fields: &KinematicFields,
    states: &[FrameState],
    external: &[f64],
    parallel: bool,
) -> SystemOfEquations {
    SystemOfEquations {
        coefficients: coefficient_matrix(scene, fields, parallel),
        forces: force_vector(scene, fields, states, external),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Frame;
    use crate::core::weight::Weight;

    fn pendulum(weight_x: f64, weight_y: f64) -> Scene {
        Scene::new(vec![Frame::rotational("p")
            .with_weight(Weight::new(5.0).with_position(weight_x, weight_y))])
        .unwrap()
    }

    #[test]
    fn horizontal_pendulum_feels_full_torque() {
        let scene = pendulum(10.0, 0.0);
        let states = [FrameState::ZERO];
        let fields = KinematicFields::compute(&scene, &states);
        let system = system_of_equations(&scene, &fields, &states, &[0.0], false);
        assert!((system.coefficients[(0, 0)] - 500.0).abs() < 1e-9);
        assert!((system.forces[0] + 500.0).abs() < 1e-9);
    }

    #[test]
    fn hanging_pendulum_feels_no_torque() {
        let scene = pendulum(0.0, -10.0);
        let states = [FrameState::ZERO];
        let fields = KinematicFields::compute(&scene, &states);
        assert_eq!(force(&scene, &fields, &states, 0.0, 0), 0.0);
    }

    #[test]
    fn resistance_and_external_force() {
        let scene = Scene::new(vec![Frame::track("cart")
            .with_resistance(5.0)
            .with_weight(Weight::new(20.0))])
        .unwrap();
        let states = [FrameState::new(0.0, 2.0)];
        let fields = KinematicFields::compute(&scene, &states);
        let b = force_vector(&scene, &fields, &states, &[7.0]);
        assert!((b[0] - (7.0 - 10.0)).abs() < 1e-12);
        assert!((coefficient(&scene, &fields, 0, 0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn weight_drag_opposes_motion() {
        let scene = Scene::new(vec![Frame::track("cart")
            .with_weight(Weight::new(1.0).with_drag(3.0))])
        .unwrap();
        let states = [FrameState::new(0.0, 2.0)];
        let fields = KinematicFields::compute(&scene, &states);
        assert!((force(&scene, &fields, &states, 0.0, 0) + 6.0).abs() < 1e-12);
    }

    #[test]
    fn unrelated_frames_do_not_couple() {
        let scene = Scene::new(vec![Frame::track("a")
            .with_weight(Weight::new(1.0))
            .with_child(
                Frame::rotational("b").with_weight(Weight::new(1.0).with_position(1.0, 0.0)),
            )
            .with_child(
                Frame::rotational("c").with_weight(Weight::new(1.0).with_position(0.0, 1.0)),
            )])
        .unwrap();
        let states = vec![FrameState::new(0.0, 0.0); 3];
        let fields = KinematicFields::compute(&scene, &states);
        let matrix = coefficient_matrix(&scene, &fields, false);
        assert_eq!(matrix[(1, 2)], 0.0);
        assert_eq!(matrix[(2, 1)], 0.0);
        assert!(matrix[(0, 0)] > 0.0);
        assert!(matrix[(1, 1)] > 0.0);
    }
}
