use std::f64::consts::PI;

use approx::assert_abs_diff_eq;
use physm::dynamics::equations::coefficient_matrix;
use physm::dynamics::kinematics::KinematicFields;
use physm::utils::math::{invert, mat3_approx_eq};
use physm::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

const DT: f64 = 1.0 / 60.0;

fn single(frame: Frame) -> Solver {
    Solver::new(Scene::new(vec![frame]).unwrap())
}

fn states_of(solver: &Solver, map: &StateMap) -> Vec<FrameState> {
    solver.scene().states_from_map(map).unwrap()
}

#[test]
fn test_cart_on_flat_track_stays_at_rest() {
    let solver = single(
        Frame::track("cart")
            .with_resistance(5.0)
            .with_weight(Weight::new(20.0)),
    );
    let initial = solver.scene().initial_state_map();
    let qdd = solver
        .accelerations(&states_of(&solver, &initial), &[0.0])
        .unwrap();
    assert_abs_diff_eq!(qdd[0], 0.0, epsilon = 1e-6);

    let mut state = initial;
    for _ in 0..120 {
        state = solver.tick(&state, DT, None).unwrap();
        let cart = state.get(&FrameId::from("cart")).unwrap();
        assert_abs_diff_eq!(cart.q, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cart.qd, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn test_horizontal_pendulum_falls() {
    // With the weight at local (10, 0), q = 0 holds the arm horizontal.
    let solver = single(
        Frame::rotational("pendulum").with_weight(Weight::new(5.0).with_position(10.0, 0.0)),
    );
    let initial = solver.scene().initial_state_map();
    let qdd = solver
        .accelerations(&states_of(&solver, &initial), &[0.0])
        .unwrap();
    assert!(qdd[0] < 0.0);
    // Point mass on a massless arm: qdd = -g / r.
    assert_abs_diff_eq!(qdd[0], -1.0, epsilon = 1e-9);

    let next = solver.tick(&initial, 1.0 / 600.0, None).unwrap();
    let pendulum = next.get(&FrameId::from("pendulum")).unwrap();
    assert!(pendulum.qd < 0.0);
    assert_eq!(pendulum.q, 0.0);
}

#[test]
fn test_pendulum_released_vertically_falls_back() {
    // q = π/2 points the same arm straight up; a small nudge tips it over.
    let solver = single(
        Frame::rotational("pendulum")
            .with_initial_state(PI / 2.0 + 0.1, 0.0)
            .with_weight(Weight::new(5.0).with_position(10.0, 0.0)),
    );
    let initial = solver.scene().initial_state_map();
    let qdd = solver
        .accelerations(&states_of(&solver, &initial), &[0.0])
        .unwrap();
    assert!(qdd[0] > 0.0);
}

#[test]
fn test_hanging_pendulum_stays_at_rest() {
    let solver = single(
        Frame::rotational("pendulum").with_weight(Weight::new(5.0).with_position(0.0, -10.0)),
    );
    let initial = solver.scene().initial_state_map();
    let qdd = solver
        .accelerations(&states_of(&solver, &initial), &[0.0])
        .unwrap();
    assert_eq!(qdd[0], 0.0);

    let mut state = initial.clone();
    for _ in 0..30 {
        state = solver.tick(&state, DT, None).unwrap();
    }
    assert_eq!(state, initial);
}

#[test]
fn test_cart_and_double_pendulum_stay_bounded() {
    let solver = Solver::new(presets::cart_double_pendulum().unwrap());
    let mut state = solver.scene().initial_state_map();
    for tick in 0..50 {
        let next = solver.tick(&state, DT, None).unwrap();
        assert!(next.is_valid());
        assert_ne!(next, state);
        if tick < 10 {
            for (id, new) in &next {
                if id.as_str() == "ball" {
                    continue;
                }
                let old = state.get(id).unwrap();
                assert!((new.q - old.q).abs() < 1.0, "{id} jumped at tick {tick}");
                assert!((new.qd - old.qd).abs() < 1.0, "{id} jumped at tick {tick}");
            }
        }
        state = next;
    }
}

#[test]
fn test_runge_kutta_runs_double_pendulum() {
    let solver = Solver::new(presets::cart_double_pendulum().unwrap())
        .with_integration(IntegrationMethod::RungeKutta4);
    let mut state = solver.scene().initial_state_map();
    for _ in 0..50 {
        state = solver.tick(&state, DT, None).unwrap();
    }
    assert!(state.is_valid());
}

#[test]
fn test_mass_matrix_structure() {
    let scene = presets::cart_double_pendulum().unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5 {
        let map = scene.randomized_state_map(&mut rng);
        let states = scene.states_from_map(&map).unwrap();
        let fields = KinematicFields::compute(&scene, &states);
        let matrix = coefficient_matrix(&scene, &fields, false);
        let n = scene.len();
        for i in 0..n {
            // Every frame carries (or is above) a positive mass.
            assert!(matrix[(i, i)] > 0.0);
            for h in 0..n {
                assert_abs_diff_eq!(matrix[(i, h)], matrix[(h, i)], epsilon = 1e-9);
                let related = scene.is_ancestor(i, h) || scene.is_ancestor(h, i);
                if !related {
                    assert_eq!(matrix[(i, h)], 0.0);
                }
            }
        }
    }
}

#[test]
fn test_parallel_assembly_matches_sequential() {
    let scene = presets::rope_cart(30).unwrap();
    let states = scene.initial_states();
    let fields = KinematicFields::compute(&scene, &states);
    let sequential = coefficient_matrix(&scene, &fields, false);
    let parallel = coefficient_matrix(&scene, &fields, true);
    assert_eq!(sequential, parallel);
}

#[test]
fn test_tick_is_deterministic() {
    let solver = Solver::new(presets::cart_double_pendulum().unwrap())
        .with_integration(IntegrationMethod::RungeKutta4);
    let state = solver.scene().initial_state_map();
    let forces = ExternalForceMap::from([(FrameId::from("cart"), 30.0)]);
    let a = solver.tick(&state, DT, Some(&forces)).unwrap();
    let b = solver.tick(&state, DT, Some(&forces)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_transform_composition_and_inverse_laws() {
    let scene = presets::cart_double_pendulum().unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let map = scene.randomized_state_map(&mut rng);
    let states = scene.states_from_map(&map).unwrap();
    let fields = KinematicFields::compute(&scene, &states);
    for (i, frame) in scene.frames().iter().enumerate() {
        let local = frame.local_position_transform(states[i].q);
        let expected = match frame.parent() {
            Some(p) => fields.positions[p] * local,
            None => local,
        };
        assert!(mat3_approx_eq(&fields.positions[i], &expected, 1e-6));
        assert!(mat3_approx_eq(
            &(invert(&fields.positions[i]) * fields.positions[i]),
            &DMat3::IDENTITY,
            1e-6
        ));
    }
}

#[test]
fn test_singular_system_is_detected() {
    let a = DenseMatrix::from_rows(&[
        vec![2.0, 0.0, 1.0],
        vec![0.0, 1.0, 1.0],
        vec![2.0, 1.0, 2.0],
    ])
    .unwrap();
    let err = solve_linear_system(&a, &[1.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, PhysmError::SingularMatrix { .. }));
}

#[test]
fn test_fixed_frame_makes_the_system_singular() {
    let solver = single(
        Frame::fixed("anchor")
            .with_weight(Weight::new(1.0))
            .with_child(
                Frame::rotational("arm").with_weight(Weight::new(1.0).with_position(1.0, 0.0)),
            ),
    );
    let err = solver
        .tick(&solver.scene().initial_state_map(), DT, None)
        .unwrap_err();
    assert!(err.is_invalid_state_map());
}
