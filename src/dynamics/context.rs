//! Session-style solver handle with an internal flat state buffer.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::kinematics::KinematicFields;
use super::solver::Solver;
use crate::core::state::{ExternalForceMap, FrameState, StateMap};
use crate::error::{PhysmError, Result};

/// Holds the current state as `[q0, qd0, q1, qd1, ...]` in topological order
/// and reuses its scratch transforms across ticks.
#[derive(Debug, Clone)]
pub struct SolverContext {
    solver: Solver,
    buffer: Vec<f64>,
    fields: KinematicFields,
}

impl SolverContext {
    /// Starts from the scene's initial state.
    pub fn new(solver: Solver) -> Self {
        let mut context = Self {
            solver,
            buffer: Vec::new(),
            fields: KinematicFields::default(),
        };
        context.reset_state_map();
        context
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn state_buffer(&self) -> &[f64] {
        &self.buffer
    }

    /// Replaces the flat state buffer; its length must be twice the frame count.
    pub fn set_state_buffer(&mut self, buffer: &[f64]) -> Result<()> {
        let expected = 2 * self.solver.scene().len();
        if buffer.len() != expected {
            return Err(PhysmError::dimension(format!(
                "expected state buffer of length {expected}; got {}",
                buffer.len()
            )));
        }
        self.buffer.clear();
        self.buffer.extend_from_slice(buffer);
        Ok(())
    }

    pub fn states(&self) -> Vec<FrameState> {
        self.buffer
            .chunks_exact(2)
            .map(|pair| FrameState::new(pair[0], pair[1]))
            .collect()
    }

    fn store(&mut self, states: &[FrameState]) {
        self.buffer.clear();
        self.buffer.extend(states.iter().flat_map(|s| [s.q, s.qd]));
    }

    pub fn state_map(&self) -> StateMap {
        self.solver.scene().state_map_from(&self.states())
    }

    /// Loads a state map; frames missing from it start at `(0, 0)`.
    pub fn set_state_map(&mut self, state_map: &StateMap) {
        let states = self.solver.scene().states_from_map_or_zero(state_map);
        self.store(&states);
    }

    pub fn reset_state_map(&mut self) {
        let states = self.solver.scene().initial_states();
        self.store(&states);
    }

    /// Runs `tick_count` steps of `delta_time` each.
    ///
    /// The buffer is only updated when the whole batch succeeds.
    pub fn tick(
        &mut self,
        delta_time: f64,
        tick_count: usize,
        forces: Option<&ExternalForceMap>,
    ) -> Result<()> {
        let external = self.solver.external_forces(forces);
        let mut states = self.states();
        for _ in 0..tick_count {
            states = self
                .solver
                .step_with(&mut self.fields, &states, delta_time, &external)?;
        }
        self.store(&states);
        Ok(())
    }
}

/// Cloneable, thread-safe handle to one [`SolverContext`].
#[derive(Debug, Clone)]
pub struct SharedSolverContext {
    inner: Arc<Mutex<SolverContext>>,
}

impl SharedSolverContext {
    pub fn new(context: SolverContext) -> Self {
        Self {
            inner: Arc::new(Mutex::new(context)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SolverContext> {
        self.inner.lock()
    }

    pub fn tick(
        &self,
        delta_time: f64,
        tick_count: usize,
        forces: Option<&ExternalForceMap>,
    ) -> Result<()> {
        self.inner.lock().tick(delta_time, tick_count, forces)
    }

    pub fn state_map(&self) -> StateMap {
        self.inner.lock().state_map()
    }

    pub fn set_state_map(&self, state_map: &StateMap) {
        self.inner.lock().set_state_map(state_map);
    }

    pub fn reset_state_map(&self) {
        self.inner.lock().reset_state_map();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{Frame, FrameId};
    use crate::core::scene::Scene;
    use crate::core::weight::Weight;

    fn context() -> SolverContext {
        let scene = Scene::new(vec![Frame::track("cart")
            .with_initial_state(1.0, 2.0)
            .with_weight(Weight::new(1.0))
            .with_child(
                Frame::rotational("arm").with_weight(Weight::new(1.0).with_position(0.0, -1.0)),
            )])
        .unwrap();
        SolverContext::new(Solver::new(scene))
    }

    #[test]
    fn starts_from_initial_state() {
        let ctx = context();
        assert_eq!(ctx.state_buffer(), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(ctx.state_map(), ctx.solver().scene().initial_state_map());
    }

    #[test]
    fn missing_frames_read_as_zero() {
        let mut ctx = context();
        ctx.set_state_map(&StateMap::new().with("arm", (0.5, 0.25)));
        assert_eq!(ctx.state_buffer(), &[0.0, 0.0, 0.5, 0.25]);
        ctx.reset_state_map();
        assert_eq!(ctx.state_buffer(), &[1.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn buffer_length_is_checked() {
        let mut ctx = context();
        assert!(matches!(
            ctx.set_state_buffer(&[1.0, 2.0, 3.0]),
            Err(PhysmError::Dimension(_))
        ));
        ctx.set_state_buffer(&[0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(ctx.states()[0], FrameState::new(0.0, 1.0));
    }

    #[test]
    fn tick_matches_pure_solver() {
        let mut ctx = context();
        let start = ctx.state_map();
        ctx.tick(0.01, 3, None).unwrap();
        let mut expected = start;
        for _ in 0..3 {
            expected = ctx.solver().tick(&expected, 0.01, None).unwrap();
        }
        assert_eq!(ctx.state_map(), expected);
    }

    #[test]
    fn failed_batch_leaves_state_untouched() {
        let mut ctx = context();
        ctx.set_state_buffer(&[f64::NAN, 0.0, 0.0, 0.0]).unwrap();
        let before = ctx.state_buffer().to_vec();
        let err = ctx.tick(0.01, 2, None).unwrap_err();
        assert!(err.is_invalid_state_map());
        assert!(ctx.state_buffer()[0].is_nan());
        assert_eq!(ctx.state_buffer()[1..], before[1..]);
    }

    #[test]
    fn shared_handle_ticks() {
        let shared = SharedSolverContext::new(context());
        let worker = shared.clone();
        std::thread::spawn(move || worker.tick(0.01, 5, None).unwrap())
            .join()
            .unwrap();
        let cart = shared.state_map().get(&FrameId::from("cart")).unwrap();
        assert!((cart.q - 1.1).abs() < 1e-9);
        shared.reset_state_map();
        assert_eq!(shared.lock().state_buffer()[0], 1.0);
    }
}
