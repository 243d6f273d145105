use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::equations::{system_of_equations, SystemOfEquations};
use super::integrator::IntegrationMethod;
use super::kinematics::KinematicFields;
use crate::core::scene::Scene;
use crate::core::state::{ExternalForceMap, FrameState, StateMap};
use crate::error::{PhysmError, Result};
use crate::utils::linalg::solve_linear_system;
use crate::utils::logging::StageTimer;

/// Tunables for a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub integration: IntegrationMethod,
    /// Assemble large mass matrices on the rayon pool.
    pub parallel: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            integration: IntegrationMethod::Euler,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

/// Stateless stepper over a shared, read-only [`Scene`].
///
/// The solver holds no per-tick state: identical inputs always produce
/// bit-identical outputs, and one scene can back any number of solvers.
#[derive(Debug, Clone)]
pub struct Solver {
    scene: Arc<Scene>,
    options: SolverOptions,
}

impl Solver {
    pub fn new(scene: impl Into<Arc<Scene>>) -> Self {
        Self::with_options(scene, SolverOptions::default())
    }

    pub fn with_options(scene: impl Into<Arc<Scene>>, options: SolverOptions) -> Self {
        let scene = scene.into();
        debug!(
            "solver over {} frames using {:?} integration (parallel: {})",
            scene.len(),
            options.integration,
            options.parallel
        );
        Self { scene, options }
    }

    pub fn with_integration(mut self, integration: IntegrationMethod) -> Self {
        self.options.integration = integration;
        self
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn options(&self) -> SolverOptions {
        self.options
    }

    /// External forces in topological order; absent frames get zero.
    pub fn external_forces(&self, forces: Option<&ExternalForceMap>) -> Vec<f64> {
        self.scene
            .frames()
            .iter()
            .map(|frame| {
                forces
                    .and_then(|map| map.get(&frame.id).copied())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    fn check_state_len(&self, states: &[FrameState]) -> Result<()> {
        if states.len() != self.scene.len() {
            return Err(PhysmError::dimension(format!(
                "expected {} frame states; got {}",
                self.scene.len(),
                states.len()
            )));
        }
        Ok(())
    }

    pub fn system_of_equations(
        &self,
        states: &[FrameState],
        external: &[f64],
    ) -> Result<SystemOfEquations> {
        self.check_state_len(states)?;
        let fields = KinematicFields::compute(&self.scene, states);
        Ok(system_of_equations(
            &self.scene,
            &fields,
            states,
            external,
            self.options.parallel,
        ))
    }

    /// Generalized accelerations `qdd`, reusing `fields` as scratch.
    ///
    /// A singular mass matrix surfaces as [`PhysmError::InvalidStateMap`].
    pub fn accelerations_with(
        &self,
        fields: &mut KinematicFields,
        states: &[FrameState],
        external: &[f64],
    ) -> Result<Vec<f64>> {
        self.check_state_len(states)?;
        {
            let _timer = StageTimer::new("kinematics");
            fields.compute_into(&self.scene, states);
        }
        let system = {
            let _timer = StageTimer::new("assembly");
            system_of_equations(&self.scene, fields, states, external, self.options.parallel)
        };
        let _timer = StageTimer::new("solve");
        solve_linear_system(&system.coefficients, &system.forces)
            .map_err(PhysmError::into_invalid_state)
    }

    pub fn accelerations(&self, states: &[FrameState], external: &[f64]) -> Result<Vec<f64>> {
        self.accelerations_with(&mut KinematicFields::default(), states, external)
    }

    /// One integration step of length `dt`, reusing `fields` as scratch.
    pub fn step_with(
        &self,
        fields: &mut KinematicFields,
        states: &[FrameState],
        dt: f64,
        external: &[f64],
    ) -> Result<Vec<FrameState>> {
        let next = self.options.integration.step(states, dt, |stage| {
            self.accelerations_with(fields, stage, external)
        })?;
        let _timer = StageTimer::new("validate");
        match next.iter().position(|state| !state.is_finite()) {
            Some(i) => Err(PhysmError::invalid_state_at(self.scene.frames()[i].id.clone())),
            None => Ok(next),
        }
    }

    pub fn step(
        &self,
        states: &[FrameState],
        dt: f64,
        external: &[f64],
    ) -> Result<Vec<FrameState>> {
        self.step_with(&mut KinematicFields::default(), states, dt, external)
    }

    /// Advances a state map by one step of `delta_time`.
    ///
    /// Every scene frame must be present in `state_map`.
    pub fn tick(
        &self,
        state_map: &StateMap,
        delta_time: f64,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap> {
        self.tick_substeps(state_map, delta_time, 1, forces)
    }

    /// Advances a state map by `delta_time`, split into `tick_count` equal steps.
    pub fn tick_substeps(
        &self,
        state_map: &StateMap,
        delta_time: f64,
        tick_count: usize,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap> {
        let tick_count = tick_count.max(1);
        let dt = delta_time / tick_count as f64;
        let external = self.external_forces(forces);
        let mut fields = KinematicFields::default();
        let mut states = self.scene.states_from_map(state_map)?;
        for _ in 0..tick_count {
            states = self.step_with(&mut fields, &states, dt, &external)?;
        }
        Ok(self.scene.state_map_from(&states))
    }
}
