//! Host-side driver turning animation frame deltas into physics sub-steps.

use std::time::Instant;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_TIME_SCALE, MIN_ANIMATION_FPS, TARGET_PHYSICS_FPS};
use crate::core::state::{ExternalForceMap, StateMap};
use crate::dynamics::context::SolverContext;
use crate::dynamics::solver::Solver;
use crate::error::Result;
use crate::utils::logging::warn_if_frame_budget_exceeded;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics steps per simulated second.
    pub target_physics_fps: f64,
    /// Multiplier from wall-clock to simulated time.
    pub time_scale: f64,
    /// Wall-clock budget for one animation frame's physics work.
    pub frame_budget_ms: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target_physics_fps: TARGET_PHYSICS_FPS,
            time_scale: DEFAULT_TIME_SCALE,
            frame_budget_ms: 1000.0 / MIN_ANIMATION_FPS,
        }
    }
}

/// Drives a [`SolverContext`] from animation frames, resetting on invalid states.
#[derive(Debug, Clone)]
pub struct Simulation {
    context: SolverContext,
    config: SimulationConfig,
    resets: usize,
    elapsed: f64,
}

impl Simulation {
    pub fn new(solver: Solver) -> Self {
        Self::with_config(solver, SimulationConfig::default())
    }

    pub fn with_config(solver: Solver, config: SimulationConfig) -> Self {
        Self {
            context: SolverContext::new(solver),
            config,
            resets: 0,
            elapsed: 0.0,
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn context(&self) -> &SolverContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SolverContext {
        &mut self.context
    }

    /// Number of times the state was reset after an invalid tick.
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Simulated seconds since construction or the last reset.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn state_map(&self) -> StateMap {
        self.context.state_map()
    }

    /// Sub-step count and per-step delta for an animation frame of `animation_dt` seconds.
    pub fn plan(&self, animation_dt: f64) -> (usize, f64) {
        let tick_count = (self.config.target_physics_fps * animation_dt).ceil().max(1.0) as usize;
        let delta_time = animation_dt / tick_count as f64 * self.config.time_scale;
        (tick_count, delta_time)
    }

    /// Advances by one animation frame and returns the new state.
    ///
    /// An invalid state resets the simulation to the scene's initial state
    /// instead of failing; any other error is returned.
    pub fn advance(
        &mut self,
        animation_dt: f64,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap> {
        if animation_dt <= 0.0 || !animation_dt.is_finite() {
            return Ok(self.state_map());
        }
        let (tick_count, delta_time) = self.plan(animation_dt);
        let start = Instant::now();
        match self.context.tick(delta_time, tick_count, forces) {
            Ok(()) => self.elapsed += delta_time * tick_count as f64,
            Err(err) if err.is_invalid_state_map() => {
                warn!("Encountered invalid state map; resetting to initial state... ({err})");
                self.context.reset_state_map();
                self.resets += 1;
                self.elapsed = 0.0;
            }
            Err(err) => return Err(err),
        }
        warn_if_frame_budget_exceeded(start.elapsed(), self.config.frame_budget_ms);
        Ok(self.state_map())
    }
}
