//! physm – planar multi-body physics for articulated mechanisms.
//!
//! A [`Scene`] is a forest of jointed frames (carts on tracks, pendulum
//! chains, ropes) carrying point masses. Each tick the [`Solver`] builds the
//! generalized mass matrix and force vector of the scene's Lagrangian, solves
//! for joint accelerations and integrates with explicit Euler or RK4.
//!
//! ```no_run
//! use physm::{presets, Solver};
//!
//! let scene = presets::cart_double_pendulum()?;
//! let solver = Solver::new(scene);
//! let mut state = solver.scene().initial_state_map();
//! for _ in 0..60 {
//!     state = solver.tick(&state, 1.0 / 60.0, None)?;
//! }
//! # Ok::<(), physm::PhysmError>(())
//! ```

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod presets;
pub mod simulation;
pub mod utils;
pub mod validation;

pub use glam::{DMat3, DVec2, DVec3};

pub use crate::core::{
    document::{FrameDocument, FrameKind, SceneDocument, WeightDocument},
    frame::{Frame, FrameId, Joint},
    scene::{Scene, SceneFrame},
    state::{ExternalForceMap, FrameState, StateMap},
    weight::Weight,
};
pub use dynamics::{
    context::{SharedSolverContext, SolverContext},
    integrator::IntegrationMethod,
    solver::{Solver, SolverOptions},
};
pub use error::{PhysmError, Result};
pub use simulation::{Simulation, SimulationConfig};
pub use utils::linalg::{solve_linear_system, DenseMatrix};
pub use validation::{cross_validate, CrossValidationReport, ReferenceSolver, TickBackend};
