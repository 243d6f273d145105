//! Dynamics pipeline: kinematic fields, equation assembly, integration and stepping.

pub mod context;
pub mod equations;
pub mod integrator;
pub mod kinematics;
pub mod solver;

pub use context::{SharedSolverContext, SolverContext};
pub use equations::{coefficient_matrix, force_vector, SystemOfEquations};
pub use integrator::IntegrationMethod;
pub use kinematics::KinematicFields;
pub use solver::{Solver, SolverOptions};
