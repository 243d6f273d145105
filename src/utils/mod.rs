//! Utility helpers: planar affine math, dense linear algebra, graph ordering and logging.

pub mod linalg;
pub mod logging;
pub mod math;
pub mod toposort;

pub use linalg::{solve_linear_system, solve_linear_system_column, DenseMatrix, QrDecomposition};
pub use logging::{warn_if_frame_budget_exceeded, StageTimer};
pub use math::*;
