//! Global configuration constants for the physm solver.

/// Default gravity magnitude, acting along -y.
pub const DEFAULT_GRAVITY: f64 = 10.0;

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 60.0;

/// Smallest absolute value an `R` diagonal entry may have before a linear
/// system is reported as singular.
pub const SINGULARITY_TOLERANCE: f64 = 1e-6;

/// Tolerance used when comparing transforms and state values.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Physics steps per simulated second the host driver aims for.
pub const TARGET_PHYSICS_FPS: f64 = 300.0;

/// Lowest animation rate the host driver tries to sustain.
pub const MIN_ANIMATION_FPS: f64 = 5.0;

/// Multiplier applied to wall-clock time before it reaches the solver.
pub const DEFAULT_TIME_SCALE: f64 = 1.0;

/// Frame count from which coefficient matrix rows are assembled in parallel.
pub const PARALLEL_ROW_THRESHOLD: usize = 24;
