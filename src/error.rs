//! Error types shared by the scene model and the solver.

use thiserror::Error;

use crate::core::frame::FrameId;

/// Errors that can occur while building scenes or stepping the solver.
#[derive(Debug, Error)]
pub enum PhysmError {
    /// A position, state tuple, matrix or buffer has the wrong shape.
    #[error("dimension mismatch: {0}")]
    Dimension(String),

    /// The generalized mass matrix (or any system matrix) is numerically singular.
    #[error("singular matrix: {matrix}")]
    SingularMatrix {
        /// Formatted rows of the offending matrix.
        matrix: String,
    },

    /// Integration produced a non-finite state, or the underlying solve failed.
    ///
    /// Hosts are expected to catch this and reset to the scene's initial state.
    #[error("encountered invalid state map{}", at_frame(.frame))]
    InvalidStateMap {
        /// First frame whose `(q, qd)` was not finite, when known.
        frame: Option<FrameId>,
        /// Underlying failure, e.g. a singular mass matrix.
        #[source]
        cause: Option<Box<PhysmError>>,
    },

    /// A required input was not supplied.
    #[error("missing argument: {0}")]
    MissingArgument(String),

    /// A frame id occurs more than once across the scene forest.
    #[error("frame {0} appears more than once in the scene")]
    DuplicateFrameId(FrameId),

    /// Dependency ordering found a cycle.
    #[error("graph is not a DAG; recursively encountered {0}")]
    CyclicGraph(String),

    /// A lookup named a frame that is not part of the scene.
    #[error("unknown frame id: {0}")]
    UnknownFrame(FrameId),

    /// Two solver backends disagreed by more than the allowed tolerance.
    #[error("backend {backend} diverged at tick {tick} on frame {frame}: {difference} > {tolerance}")]
    Divergence {
        backend: String,
        frame: FrameId,
        tick: usize,
        difference: f64,
        tolerance: f64,
    },

    /// The scene document could not be parsed or written.
    #[error("invalid scene document: {0}")]
    Document(#[from] serde_json::Error),
}

impl PhysmError {
    /// Creates a dimension error from any displayable message.
    pub fn dimension(message: impl Into<String>) -> Self {
        Self::Dimension(message.into())
    }

    /// Creates an invalid state error pointing at a specific frame.
    pub fn invalid_state_at(frame: FrameId) -> Self {
        Self::InvalidStateMap {
            frame: Some(frame),
            cause: None,
        }
    }

    /// Wraps a solve failure as an invalid state; invalid states pass through unchanged.
    pub fn into_invalid_state(self) -> Self {
        match self {
            err @ Self::InvalidStateMap { .. } => err,
            other => Self::InvalidStateMap {
                frame: None,
                cause: Some(Box::new(other)),
            },
        }
    }

    /// Whether this is the recoverable error a host should reset on.
    pub fn is_invalid_state_map(&self) -> bool {
        matches!(self, Self::InvalidStateMap { .. })
    }
}

fn at_frame(frame: &Option<FrameId>) -> String {
    frame
        .as_ref()
        .map(|id| format!(" at frame {id}"))
        .unwrap_or_default()
}

/// Crate-wide result alias.
pub type Result<T, E = PhysmError> = std::result::Result<T, E>;
