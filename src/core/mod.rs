//! Scene model: frames, weights, the scene arena, state snapshots and documents.

pub mod document;
pub mod frame;
pub mod scene;
pub mod state;
pub mod weight;

pub use document::{FrameDocument, FrameKind, SceneDocument, WeightDocument};
pub use frame::{Frame, FrameId, Joint};
pub use scene::{Scene, SceneFrame};
pub use state::{ExternalForceMap, FrameState, StateMap};
pub use weight::Weight;
