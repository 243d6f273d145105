//! Plain structured scene documents, used to hand a scene to another solver.
//!
//! ```json
//! {"gravity": 10, "frames": [{"id": "cart", "type": "TrackFrame",
//!   "position": [0, 0], "angle": 0, "resistance": 5, "initialState": [5, 1],
//!   "weights": [{"mass": 20, "position": [0, 0], "drag": 0}], "frames": []}]}
//! ```

use serde::{Deserialize, Serialize};

use super::frame::{Frame, FrameId, Joint};
use super::scene::Scene;
use super::state::FrameState;
use super::weight::Weight;
use crate::config::DEFAULT_GRAVITY;
use crate::error::Result;
use crate::utils::math::{coerce_position, coerce_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    #[serde(rename = "Frame")]
    Fixed,
    RotationalFrame,
    TrackFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightDocument {
    pub mass: f64,
    #[serde(default = "origin")]
    pub position: Vec<f64>,
    #[serde(default)]
    pub drag: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDocument {
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: FrameKind,
    #[serde(default = "origin")]
    pub position: Vec<f64>,
    /// Travel direction; only meaningful for track frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default)]
    pub resistance: f64,
    #[serde(default = "origin")]
    pub initial_state: Vec<f64>,
    #[serde(default)]
    pub weights: Vec<WeightDocument>,
    #[serde(default)]
    pub frames: Vec<FrameDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default = "default_gravity")]
    pub gravity: f64,
    #[serde(default)]
    pub frames: Vec<FrameDocument>,
}

fn origin() -> Vec<f64> {
    vec![0.0, 0.0]
}

fn default_gravity() -> f64 {
    DEFAULT_GRAVITY
}

impl WeightDocument {
    pub fn to_weight(&self) -> Result<Weight> {
        let position = coerce_position(&self.position)?;
        Ok(Weight::new(self.mass)
            .with_position(position.x, position.y)
            .with_drag(self.drag))
    }

    pub fn from_weight(weight: &Weight) -> Self {
        Self {
            mass: weight.mass,
            position: vec![weight.position.x, weight.position.y],
            drag: weight.drag,
        }
    }
}

impl FrameDocument {
    pub fn to_frame(&self) -> Result<Frame> {
        let joint = match self.kind {
            FrameKind::Fixed => Joint::Fixed,
            FrameKind::RotationalFrame => Joint::Rotational,
            FrameKind::TrackFrame => Joint::Track {
                angle: self.angle.unwrap_or(0.0),
            },
        };
        let id = self
            .id
            .as_deref()
            .map(FrameId::from)
            .unwrap_or_else(FrameId::random);
        let position = coerce_position(&self.position)?;
        let (q, qd) = coerce_state(&self.initial_state)?;

        let mut frame = Frame::new(id, joint)
            .with_position(position.x, position.y)
            .with_resistance(self.resistance)
            .with_initial_state(q, qd);
        frame.weights = self
            .weights
            .iter()
            .map(WeightDocument::to_weight)
            .collect::<Result<_>>()?;
        frame.frames = self
            .frames
            .iter()
            .map(FrameDocument::to_frame)
            .collect::<Result<_>>()?;
        Ok(frame)
    }

    pub fn from_frame(frame: &Frame) -> Self {
        let kind = match frame.joint {
            Joint::Fixed => FrameKind::Fixed,
            Joint::Rotational => FrameKind::RotationalFrame,
            Joint::Track { .. } => FrameKind::TrackFrame,
        };
        let FrameState { q, qd } = frame.initial_state;
        Self {
            id: Some(frame.id.to_string()),
            kind,
            position: vec![frame.position.x, frame.position.y],
            angle: frame.angle(),
            resistance: frame.resistance,
            initial_state: vec![q, qd],
            weights: frame.weights.iter().map(WeightDocument::from_weight).collect(),
            frames: frame.frames.iter().map(FrameDocument::from_frame).collect(),
        }
    }
}

impl Scene {
    pub fn from_document(document: &SceneDocument) -> Result<Self> {
        let roots = document
            .frames
            .iter()
            .map(FrameDocument::to_frame)
            .collect::<Result<Vec<_>>>()?;
        Scene::with_roots(document.gravity, roots)
    }

    pub fn to_document(&self) -> SceneDocument {
        SceneDocument {
            gravity: self.gravity(),
            frames: self.roots().iter().map(FrameDocument::from_frame).collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: SceneDocument = serde_json::from_str(json)?;
        Self::from_document(&document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_document())?)
    }
}
