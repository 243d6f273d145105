//! Scene: a forest of frames flattened into a parent-before-child arena.
//!
//! Every frame gets an index equal to its position in the topological order.
//! Parent, depth, root path and descendant lists are precomputed as indices so
//! the solver never hashes ids in its inner loops.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};

use glam::{DMat3, DVec3};
use log::debug;
use rand::Rng;

use super::frame::{Frame, FrameId, Joint};
use super::state::{FrameState, StateMap};
use super::weight::Weight;
use crate::config::DEFAULT_GRAVITY;
use crate::error::{PhysmError, Result};
use crate::utils::toposort::{child_map, toposort, transform_nodes};

/// One frame of a scene together with its place in the tree.
#[derive(Debug, Clone)]
pub struct SceneFrame {
    pub id: FrameId,
    pub joint: Joint,
    pub position: DVec3,
    pub resistance: f64,
    pub initial_state: FrameState,
    pub weights: Vec<Weight>,
    parent: Option<usize>,
    depth: usize,
    /// Indices from the root down to this frame, inclusive.
    path: Vec<usize>,
    children: Vec<usize>,
    /// This frame and everything below it, in topological order.
    descendants: Vec<usize>,
}

impl SceneFrame {
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn path(&self) -> &[usize] {
        &self.path
    }

    pub fn children(&self) -> &[usize] {
        &self.children
    }

    pub fn descendants(&self) -> &[usize] {
        &self.descendants
    }

    pub fn local_position_transform(&self, q: f64) -> DMat3 {
        self.joint.position_transform(self.position, q)
    }

    pub fn local_velocity_transform(&self, q: f64) -> DMat3 {
        self.joint.velocity_transform(q)
    }

    pub fn local_acceleration_transform(&self, q: f64) -> DMat3 {
        self.joint.acceleration_transform(q)
    }
}

/// Owns the root frames and the derived topology used by the solver.
#[derive(Debug, Clone)]
pub struct Scene {
    gravity: f64,
    roots: Vec<Frame>,
    frames: Vec<SceneFrame>,
    index: HashMap<FrameId, usize>,
}

impl Scene {
    /// Builds a scene with the default gravity.
    ///
    /// Fails with [`PhysmError::DuplicateFrameId`] if an id occurs twice
    /// anywhere in the forest.
    pub fn new(roots: Vec<Frame>) -> Result<Self> {
        Self::with_roots(DEFAULT_GRAVITY, roots)
    }

    pub fn with_roots(gravity: f64, roots: Vec<Frame>) -> Result<Self> {
        let mut flat: Vec<(usize, Option<usize>)> = Vec::new();
        let mut sources: Vec<&Frame> = Vec::new();
        let mut index = HashMap::new();
        for root in &roots {
            flatten(root, None, &mut flat, &mut sources, &mut index)?;
        }

        let parent_of = |node: &(usize, Option<usize>)| -> Vec<(usize, Option<usize>)> {
            node.1.map(|p| flat[p]).into_iter().collect()
        };
        let order = toposort(&flat, |node| node.0, parent_of)?;
        let paths = transform_nodes(
            &flat,
            |node| node.0,
            parent_of,
            |node, parents: &[&Vec<usize>]| {
                let mut path = parents.first().map(|p| (*p).clone()).unwrap_or_default();
                path.push(node.0);
                path
            },
        )?;
        let children = child_map(&flat, |node| node.0, parent_of)?;

        // Arena indices follow the topological order.
        let mut remap = vec![0; order.len()];
        for (new, (old, _)) in order.iter().enumerate() {
            remap[*old] = new;
        }

        let mut frames: Vec<SceneFrame> = order
            .iter()
            .map(|&(old, parent)| {
                let source = sources[old];
                let path: Vec<usize> = paths
                    .get(&old)
                    .map(|p| p.iter().map(|i| remap[*i]).collect())
                    .unwrap_or_default();
                let kids: Vec<usize> = children
                    .get(&old)
                    .map(|c| c.iter().map(|(i, _)| remap[*i]).collect())
                    .unwrap_or_default();
                SceneFrame {
                    id: source.id.clone(),
                    joint: source.joint,
                    position: source.position,
                    resistance: source.resistance,
                    initial_state: source.initial_state,
                    weights: source.weights.clone(),
                    parent: parent.map(|p| remap[p]),
                    depth: path.len().saturating_sub(1),
                    path,
                    children: kids,
                    descendants: Vec::new(),
                }
            })
            .collect();

        for i in (0..frames.len()).rev() {
            let mut descendants = vec![i];
            for &child in &frames[i].children {
                descendants.extend_from_slice(&frames[child].descendants);
            }
            descendants.sort_unstable();
            frames[i].descendants = descendants;
        }

        let index = frames
            .iter()
            .enumerate()
            .map(|(i, frame)| (frame.id.clone(), i))
            .collect();

        debug!(
            "built scene with {} frames across {} roots",
            frames.len(),
            roots.len()
        );

        Ok(Self {
            gravity,
            roots,
            frames,
            index,
        })
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    /// Adds another root frame, rebuilding the derived topology.
    pub fn with_frame(self, frame: Frame) -> Result<Self> {
        let mut roots = self.roots;
        roots.push(frame);
        Self::with_roots(self.gravity, roots)
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn roots(&self) -> &[Frame] {
        &self.roots
    }

    /// All frames in topological order.
    pub fn frames(&self) -> &[SceneFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn index_of(&self, id: &FrameId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn frame(&self, id: &FrameId) -> Result<&SceneFrame> {
        self.index_of(id)
            .map(|i| &self.frames[i])
            .ok_or_else(|| PhysmError::UnknownFrame(id.clone()))
    }

    pub fn sorted_ids(&self) -> impl Iterator<Item = &FrameId> {
        self.frames.iter().map(|frame| &frame.id)
    }

    pub fn parent_id(&self, id: &FrameId) -> Result<Option<&FrameId>> {
        let frame = self.frame(id)?;
        Ok(frame.parent.map(|p| &self.frames[p].id))
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_ids(&self, id: &FrameId) -> Result<Vec<&FrameId>> {
        let frame = self.frame(id)?;
        Ok(frame.path.iter().map(|&i| &self.frames[i].id).collect())
    }

    pub fn child_ids(&self, id: &FrameId) -> Result<Vec<&FrameId>> {
        let frame = self.frame(id)?;
        Ok(frame.children.iter().map(|&i| &self.frames[i].id).collect())
    }

    /// Whether `ancestor` lies on the root path of `descendant`; a frame is its own ancestor.
    #[inline]
    pub fn is_ancestor(&self, ancestor: usize, descendant: usize) -> bool {
        let depth = self.frames[ancestor].depth;
        let path = &self.frames[descendant].path;
        depth < path.len() && path[depth] == ancestor
    }

    /// The deeper of two frames when one descends from the other.
    #[inline]
    pub fn deeper_related(&self, a: usize, b: usize) -> Option<usize> {
        if self.is_ancestor(a, b) {
            Some(b)
        } else if self.is_ancestor(b, a) {
            Some(a)
        } else {
            None
        }
    }

    pub fn initial_state_map(&self) -> StateMap {
        self.frames
            .iter()
            .map(|frame| (frame.id.clone(), frame.initial_state))
            .collect()
    }

    /// Random coordinates in `(-π, π]` with zero velocity, for stress tests.
    pub fn randomized_state_map<R: Rng>(&self, rng: &mut R) -> StateMap {
        self.frames
            .iter()
            .map(|frame| {
                let q = PI - rng.gen_range(0.0..TAU);
                (frame.id.clone(), FrameState::new(q, 0.0))
            })
            .collect()
    }

    /// Initial states laid out in topological order.
    pub fn initial_states(&self) -> Vec<FrameState> {
        self.frames.iter().map(|frame| frame.initial_state).collect()
    }

    /// Converts a state map to topological order, requiring every frame.
    pub fn states_from_map(&self, map: &StateMap) -> Result<Vec<FrameState>> {
        self.frames
            .iter()
            .map(|frame| {
                map.get(&frame.id).ok_or_else(|| {
                    PhysmError::MissingArgument(format!("state for frame {}", frame.id))
                })
            })
            .collect()
    }

    /// Like [`Scene::states_from_map`], but missing frames read as `(0, 0)`.
    pub fn states_from_map_or_zero(&self, map: &StateMap) -> Vec<FrameState> {
        self.frames
            .iter()
            .map(|frame| map.get(&frame.id).unwrap_or(FrameState::ZERO))
            .collect()
    }

    pub fn state_map_from(&self, states: &[FrameState]) -> StateMap {
        self.frames
            .iter()
            .zip(states)
            .map(|(frame, state)| (frame.id.clone(), *state))
            .collect()
    }
}

fn flatten<'a>(
    frame: &'a Frame,
    parent: Option<usize>,
    flat: &mut Vec<(usize, Option<usize>)>,
    sources: &mut Vec<&'a Frame>,
    index: &mut HashMap<FrameId, usize>,
) -> Result<()> {
    let me = flat.len();
    if index.insert(frame.id.clone(), me).is_some() {
        return Err(PhysmError::DuplicateFrameId(frame.id.clone()));
    }
    flat.push((me, parent));
    sources.push(frame);
    for child in &frame.frames {
        flatten(child, Some(me), flat, sources, index)?;
    }
    Ok(())
}
