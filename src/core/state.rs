//! Dynamical state snapshots.
//!
//! The solver never stores `(q, qd)` on frames. A [`StateMap`] is an owned
//! snapshot keyed by frame id; internally the solver works on a
//! [`FrameState`] slice laid out in the scene's topological order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::frame::FrameId;
use crate::error::{PhysmError, Result};

/// Generalized coordinate and velocity of one joint.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct FrameState {
    pub q: f64,
    pub qd: f64,
}

impl FrameState {
    pub const ZERO: Self = Self { q: 0.0, qd: 0.0 };

    pub fn new(q: f64, qd: f64) -> Self {
        Self { q, qd }
    }

    pub fn is_finite(&self) -> bool {
        self.q.is_finite() && self.qd.is_finite()
    }
}

impl From<[f64; 2]> for FrameState {
    fn from([q, qd]: [f64; 2]) -> Self {
        Self { q, qd }
    }
}

impl From<FrameState> for [f64; 2] {
    fn from(state: FrameState) -> Self {
        [state.q, state.qd]
    }
}

impl From<(f64, f64)> for FrameState {
    fn from((q, qd): (f64, f64)) -> Self {
        Self { q, qd }
    }
}

/// Scalar generalized force per frame id; absent frames receive zero.
pub type ExternalForceMap = HashMap<FrameId, f64>;

/// Complete dynamical state of a scene at one instant.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap {
    entries: BTreeMap<FrameId, FrameState>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &FrameId) -> Option<FrameState> {
        self.entries.get(id).copied()
    }

    pub fn insert(&mut self, id: FrameId, state: FrameState) -> Option<FrameState> {
        self.entries.insert(id, state)
    }

    /// Returns a copy with one entry replaced.
    pub fn with(mut self, id: impl Into<FrameId>, state: impl Into<FrameState>) -> Self {
        self.entries.insert(id.into(), state.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FrameId, &FrameState)> {
        self.entries.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &FrameId> {
        self.entries.keys()
    }

    /// Whether every `(q, qd)` is finite.
    pub fn is_valid(&self) -> bool {
        self.entries.values().all(FrameState::is_finite)
    }

    /// Fails with [`PhysmError::InvalidStateMap`] naming the first non-finite frame.
    pub fn check_valid(&self) -> Result<()> {
        match self.entries.iter().find(|(_, state)| !state.is_finite()) {
            Some((id, _)) => Err(PhysmError::invalid_state_at(id.clone())),
            None => Ok(()),
        }
    }

    /// Largest `|Δq|` or `|Δqd|` over the frames both maps share.
    pub fn max_abs_difference(&self, other: &StateMap) -> f64 {
        self.entries
            .iter()
            .filter_map(|(id, a)| other.get(id).map(|b| (a, b)))
            .map(|(a, b)| (a.q - b.q).abs().max((a.qd - b.qd).abs()))
            .fold(0.0, f64::max)
    }
}

impl FromIterator<(FrameId, FrameState)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (FrameId, FrameState)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a StateMap {
    type Item = (&'a FrameId, &'a FrameState);
    type IntoIter = std::collections::btree_map::Iter<'a, FrameId, FrameState>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
