//! Side-by-side comparison of solver backends.
//!
//! [`ReferenceSolver`] walks the frame tree recursively with id-keyed maps and
//! shares no assembly code with the indexed [`Solver`], so agreement between
//! the two is meaningful evidence that both are right.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use glam::{DMat3, DVec3};
use log::info;

use crate::core::frame::{Frame, FrameId};
use crate::core::scene::Scene;
use crate::core::state::{ExternalForceMap, FrameState, StateMap};
use crate::dynamics::integrator::IntegrationMethod;
use crate::dynamics::solver::Solver;
use crate::error::{PhysmError, Result};
use crate::utils::linalg::{solve_linear_system, DenseMatrix};
use crate::utils::math::invert;

/// Anything that can advance a state map by one step.
pub trait TickBackend {
    fn name(&self) -> &str;

    fn tick(
        &self,
        state_map: &StateMap,
        delta_time: f64,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap>;
}

impl TickBackend for Solver {
    fn name(&self) -> &str {
        match self.options().integration {
            IntegrationMethod::Euler => "indexed solver (euler)",
            IntegrationMethod::RungeKutta4 => "indexed solver (rk4)",
        }
    }

    fn tick(
        &self,
        state_map: &StateMap,
        delta_time: f64,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap> {
        Solver::tick(self, state_map, delta_time, forces)
    }
}

#[derive(Default)]
struct Fields {
    pos: HashMap<FrameId, DMat3>,
    vel: HashMap<FrameId, DMat3>,
    vel_sum: HashMap<FrameId, DMat3>,
    accel_sum: HashMap<FrameId, DMat3>,
    weights: HashMap<FrameId, Vec<DVec3>>,
}

/// Straightforward id-keyed implementation of the tick pipeline.
#[derive(Debug, Clone)]
pub struct ReferenceSolver {
    scene: Arc<Scene>,
    integration: IntegrationMethod,
    /// Root-to-frame id path of every frame.
    paths: HashMap<FrameId, Vec<FrameId>>,
    /// Frames in depth-first order, parents first.
    order: Vec<FrameId>,
    frames: HashMap<FrameId, Frame>,
    parents: HashMap<FrameId, FrameId>,
}

impl ReferenceSolver {
    pub fn new(scene: impl Into<Arc<Scene>>, integration: IntegrationMethod) -> Self {
        let scene = scene.into();
        let mut solver = Self {
            scene: Arc::clone(&scene),
            integration,
            paths: HashMap::new(),
            order: Vec::new(),
            frames: HashMap::new(),
            parents: HashMap::new(),
        };
        for root in scene.roots() {
            solver.visit(root, &[]);
        }
        solver
    }

    fn visit(&mut self, frame: &Frame, parent_path: &[FrameId]) {
        let mut path = parent_path.to_vec();
        path.push(frame.id.clone());
        if let Some(parent) = parent_path.last() {
            self.parents.insert(frame.id.clone(), parent.clone());
        }
        self.order.push(frame.id.clone());
        let leaf = Frame {
            frames: Vec::new(),
            ..frame.clone()
        };
        self.frames.insert(frame.id.clone(), leaf);
        for child in &frame.frames {
            self.visit(child, &path);
        }
        self.paths.insert(frame.id.clone(), path);
    }

    fn is_descendant(&self, ancestor: &FrameId, descendant: &FrameId) -> bool {
        self.paths
            .get(descendant)
            .is_some_and(|path| path.contains(ancestor))
    }

    fn descendants<'a>(&'a self, ancestor: &'a FrameId) -> impl Iterator<Item = &'a FrameId> + 'a {
        self.order
            .iter()
            .filter(move |id| self.is_descendant(ancestor, id))
    }

    fn fields(&self, states: &HashMap<FrameId, FrameState>) -> Fields {
        let mut fields = Fields::default();
        for id in &self.order {
            let frame = &self.frames[id];
            let FrameState { q, qd } = states[id];
            let parent = self.parents.get(id);
            let parent_pos = parent.map_or(DMat3::IDENTITY, |p| fields.pos[p]);
            let pos = parent_pos * frame.local_position_transform(q);
            let inv = invert(&pos);
            let vel = parent_pos * frame.local_velocity_transform(q) * inv;
            let accel = parent_pos * frame.local_acceleration_transform(q) * inv;
            let parent_vel_sum = parent.map_or(DMat3::ZERO, |p| fields.vel_sum[p]);
            let parent_accel_sum = parent.map_or(DMat3::ZERO, |p| fields.accel_sum[p]);
            let vel_sum = vel * qd + parent_vel_sum;
            let accel_sum =
                accel * (qd * qd) + parent_accel_sum + (parent_vel_sum * vel) * (2.0 * qd);

            fields
                .weights
                .insert(id.clone(), frame.weights.iter().map(|w| pos * w.position).collect());
            fields.pos.insert(id.clone(), pos);
            fields.vel.insert(id.clone(), vel);
            fields.vel_sum.insert(id.clone(), vel_sum);
            fields.accel_sum.insert(id.clone(), accel_sum);
        }
        fields
    }

    fn accelerations(
        &self,
        states: &HashMap<FrameId, FrameState>,
        forces: Option<&ExternalForceMap>,
    ) -> Result<HashMap<FrameId, f64>> {
        let fields = self.fields(states);
        let n = self.order.len();
        let gravity = self.scene.gravity();
        let mut a = DenseMatrix::zeros(n, n);
        let mut b = vec![0.0; n];

        for (row, i) in self.order.iter().enumerate() {
            for (col, h) in self.order.iter().enumerate() {
                let base = if self.is_descendant(i, h) {
                    h
                } else if self.is_descendant(h, i) {
                    i
                } else {
                    continue;
                };
                let mut sum = 0.0;
                for j in self.descendants(base) {
                    for (weight, p) in self.frames[j].weights.iter().zip(&fields.weights[j]) {
                        let vh = (fields.vel[h] * *p).truncate();
                        let vi = (fields.vel[i] * *p).truncate();
                        sum += weight.mass * vh.dot(vi);
                    }
                }
                a[(row, col)] = sum;
            }

            let mut force = 0.0;
            for j in self.descendants(i) {
                for (weight, p) in self.frames[j].weights.iter().zip(&fields.weights[j]) {
                    let unit = (fields.vel[i] * *p).truncate();
                    force -= weight.mass * unit.dot((fields.accel_sum[j] * *p).truncate());
                    force -= weight.drag * unit.dot((fields.vel_sum[j] * *p).truncate());
                    force -= weight.mass * gravity * unit.y;
                }
            }
            force -= self.frames[i].resistance * states[i].qd;
            force += forces.and_then(|f| f.get(i).copied()).unwrap_or(0.0);
            b[row] = force;
        }

        let qdd = solve_linear_system(&a, &b).map_err(PhysmError::into_invalid_state)?;
        Ok(self.order.iter().cloned().zip(qdd).collect())
    }
}

impl TickBackend for ReferenceSolver {
    fn name(&self) -> &str {
        match self.integration {
            IntegrationMethod::Euler => "reference solver (euler)",
            IntegrationMethod::RungeKutta4 => "reference solver (rk4)",
        }
    }

    fn tick(
        &self,
        state_map: &StateMap,
        delta_time: f64,
        forces: Option<&ExternalForceMap>,
    ) -> Result<StateMap> {
        let ids = &self.order;
        let states: Vec<FrameState> = ids
            .iter()
            .map(|id| {
                state_map
                    .get(id)
                    .ok_or_else(|| PhysmError::MissingArgument(format!("state for frame {id}")))
            })
            .collect::<Result<_>>()?;

        let next = self.integration.step(&states, delta_time, |stage| {
            let keyed: HashMap<FrameId, FrameState> =
                ids.iter().cloned().zip(stage.iter().copied()).collect();
            let qdd = self.accelerations(&keyed, forces)?;
            Ok(ids.iter().map(|id| qdd[id]).collect())
        })?;

        let map: StateMap = ids.iter().cloned().zip(next).collect();
        map.check_valid()?;
        Ok(map)
    }
}

/// Largest divergence observed per frame across all backends.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidationReport {
    pub backends: Vec<String>,
    pub ticks: usize,
    pub max_divergence: BTreeMap<FrameId, f64>,
}

impl CrossValidationReport {
    pub fn worst(&self) -> f64 {
        self.max_divergence.values().copied().fold(0.0, f64::max)
    }
}

/// Runs every backend from the scene's initial state for `ticks` steps of
/// `delta_time` and compares each against the first.
///
/// Fails with [`PhysmError::Divergence`] as soon as any `|Δq|` or `|Δqd|`
/// exceeds `tolerance`.
pub fn cross_validate(
    scene: &Scene,
    backends: &[&dyn TickBackend],
    ticks: usize,
    delta_time: f64,
    tolerance: f64,
) -> Result<CrossValidationReport> {
    let Some((first, others)) = backends.split_first() else {
        return Err(PhysmError::MissingArgument("at least one backend".into()));
    };
    let initial = scene.initial_state_map();
    let mut current: Vec<StateMap> = vec![initial; backends.len()];
    let mut max_divergence: BTreeMap<FrameId, f64> =
        scene.sorted_ids().map(|id| (id.clone(), 0.0)).collect();

    for tick in 1..=ticks {
        current[0] = first.tick(&current[0], delta_time, None)?;
        for (k, backend) in others.iter().enumerate() {
            let slot = k + 1;
            current[slot] = backend.tick(&current[slot], delta_time, None)?;
            for (id, reference) in &current[0] {
                let other = current[slot]
                    .get(id)
                    .ok_or_else(|| PhysmError::UnknownFrame(id.clone()))?;
                let difference = (reference.q - other.q).abs().max((reference.qd - other.qd).abs());
                if difference > tolerance {
                    return Err(PhysmError::Divergence {
                        backend: backend.name().to_owned(),
                        frame: id.clone(),
                        tick,
                        difference,
                        tolerance,
                    });
                }
                let worst = max_divergence.entry(id.clone()).or_insert(0.0);
                *worst = worst.max(difference);
            }
        }
    }

    let report = CrossValidationReport {
        backends: backends.iter().map(|b| b.name().to_owned()).collect(),
        ticks,
        max_divergence,
    };
    info!(
        "cross-validated {} backends over {} ticks; worst divergence {:.3e}",
        report.backends.len(),
        ticks,
        report.worst()
    );
    Ok(report)
}
