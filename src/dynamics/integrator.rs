use serde::{Deserialize, Serialize};

use crate::core::state::FrameState;
use crate::error::Result;

/// Explicit scheme used to advance `(q, qd)` by one step.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrationMethod {
    #[default]
    Euler,
    RungeKutta4,
}

impl IntegrationMethod {
    /// Advances `states` by `dt`, calling `accelerations` for `qdd` at each stage.
    pub fn step<F>(
        self,
        states: &[FrameState],
        dt: f64,
        mut accelerations: F,
    ) -> Result<Vec<FrameState>>
    where
        F: FnMut(&[FrameState]) -> Result<Vec<f64>>,
    {
        match self {
            IntegrationMethod::Euler => {
                let qdd = accelerations(states)?;
                Ok(states
                    .iter()
                    .zip(&qdd)
                    .map(|(s, a)| FrameState::new(s.q + s.qd * dt, s.qd + a * dt))
                    .collect())
            }
            IntegrationMethod::RungeKutta4 => {
                let offset = |k_q: &[f64], k_qd: &[f64], h: f64| -> Vec<FrameState> {
                    states
                        .iter()
                        .zip(k_q.iter().zip(k_qd))
                        .map(|(s, (dq, dqd))| FrameState::new(s.q + dq * h, s.qd + dqd * h))
                        .collect()
                };
                let velocities = |stage: &[FrameState]| -> Vec<f64> {
                    stage.iter().map(|s| s.qd).collect()
                };

                let k1_q = velocities(states);
                let k1_qd = accelerations(states)?;

                let stage = offset(&k1_q, &k1_qd, dt / 2.0);
                let k2_q = velocities(&stage);
                let k2_qd = accelerations(&stage)?;

                let stage = offset(&k2_q, &k2_qd, dt / 2.0);
                let k3_q = velocities(&stage);
                let k3_qd = accelerations(&stage)?;

                let stage = offset(&k3_q, &k3_qd, dt);
                let k4_q = velocities(&stage);
                let k4_qd = accelerations(&stage)?;

                let weighted = |k1: &[f64], k2: &[f64], k3: &[f64], k4: &[f64]| -> Vec<f64> {
                    (0..k1.len())
                        .map(|i| (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0)
                        .collect()
                };
                Ok(offset(
                    &weighted(&k1_q, &k2_q, &k3_q, &k4_q),
                    &weighted(&k1_qd, &k2_qd, &k3_qd, &k4_qd),
                    dt,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // qdd = -q: harmonic oscillator with exact solution q = cos t.
    fn oscillator(states: &[FrameState]) -> Result<Vec<f64>> {
        Ok(states.iter().map(|s| -s.q).collect())
    }

    fn run(method: IntegrationMethod, steps: usize, dt: f64) -> FrameState {
        let mut states = vec![FrameState::new(1.0, 0.0)];
        for _ in 0..steps {
            states = method.step(&states, dt, oscillator).unwrap();
        }
        states[0]
    }

    #[test]
    fn euler_single_step() {
        let next = IntegrationMethod::Euler
            .step(&[FrameState::new(1.0, 2.0)], 0.5, |_| Ok(vec![4.0]))
            .unwrap();
        assert_eq!(next, vec![FrameState::new(2.0, 4.0)]);
    }

    #[test]
    fn rk4_is_exact_for_constant_acceleration() {
        let next = IntegrationMethod::RungeKutta4
            .step(&[FrameState::new(0.0, 1.0)], 2.0, |s| Ok(vec![3.0; s.len()]))
            .unwrap();
        // q = t + 1.5 t², qd = 1 + 3 t at t = 2.
        assert!((next[0].q - 8.0).abs() < 1e-12);
        assert!((next[0].qd - 7.0).abs() < 1e-12);
    }

    #[test]
    fn rk4_tracks_oscillator_closely() {
        let end = run(IntegrationMethod::RungeKutta4, 100, 0.01);
        assert!((end.q - 1.0f64.cos()).abs() < 1e-8);
        assert!((end.qd + 1.0f64.sin()).abs() < 1e-8);
        let euler = run(IntegrationMethod::Euler, 100, 0.01);
        assert!((euler.q - 1.0f64.cos()).abs() > 1e-4);
    }

    #[test]
    fn stage_errors_propagate() {
        let err = IntegrationMethod::RungeKutta4.step(&[FrameState::ZERO], 0.1, |_| {
            Err(crate::error::PhysmError::MissingArgument("qdd".into()))
        });
        assert!(err.is_err());
    }
}
