use physm::config::DEFAULT_TIME_STEP;
use physm::*;

fn main() -> Result<()> {
    let scene = presets::cart_double_pendulum()?;
    let euler = Solver::new(scene.clone());
    let rk4 = Solver::new(scene.clone()).with_integration(IntegrationMethod::RungeKutta4);

    let mut a = scene.initial_state_map();
    let mut b = a.clone();
    for tick in 1..=120 {
        a = euler.tick(&a, DEFAULT_TIME_STEP, None)?;
        b = rk4.tick(&b, DEFAULT_TIME_STEP, None)?;
        if tick % 30 == 0 {
            println!("t = {:.2}s", tick as f64 * DEFAULT_TIME_STEP);
            for (id, state) in &a {
                let other = b.get(id).unwrap_or_default();
                println!(
                    "  {id:>10}: euler q={:+.4} qd={:+.4} | rk4 q={:+.4} qd={:+.4}",
                    state.q, state.qd, other.q, other.qd
                );
            }
        }
    }

    let reference = ReferenceSolver::new(scene.clone(), IntegrationMethod::Euler);
    let report = cross_validate(&scene, &[&euler, &reference], 50, DEFAULT_TIME_STEP, 0.2)?;
    println!("worst divergence against the reference solver: {:.3e}", report.worst());
    Ok(())
}
