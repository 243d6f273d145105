use physm::presets::{rope_cart, CART_FORCE, ROPE_SEGMENT_COUNT};
use physm::*;

fn main() -> Result<()> {
    let solver = Solver::new(rope_cart(ROPE_SEGMENT_COUNT)?);
    println!("{}", solver.scene().to_json()?);

    let mut sim = Simulation::new(solver);
    let cart = FrameId::from("cart");
    for frame in 0..240 {
        // Push right for two seconds, then left.
        let push = if frame < 120 { CART_FORCE } else { -CART_FORCE };
        let forces = ExternalForceMap::from([(cart.clone(), push)]);
        let state = sim.advance(1.0 / 60.0, Some(&forces))?;
        if frame % 20 == 0 {
            let cart_state = state.get(&cart).unwrap_or_default();
            let poi = state.get(&FrameId::from("segment0")).unwrap_or_default();
            println!(
                "t={:5.2}s cart x={:+8.3} v={:+8.3} poi angle={:+.3}",
                sim.elapsed(),
                cart_state.q,
                cart_state.qd,
                poi.q
            );
        }
    }
    println!("resets: {}", sim.reset_count());
    Ok(())
}
