use log::{Level, log_enabled, warn};
use std::time::{Duration, Instant};

/// Traces the start and end of one solver pipeline stage.
pub struct StageTimer<'a> {
    stage: &'a str,
    start: Option<Instant>,
}

impl<'a> StageTimer<'a> {
    pub fn new(stage: &'a str) -> Self {
        let start = if log_enabled!(Level::Trace) {
            log::trace!("start {stage}");
            Some(Instant::now())
        } else {
            None
        };
        Self { stage, start }
    }
}

impl<'a> Drop for StageTimer<'a> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            log::trace!("end {} ({} µs)", self.stage, start.elapsed().as_micros());
        }
    }
}

/// Warns when the physics work for one animation frame exceeded its budget.
///
/// Returns whether the budget was exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f64) -> bool {
    let elapsed_ms = duration.as_secs_f64() * 1000.0;
    if elapsed_ms > budget_ms {
        warn!(
            "Overshot physics computation deadline: {:.2} ms > {:.2} ms; unable to sustain desired animation FPS",
            elapsed_ms, budget_ms
        );
        return true;
    }
    false
}
