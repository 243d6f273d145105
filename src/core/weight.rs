use glam::DVec3;

use crate::utils::math::point;

/// Point mass rigidly attached to a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weight {
    pub mass: f64,
    /// Local homogeneous position `[x, y, 1]` in the owning frame.
    pub position: DVec3,
    /// Linear damping acting on this point mass's own velocity.
    pub drag: f64,
}

impl Default for Weight {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Weight {
    pub fn new(mass: f64) -> Self {
        Self {
            mass,
            position: point(0.0, 0.0),
            drag: 0.0,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = point(x, y);
        self
    }

    pub fn with_drag(mut self, drag: f64) -> Self {
        self.drag = drag;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder() {
        let weight = Weight::new(7.0);
        assert_eq!(weight.mass, 7.0);
        assert_eq!(weight.position, point(0.0, 0.0));
        assert_eq!(weight.drag, 0.0);

        let weight = weight.with_position(3.0, 4.0).with_drag(2.0);
        assert_eq!(weight.mass, 7.0);
        assert_eq!(weight.position, DVec3::new(3.0, 4.0, 1.0));
        assert_eq!(weight.drag, 2.0);
    }
}
