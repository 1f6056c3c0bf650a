//! Central inverse-square attraction and the Euler substep kernel
//!
//! Bodies never interact with each other, only with a fixed center. Both
//! integrator forms advance a body through [`CentralGravity::substep`], so
//! the per-body operation chain is identical whichever form runs it

use crate::error::{Result, SimError};
use super::params::Parameters;
use super::states::DVec2;

/// Newtonian attraction toward a fixed, immovable center
#[derive(Debug, Clone, Copy)]
pub struct CentralGravity {
    pub g: f64, // gravitational constant
    pub center: DVec2, // attractor position
}

impl CentralGravity {
    pub fn from_params(params: &Parameters) -> Self {
        Self {
            g: params.gravity,
            center: params.center,
        }
    }

    /// One Euler substep of duration `step` for body `index`.
    ///
    /// Velocity is kicked first, then the position drifts with the new velocity:
    ///   v -= (G / r^2) * (x - c) / r * step
    ///   x += v * step
    #[inline]
    pub fn substep(&self, index: usize, x: &mut DVec2, v: &mut DVec2, step: f64) -> Result<()> {
        // offset points away from the center
        let offset = *x - self.center;

        let r2 = offset.x * offset.x + offset.y * offset.y;
        if r2 == 0.0 {
            return Err(SimError::BodyAtCenter { index });
        }
        let r = r2.sqrt();

        // unit vector away from the center
        let direction = offset / r;

        // magnitude of the pull, G / r^2
        let accel_scale = self.g / r2;

        // subtracting an outward vector pulls the body inward
        v.x -= accel_scale * direction.x * step;
        v.y -= accel_scale * direction.y * step;

        x.x += v.x * step;
        x.y += v.y * step;

        Ok(())
    }
}
