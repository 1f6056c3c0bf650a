//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - canvas size and the fixed gravitational center (canvas middle),
//! - gravitational constant, frame duration and substep count,
//! - the per-substep duration, computed once in double precision,
//! - compositing constants (body radius, blend gain)

use super::states::DVec2;

pub const DEFAULT_WIDTH: usize = 1024;
pub const DEFAULT_HEIGHT: usize = 1024;
pub const DEFAULT_SATELLITE_COUNT: usize = 64;
pub const DEFAULT_BODY_RADIUS: f32 = 3.16;
pub const DEFAULT_GRAVITY: f64 = 1.0;
pub const DEFAULT_DELTA_TIME: f64 = 32.0;
pub const DEFAULT_SUBSTEPS: u32 = 100_000;
pub const DEFAULT_COLOR_GAIN: f32 = 3.0;

#[derive(Debug, Clone)]
pub struct Parameters {
    pub width: usize, // canvas width in pixels
    pub height: usize, // canvas height in pixels
    pub gravity: f64, // gravitational constant G
    pub delta_time: f64, // simulated time per frame
    pub substeps: u32, // Euler substeps per frame (K)
    pub step: f64, // delta_time / substeps
    pub center: DVec2, // fixed attractor
    pub body_radius: f32, // closest-body override threshold
    pub color_gain: f32, // un-normalized blend multiplier
    pub seed_closest_color: bool, // start the blend from the closest identifier instead of black
}

impl Parameters {
    pub fn new(width: usize, height: usize, gravity: f64, delta_time: f64, substeps: u32) -> Self {
        Self {
            width,
            height,
            gravity,
            delta_time,
            substeps,
            step: delta_time / substeps as f64,
            // integer halving, matching pixel coordinates of the canvas middle
            center: DVec2::new((width / 2) as f64, (height / 2) as f64),
            body_radius: DEFAULT_BODY_RADIUS,
            color_gain: DEFAULT_COLOR_GAIN,
            seed_closest_color: false,
        }
    }

    pub fn with_body_radius(mut self, body_radius: f32) -> Self {
        self.body_radius = body_radius;
        self
    }

    pub fn with_color_gain(mut self, color_gain: f32) -> Self {
        self.color_gain = color_gain;
        self
    }

    pub fn with_seed_closest_color(mut self, seed_closest_color: bool) -> Self {
        self.seed_closest_color = seed_closest_color;
        self
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl Default for Parameters {
    /// 1024x1024 canvas, G = 1, 32 time units per frame in 100000 substeps
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_GRAVITY, DEFAULT_DELTA_TIME, DEFAULT_SUBSTEPS)
    }
}
