//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – execution options (backend, threads, validation window)
//! - [`ParametersConfig`] – canvas, physical constants and compositing constants
//! - [`BodyConfig`]       – optional explicit initial state for each body
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! Every field may be omitted; omitted values fall back to the classic setup
//! (1024x1024 canvas, 64 satellites, K = 100000).
//!
//! # YAML format
//!
//! ```yaml
//! engine:
//!   backend: "parallel"     # or "sequential"
//!   threads: 0              # 0 -> one worker per core
//!   validation_frames: 2
//!   allowed_fp_error: 0.08
//!   tile_rows: 16
//!
//! parameters:
//!   width: 1024
//!   height: 1024
//!   satellite_count: 64     # used when `bodies` is empty
//!   body_radius: 3.16
//!   gravity: 1.0
//!   delta_time: 32.0
//!   substeps: 100000
//!   color_gain: 3.0
//!   seed_closest_color: false
//!   seed: 0                 # 0 or absent -> random seed, logged at startup
//!
//! bodies:
//!   - position: [662.0, 512.0]
//!     velocity: [0.0, 0.08]
//!     color: [0.2, 0.1, 0.1]
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SimError};
use crate::simulation::params::{DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Which strategies run every frame
/// backend: "parallel"` or `backend: "sequential"
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendConfig {
    #[serde(rename = "parallel")] // rayon pool, one work item per body / per tile of rows
    #[default]
    Parallel,

    #[serde(rename = "sequential")] // reference path in the accelerated slot too
    Sequential,
}

/// Execution configuration
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    pub threads: Option<usize>, // worker threads, 0 or absent = rayon default
    pub validation_frames: Option<u64>, // frames run through the oracle
    pub allowed_fp_error: Option<f32>, // per-channel pixel tolerance
    pub tile_rows: Option<usize>, // rows per accelerated compositing work item
}

/// Canvas, physics and compositing parameters
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ParametersConfig {
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub satellite_count: Option<usize>, // bodies generated when none are listed
    pub body_radius: Option<f32>, // closest-body override radius
    pub gravity: Option<f64>, // gravitational constant
    pub delta_time: Option<f64>, // simulated time per frame
    pub substeps: Option<u32>, // Euler substeps per frame
    pub color_gain: Option<f32>, // blend multiplier
    pub seed_closest_color: Option<bool>, // start the blend from the closest body's color
    pub seed: Option<u64>, // initializer seed, 0 = pick one
}

/// Explicit initial state of one body
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub position: [f32; 2], // canvas coordinates
    pub velocity: [f32; 2], // canvas units per time unit
    pub color: [f32; 3], // identifier color, red green blue
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Reject scenarios the core cannot run
    pub fn validate(&self) -> Result<()> {
        let p = &self.parameters;
        let e = &self.engine;

        if p.width == Some(0) || p.height == Some(0) {
            return Err(SimError::Config("canvas dimensions must be positive".into()));
        }
        if p.substeps == Some(0) {
            return Err(SimError::Config("substeps must be at least 1".into()));
        }
        if self.bodies.is_empty() && p.satellite_count == Some(0) {
            return Err(SimError::Config("at least one satellite is required".into()));
        }
        if let Some(r) = p.body_radius {
            if !(r.is_finite() && r > 0.0) {
                return Err(SimError::Config(format!("body_radius must be positive, got {r}")));
            }
        }
        for (name, value) in [("gravity", p.gravity), ("delta_time", p.delta_time)] {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(SimError::Config(format!("{name} must be finite, got {v}")));
                }
            }
        }
        if let Some(g) = p.color_gain {
            if !g.is_finite() {
                return Err(SimError::Config(format!("color_gain must be finite, got {g}")));
            }
        }
        if let Some(tol) = e.allowed_fp_error {
            if tol.is_nan() || tol < 0.0 {
                return Err(SimError::Config(format!("allowed_fp_error must be non-negative, got {tol}")));
            }
        }
        if e.tile_rows == Some(0) {
            return Err(SimError::Config("tile_rows must be at least 1".into()));
        }

        // integer halving, same as the runtime center
        let cx = (p.width.unwrap_or(DEFAULT_WIDTH) / 2) as f32;
        let cy = (p.height.unwrap_or(DEFAULT_HEIGHT) / 2) as f32;
        for (i, b) in self.bodies.iter().enumerate() {
            let finite = b
                .position
                .iter()
                .chain(b.velocity.iter())
                .chain(b.color.iter())
                .all(|v| v.is_finite());
            if !finite {
                return Err(SimError::Config(format!("body {i} has a non-finite field")));
            }
            if b.position == [cx, cy] {
                return Err(SimError::Config(format!("body {i} starts at the gravitational center")));
            }
        }

        Ok(())
    }
}
