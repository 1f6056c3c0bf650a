//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a runtime bundle
//! containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the initial body store, either listed explicitly or generated from a seed
//!
//! The generator places satellites in the four quadrants around the center
//! with reddish identifier colors and roughly tangential velocities, every
//! other one orbiting clockwise.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::configuration::config::{BodyConfig, ScenarioConfig};
use crate::error::Result;
use super::engine::Engine;
use super::params::{
    Parameters, DEFAULT_BODY_RADIUS, DEFAULT_COLOR_GAIN, DEFAULT_DELTA_TIME, DEFAULT_GRAVITY,
    DEFAULT_HEIGHT, DEFAULT_SATELLITE_COUNT, DEFAULT_SUBSTEPS, DEFAULT_WIDTH,
};
use super::states::{Body, BodyStore, Color, FVec2};

/// Runtime bundle: everything a `Simulation` needs to start
#[derive(Debug, Clone)]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub store: BodyStore,
    pub seed: Option<u64>, // seed the store was generated from, None for explicit bodies
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self> {
        cfg.validate()?;

        // Parameters (runtime) from ParametersConfig
        let p_cfg = &cfg.parameters;
        let parameters = Parameters::new(
            p_cfg.width.unwrap_or(DEFAULT_WIDTH),
            p_cfg.height.unwrap_or(DEFAULT_HEIGHT),
            p_cfg.gravity.unwrap_or(DEFAULT_GRAVITY),
            p_cfg.delta_time.unwrap_or(DEFAULT_DELTA_TIME),
            p_cfg.substeps.unwrap_or(DEFAULT_SUBSTEPS),
        )
        .with_body_radius(p_cfg.body_radius.unwrap_or(DEFAULT_BODY_RADIUS))
        .with_color_gain(p_cfg.color_gain.unwrap_or(DEFAULT_COLOR_GAIN))
        .with_seed_closest_color(p_cfg.seed_closest_color.unwrap_or(false));

        // Engine (runtime) from EngineConfig
        let e_cfg = &cfg.engine;
        let defaults = Engine::default();
        let engine = Engine {
            backend: e_cfg.backend,
            threads: e_cfg.threads.unwrap_or(defaults.threads),
            validation_frames: e_cfg.validation_frames.unwrap_or(defaults.validation_frames),
            allowed_fp_error: e_cfg.allowed_fp_error.unwrap_or(defaults.allowed_fp_error),
            tile_rows: e_cfg.tile_rows.unwrap_or(defaults.tile_rows),
        };

        // Bodies: explicit list wins, otherwise generate from the seed
        let (store, seed) = if cfg.bodies.is_empty() {
            let seed = match p_cfg.seed {
                Some(seed) if seed != 0 => seed,
                _ => rand::random(),
            };
            let count = p_cfg.satellite_count.unwrap_or(DEFAULT_SATELLITE_COUNT);
            let mut rng = StdRng::seed_from_u64(seed);
            info!(seed, count, "generating satellites");
            (generate_bodies(count, &parameters, &mut rng), Some(seed))
        } else {
            (bodies_from_config(&cfg.bodies), None)
        };

        Ok(Self {
            engine,
            parameters,
            store,
            seed,
        })
    }
}

/// Map `BodyConfig` -> runtime `Body`
pub fn bodies_from_config(bodies: &[BodyConfig]) -> BodyStore {
    BodyStore::new(
        bodies
            .iter()
            .map(|bc| Body {
                identifier: Color::new(bc.color[0], bc.color[1], bc.color[2]),
                position: FVec2::new(bc.position[0], bc.position[1]),
                velocity: FVec2::new(bc.velocity[0], bc.velocity[1]),
            })
            .collect(),
    )
}

fn random_number<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
    rng.random_range(min..=max)
}

/// Random satellites around the canvas center. Never places a body at the
/// center: each axis is offset by at least 50 pixels
pub fn generate_bodies<R: Rng>(count: usize, params: &Parameters, rng: &mut R) -> BodyStore {
    let width = params.width as f32;
    let height = params.height as f32;
    let cx = params.center.x as f32;
    let cy = params.center.y as f32;

    let bodies = (0..count)
        .map(|i| {
            // reddish identifier
            let identifier = Color::new(
                random_number(rng, 0.0, 0.15) + 0.1,
                random_number(rng, 0.0, 0.14),
                random_number(rng, 0.0, 0.16),
            );

            // top-left quadrant, then mirrored into the other three
            let mut x = cx - random_number(rng, 50.0, 320.0);
            let mut y = cy - random_number(rng, 50.0, 320.0);
            if (i / 2) % 2 != 0 {
                x = width - x;
            }
            if i >= count / 2 {
                y = height - y;
            }

            // tangential velocity, speed 0.06 +- 0.01
            let ox = x - cx;
            let oy = y - cy;
            let scale = (0.06 + random_number(rng, -0.01, 0.01)) / (ox * ox + oy * oy).sqrt();
            let mut velocity = FVec2::new(scale * -oy, scale * ox);

            // every other satellite orbits clockwise
            if i % 2 == 0 {
                velocity = -velocity;
            }

            Body {
                identifier,
                position: FVec2::new(x, y),
                velocity,
            }
        })
        .collect();

    BodyStore::new(bodies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_bodies_respect_margins_and_quadrants() {
        let params = Parameters::default();
        let mut rng = StdRng::seed_from_u64(7);
        let store = generate_bodies(64, &params, &mut rng);
        assert_eq!(store.len(), 64);

        for (i, b) in store.bodies().iter().enumerate() {
            let ox = b.position.x - 512.0;
            let oy = b.position.y - 512.0;
            assert!(ox.abs() >= 49.9 && ox.abs() <= 320.1, "body {i} x offset {ox}");
            assert!(oy.abs() >= 49.9 && oy.abs() <= 320.1, "body {i} y offset {oy}");
            assert_eq!(ox > 0.0, (i / 2) % 2 == 1, "body {i} horizontal side");
            assert_eq!(oy > 0.0, i >= 32, "body {i} vertical side");

            // tangential: velocity is perpendicular to the radius vector
            let radial = (ox * b.velocity.x + oy * b.velocity.y) / (ox * ox + oy * oy).sqrt();
            assert!(radial.abs() < 1e-5, "body {i} radial speed {radial}");
            let speed = b.velocity.norm();
            assert!(speed >= 0.0499 && speed <= 0.0701, "body {i} speed {speed}");

            assert!(b.identifier.red >= 0.1 && b.identifier.red <= 0.2501);
            assert!(b.identifier.green <= 0.14);
            assert!(b.identifier.blue <= 0.16);
        }
    }

    #[test]
    fn same_seed_same_store() {
        let params = Parameters::default();
        let a = generate_bodies(16, &params, &mut StdRng::seed_from_u64(42));
        let b = generate_bodies(16, &params, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn explicit_bodies_skip_generation() {
        let cfg = ScenarioConfig::from_yaml_str(
            "bodies:\n  - position: [662.0, 512.0]\n    velocity: [0.0, 0.08]\n    color: [0.2, 0.1, 0.1]\n",
        )
        .unwrap();
        let scenario = Scenario::build_scenario(cfg).unwrap();
        assert_eq!(scenario.store.len(), 1);
        assert_eq!(scenario.seed, None);
        assert_eq!(scenario.store.bodies()[0].position, FVec2::new(662.0, 512.0));
    }
}
