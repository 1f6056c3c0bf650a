//! Frame driver
//!
//! `Simulation` owns the body store, both pixel buffers and the frame clock.
//! One call to [`Simulation::advance_frame`] integrates, then composites, and
//! while the clock is inside the validation window also runs the reference
//! strategies through the oracle. Phases follow the frame counter only:
//!
//! - `Validating` (frame < validation_frames): accelerated + reference + oracle
//! - `Warming` (frame == validation_frames): first timing baseline
//! - `Steady` (after): accelerated only, latencies averaged and logged

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::Result;
use super::engine::{Engine, Strategies};
use super::oracle::{ConsistencyOracle, ValidationReport};
use super::params::Parameters;
use super::scenario::Scenario;
use super::states::{BodyStore, Color, PixelBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Validating,
    Warming,
    Steady,
}

impl FramePhase {
    pub fn for_frame(frame: u64, validation_frames: u64) -> Self {
        if frame < validation_frames {
            FramePhase::Validating
        } else if frame == validation_frames {
            FramePhase::Warming
        } else {
            FramePhase::Steady
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimings {
    pub physics: Duration, // integration
    pub compositing: Duration, // pixel coloring
    pub total: Option<Duration>, // finish-to-finish, steady frames only
}

/// Running sums over steady frames
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    frames: u32,
    physics: Duration,
    compositing: Duration,
    total: Duration,
}

impl TimingStats {
    pub fn record(&mut self, physics: Duration, compositing: Duration, total: Duration) {
        self.frames += 1;
        self.physics += physics;
        self.compositing += compositing;
        self.total += total;
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Average (physics, compositing, total); `None` before the first steady frame
    pub fn averages(&self) -> Option<(Duration, Duration, Duration)> {
        if self.frames == 0 {
            return None;
        }
        Some((
            self.physics / self.frames,
            self.compositing / self.frames,
            self.total / self.frames,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    pub phase: FramePhase,
    pub timings: FrameTimings,
    pub validation: Option<ValidationReport>, // present during the validation window
}

pub struct Simulation {
    params: Parameters,
    engine: Engine,
    store: BodyStore,
    pixels: PixelBuffer, // accelerated output, what gets presented
    reference_pixels: PixelBuffer, // reference output, validation only
    frame: u64,
    accelerated: Strategies,
    reference: Strategies,
    oracle: ConsistencyOracle,
    previous_finish: Option<Instant>,
    stats: TimingStats,
}

impl Simulation {
    /// Build the strategies from the scenario's engine settings
    pub fn new(scenario: Scenario) -> Result<Self> {
        let Scenario {
            engine,
            parameters,
            store,
            ..
        } = scenario;

        let accelerated = engine.accelerated_strategies(&parameters)?;
        let reference = engine.reference_strategies(&parameters);
        Ok(Self::with_strategies(parameters, engine, store, accelerated, reference))
    }

    /// Use caller-supplied strategies in both slots
    pub fn with_strategies(
        params: Parameters,
        engine: Engine,
        store: BodyStore,
        accelerated: Strategies,
        reference: Strategies,
    ) -> Self {
        let pixels = PixelBuffer::new(params.width, params.height);
        let reference_pixels = PixelBuffer::new(params.width, params.height);
        let oracle = ConsistencyOracle::new(engine.allowed_fp_error);

        Self {
            params,
            engine,
            store,
            pixels,
            reference_pixels,
            frame: 0,
            accelerated,
            reference,
            oracle,
            previous_finish: None,
            stats: TimingStats::default(),
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn phase(&self) -> FramePhase {
        FramePhase::for_frame(self.frame, self.engine.validation_frames)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn store(&self) -> &BodyStore {
        &self.store
    }

    /// Accelerated pixel buffer, row-major, for presentation
    pub fn pixels(&self) -> &[Color] {
        self.pixels.as_slice()
    }

    pub fn pixel_buffer(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn reference_pixels(&self) -> &PixelBuffer {
        &self.reference_pixels
    }

    pub fn stats(&self) -> &TimingStats {
        &self.stats
    }

    /// Run one frame. Errors are fatal (degenerate body); divergences are not
    /// and come back inside the report
    pub fn advance_frame(&mut self) -> Result<FrameReport> {
        let phase = self.phase();
        debug!(frame = self.frame, ?phase, "advancing frame");

        let start = Instant::now();

        let body_divergence = if phase == FramePhase::Validating {
            self.oracle.check_integrators(
                self.reference.integrator.as_ref(),
                self.accelerated.integrator.as_ref(),
                &mut self.store,
            )?
        } else {
            self.accelerated.integrator.advance(&mut self.store)?;
            None
        };

        let physics_done = Instant::now();

        let pixel_divergence = if phase == FramePhase::Validating {
            self.oracle.check_compositors(
                self.reference.compositor.as_ref(),
                self.accelerated.compositor.as_ref(),
                &self.store,
                &mut self.pixels,
                &mut self.reference_pixels,
            )
        } else {
            self.accelerated.compositor.composite(&self.store, &mut self.pixels);
            None
        };

        let finish = Instant::now();
        let mut timings = FrameTimings {
            physics: physics_done - start,
            compositing: finish - physics_done,
            total: None,
        };

        let validation = match phase {
            FramePhase::Validating => {
                let report = ValidationReport {
                    bodies: body_divergence,
                    pixels: pixel_divergence,
                };
                if report.passed() {
                    info!(frame = self.frame, "error check passed");
                } else {
                    for d in report.divergences() {
                        warn!(frame = self.frame, divergence = %d, "accelerated path diverged from reference");
                    }
                }
                Some(report)
            }
            FramePhase::Warming => {
                self.previous_finish = Some(finish);
                info!("latency columns: satellite movement + space coloring = time between frames (ms)");
                None
            }
            FramePhase::Steady => {
                let total = self
                    .previous_finish
                    .map(|prev| finish - prev)
                    .unwrap_or(timings.physics + timings.compositing);
                self.previous_finish = Some(finish);
                timings.total = Some(total);

                self.stats.record(timings.physics, timings.compositing, total);
                info!(
                    frame = self.frame,
                    "latency {} + {} = {} ms",
                    timings.physics.as_millis(),
                    timings.compositing.as_millis(),
                    total.as_millis()
                );
                if let Some((p, c, t)) = self.stats.averages() {
                    info!(
                        frames = self.stats.frames(),
                        "averaged {} + {} = {} ms",
                        p.as_millis(),
                        c.as_millis(),
                        t.as_millis()
                    );
                }
                None
            }
        };

        let report = FrameReport {
            frame: self.frame,
            phase,
            timings,
            validation,
        };
        self.frame += 1;
        Ok(report)
    }
}
