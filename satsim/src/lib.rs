pub mod error;
pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use error::{Result, SimError};

pub use simulation::states::{Body, BodyStore, Color, PixelBuffer, FVec2, DVec2};
pub use simulation::params::Parameters;
pub use simulation::engine::{Engine, Strategies};
pub use simulation::forces::CentralGravity;
pub use simulation::backend::ExecutionBackend;
pub use simulation::integrator::{Integrator, SequentialIntegrator, ParallelIntegrator};
pub use simulation::compositor::{Compositor, SequentialCompositor, ParallelCompositor, ClosestScan, scan_closest, blend, shade_pixel};
pub use simulation::oracle::{ConsistencyOracle, Divergence, ValidationReport, ALLOWED_FP_ERROR};
pub use simulation::driver::{Simulation, FramePhase, FrameReport, FrameTimings, TimingStats};
pub use simulation::scenario::{Scenario, generate_bodies};

pub use configuration::config::{BackendConfig, EngineConfig, ParametersConfig, BodyConfig, ScenarioConfig};

pub use benchmark::benchmark::{bench_integrators, bench_compositors};
