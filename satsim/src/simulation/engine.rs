//! High-level runtime engine settings
//!
//! Selects which strategies fill the accelerated slot, the worker count,
//! and the validation window used when running a `Scenario`

use tracing::debug;

use crate::configuration::config::BackendConfig;
use crate::error::Result;
use super::backend::ExecutionBackend;
use super::compositor::{Compositor, ParallelCompositor, SequentialCompositor};
use super::integrator::{Integrator, ParallelIntegrator, SequentialIntegrator};
use super::params::Parameters;

#[derive(Debug, Clone)]
pub struct Engine {
    pub backend: BackendConfig, // parallel or sequential accelerated path
    pub threads: usize, // worker threads, 0 = one per core
    pub validation_frames: u64, // frames checked against the reference path
    pub allowed_fp_error: f32, // per-channel pixel tolerance
    pub tile_rows: usize, // rows per compositing work item
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            backend: BackendConfig::Parallel,
            threads: 0,
            validation_frames: 2,
            allowed_fp_error: super::oracle::ALLOWED_FP_ERROR,
            tile_rows: 16,
        }
    }
}

/// One integrator and one compositor behind the capability traits
pub struct Strategies {
    pub integrator: Box<dyn Integrator>,
    pub compositor: Box<dyn Compositor>,
}

impl Engine {
    /// The strict single-threaded pair the oracle treats as correct
    pub fn reference_strategies(&self, params: &Parameters) -> Strategies {
        Strategies {
            integrator: Box::new(SequentialIntegrator::new(params)),
            compositor: Box::new(SequentialCompositor::new(params)),
        }
    }

    /// The pair run every frame. Fails only if the thread pool cannot be built
    pub fn accelerated_strategies(&self, params: &Parameters) -> Result<Strategies> {
        match self.backend {
            BackendConfig::Sequential => Ok(self.reference_strategies(params)),
            BackendConfig::Parallel => {
                let backend = ExecutionBackend::new(self.threads)?;
                debug!(threads = backend.threads(), "execution backend ready");
                Ok(Strategies {
                    integrator: Box::new(ParallelIntegrator::new(params, backend.clone())),
                    compositor: Box::new(ParallelCompositor::new(params, self.tile_rows, backend)),
                })
            }
        }
    }
}
