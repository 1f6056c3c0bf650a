//! Fixed-step Euler integrators for the satellite set
//!
//! Provides the reference (strictly ordered) and accelerated (one work unit
//! per body) forms behind the [`Integrator`] trait. Both run the same
//! substep kernel in the same order for any single body, accumulate in f64
//! and store back into f32 once per frame, so their outputs are bitwise equal

use rayon::prelude::*;

use crate::error::Result;
use super::backend::ExecutionBackend;
use super::forces::CentralGravity;
use super::params::Parameters;
use super::states::{Body, BodyStore, DVec2, FVec2};

fn widen(v: &FVec2) -> DVec2 {
    DVec2::new(v.x as f64, v.y as f64)
}

fn narrow(v: &DVec2) -> FVec2 {
    FVec2::new(v.x as f32, v.y as f32)
}

/// Advances a whole [`BodyStore`] by one frame (K substeps)
pub trait Integrator: Send + Sync {
    fn name(&self) -> &'static str;
    fn advance(&self, store: &mut BodyStore) -> Result<()>;
}

/// Reference integrator: substep loop outside, body loop inside, one thread
#[derive(Debug, Clone)]
pub struct SequentialIntegrator {
    gravity: CentralGravity,
    step: f64,
    substeps: u32,
}

impl SequentialIntegrator {
    pub fn new(params: &Parameters) -> Self {
        Self {
            gravity: CentralGravity::from_params(params),
            step: params.step,
            substeps: params.substeps,
        }
    }
}

impl Integrator for SequentialIntegrator {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn advance(&self, store: &mut BodyStore) -> Result<()> {
        let n = store.len();
        if n == 0 { // no bodies, return
            return Ok(());
        }

        // Widen to f64 once; all K substeps run on these copies
        let mut x: Vec<DVec2> = store.bodies().iter().map(|b| widen(&b.position)).collect();
        let mut v: Vec<DVec2> = store.bodies().iter().map(|b| widen(&b.velocity)).collect();

        for _ in 0..self.substeps {
            for i in 0..n {
                self.gravity.substep(i, &mut x[i], &mut v[i], self.step)?;
            }
        }

        // Narrow back to f32 storage
        for (b, (xi, vi)) in store.bodies_mut().iter_mut().zip(x.iter().zip(v.iter())) {
            b.position = narrow(xi);
            b.velocity = narrow(vi);
        }

        Ok(())
    }
}

/// Accelerated integrator: each body's full substep chain is one unit of work
/// on the execution backend. The chain itself is never split
#[derive(Debug, Clone)]
pub struct ParallelIntegrator {
    gravity: CentralGravity,
    step: f64,
    substeps: u32,
    backend: ExecutionBackend,
}

impl ParallelIntegrator {
    pub fn new(params: &Parameters, backend: ExecutionBackend) -> Self {
        Self {
            gravity: CentralGravity::from_params(params),
            step: params.step,
            substeps: params.substeps,
            backend,
        }
    }

    fn advance_body(&self, index: usize, body: &Body) -> Result<Body> {
        let mut x = widen(&body.position);
        let mut v = widen(&body.velocity);

        for _ in 0..self.substeps {
            self.gravity.substep(index, &mut x, &mut v, self.step)?;
        }

        Ok(Body {
            position: narrow(&x),
            velocity: narrow(&v),
            ..*body
        })
    }
}

impl Integrator for ParallelIntegrator {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn advance(&self, store: &mut BodyStore) -> Result<()> {
        let bodies = store.bodies();
        // submit blocks until every body is done: the frame barrier
        let advanced = self.backend.submit(|| {
            bodies
                .par_iter()
                .enumerate()
                .map(|(i, b)| self.advance_body(i, b))
                .collect::<Result<Vec<Body>>>()
        })?;

        // store is only touched once every body succeeded
        store.bodies_mut().copy_from_slice(&advanced);
        Ok(())
    }
}
