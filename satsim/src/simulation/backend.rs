//! Execution backend for the accelerated paths
//!
//! A dedicated rayon pool that work is submitted to. `submit` blocks the
//! caller until every unit of work has finished, which is the only barrier
//! the accelerated integrator and compositor rely on

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{Result, SimError};

#[derive(Clone)]
pub struct ExecutionBackend {
    pool: Arc<ThreadPool>,
}

impl ExecutionBackend {
    /// Build a pool with `threads` workers; `0` lets rayon pick (one per core)
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("satsim-worker-{i}"))
            .build()
            .map_err(|e| SimError::Backend(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `work` inside the pool and wait for it to complete
    pub fn submit<R, F>(&self, work: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(work)
    }
}

impl std::fmt::Debug for ExecutionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionBackend")
            .field("threads", &self.threads())
            .finish()
    }
}
