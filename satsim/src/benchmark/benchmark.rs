use std::time::Instant;

use crate::error::Result;
use crate::simulation::backend::ExecutionBackend;
use crate::simulation::compositor::{Compositor, ParallelCompositor, SequentialCompositor};
use crate::simulation::integrator::{Integrator, ParallelIntegrator, SequentialIntegrator};
use crate::simulation::params::Parameters;
use crate::simulation::states::{Body, BodyStore, Color, FVec2, PixelBuffer};

/// Helper to build a manual BodyStore of size `n` around the center of `params`
fn make_store(n: usize, params: &Parameters) -> BodyStore {
    let cx = params.center.x as f32;
    let cy = params.center.y as f32;

    let bodies = (0..n)
        .map(|i| {
            let i_f = i as f32;
            // deterministic ring, no rand needed
            let angle = i_f * 0.37;
            let radius = 80.0 + (i_f * 0.13).sin().abs() * 200.0;
            let (s, c) = angle.sin_cos();
            let speed = 1.0 / radius.sqrt();

            Body {
                identifier: Color::new(0.1 + 0.15 * (i_f * 0.07).sin().abs(), 0.07, 0.08),
                position: FVec2::new(cx + c * radius, cy + s * radius),
                velocity: FVec2::new(-s * speed, c * speed),
            }
        })
        .collect();

    BodyStore::new(bodies)
}

/// Helper to build parameters with a reduced substep count
fn make_params(substeps: u32) -> Parameters {
    Parameters::new(1024, 1024, 1.0, 32.0, substeps)
}

/// Reference vs accelerated integrator, one frame each, for a range of n.
/// Paste output directly into a spreadsheet to graph
pub fn bench_integrators() -> Result<()> {
    let backend = ExecutionBackend::new(0)?;
    let params = make_params(10_000);

    let sequential = SequentialIntegrator::new(&params);
    let parallel = ParallelIntegrator::new(&params, backend.clone());

    println!("N,sequential_ms,parallel_ms");

    for n in [16, 32, 64, 128, 256, 512] {
        let template = make_store(n, &params);

        // Warm up
        parallel.advance(&mut template.clone())?;

        let mut store_seq = template.clone();
        let t0 = Instant::now();
        sequential.advance(&mut store_seq)?;
        let ms_seq = t0.elapsed().as_secs_f64() * 1000.0;

        let mut store_par = template.clone();
        let t1 = Instant::now();
        parallel.advance(&mut store_par)?;
        let ms_par = t1.elapsed().as_secs_f64() * 1000.0;

        println!("{},{:.3},{:.3}", n, ms_seq, ms_par);
    }

    Ok(())
}

/// Reference vs accelerated compositor on the full canvas for a range of n
pub fn bench_compositors() -> Result<()> {
    let backend = ExecutionBackend::new(0)?;
    let params = make_params(1);

    let sequential = SequentialCompositor::new(&params);
    let parallel = ParallelCompositor::new(&params, 16, backend);

    let mut out_seq = PixelBuffer::new(params.width, params.height);
    let mut out_par = PixelBuffer::new(params.width, params.height);

    println!("N,sequential_ms,parallel_ms");

    for n in [8, 16, 32, 64, 128] {
        let store = make_store(n, &params);

        // Warm up
        parallel.composite(&store, &mut out_par);

        let t0 = Instant::now();
        sequential.composite(&store, &mut out_seq);
        let ms_seq = t0.elapsed().as_secs_f64() * 1000.0;

        let t1 = Instant::now();
        parallel.composite(&store, &mut out_par);
        let ms_par = t1.elapsed().as_secs_f64() * 1000.0;

        println!("{},{:.3},{:.3}", n, ms_seq, ms_par);
    }

    Ok(())
}
