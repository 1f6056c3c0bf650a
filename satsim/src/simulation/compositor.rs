//! Pixel color compositing
//!
//! Every pixel is colored from its relation to all bodies, in two passes:
//!
//! 1. Closest-body scan. A body closer than the body radius turns the pixel
//!    solid white and ends the scan. Otherwise the scan records the closest
//!    body (first strictly-smaller distance wins ties, so the lowest index
//!    is kept) and accumulates `sum(1 / d^4)` from the square-rooted distances.
//! 2. Weighted blend. Each body contributes `identifier * w / sum * gain`
//!    with `w = 1 / (d^2)^2` recomputed from the squared distance.
//!
//! The reference form walks the canvas in row-major order on one thread. The
//! accelerated form packs the bodies into a read-only snapshot and dispatches
//! tiles of rows to the execution backend.

use rayon::prelude::*;

use super::backend::ExecutionBackend;
use super::params::Parameters;
use super::states::{Body, BodyStore, Color, FVec2, PixelBuffer};

/// Produces one color per pixel from a [`BodyStore`]
pub trait Compositor: Send + Sync {
    fn name(&self) -> &'static str;
    fn composite(&self, store: &BodyStore, out: &mut PixelBuffer);
}

/// Outcome of the closest-body pass for one pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClosestScan {
    /// Body `index` lies within the body radius; the pixel is white
    Hit { index: usize },
    /// No override. `closest` is `None` only when there are no bodies
    Miss {
        closest: Option<usize>,
        distance: f32,
        weight_sum: f32,
    },
}

/// First pass: radius override check, closest body and inverse-fourth-power weight sum
pub fn scan_closest(pixel: FVec2, bodies: &[Body], body_radius: f32) -> ClosestScan {
    let mut shortest = f32::INFINITY;
    let mut closest = None;
    let mut weight_sum = 0.0f32;

    for (j, body) in bodies.iter().enumerate() {
        let dx = pixel.x - body.position.x;
        let dy = pixel.y - body.position.y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance < body_radius {
            return ClosestScan::Hit { index: j };
        }

        weight_sum += 1.0 / (distance * distance * distance * distance);
        // strict comparison: an equidistant later body never replaces an earlier one
        if distance < shortest {
            shortest = distance;
            closest = Some(j);
        }
    }

    ClosestScan::Miss {
        closest,
        distance: shortest,
        weight_sum,
    }
}

/// Second pass: add every body's share of the weighted average, times `gain`, onto `base`
pub fn blend(pixel: FVec2, bodies: &[Body], weight_sum: f32, gain: f32, base: Color) -> Color {
    let mut color = base;

    for body in bodies {
        let dx = pixel.x - body.position.x;
        let dy = pixel.y - body.position.y;
        let dist2 = dx * dx + dy * dy;
        let weight = 1.0 / (dist2 * dist2);

        color.red += (body.identifier.red * weight / weight_sum) * gain;
        color.green += (body.identifier.green * weight / weight_sum) * gain;
        color.blue += (body.identifier.blue * weight / weight_sum) * gain;
    }

    color
}

/// Color of the pixel at column `x`, row `y`
pub fn shade_pixel(x: usize, y: usize, bodies: &[Body], params: &Parameters) -> Color {
    let pixel = FVec2::new(x as f32, y as f32);

    match scan_closest(pixel, bodies, params.body_radius) {
        ClosestScan::Hit { .. } => Color::WHITE,
        ClosestScan::Miss { closest, weight_sum, .. } => {
            let base = match closest {
                Some(j) if params.seed_closest_color => bodies[j].identifier,
                _ => Color::BLACK,
            };
            blend(pixel, bodies, weight_sum, params.color_gain, base)
        }
    }
}

/// Reference compositor: row-major walk on the calling thread
#[derive(Debug, Clone)]
pub struct SequentialCompositor {
    params: Parameters,
}

impl SequentialCompositor {
    pub fn new(params: &Parameters) -> Self {
        Self { params: params.clone() }
    }
}

impl Compositor for SequentialCompositor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn composite(&self, store: &BodyStore, out: &mut PixelBuffer) {
        let width = out.width();
        let bodies = store.bodies();

        for (i, px) in out.as_mut_slice().iter_mut().enumerate() {
            *px = shade_pixel(i % width, i / width, bodies, &self.params);
        }
    }
}

/// Structure-of-arrays copy of the body store, taken once per frame and
/// shared read-only by every work item
#[derive(Debug, Clone, Default)]
pub struct BodySnapshot {
    xs: Vec<f32>,
    ys: Vec<f32>,
    colors: Vec<Color>,
}

impl BodySnapshot {
    pub fn capture(store: &BodyStore) -> Self {
        let bodies = store.bodies();
        Self {
            xs: bodies.iter().map(|b| b.position.x).collect(),
            ys: bodies.iter().map(|b| b.position.y).collect(),
            colors: bodies.iter().map(|b| b.identifier).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Per-pixel kernel run by the accelerated compositor
#[derive(Debug, Clone, Copy)]
struct PixelKernel {
    radius: f32,
    gain: f32,
    seed_closest: bool,
}

impl PixelKernel {
    fn run(&self, snap: &BodySnapshot, px: f32, py: f32) -> Color {
        let n = snap.len();

        let mut shortest = f32::INFINITY;
        let mut closest = usize::MAX;
        let mut weights = 0.0f32;

        for j in 0..n {
            let dx = px - snap.xs[j];
            let dy = py - snap.ys[j];
            let d = (dx * dx + dy * dy).sqrt();
            if d < self.radius {
                return Color::WHITE;
            }
            weights += 1.0 / (d * d * d * d);
            if d < shortest {
                shortest = d;
                closest = j;
            }
        }

        let mut acc = if self.seed_closest && closest < n {
            snap.colors[closest]
        } else {
            Color::BLACK
        };

        for j in 0..n {
            let dx = px - snap.xs[j];
            let dy = py - snap.ys[j];
            let d2 = dx * dx + dy * dy;
            let w = 1.0 / (d2 * d2);
            let id = &snap.colors[j];
            acc.red += (id.red * w / weights) * self.gain;
            acc.green += (id.green * w / weights) * self.gain;
            acc.blue += (id.blue * w / weights) * self.gain;
        }

        acc
    }
}

/// Accelerated compositor: tiles of `tile_rows` full rows are independent
/// work items on the execution backend
#[derive(Debug, Clone)]
pub struct ParallelCompositor {
    kernel: PixelKernel,
    tile_rows: usize,
    backend: ExecutionBackend,
}

impl ParallelCompositor {
    pub fn new(params: &Parameters, tile_rows: usize, backend: ExecutionBackend) -> Self {
        Self {
            kernel: PixelKernel {
                radius: params.body_radius,
                gain: params.color_gain,
                seed_closest: params.seed_closest_color,
            },
            tile_rows: tile_rows.max(1),
            backend,
        }
    }
}

impl Compositor for ParallelCompositor {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn composite(&self, store: &BodyStore, out: &mut PixelBuffer) {
        let width = out.width();
        if width == 0 {
            return;
        }
        let snap = BodySnapshot::capture(store);
        let kernel = self.kernel;
        let tile_len = self.tile_rows * width;
        let tile_rows = self.tile_rows;
        let pixels = out.as_mut_slice();

        // blocks until every tile is written
        self.backend.submit(|| {
            pixels
                .par_chunks_mut(tile_len)
                .enumerate()
                .for_each(|(tile, chunk)| {
                    let row0 = tile * tile_rows;
                    for (k, px) in chunk.iter_mut().enumerate() {
                        let x = k % width;
                        let y = row0 + k / width;
                        *px = kernel.run(&snap, x as f32, y as f32);
                    }
                });
        });
    }
}
