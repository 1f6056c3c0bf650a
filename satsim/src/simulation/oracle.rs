//! Consistency oracle
//!
//! During the validation window both the reference and the accelerated forms
//! run against independent inputs and the oracle compares their outputs:
//! body state must match bit for bit, pixels per channel within a tolerance.
//! Only the first divergence of each comparison is reported.

use std::fmt;

use crate::error::Result;
use super::compositor::Compositor;
use super::integrator::Integrator;
use super::states::{Body, BodyStore, Color, PixelBuffer};

/// Default per-channel pixel tolerance
pub const ALLOWED_FP_ERROR: f32 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Divergence {
    /// Accelerated integrator disagrees with the reference on body `index`
    Body { index: usize },
    /// Body `index` holds a NaN or infinite field
    NonFinite { index: usize },
    /// First pixel whose channel difference exceeds the tolerance
    Pixel {
        x: usize,
        y: usize,
        reference: Color,
        accelerated: Color,
    },
    /// The two outputs do not even have the same size
    Shape { reference: usize, accelerated: usize },
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Divergence::Body { index } => write!(f, "incorrect satellite data of satellite {index}"),
            Divergence::NonFinite { index } => write!(f, "non-finite state in satellite {index}"),
            Divergence::Pixel { x, y, .. } => write!(f, "buggy pixel at (x={x}, y={y})"),
            Divergence::Shape { reference, accelerated } => {
                write!(f, "size mismatch: reference {reference}, accelerated {accelerated}")
            }
        }
    }
}

/// Result of one validation frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub bodies: Option<Divergence>,
    pub pixels: Option<Divergence>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.bodies.is_none() && self.pixels.is_none()
    }

    pub fn divergences(&self) -> impl Iterator<Item = &Divergence> {
        self.bodies.iter().chain(self.pixels.iter())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConsistencyOracle {
    tolerance: f32,
}

impl Default for ConsistencyOracle {
    fn default() -> Self {
        Self::new(ALLOWED_FP_ERROR)
    }
}

impl ConsistencyOracle {
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Advance `store` with the accelerated integrator and a private copy with
    /// the reference one, then compare. `store` ends up in the accelerated state
    pub fn check_integrators(
        &self,
        reference: &dyn Integrator,
        accelerated: &dyn Integrator,
        store: &mut BodyStore,
    ) -> Result<Option<Divergence>> {
        let mut backup = store.clone();
        reference.advance(&mut backup)?;
        accelerated.advance(store)?;

        Ok(self.compare_bodies(&backup, store).or_else(|| self.find_non_finite(store)))
    }

    /// Render `store` into both buffers (accelerated into `pixels`, reference
    /// into `reference_pixels`) and compare them
    pub fn check_compositors(
        &self,
        reference: &dyn Compositor,
        accelerated: &dyn Compositor,
        store: &BodyStore,
        pixels: &mut PixelBuffer,
        reference_pixels: &mut PixelBuffer,
    ) -> Option<Divergence> {
        accelerated.composite(store, pixels);
        reference.composite(store, reference_pixels);
        self.compare_pixels(reference_pixels, pixels)
    }

    /// First body whose stored fields differ bitwise between the two stores
    pub fn compare_bodies(&self, reference: &BodyStore, accelerated: &BodyStore) -> Option<Divergence> {
        if reference.len() != accelerated.len() {
            return Some(Divergence::Shape {
                reference: reference.len(),
                accelerated: accelerated.len(),
            });
        }

        reference
            .bodies()
            .iter()
            .zip(accelerated.bodies())
            .position(|(r, a)| !bitwise_eq(r, a))
            .map(|index| Divergence::Body { index })
    }

    /// First body carrying a NaN or infinity
    pub fn find_non_finite(&self, store: &BodyStore) -> Option<Divergence> {
        store
            .bodies()
            .iter()
            .position(|b| !b.is_finite())
            .map(|index| Divergence::NonFinite { index })
    }

    /// First pixel, in row-major order, with any channel off by more than the tolerance
    pub fn compare_pixels(&self, reference: &PixelBuffer, accelerated: &PixelBuffer) -> Option<Divergence> {
        if reference.width() != accelerated.width() || reference.height() != accelerated.height() {
            return Some(Divergence::Shape {
                reference: reference.as_slice().len(),
                accelerated: accelerated.as_slice().len(),
            });
        }

        let width = reference.width();
        reference
            .as_slice()
            .iter()
            .zip(accelerated.as_slice())
            .position(|(r, a)| !self.within_tolerance(r, a))
            .map(|i| Divergence::Pixel {
                x: i % width,
                y: i / width,
                reference: reference.as_slice()[i],
                accelerated: accelerated.as_slice()[i],
            })
    }

    fn within_tolerance(&self, r: &Color, a: &Color) -> bool {
        // written so that a NaN difference fails
        r.channels()
            .iter()
            .zip(a.channels().iter())
            .all(|(rc, ac)| (rc - ac).abs() <= self.tolerance)
    }
}

fn bitwise_eq(a: &Body, b: &Body) -> bool {
    let fields = |body: &Body| {
        [
            body.identifier.red,
            body.identifier.green,
            body.identifier.blue,
            body.position.x,
            body.position.y,
            body.velocity.x,
            body.velocity.y,
        ]
        .map(f32::to_bits)
    };
    fields(a) == fields(b)
}
