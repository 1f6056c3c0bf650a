//! Core state types for the satellite simulation.
//!
//! - `FVec2` / `DVec2`: single precision storage, double precision accumulation
//! - `Color`: plain RGB triple, never clamped by the core
//! - `Body` / `BodyStore`: the fixed-length, index-ordered satellite set
//! - `PixelBuffer`: row-major canvas of `Color`

use nalgebra::Vector2;

pub type FVec2 = Vector2<f32>;
pub type DVec2 = Vector2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Color {
    pub const BLACK: Color = Color { red: 0.0, green: 0.0, blue: 0.0 };
    pub const WHITE: Color = Color { red: 1.0, green: 1.0, blue: 1.0 };

    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Channels in red, green, blue order
    pub fn channels(&self) -> [f32; 3] {
        [self.red, self.green, self.blue]
    }

    pub fn is_finite(&self) -> bool {
        self.red.is_finite() && self.green.is_finite() && self.blue.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub identifier: Color, // color this body contributes to the field
    pub position: FVec2, // canvas coordinates
    pub velocity: FVec2, // canvas units per time unit
}

impl Body {
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite()) && self.velocity.iter().all(|c| c.is_finite())
    }
}

/// Ordered, fixed-length set of bodies. The index is the body's identity:
/// nothing in the crate reorders, inserts or removes bodies after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyStore {
    bodies: Vec<Body>,
}

impl BodyStore {
    pub fn new(bodies: Vec<Body>) -> Self {
        Self { bodies }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    /// Mutable access to the bodies. The slice cannot grow or shrink, so the
    /// store length stays fixed.
    pub fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    pub fn get(&self, index: usize) -> Option<&Body> {
        self.bodies.get(index)
    }
}

/// Row-major grid of colors, one per canvas pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<Color>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![Color::BLACK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x).copied()
    }

    /// Writes one pixel. Returns false, leaving the buffer untouched, when
    /// (x, y) is off the canvas
    pub fn set(&mut self, x: usize, y: usize, color: Color) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y * self.width + x] = color;
        true
    }

    /// Flat row-major view for presentation
    pub fn as_slice(&self) -> &[Color] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Color] {
        &mut self.data
    }
}
