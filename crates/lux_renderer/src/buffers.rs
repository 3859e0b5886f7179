//! Accumulation buffers and the shared display framebuffer.
//!
//! Each pixel keeps a running colour sum and sample count; the displayed
//! pixel is `sqrt(clamp01(sum / samples))` (square root as a gamma-2
//! approximation). Accumulation entries are mutated without locks: within a
//! pass no two tasks touch the same pixel, and passes never overlap. The
//! display framebuffer uses atomic packed pixels so observers can read it
//! while a pass is in flight.

use crate::material::Color;
use lux_math::Vec3;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Tonemap a linear colour to its displayed value.
#[inline]
pub fn tonemap(colour: Color) -> Color {
    Color::new(
        linear_to_gamma(clamp_01(colour.x)),
        linear_to_gamma(clamp_01(colour.y)),
        linear_to_gamma(clamp_01(colour.z)),
    )
}

/// Pack a displayed colour into an RGBA8 word.
#[inline]
pub fn pack_rgba(colour: Color) -> u32 {
    let r = (255.0 * clamp_01(colour.x)) as u8;
    let g = (255.0 * clamp_01(colour.y)) as u8;
    let b = (255.0 * clamp_01(colour.z)) as u8;
    u32::from_le_bytes([r, g, b, 255])
}

/// Fold one sample into an accumulation entry and refresh its displayed
/// pixel at the given flat image index.
///
/// Shared by [`AccumulationBuffers::update`] and the render workers, which
/// hold disjoint `&mut` entries during a pass.
pub(crate) fn accumulate_and_display(
    pixel: &mut PixelAccum,
    framebuffer: &Framebuffer,
    index: usize,
    sample: Color,
) {
    let displayed = pixel.accumulate(sample);
    framebuffer.store(index, pack_rgba(displayed));
}

/// Running colour sum and sample count for one pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelAccum {
    pub colour_sum: Vec3,
    pub samples: u32,
}

impl PixelAccum {
    /// Fold one sample in and return the new displayed colour.
    pub fn accumulate(&mut self, sample: Color) -> Color {
        self.colour_sum += sample;
        self.samples += 1;
        tonemap(self.colour_sum / self.samples as f32)
    }

    /// Average colour so far (linear, before tonemapping).
    pub fn mean(&self) -> Color {
        if self.samples == 0 {
            Color::ZERO
        } else {
            self.colour_sum / self.samples as f32
        }
    }
}

/// Shared display image with atomically updated packed-RGBA pixels.
///
/// Row 0 is the *top* of the image. Readers may observe a mix of the
/// current and previous pass, but each individual pixel is consistent.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<AtomicU32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: (0..count).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Store a packed pixel by flat image index.
    #[inline]
    pub fn store(&self, index: usize, packed: u32) {
        self.pixels[index].store(packed, Ordering::Relaxed);
    }

    /// Read one pixel as RGBA bytes, (0, 0) at the top-left.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let index = (y * self.width + x) as usize;
        self.pixels[index].load(Ordering::Relaxed).to_le_bytes()
    }

    /// Copy the image out as tightly packed RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            bytes.extend_from_slice(&pixel.load(Ordering::Relaxed).to_le_bytes());
        }
        bytes
    }
}

/// Per-job accumulation state: one [`PixelAccum`] per pixel plus the shared
/// display framebuffer.
///
/// Entries are stored in image order (row 0 at the top); updates given in
/// camera coordinates (row 0 at the bottom) are flipped on the way in.
pub struct AccumulationBuffers {
    width: u32,
    height: u32,
    pub(crate) pixels: Vec<PixelAccum>,
    framebuffer: Arc<Framebuffer>,
}

impl AccumulationBuffers {
    /// Allocate buffers at the output resolution, all pixels black.
    pub fn new(width: u32, height: u32) -> Self {
        let count = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![PixelAccum::default(); count],
            framebuffer: Arc::new(Framebuffer::new(width, height)),
        }
    }

    /// Handle to the shared display image.
    pub fn framebuffer(&self) -> Arc<Framebuffer> {
        Arc::clone(&self.framebuffer)
    }

    /// Fold one sample into pixel `(x, y)` in *camera* coordinates.
    ///
    /// Flips y because camera space has row 0 at the bottom while the
    /// output image has row 0 at the top, then refreshes the displayed
    /// pixel.
    pub fn update(&mut self, x: u32, y: u32, sample: Color) {
        let flipped = self.height - 1 - y;
        let index = (flipped * self.width + x) as usize;
        accumulate_and_display(&mut self.pixels[index], &self.framebuffer, index, sample);
    }

    /// Linear mean of pixel `(x, y)` in camera coordinates.
    pub fn mean(&self, x: u32, y: u32) -> Color {
        let flipped = self.height - 1 - y;
        self.pixels[(flipped * self.width + x) as usize].mean()
    }
}
