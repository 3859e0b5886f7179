//! Validated render configuration.

use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Render configuration.
///
/// Plain data with builder-style setters; [`RenderOptions::validate`] is
/// called by [`crate::RenderJob::new`], so invalid configurations are
/// rejected before any rendering resource is allocated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Output image width in pixels
    pub width: u32,
    /// Output image height in pixels
    pub height: u32,
    /// Minimum ray parameter accepted as a hit (shadow-acne epsilon)
    pub k_min: f32,
    /// Maximum ray parameter accepted as a hit
    pub k_max: f32,
    /// Maximum number of worker threads rendering pixels at once
    pub concurrency: usize,
    /// Number of progressive passes, ignored when `infinite_passes` is set
    pub passes: u32,
    /// Keep accumulating passes until cancelled
    pub infinite_passes: bool,
    /// Maximum ray bounce depth (0 = camera hits only)
    pub max_bounce_depth: u32,
    /// Samples-per-light hint for direct light estimation
    pub light_samples: u32,
    /// Base seed for the per-pixel deterministic RNG streams
    pub seed: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 450,
            k_min: 0.001,
            k_max: f32::INFINITY,
            concurrency: 4,
            passes: 16,
            infinite_passes: false,
            max_bounce_depth: 50,
            light_samples: 1,
            seed: 0,
        }
    }
}

impl RenderOptions {
    /// Create options with the default quality settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the accepted ray parameter range.
    pub fn with_k_range(mut self, k_min: f32, k_max: f32) -> Self {
        self.k_min = k_min;
        self.k_max = k_max;
        self
    }

    /// Set the worker thread bound.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the number of progressive passes.
    pub fn with_passes(mut self, passes: u32) -> Self {
        self.passes = passes;
        self.infinite_passes = false;
        self
    }

    /// Keep rendering passes until cancelled.
    pub fn with_infinite_passes(mut self) -> Self {
        self.infinite_passes = true;
        self
    }

    /// Set the maximum bounce depth.
    pub fn with_max_bounce_depth(mut self, depth: u32) -> Self {
        self.max_bounce_depth = depth;
        self
    }

    /// Set the samples-per-light hint.
    pub fn with_light_samples(mut self, samples: u32) -> Self {
        self.light_samples = samples;
        self
    }

    /// Set the base RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Total number of pixels per pass.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check every configuration invariant.
    pub fn validate(&self) -> RenderResult<()> {
        if self.width < 1 || self.height < 1 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !self.k_min.is_finite() || self.k_min < 0.0 {
            return Err(RenderError::InvalidKMin(self.k_min));
        }
        if self.k_max.is_nan() || self.k_max < self.k_min {
            return Err(RenderError::InvertedKRange {
                k_min: self.k_min,
                k_max: self.k_max,
            });
        }
        if self.concurrency < 1 {
            return Err(RenderError::ZeroConcurrency);
        }
        if !self.infinite_passes && self.passes < 1 {
            return Err(RenderError::ZeroPasses);
        }
        if self.light_samples < 1 {
            return Err(RenderError::ZeroLightSamples);
        }
        Ok(())
    }
}
