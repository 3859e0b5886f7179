//! Error types for render job and camera construction.
//!
//! Everything here is rejected synchronously at construction time; the
//! render loop itself never surfaces these (per-hit geometry faults are
//! corrected and counted instead, see [`crate::stats`]).

use thiserror::Error;

/// Errors that can occur while constructing a camera or render job.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("image dimensions must be at least 1x1, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("k_min must be finite and non-negative, got {0}")]
    InvalidKMin(f32),

    #[error("k_max ({k_max}) must be >= k_min ({k_min})")]
    InvertedKRange { k_min: f32, k_max: f32 },

    #[error("concurrency level must be at least 1")]
    ZeroConcurrency,

    #[error("pass count must be at least 1 unless infinite passes is enabled")]
    ZeroPasses,

    #[error("light sample count must be at least 1")]
    ZeroLightSamples,

    #[error("up vector is parallel to the view direction, no camera basis can be formed")]
    DegenerateCameraBasis,

    #[error("failed to build render thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result type for construction operations.
pub type RenderResult<T> = Result<T, RenderError>;
