//! Lux - progressive CPU path tracer
//!
//! A Monte Carlo path tracer built around a two-pass integrator: a forward
//! walk records the bounce chain, then a reverse walk composes colour back
//! toward the camera. Rendering runs as a multi-pass job on a bounded
//! thread pool, refining a shared display image one full pass at a time.

mod buffers;
mod bvh;
mod camera;
mod error;
mod hittable;
mod integrator;
mod job;
mod light;
mod material;
mod options;
mod plane;
mod scene;
mod sky;
mod sphere;
mod stats;

pub use buffers::{pack_rgba, tonemap, AccumulationBuffers, Framebuffer, PixelAccum};
pub use bvh::Bvh;
pub use camera::{Camera, CameraConfig};
pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable};
pub use integrator::{trace, PathVertex, RenderContext};
pub use job::{JobState, RenderJob};
pub use light::{Light, PointLight};
pub use material::{random_unit_vector, Color, Emissive, Lambertian, Material, Metal};
pub use options::RenderOptions;
pub use plane::Plane;
pub use scene::{Scene, SceneObject};
pub use sky::{ConstantSky, GradientSky, Sky};
pub use sphere::Sphere;
pub use stats::{HitFault, RenderStats, RenderStatsSnapshot};

/// Re-export common math types from lux_math
pub use lux_math::{Aabb, Interval, Ray, Vec3};

use rand::RngCore;

/// Uniform f32 in [0, 1) from the top 24 bits of the generator, exact in
/// single precision.
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    (rng.next_u32() >> 8) as f32 / 16_777_216.0
}
