//! Light contract for direct illumination.

use crate::hittable::HitRecord;
use crate::integrator::RenderContext;
use crate::material::Color;
use lux_math::{Ray, Vec3};
use rand::RngCore;

/// A light source sampled during shading.
///
/// Implementations do their own occlusion testing through
/// [`RenderContext::any_intersection_fast`], which only needs to know
/// whether *anything* blocks the shadow ray.
pub trait Light: Send + Sync {
    /// Radiance this light contributes at a surface hit, zero if occluded.
    fn calculate_light(&self, hit: &HitRecord, ctx: &RenderContext, rng: &mut dyn RngCore)
        -> Color;
}

/// Point light with inverse-square falloff.
pub struct PointLight {
    position: Vec3,
    colour: Color,
    intensity: f32,
}

impl PointLight {
    pub fn new(position: Vec3, colour: Color, intensity: f32) -> Self {
        Self {
            position,
            colour,
            intensity,
        }
    }
}

impl Light for PointLight {
    fn calculate_light(
        &self,
        hit: &HitRecord,
        ctx: &RenderContext,
        _rng: &mut dyn RngCore,
    ) -> Color {
        let to_light = self.position - hit.point;
        let distance_sq = to_light.length_squared();
        if distance_sq < 1e-12 {
            return Color::ZERO;
        }
        let distance = distance_sq.sqrt();
        let direction = to_light / distance;

        let cosine = hit.normal.dot(direction);
        if cosine <= 0.0 {
            // Light is behind the surface
            return Color::ZERO;
        }

        // Shadow test: anything between the hit and the light blocks it
        let shadow_ray = Ray::new(hit.point, direction);
        if ctx.any_intersection_fast(&shadow_ray, ctx.options.k_min, distance - ctx.options.k_min)
        {
            return Color::ZERO;
        }

        self.colour * (self.intensity * cosine / distance_sq)
    }
}
