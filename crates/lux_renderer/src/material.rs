//! Material contract for surface scattering and shading.
//!
//! The integrator walks a path in two phases (see [`crate::integrator`]):
//! the forward walk asks [`Material::scatter`] for the next ray (or
//! absorption), and the reverse walk asks [`Material::shade`] to fold the
//! colour arriving from the rest of the path into this surface's response.

use crate::gen_f32;
use crate::hittable::HitRecord;
use crate::integrator::RenderContext;
use lux_math::{Ray, Vec3};
use rand::RngCore;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Trait for materials that describe how light interacts with surfaces.
pub trait Material: Send + Sync {
    /// Scatter an incoming ray at a hit.
    ///
    /// Returns the next ray to follow, or None if the ray is absorbed and
    /// the path terminates here.
    fn scatter(&self, ray_in: &Ray, hit: &HitRecord, rng: &mut dyn RngCore) -> Option<Ray>;

    /// Combine the colour arriving from the rest of the path with this
    /// surface's own response.
    ///
    /// `colour_so_far` is the radiance estimate for everything beyond this
    /// hit (sky colour or black for absorbed/depth-limited paths). Direct
    /// light sampling goes through `ctx`.
    fn shade(
        &self,
        colour_so_far: Color,
        ray_in: &Ray,
        hit: &HitRecord,
        ctx: &RenderContext,
        rng: &mut dyn RngCore,
    ) -> Color;
}

/// Lambertian (diffuse) material.
#[derive(Clone)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    /// Create a new Lambertian material with the given albedo color.
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn scatter(&self, _ray_in: &Ray, hit: &HitRecord, rng: &mut dyn RngCore) -> Option<Ray> {
        // Scatter in a random direction on the hemisphere around the normal
        let mut scatter_direction = hit.normal + random_unit_vector(rng);

        // Catch degenerate scatter direction
        if scatter_direction.length_squared() < 1e-8 {
            scatter_direction = hit.normal;
        }

        Some(Ray::new(hit.point, scatter_direction))
    }

    fn shade(
        &self,
        colour_so_far: Color,
        _ray_in: &Ray,
        hit: &HitRecord,
        ctx: &RenderContext,
        rng: &mut dyn RngCore,
    ) -> Color {
        let direct = ctx.direct_light(hit, rng);
        self.albedo * (colour_so_far + direct)
    }
}

/// Metal (specular) material.
pub struct Metal {
    albedo: Color,
    fuzz: f32,
}

impl Metal {
    /// Create a new Metal material.
    ///
    /// - `albedo`: The color of the metal
    /// - `fuzz`: Roughness, 0.0 = perfect mirror, 1.0 = very rough
    pub fn new(albedo: Color, fuzz: f32) -> Self {
        Self {
            albedo,
            fuzz: fuzz.clamp(0.0, 1.0),
        }
    }
}

impl Material for Metal {
    fn scatter(&self, ray_in: &Ray, hit: &HitRecord, rng: &mut dyn RngCore) -> Option<Ray> {
        let reflected = reflect(ray_in.direction(), hit.normal);
        let scattered_dir = reflected + self.fuzz * random_unit_vector(rng);

        // Only scatter if the reflected ray is in the same hemisphere as the normal
        if scattered_dir.dot(hit.normal) > 0.0 {
            Some(Ray::new(hit.point, scattered_dir))
        } else {
            None
        }
    }

    fn shade(
        &self,
        colour_so_far: Color,
        _ray_in: &Ray,
        _hit: &HitRecord,
        _ctx: &RenderContext,
        _rng: &mut dyn RngCore,
    ) -> Color {
        self.albedo * colour_so_far
    }
}

/// Emissive material: absorbs every incoming ray and glows.
pub struct Emissive {
    emit: Color,
}

impl Emissive {
    /// Create an emissive material with the given radiance.
    pub fn new(emit: Color) -> Self {
        Self { emit }
    }
}

impl Material for Emissive {
    fn scatter(&self, _ray_in: &Ray, _hit: &HitRecord, _rng: &mut dyn RngCore) -> Option<Ray> {
        None
    }

    fn shade(
        &self,
        _colour_so_far: Color,
        _ray_in: &Ray,
        _hit: &HitRecord,
        _ctx: &RenderContext,
        _rng: &mut dyn RngCore,
    ) -> Color {
        self.emit
    }
}

/// Reflect a vector about a normal.
#[inline]
fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Sample a uniformly distributed unit vector.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        let len_sq = p.length_squared();
        if len_sq > 1e-7 && len_sq <= 1.0 {
            return p / len_sq.sqrt();
        }
    }
}
