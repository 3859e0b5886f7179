//! Thin-lens camera for ray generation.

use crate::error::{RenderError, RenderResult};
use crate::gen_f32;
use lux_math::{Ray, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Camera description, turned into a [`Camera`] by [`Camera::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub look_from: Vec3,
    pub look_at: Vec3,
    pub vup: Vec3,
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Output aspect ratio (width / height)
    pub aspect_ratio: f32,
    /// Lens diameter; 0.0 disables depth of field
    pub aperture: f32,
    /// Distance from camera to the plane of perfect focus
    pub focus_dist: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: Vec3::ZERO,
            look_at: -Vec3::Z,
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 16.0 / 9.0,
            aperture: 0.0,
            focus_dist: 1.0,
        }
    }
}

impl CameraConfig {
    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set lens settings.
    pub fn with_lens(mut self, vfov: f32, aperture: f32, focus_dist: f32) -> Self {
        self.vfov = vfov;
        self.aperture = aperture;
        self.focus_dist = focus_dist;
        self
    }

    /// Set the output aspect ratio.
    pub fn with_aspect_ratio(mut self, aspect_ratio: f32) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }
}

/// Camera that maps normalized viewport coordinates to world-space rays.
///
/// `(u, v)` run over [0, 1]^2 with v = 0 at the *bottom* of the frame;
/// the accumulation buffers flip rows when writing the output image.
#[derive(Clone)]
pub struct Camera {
    origin: Vec3,
    lower_left_corner: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
    // Lens basis for defocus sampling
    u: Vec3,
    v: Vec3,
    lens_radius: f32,
}

impl Camera {
    /// Build the camera basis from a config.
    ///
    /// Fails with [`RenderError::DegenerateCameraBasis`] when the up vector
    /// is parallel to the view direction (the cross product would be zero,
    /// so no orthonormal basis exists).
    pub fn new(config: &CameraConfig) -> RenderResult<Self> {
        let view = config.look_from - config.look_at;
        if view.length_squared() < 1e-12 {
            return Err(RenderError::DegenerateCameraBasis);
        }

        let w = view.normalize();
        let cross = config.vup.cross(w);
        if cross.length_squared() < 1e-12 {
            return Err(RenderError::DegenerateCameraBasis);
        }
        let u = cross.normalize();
        let v = w.cross(u);

        let theta = config.vfov.to_radians();
        let half_height = (theta / 2.0).tan();
        let viewport_height = 2.0 * half_height;
        let viewport_width = viewport_height * config.aspect_ratio;

        let origin = config.look_from;
        let horizontal = config.focus_dist * viewport_width * u;
        let vertical = config.focus_dist * viewport_height * v;
        let lower_left_corner =
            origin - horizontal / 2.0 - vertical / 2.0 - config.focus_dist * w;

        Ok(Self {
            origin,
            lower_left_corner,
            horizontal,
            vertical,
            u,
            v,
            lens_radius: config.aperture / 2.0,
        })
    }

    /// Generate a ray through normalized viewport coordinates `(s, t)`.
    ///
    /// The origin is jittered over the lens disk when the aperture is
    /// non-zero, producing depth of field.
    pub fn get_ray(&self, s: f32, t: f32, rng: &mut dyn RngCore) -> Ray {
        let offset = if self.lens_radius > 0.0 {
            let rd = self.lens_radius * random_in_unit_disk(rng);
            self.u * rd.x + self.v * rd.y
        } else {
            Vec3::ZERO
        };

        let origin = self.origin + offset;
        let direction =
            self.lower_left_corner + s * self.horizontal + t * self.vertical - origin;
        Ray::new(origin, direction)
    }
}

/// Sample a random point in the unit disk.
fn random_in_unit_disk(rng: &mut dyn RngCore) -> Vec3 {
    loop {
        let p = Vec3::new(gen_f32(rng) * 2.0 - 1.0, gen_f32(rng) * 2.0 - 1.0, 0.0);
        if p.length_squared() < 1.0 {
            return p;
        }
    }
}
