//! Sphere primitive for ray tracing.

use crate::hittable::{HitRecord, Hittable};
use lux_math::{Aabb, Interval, Ray, Vec3};
use std::f32::consts::PI;

/// A sphere primitive.
pub struct Sphere {
    center: Vec3,
    radius: f32,
    bbox: Aabb,
}

impl Sphere {
    /// Create a new sphere.
    pub fn new(center: Vec3, radius: f32) -> Self {
        let radius = radius.max(0.0);
        let rvec = Vec3::splat(radius);
        let bbox = Aabb::from_points(center - rvec, center + rvec);

        Self {
            center,
            radius,
            bbox,
        }
    }

    /// Get the UV coordinates for a point on the unit sphere.
    fn get_sphere_uv(p: Vec3) -> (f32, f32) {
        // p is a point on the unit sphere centered at origin
        // theta: angle down from +Y
        // phi: angle around Y axis from +X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        let u = phi / (2.0 * PI);
        let v = theta / PI;
        (u, v)
    }

    /// Find the nearest quadratic root in the acceptable range, if any.
    fn nearest_root(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        let oc = self.center - ray.origin();
        let a = ray.direction().length_squared();
        let h = ray.direction().dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }
        Some(root)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let Some(root) = self.nearest_root(ray, ray_t) else {
            return false;
        };

        rec.t = root;
        rec.point = ray.at(rec.t);
        rec.local_point = rec.point - self.center;
        let outward_normal = rec.local_point / self.radius;
        rec.set_face_normal(ray, outward_normal);
        (rec.u, rec.v) = Self::get_sphere_uv(outward_normal);

        true
    }

    fn hit_fast(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.nearest_root(ray, ray_t).is_some()
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sphere_hit() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5);

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, interval, &mut rec));
        assert!((rec.t - 0.5).abs() < 0.001); // Should hit at t=0.5
        assert!(rec.front_face);
        assert!((rec.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn test_sphere_miss() {
        let sphere = Sphere::new(Vec3::new(0.0, 0.0, -1.0), 0.5);

        // Ray pointing away from sphere
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(!sphere.hit(&ray, interval, &mut rec));
        assert!(!sphere.hit_fast(&ray, interval));
    }

    #[test]
    fn test_sphere_hit_from_inside() {
        let sphere = Sphere::new(Vec3::ZERO, 2.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let interval = Interval::new(0.001, f32::INFINITY);

        let mut rec = HitRecord::default();
        assert!(sphere.hit(&ray, interval, &mut rec));
        assert!((rec.t - 2.0).abs() < 0.001);
        // Normal flipped to face the ray origin
        assert!(!rec.front_face);
        assert!((rec.normal + Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_sphere_uv_range() {
        let sphere = Sphere::new(Vec3::ZERO, 1.0);
        let interval = Interval::new(0.001, f32::INFINITY);

        let dirs = [
            Vec3::new(1.0, 0.3, -0.2),
            Vec3::new(-0.5, -1.0, 0.7),
            Vec3::new(0.1, 0.9, 0.9),
        ];
        for dir in dirs {
            let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), dir - Vec3::new(0.0, 0.0, 5.0));
            let mut rec = HitRecord::default();
            if sphere.hit(&ray, interval, &mut rec) {
                assert!((0.0..=1.0).contains(&rec.u));
                assert!((0.0..=1.0).contains(&rec.v));
            }
        }
    }

    #[test]
    fn test_sphere_bounding_box() {
        let sphere = Sphere::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let bbox = sphere.bounding_box();
        assert!((bbox.min_corner() - Vec3::new(0.5, 1.5, 2.5)).length() < 1e-5);
        assert!((bbox.max_corner() - Vec3::new(1.5, 2.5, 3.5)).length() < 1e-5);
    }
}
