//! Infinite plane primitive.

use crate::hittable::{HitRecord, Hittable};
use lux_math::{Aabb, Interval, Ray, Vec3};

/// An infinite plane through `point` with the given normal.
///
/// The plane is unbounded, so its bounding box is [`Aabb::UNIVERSE`] and the
/// BVH can never cull it by its box.
pub struct Plane {
    point: Vec3,
    normal: Vec3,
    // Local tangent frame for UV tiling
    tangent: Vec3,
    bitangent: Vec3,
}

impl Plane {
    /// Create a new plane. The normal is normalized.
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();

        // Pick the world axis least aligned with the normal to anchor the frame
        let helper = if normal.x.abs() > 0.9 { Vec3::Y } else { Vec3::X };
        let tangent = normal.cross(helper).normalize();
        let bitangent = normal.cross(tangent);

        Self {
            point,
            normal,
            tangent,
            bitangent,
        }
    }

    fn intersection_t(&self, ray: &Ray, ray_t: Interval) -> Option<f32> {
        let denom = self.normal.dot(ray.direction());
        if denom.abs() < 1e-8 {
            // Ray parallel to the plane
            return None;
        }

        let t = (self.point - ray.origin()).dot(self.normal) / denom;
        ray_t.surrounds(t).then_some(t)
    }
}

impl Hittable for Plane {
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool {
        let Some(t) = self.intersection_t(ray, ray_t) else {
            return false;
        };

        rec.t = t;
        rec.point = ray.at(t);
        rec.local_point = rec.point - self.point;
        rec.set_face_normal(ray, self.normal);

        // Tile the infinite plane into unit UV cells
        rec.u = rec.local_point.dot(self.tangent).rem_euclid(1.0);
        rec.v = rec.local_point.dot(self.bitangent).rem_euclid(1.0);

        true
    }

    fn hit_fast(&self, ray: &Ray, ray_t: Interval) -> bool {
        self.intersection_t(ray, ray_t).is_some()
    }

    fn bounding_box(&self) -> Aabb {
        Aabb::UNIVERSE
    }
}
