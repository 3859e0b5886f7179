//! Hittable trait and HitRecord for ray-object intersection.

use lux_math::{Aabb, Interval, Ray, Vec3};

/// Record of a ray-object intersection.
///
/// Carries the index of the scene object that was hit rather than a material
/// reference, so records can live in pooled scratch buffers without
/// borrowing from the scene. Material lookup goes through
/// [`crate::Scene::objects`].
#[derive(Debug, Clone, Copy)]
pub struct HitRecord {
    /// Point of intersection in world space
    pub point: Vec3,
    /// Point of intersection in the object's local frame (for texturing)
    pub local_point: Vec3,
    /// Surface normal at intersection (always points against the ray)
    pub normal: Vec3,
    /// UV texture coordinates, each in [0, 1]
    pub u: f32,
    pub v: f32,
    /// Ray parameter k where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// Index of the hit object in the scene's object list
    pub object: usize,
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            local_point: Vec3::ZERO,
            normal: Vec3::ZERO,
            u: 0.0,
            v: 0.0,
            t: 0.0,
            front_face: false,
            object: 0,
        }
    }
}

impl HitRecord {
    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        // If the ray and normal point in the same direction, we're inside
        self.front_face = ray.direction().dot(outward_normal) < 0.0;

        // Normal always points against the ray
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }
}

/// Trait for geometry that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within the given parameter interval.
    ///
    /// Returns true on the closest hit in range, and fills in the hit record.
    fn hit(&self, ray: &Ray, ray_t: Interval, rec: &mut HitRecord) -> bool;

    /// Test if a ray hits this object at all within the interval.
    ///
    /// Cheaper than [`Hittable::hit`] for occlusion/shadow queries where no
    /// hit record or closest-distance comparison is needed.
    fn hit_fast(&self, ray: &Ray, ray_t: Interval) -> bool {
        let mut rec = HitRecord::default();
        self.hit(ray, ray_t, &mut rec)
    }

    /// Get the axis-aligned bounding box of this object.
    ///
    /// Unbounded geometry returns [`Aabb::UNIVERSE`].
    fn bounding_box(&self) -> Aabb;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_face_normal_front() {
        let mut rec = HitRecord::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        // Outward normal opposing the ray: front face
        rec.set_face_normal(&ray, -Vec3::Z);
        assert!(rec.front_face);
        assert_eq!(rec.normal, -Vec3::Z);
    }

    #[test]
    fn test_set_face_normal_back() {
        let mut rec = HitRecord::default();
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);

        // Outward normal along the ray: back face, normal gets flipped
        rec.set_face_normal(&ray, Vec3::Z);
        assert!(!rec.front_face);
        assert_eq!(rec.normal, -Vec3::Z);
    }
}
