//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A binary tree over scene object indices, built once per render job and
//! read-only during traversal. Node boxes are the union of their children's
//! boxes, so the root encompasses the whole scene and a box miss prunes the
//! entire subtree.

use crate::hittable::HitRecord;
use crate::scene::SceneObject;
use crate::stats::RenderStats;
use lux_math::{Aabb, Interval, Ray};
use std::sync::atomic::Ordering;

/// Maximum objects per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 2;

/// BVH node - either a branch with two children or a leaf with object indices.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of objects, indexed into the scene list.
    Leaf { objects: Vec<usize>, bbox: Aabb },
    /// Empty node (scene with no objects).
    Empty,
}

impl BvhNode {
    fn bbox(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}

/// BVH over a scene's objects.
///
/// Holds indices rather than the objects themselves; the object list is
/// passed into traversal so the tree can be shared read-only between the
/// render workers and outside observers.
pub struct Bvh {
    root: BvhNode,
}

impl Bvh {
    /// Build a BVH over the given objects.
    pub fn build(objects: &[SceneObject]) -> Self {
        if objects.is_empty() {
            return Self {
                root: BvhNode::Empty,
            };
        }

        let items: Vec<(usize, Aabb)> = objects
            .iter()
            .enumerate()
            .map(|(i, obj)| (i, obj.geometry.bounding_box()))
            .collect();

        Self {
            root: Self::build_node(items),
        }
    }

    /// Recursive BVH construction.
    ///
    /// Median-split: sort objects by bounding-box centroid on the axis with
    /// the greatest centroid spread, split in half, recurse.
    fn build_node(mut items: Vec<(usize, Aabb)>) -> BvhNode {
        let n = items.len();

        // Bounding box of all objects in this subtree
        let bounds = items
            .iter()
            .fold(Aabb::EMPTY, |acc, (_, bbox)| Aabb::surrounding(&acc, bbox));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                objects: items.into_iter().map(|(i, _)| i).collect(),
                bbox: bounds,
            };
        }

        // Centroid bounds determine the axis of greatest spread
        let centroid_bounds = items.iter().fold(Aabb::EMPTY, |acc, (_, bbox)| {
            let c = bbox.centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        items.sort_unstable_by(|(_, a), (_, b)| {
            let a_val = a.centroid()[axis];
            let b_val = b.centroid()[axis];
            a_val.partial_cmp(&b_val).unwrap_or(std::cmp::Ordering::Equal)
        });

        // Split at midpoint
        let right_items = items.split_off(n / 2);
        let left_items = items;

        BvhNode::Branch {
            left: Box::new(Self::build_node(left_items)),
            right: Box::new(Self::build_node(right_items)),
            bbox: bounds,
        }
    }

    /// Closest-hit traversal.
    ///
    /// Returns true if any object is hit within `ray_t`, leaving the
    /// nearest hit in `rec`. Traversal counters are recorded in `stats`.
    pub fn hit(
        &self,
        objects: &[SceneObject],
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord,
        stats: &RenderStats,
    ) -> bool {
        Self::hit_node(&self.root, objects, ray, ray_t, rec, stats)
    }

    fn hit_node(
        node: &BvhNode,
        objects: &[SceneObject],
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord,
        stats: &RenderStats,
    ) -> bool {
        match node {
            BvhNode::Empty => false,

            BvhNode::Leaf {
                objects: indices,
                bbox,
            } => {
                if !bbox.hit(ray, ray_t) {
                    stats.aabb_misses.fetch_add(1, Ordering::Relaxed);
                    return false;
                }

                let mut hit_anything = false;
                let mut closest = ray_t.max;

                for &index in indices {
                    let interval = Interval::new(ray_t.min, closest);
                    if objects[index].geometry.hit(ray, interval, rec) {
                        stats.primitive_hits.fetch_add(1, Ordering::Relaxed);
                        rec.object = index;
                        hit_anything = true;
                        closest = rec.t;
                    } else {
                        stats.primitive_misses.fetch_add(1, Ordering::Relaxed);
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    stats.aabb_misses.fetch_add(1, Ordering::Relaxed);
                    return false;
                }

                // Visit the geometrically nearer child first so the second
                // child's box test can be short-circuited by a close hit.
                let d_left = left.bbox().hit_distance(ray, ray_t);
                let d_right = right.bbox().hit_distance(ray, ray_t);
                let (first, second) =
                    if d_left.unwrap_or(f32::INFINITY) <= d_right.unwrap_or(f32::INFINITY) {
                        (left, right)
                    } else {
                        (right, left)
                    };

                let hit_first = Self::hit_node(first, objects, ray, ray_t, rec, stats);

                // Only check the farther child up to the closest hit so far
                let second_max = if hit_first { rec.t } else { ray_t.max };
                let hit_second = Self::hit_node(
                    second,
                    objects,
                    ray,
                    Interval::new(ray_t.min, second_max),
                    rec,
                    stats,
                );

                hit_first || hit_second
            }
        }
    }

    /// Any-hit traversal for occlusion/shadow queries.
    ///
    /// Returns true as soon as *any* object intersection is found, without
    /// building a hit record or comparing distances.
    pub fn hit_fast(
        &self,
        objects: &[SceneObject],
        ray: &Ray,
        ray_t: Interval,
        stats: &RenderStats,
    ) -> bool {
        Self::hit_fast_node(&self.root, objects, ray, ray_t, stats)
    }

    fn hit_fast_node(
        node: &BvhNode,
        objects: &[SceneObject],
        ray: &Ray,
        ray_t: Interval,
        stats: &RenderStats,
    ) -> bool {
        match node {
            BvhNode::Empty => false,

            BvhNode::Leaf {
                objects: indices,
                bbox,
            } => {
                if !bbox.hit(ray, ray_t) {
                    stats.aabb_misses.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                indices
                    .iter()
                    .any(|&index| objects[index].geometry.hit_fast(ray, ray_t))
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    stats.aabb_misses.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                Self::hit_fast_node(left, objects, ray, ray_t, stats)
                    || Self::hit_fast_node(right, objects, ray, ray_t, stats)
            }
        }
    }

    /// Bounding box of the whole scene.
    pub fn bounding_box(&self) -> Aabb {
        self.root.bbox()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Color, Lambertian};
    use crate::plane::Plane;
    use crate::scene::SceneObject;
    use crate::sphere::Sphere;
    use lux_math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn sphere_object(name: &str, center: Vec3, radius: f32) -> SceneObject {
        SceneObject {
            name: name.to_string(),
            geometry: Box::new(Sphere::new(center, radius)),
            material: Arc::new(Lambertian::new(Color::ONE)),
        }
    }

    fn scatter_spheres(count: usize, seed: u64) -> Vec<SceneObject> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                let center = Vec3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                );
                sphere_object(&format!("sphere_{i}"), center, rng.gen_range(0.2..1.5))
            })
            .collect()
    }

    /// Linear scan over all objects, the reference for BVH traversal.
    fn brute_force_hit(
        objects: &[SceneObject],
        ray: &Ray,
        ray_t: Interval,
        rec: &mut HitRecord,
    ) -> bool {
        let mut hit_anything = false;
        let mut closest = ray_t.max;
        for (index, obj) in objects.iter().enumerate() {
            let interval = Interval::new(ray_t.min, closest);
            if obj.geometry.hit(ray, interval, rec) {
                rec.object = index;
                hit_anything = true;
                closest = rec.t;
            }
        }
        hit_anything
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[]);
        assert!(matches!(bvh.root, BvhNode::Empty));

        let stats = RenderStats::new(1);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        let mut rec = HitRecord::default();
        assert!(!bvh.hit(&[], &ray, Interval::new(0.001, f32::INFINITY), &mut rec, &stats));
    }

    #[test]
    fn test_bvh_single_sphere() {
        let objects = vec![sphere_object("only", Vec3::new(0.0, 0.0, -1.0), 0.5)];
        let bvh = Bvh::build(&objects);
        assert!(matches!(bvh.root, BvhNode::Leaf { .. }));

        let stats = RenderStats::new(1);
        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&objects, &ray, Interval::new(0.001, f32::INFINITY), &mut rec, &stats));
        assert_eq!(rec.object, 0);
        assert!((rec.t - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_bvh_matches_brute_force() {
        let objects = scatter_spheres(30, 0xBEEF);
        let bvh = Bvh::build(&objects);
        let stats = RenderStats::new(1);
        let mut rng = StdRng::seed_from_u64(0xCAFE);
        let interval = Interval::new(0.001, f32::INFINITY);

        for _ in 0..1000 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if dir.length_squared() < 1e-6 {
                continue;
            }
            let ray = Ray::new(origin, dir);

            let mut bvh_rec = HitRecord::default();
            let mut brute_rec = HitRecord::default();
            let bvh_hit = bvh.hit(&objects, &ray, interval, &mut bvh_rec, &stats);
            let brute_hit = brute_force_hit(&objects, &ray, interval, &mut brute_rec);

            assert_eq!(bvh_hit, brute_hit, "hit disagreement for {ray:?}");
            if bvh_hit {
                assert!(
                    (bvh_rec.t - brute_rec.t).abs() < 1e-4,
                    "k disagreement: {} vs {}",
                    bvh_rec.t,
                    brute_rec.t
                );
                assert_eq!(bvh_rec.object, brute_rec.object);
            }
        }
    }

    #[test]
    fn test_bvh_hit_fast_agrees_with_hit() {
        let objects = scatter_spheres(20, 42);
        let bvh = Bvh::build(&objects);
        let stats = RenderStats::new(1);
        let mut rng = StdRng::seed_from_u64(43);
        let interval = Interval::new(0.001, f32::INFINITY);

        for _ in 0..200 {
            let origin = Vec3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
            );
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if dir.length_squared() < 1e-6 {
                continue;
            }
            let ray = Ray::new(origin, dir);

            let mut rec = HitRecord::default();
            let closest = bvh.hit(&objects, &ray, interval, &mut rec, &stats);
            let fast = bvh.hit_fast(&objects, &ray, interval, &stats);
            assert_eq!(closest, fast);
        }
    }

    #[test]
    fn test_bvh_with_unbounded_plane() {
        let mut objects = scatter_spheres(5, 7);
        objects.push(SceneObject {
            name: "ground".to_string(),
            geometry: Box::new(Plane::new(Vec3::new(0.0, -20.0, 0.0), Vec3::Y)),
            material: Arc::new(Lambertian::new(Color::ONE)),
        });
        let bvh = Bvh::build(&objects);
        let stats = RenderStats::new(1);

        // Straight down from far above everything: must reach the plane
        let ray = Ray::new(Vec3::new(100.0, 50.0, 100.0), -Vec3::Y);
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&objects, &ray, Interval::new(0.001, f32::INFINITY), &mut rec, &stats));
        assert_eq!(objects[rec.object].name, "ground");
        assert!((rec.t - 70.0).abs() < 1e-3);
    }

    #[test]
    fn test_bvh_root_encompasses_children() {
        let objects = scatter_spheres(16, 99);
        let bvh = Bvh::build(&objects);
        let root_box = bvh.bounding_box();

        for obj in &objects {
            let bbox = obj.geometry.bounding_box();
            for axis in 0..3 {
                assert!(root_box.axis_interval(axis).min <= bbox.axis_interval(axis).min);
                assert!(root_box.axis_interval(axis).max >= bbox.axis_interval(axis).max);
            }
        }
    }
}
