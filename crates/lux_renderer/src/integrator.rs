//! Path integrator: forward bounce walk + reverse colour composition.
//!
//! A material's outgoing colour at hit N depends on the colour arriving
//! from hit N+1, so colour cannot be finalized until the whole forward
//! chain is known. The walk is iterative rather than recursive: recorded
//! hits go into a reusable scratch buffer, keeping stack depth constant
//! and avoiding per-sample allocation.

use crate::bvh::Bvh;
use crate::hittable::HitRecord;
use crate::material::Color;
use crate::options::RenderOptions;
use crate::scene::Scene;
use crate::stats::{HitFault, RenderStats};
use lux_math::{Interval, Ray};
use rand::RngCore;
use std::sync::atomic::Ordering;

/// One recorded surface interaction on the forward walk.
#[derive(Debug, Clone, Copy)]
pub struct PathVertex {
    /// The validated hit record
    pub hit: HitRecord,
    /// The ray that produced the hit
    pub ray: Ray,
}

/// How a forward walk ended.
enum Terminal {
    /// The ray escaped the scene; holds the escaping ray for sky lookup
    Sky(Ray),
    /// A material absorbed the ray
    Absorbed,
    /// The bounce depth limit cut the path off
    LimitReached,
}

/// Borrowed view of everything the integrator, materials, and lights need
/// to query the scene.
///
/// Passing this explicitly keeps the dependency visible in signatures
/// instead of hiding it in late-bound mutable state.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub scene: &'a Scene,
    pub bvh: &'a Bvh,
    pub options: &'a RenderOptions,
    pub stats: &'a RenderStats,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        scene: &'a Scene,
        bvh: &'a Bvh,
        options: &'a RenderOptions,
        stats: &'a RenderStats,
    ) -> Self {
        Self {
            scene,
            bvh,
            options,
            stats,
        }
    }

    /// Find the closest hit along a ray, validated and corrected.
    ///
    /// Hits that violate the geometry contract (non-unit normal, UV outside
    /// [0,1]^2, k outside the query range) are corrected or discarded and
    /// counted in the fault histogram; nothing is raised from the hot path.
    pub fn try_find_closest_hit(&self, ray: &Ray, k_min: f32, k_max: f32) -> Option<HitRecord> {
        let mut rec = HitRecord::default();
        let interval = Interval::new(k_min, k_max);
        if !self
            .bvh
            .hit(&self.scene.objects, ray, interval, &mut rec, self.stats)
        {
            return None;
        }
        self.validate_record(&mut rec, k_min, k_max).then_some(rec)
    }

    /// Is anything at all blocking this ray within the range?
    pub fn any_intersection_fast(&self, ray: &Ray, k_min: f32, k_max: f32) -> bool {
        self.bvh.hit_fast(
            &self.scene.objects,
            ray,
            Interval::new(k_min, k_max),
            self.stats,
        )
    }

    /// Average direct-light contribution at a hit across all scene lights.
    pub fn direct_light(&self, hit: &HitRecord, rng: &mut dyn RngCore) -> Color {
        if self.scene.lights.is_empty() {
            return Color::ZERO;
        }

        let samples = self.options.light_samples.max(1);
        let mut total = Color::ZERO;
        for _ in 0..samples {
            for light in &self.scene.lights {
                total += light.calculate_light(hit, self, rng);
            }
        }
        total / samples as f32
    }

    /// Enforce hit-record invariants, counting violations per object.
    ///
    /// Returns false when the hit must be discarded (out-of-range k, or a
    /// normal too degenerate to renormalize).
    fn validate_record(&self, rec: &mut HitRecord, k_min: f32, k_max: f32) -> bool {
        let object = rec.object;

        if rec.t < k_min || rec.t > k_max {
            self.record_fault(object, HitFault::KOutOfRange);
            return false;
        }

        // NaN/infinite lengths must take the fault branch too, so the
        // comparison cannot be left to decide
        let len_sq = rec.normal.length_squared();
        if !len_sq.is_finite() || (len_sq - 1.0).abs() > 2e-4 {
            self.record_fault(object, HitFault::NonUnitNormal);
            if !len_sq.is_finite() || len_sq < 1e-12 {
                // Nothing salvageable here
                return false;
            }
            rec.normal /= len_sq.sqrt();
        }

        if !(0.0..=1.0).contains(&rec.u) || !(0.0..=1.0).contains(&rec.v) {
            self.record_fault(object, HitFault::UvOutOfRange);
            rec.u = rec.u.clamp(0.0, 1.0);
            rec.v = rec.v.clamp(0.0, 1.0);
        }

        true
    }

    fn record_fault(&self, object: usize, fault: HitFault) {
        // Warn once per (object, fault); afterwards only the histogram grows
        if self.stats.record_fault(object, fault) == 1 {
            let name = self
                .scene
                .objects
                .get(object)
                .map(|o| o.name.as_str())
                .unwrap_or("<unknown>");
            log::warn!("object '{}' produced an invalid hit: {:?}", name, fault);
        }
    }
}

/// Estimate the radiance arriving along a single camera ray.
///
/// `scratch` is a caller-owned buffer reused across samples; it is cleared
/// on entry and holds at most `max_bounce_depth + 1` vertices.
pub fn trace(
    ctx: &RenderContext,
    camera_ray: Ray,
    scratch: &mut Vec<PathVertex>,
    rng: &mut dyn RngCore,
) -> Color {
    scratch.clear();
    let options = ctx.options;
    let stats = ctx.stats;
    let max_depth = options.max_bounce_depth as usize;

    // Forward walk: record hits until absorption, escape, or depth limit.
    let mut ray = camera_ray;
    let terminal = loop {
        stats.rays_cast.fetch_add(1, Ordering::Relaxed);
        match ctx.try_find_closest_hit(&ray, options.k_min, options.k_max) {
            None => {
                stats.sky_rays.fetch_add(1, Ordering::Relaxed);
                break Terminal::Sky(ray);
            }
            Some(hit) => {
                let material = &ctx.scene.objects[hit.object].material;
                let scattered = material.scatter(&ray, &hit, rng);
                // A hit at the depth limit may still be absorbed, but its
                // scattered ray is never cast and does not count as a bounce.
                let at_limit = scratch.len() == max_depth;
                scratch.push(PathVertex { hit, ray });
                match scattered {
                    None => {
                        stats.rays_absorbed.fetch_add(1, Ordering::Relaxed);
                        break Terminal::Absorbed;
                    }
                    Some(_) if at_limit => {
                        stats.bounce_limit_exceeded.fetch_add(1, Ordering::Relaxed);
                        break Terminal::LimitReached;
                    }
                    Some(next) => {
                        stats.rays_scattered.fetch_add(1, Ordering::Relaxed);
                        ray = next;
                    }
                }
            }
        }
    };

    // Hit index == bounce number; a sky escape after n hits is bounce n.
    let depth = match &terminal {
        Terminal::Sky(_) => scratch.len(),
        Terminal::Absorbed | Terminal::LimitReached => scratch.len().saturating_sub(1),
    };
    stats.record_depth(depth);

    // Reverse walk: compose colour from the deepest hit back to the camera.
    let mut colour = match terminal {
        Terminal::Sky(escaped) => ctx.scene.sky.sky_colour(&escaped),
        Terminal::Absorbed | Terminal::LimitReached => Color::ZERO,
    };
    for vertex in scratch.iter().rev() {
        let material = &ctx.scene.objects[vertex.hit.object].material;
        colour = material.shade(colour, &vertex.ray, &vertex.hit, ctx, rng);
    }
    colour
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, CameraConfig};
    use crate::material::{Emissive, Lambertian, Material};
    use crate::sky::ConstantSky;
    use crate::sphere::Sphere;
    use lux_math::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Always bounces the ray back through the sphere's center, so every
    /// scattered ray is guaranteed to hit the shell again.
    struct AlwaysInward;

    impl Material for AlwaysInward {
        fn scatter(&self, _ray_in: &Ray, hit: &HitRecord, _rng: &mut dyn RngCore) -> Option<Ray> {
            Some(Ray::new(hit.point, -hit.point))
        }

        fn shade(
            &self,
            colour_so_far: Color,
            _ray_in: &Ray,
            _hit: &HitRecord,
            _ctx: &RenderContext,
            _rng: &mut dyn RngCore,
        ) -> Color {
            colour_so_far
        }
    }

    fn empty_scene() -> Scene {
        let camera = Camera::new(&CameraConfig::default()).unwrap();
        Scene::new(camera)
    }

    fn enclosing_sphere_scene(material: Arc<dyn Material>) -> Scene {
        let mut scene = empty_scene();
        scene.add_object("shell", Box::new(Sphere::new(Vec3::ZERO, 5.0)), material);
        scene
    }

    #[test]
    fn test_bounce_limit_is_enforced() {
        let scene = enclosing_sphere_scene(Arc::new(AlwaysInward));
        let bvh = Bvh::build(&scene.objects);
        let max_depth = 3;
        let options = RenderOptions::default().with_max_bounce_depth(max_depth);
        let stats = RenderStats::new(max_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scratch = Vec::new();

        // Camera ray from inside the shell: hits forever until the limit
        trace(&ctx, Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::X), &mut scratch, &mut rng);

        // No more than max_depth + 1 hits recorded
        assert_eq!(scratch.len(), max_depth as usize + 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.bounce_limit_exceeded, 1);
        assert_eq!(snapshot.rays_cast, max_depth as u64 + 1);
        // Only bounces actually taken count; the last hit's scatter result
        // is discarded at the limit
        assert_eq!(snapshot.rays_scattered, max_depth as u64);
        assert_eq!(snapshot.rays_absorbed, 0);
        assert_eq!(snapshot.sky_rays, 0);
        // Limit-exceeded paths land in the bucket of their last hit index
        assert_eq!(snapshot.depth_histogram[max_depth as usize], 1);
        assert!(snapshot.depth_histogram[..max_depth as usize]
            .iter()
            .all(|&count| count == 0));
    }

    #[test]
    fn test_sky_ray_with_no_hits() {
        let scene = empty_scene().with_sky(Box::new(ConstantSky::new(Color::new(0.1, 0.2, 0.3))));
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default();
        let stats = RenderStats::new(options.max_bounce_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scratch = Vec::new();

        let colour = trace(&ctx, Ray::new(Vec3::ZERO, Vec3::Z), &mut scratch, &mut rng);

        assert_eq!(colour, Color::new(0.1, 0.2, 0.3));
        assert!(scratch.is_empty());
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.sky_rays, 1);
        assert_eq!(snapshot.depth_histogram[0], 1);
    }

    #[test]
    fn test_absorption_at_first_hit() {
        let emission = Color::new(2.0, 1.0, 0.5);
        let scene = enclosing_sphere_scene(Arc::new(Emissive::new(emission)));
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default();
        let stats = RenderStats::new(options.max_bounce_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scratch = Vec::new();

        let colour = trace(&ctx, Ray::new(Vec3::ZERO, Vec3::X), &mut scratch, &mut rng);

        assert_eq!(colour, emission);
        assert_eq!(scratch.len(), 1);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rays_absorbed, 1);
        assert_eq!(snapshot.depth_histogram[0], 1);
    }

    #[test]
    fn test_reverse_composition_tints_sky() {
        // A lambertian shell around the camera: sky is never reached, the
        // path dies at the depth limit and composes to black.
        let scene = enclosing_sphere_scene(Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5))))
            .with_sky(Box::new(ConstantSky::new(Color::ONE)));
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default().with_max_bounce_depth(2);
        let stats = RenderStats::new(2);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scratch = Vec::new();

        let colour = trace(&ctx, Ray::new(Vec3::ZERO, Vec3::X), &mut scratch, &mut rng);

        // No lights and no escape: 0.5^n * 0 = 0
        assert_eq!(colour, Color::ZERO);
    }

    #[test]
    fn test_nan_normal_hit_is_discarded() {
        let scene = enclosing_sphere_scene(Arc::new(Emissive::new(Color::ONE)));
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default();
        let stats = RenderStats::new(options.max_bounce_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);

        let mut rec = HitRecord {
            normal: Vec3::new(f32::NAN, 0.0, 0.0),
            t: 1.0,
            ..HitRecord::default()
        };
        assert!(!ctx.validate_record(&mut rec, 0.001, f32::INFINITY));
        assert_eq!(
            stats.snapshot().faults[&(0, HitFault::NonUnitNormal)],
            1
        );
    }

    #[test]
    fn test_zero_radius_sphere_is_treated_as_a_miss() {
        // A through-center ray on a zero-radius sphere divides by zero in
        // the normal computation; the record must be discarded and counted,
        // not trusted.
        let mut scene = empty_scene();
        scene.add_object(
            "degenerate",
            Box::new(Sphere::new(Vec3::new(0.0, 0.0, -2.0), 0.0)),
            Arc::new(Emissive::new(Color::ONE)),
        );
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default();
        let stats = RenderStats::new(options.max_bounce_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        assert!(ctx.try_find_closest_hit(&ray, 0.001, f32::INFINITY).is_none());
        assert_eq!(
            stats.snapshot().faults[&(0, HitFault::NonUnitNormal)],
            1
        );
    }

    #[test]
    fn test_scratch_is_reused_across_samples() {
        let scene = enclosing_sphere_scene(Arc::new(Emissive::new(Color::ONE)));
        let bvh = Bvh::build(&scene.objects);
        let options = RenderOptions::default();
        let stats = RenderStats::new(options.max_bounce_depth);
        let ctx = RenderContext::new(&scene, &bvh, &options, &stats);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scratch = Vec::with_capacity(options.max_bounce_depth as usize + 1);

        trace(&ctx, Ray::new(Vec3::ZERO, Vec3::X), &mut scratch, &mut rng);
        let capacity = scratch.capacity();
        trace(&ctx, Ray::new(Vec3::ZERO, Vec3::Y), &mut scratch, &mut rng);

        // Cleared and refilled without growing
        assert_eq!(scratch.len(), 1);
        assert_eq!(scratch.capacity(), capacity);
    }
}
