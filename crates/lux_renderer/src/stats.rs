//! Thread-safe render statistics.
//!
//! Counters are written concurrently by every pixel task and read live by
//! observers (UI previews, telemetry), so everything hot is a relaxed
//! atomic. The per-object fault histogram is cold-path (a well-formed scene
//! never touches it) and sits behind a mutex.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Kinds of per-hit correctness violations.
///
/// These are corrected (or the hit discarded) and counted, never raised as
/// errors from the intersection hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitFault {
    /// Geometry reported a normal that was not unit length
    NonUnitNormal,
    /// Geometry reported UV coordinates outside [0, 1]^2
    UvOutOfRange,
    /// Geometry reported a hit distance outside the query interval
    KOutOfRange,
}

/// Mutable, concurrently-updated render statistics.
///
/// Created alongside a render job, live-read while it runs, and effectively
/// frozen once the job completes.
pub struct RenderStats {
    /// Completed pixel tasks across all passes
    pub pixels_rendered: AtomicU64,
    /// Fully completed passes (an abandoned pass is not counted)
    pub passes_rendered: AtomicU64,
    /// Rays cast by the integrator (camera rays and bounces)
    pub rays_cast: AtomicU64,
    /// Rays a material chose to scatter onward
    pub rays_scattered: AtomicU64,
    /// Rays a material absorbed
    pub rays_absorbed: AtomicU64,
    /// Rays that escaped the scene to the sky
    pub sky_rays: AtomicU64,
    /// Paths cut off by the bounce depth limit
    pub bounce_limit_exceeded: AtomicU64,
    /// BVH node boxes that pruned a subtree
    pub aabb_misses: AtomicU64,
    /// Primitive intersection tests that hit
    pub primitive_hits: AtomicU64,
    /// Primitive intersection tests that missed
    pub primitive_misses: AtomicU64,
    /// Pixel tasks currently executing (gauge)
    pub threads_running: AtomicUsize,

    depth_histogram: Vec<AtomicU64>,
    faults: Mutex<HashMap<(usize, HitFault), u64>>,
}

impl RenderStats {
    /// Create statistics for a job with the given maximum bounce depth.
    pub fn new(max_bounce_depth: u32) -> Self {
        let buckets = max_bounce_depth as usize + 1;
        Self {
            pixels_rendered: AtomicU64::new(0),
            passes_rendered: AtomicU64::new(0),
            rays_cast: AtomicU64::new(0),
            rays_scattered: AtomicU64::new(0),
            rays_absorbed: AtomicU64::new(0),
            sky_rays: AtomicU64::new(0),
            bounce_limit_exceeded: AtomicU64::new(0),
            aabb_misses: AtomicU64::new(0),
            primitive_hits: AtomicU64::new(0),
            primitive_misses: AtomicU64::new(0),
            threads_running: AtomicUsize::new(0),
            depth_histogram: (0..buckets).map(|_| AtomicU64::new(0)).collect(),
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Record the terminal bounce depth of one completed path.
    pub fn record_depth(&self, depth: usize) {
        // Clamp into the last bucket rather than lose the sample
        let bucket = depth.min(self.depth_histogram.len() - 1);
        self.depth_histogram[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Record a per-hit fault against a scene object.
    ///
    /// Returns the updated occurrence count so callers can log only the
    /// first occurrence per (object, fault) pair.
    pub fn record_fault(&self, object: usize, fault: HitFault) -> u64 {
        let mut faults = self.faults.lock().unwrap_or_else(|e| e.into_inner());
        let count = faults.entry((object, fault)).or_insert(0);
        *count += 1;
        *count
    }

    /// Take a consistent-enough snapshot for observers.
    ///
    /// Individual counters are loaded independently, so totals may be
    /// mid-update relative to each other while the job is running.
    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            pixels_rendered: self.pixels_rendered.load(Ordering::Relaxed),
            passes_rendered: self.passes_rendered.load(Ordering::Relaxed),
            rays_cast: self.rays_cast.load(Ordering::Relaxed),
            rays_scattered: self.rays_scattered.load(Ordering::Relaxed),
            rays_absorbed: self.rays_absorbed.load(Ordering::Relaxed),
            sky_rays: self.sky_rays.load(Ordering::Relaxed),
            bounce_limit_exceeded: self.bounce_limit_exceeded.load(Ordering::Relaxed),
            aabb_misses: self.aabb_misses.load(Ordering::Relaxed),
            primitive_hits: self.primitive_hits.load(Ordering::Relaxed),
            primitive_misses: self.primitive_misses.load(Ordering::Relaxed),
            threads_running: self.threads_running.load(Ordering::Relaxed),
            depth_histogram: self
                .depth_histogram
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            faults: self
                .faults
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

/// Plain-data view of [`RenderStats`] at one point in time.
#[derive(Debug, Clone)]
pub struct RenderStatsSnapshot {
    pub pixels_rendered: u64,
    pub passes_rendered: u64,
    pub rays_cast: u64,
    pub rays_scattered: u64,
    pub rays_absorbed: u64,
    pub sky_rays: u64,
    pub bounce_limit_exceeded: u64,
    pub aabb_misses: u64,
    pub primitive_hits: u64,
    pub primitive_misses: u64,
    pub threads_running: usize,
    /// Occurrences per terminal bounce depth, `max_bounce_depth + 1` buckets
    pub depth_histogram: Vec<u64>,
    /// Per-hit fault occurrences keyed by (object index, fault kind)
    pub faults: HashMap<(usize, HitFault), u64>,
}
