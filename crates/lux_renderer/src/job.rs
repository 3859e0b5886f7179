//! Progressive render job: one-shot start, multi-pass parallel scheduling,
//! cooperative cancellation.
//!
//! A pass renders every pixel once; passes run strictly sequentially while
//! pixels within a pass run on a bounded rayon pool. Pixel exclusivity
//! comes from `par_iter_mut` over the accumulation entries, so no locking
//! is needed on the image path.

use crate::buffers::{accumulate_and_display, AccumulationBuffers, Framebuffer};
use crate::bvh::Bvh;
use crate::error::RenderResult;
use crate::hittable::HitRecord;
use crate::integrator::{trace, PathVertex, RenderContext};
use crate::options::RenderOptions;
use crate::scene::Scene;
use crate::stats::{RenderStats, RenderStatsSnapshot};
use lux_math::Ray;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const STATE_NOT_STARTED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_COMPLETED: u8 = 2;
const STATE_CANCELLED: u8 = 3;

/// Lifecycle of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    NotStarted,
    Running,
    Completed,
    Cancelled,
}

impl JobState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_NOT_STARTED => JobState::NotStarted,
            STATE_RUNNING => JobState::Running,
            STATE_COMPLETED => JobState::Completed,
            _ => JobState::Cancelled,
        }
    }
}

#[derive(Default)]
struct Timing {
    started: Option<Instant>,
    total: Option<Duration>,
}

/// A configured render of one scene.
///
/// Construction validates the options, builds the BVH, and allocates all
/// buffers; nothing renders until [`RenderJob::start`]. The job can be
/// started exactly once.
pub struct RenderJob {
    scene: Arc<Scene>,
    options: RenderOptions,
    bvh: Arc<Bvh>,
    stats: Arc<RenderStats>,
    framebuffer: Arc<Framebuffer>,
    pool: Arc<rayon::ThreadPool>,
    state: Arc<AtomicU8>,
    cancel: Arc<AtomicBool>,
    buffers: Mutex<Option<AccumulationBuffers>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    timing: Arc<Mutex<Timing>>,
}

impl RenderJob {
    /// Create a job for the given scene and options.
    ///
    /// Fails synchronously on invalid options or an unbuildable thread
    /// pool, before any rendering starts.
    pub fn new(scene: Scene, options: RenderOptions) -> RenderResult<Self> {
        options.validate()?;

        let bvh = Bvh::build(&scene.objects);
        log::info!(
            "render job created: {}x{}, {} objects, concurrency {}",
            options.width,
            options.height,
            scene.object_count(),
            options.concurrency
        );

        let buffers = AccumulationBuffers::new(options.width, options.height);
        let framebuffer = buffers.framebuffer();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency)
            .build()?;

        Ok(Self {
            scene: Arc::new(scene),
            stats: Arc::new(RenderStats::new(options.max_bounce_depth)),
            bvh: Arc::new(bvh),
            framebuffer,
            pool: Arc::new(pool),
            state: Arc::new(AtomicU8::new(STATE_NOT_STARTED)),
            cancel: Arc::new(AtomicBool::new(false)),
            buffers: Mutex::new(Some(buffers)),
            worker: Mutex::new(None),
            timing: Arc::new(Mutex::new(Timing::default())),
            options,
        })
    }

    /// Start rendering on a background worker.
    ///
    /// One-shot: only the first call transitions NotStarted -> Running;
    /// later calls log a warning and do nothing.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(
                STATE_NOT_STARTED,
                STATE_RUNNING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            log::warn!("render job already started, ignoring start request");
            return;
        }

        // The state claim above guarantees the buffers are still present
        let buffers = self
            .buffers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(buffers) = buffers else {
            return;
        };

        self.timing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .started = Some(Instant::now());

        let scene = Arc::clone(&self.scene);
        let options = self.options.clone();
        let bvh = Arc::clone(&self.bvh);
        let stats = Arc::clone(&self.stats);
        let pool = Arc::clone(&self.pool);
        let state = Arc::clone(&self.state);
        let cancel = Arc::clone(&self.cancel);
        let timing = Arc::clone(&self.timing);

        let handle = std::thread::spawn(move || {
            render_loop(scene, options, bvh, stats, buffers, pool, cancel, state);
            let mut timing = timing.lock().unwrap_or_else(|e| e.into_inner());
            timing.total = timing.started.map(|s| s.elapsed());
        });
        *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Request cooperative cancellation.
    ///
    /// In-flight pixel tasks finish normally; the current pass is abandoned
    /// at the next opportunity and the job transitions to Cancelled.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        log::info!("render cancellation requested");
    }

    /// Block until the worker finishes (completed or cancelled).
    pub fn wait(&self) {
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("render worker panicked");
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True once the job has completed or been cancelled.
    pub fn is_complete(&self) -> bool {
        matches!(self.state(), JobState::Completed | JobState::Cancelled)
    }

    /// Wall-clock render time: running total while rendering, final once done.
    pub fn elapsed(&self) -> Duration {
        let timing = self.timing.lock().unwrap_or_else(|e| e.into_inner());
        match (timing.total, timing.started) {
            (Some(total), _) => total,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Snapshot of the live render statistics.
    pub fn stats(&self) -> RenderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Handle to the progressively refined display image.
    pub fn framebuffer(&self) -> Arc<Framebuffer> {
        Arc::clone(&self.framebuffer)
    }

    /// The job's validated options.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// The scene being rendered.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Closest-hit query against the job's BVH, for lights and materials.
    pub fn try_find_closest_hit(&self, ray: &Ray, k_min: f32, k_max: f32) -> Option<HitRecord> {
        self.context().try_find_closest_hit(ray, k_min, k_max)
    }

    /// Any-hit occlusion query against the job's BVH.
    pub fn any_intersection_fast(&self, ray: &Ray, k_min: f32, k_max: f32) -> bool {
        self.context().any_intersection_fast(ray, k_min, k_max)
    }

    fn context(&self) -> RenderContext<'_> {
        RenderContext::new(&self.scene, &self.bvh, &self.options, &self.stats)
    }
}

/// Deterministic per-pixel RNG stream: mixes the base seed with the pass
/// and pixel indices so reruns reproduce exactly.
fn pixel_seed(seed: u64, pass: u64, index: usize) -> u64 {
    let mut h = seed
        ^ pass.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (index as u64).wrapping_mul(0xD1B5_4A32_D192_ED03);
    h ^= h >> 33;
    h = h.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    h ^= h >> 33;
    h
}

#[allow(clippy::too_many_arguments)]
fn render_loop(
    scene: Arc<Scene>,
    options: RenderOptions,
    bvh: Arc<Bvh>,
    stats: Arc<RenderStats>,
    mut buffers: AccumulationBuffers,
    pool: Arc<rayon::ThreadPool>,
    cancel: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
) {
    let width = options.width;
    let height = options.height;
    let framebuffer = buffers.framebuffer();
    let scratch_capacity = options.max_bounce_depth as usize + 1;

    log::info!("render started: {} passes", if options.infinite_passes {
        "unbounded".to_string()
    } else {
        options.passes.to_string()
    });

    let mut pass: u64 = 0;
    loop {
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        if !options.infinite_passes && pass >= options.passes as u64 {
            break;
        }

        let scene_ref: &Scene = &scene;
        let bvh_ref: &Bvh = &bvh;
        let stats_ref: &RenderStats = &stats;
        let options_ref: &RenderOptions = &options;
        let framebuffer_ref: &Framebuffer = &framebuffer;
        let cancel_ref: &AtomicBool = &cancel;

        pool.install(|| {
            buffers.pixels.par_iter_mut().enumerate().for_each_init(
                || Vec::<PathVertex>::with_capacity(scratch_capacity),
                |scratch, (index, pixel)| {
                    // Skipped tasks leave the pass incomplete; it will not
                    // be counted below.
                    if cancel_ref.load(Ordering::Relaxed) {
                        return;
                    }

                    stats_ref.threads_running.fetch_add(1, Ordering::Relaxed);

                    let x = index as u32 % width;
                    let image_row = index as u32 / width;
                    // Camera space has row 0 at the bottom
                    let y = height - 1 - image_row;

                    let mut rng =
                        SmallRng::seed_from_u64(pixel_seed(options_ref.seed, pass, index));

                    // Jitter up to half a pixel for antialiasing
                    let ju = rng.gen::<f32>() - 0.5;
                    let jv = rng.gen::<f32>() - 0.5;
                    let s = (x as f32 + 0.5 + ju) / width as f32;
                    let t = (y as f32 + 0.5 + jv) / height as f32;

                    let ray = scene_ref.camera.get_ray(s, t, &mut rng);
                    let ctx = RenderContext::new(scene_ref, bvh_ref, options_ref, stats_ref);
                    let colour = trace(&ctx, ray, scratch, &mut rng);

                    accumulate_and_display(pixel, framebuffer_ref, index, colour);

                    stats_ref.pixels_rendered.fetch_add(1, Ordering::Relaxed);
                    stats_ref.threads_running.fetch_sub(1, Ordering::Relaxed);
                },
            );
        });

        // A pass interrupted by cancellation is abandoned, not counted
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        stats.passes_rendered.fetch_add(1, Ordering::Relaxed);
        pass += 1;
        log::debug!("pass {} complete", pass);
    }

    let cancelled = cancel.load(Ordering::SeqCst);
    state.store(
        if cancelled {
            STATE_CANCELLED
        } else {
            STATE_COMPLETED
        },
        Ordering::SeqCst,
    );
    log::info!(
        "render {}: {} passes, {} rays",
        if cancelled { "cancelled" } else { "completed" },
        stats.passes_rendered.load(Ordering::Relaxed),
        stats.rays_cast.load(Ordering::Relaxed)
    );
}
