//! Progressive path tracer example.
//!
//! Renders a small sphere scene over several passes and saves a PNG.

use anyhow::Context;
use lux_renderer::{
    Camera, CameraConfig, Color, Emissive, GradientSky, Lambertian, Metal, Plane,
    PointLight, RenderJob, RenderOptions, Scene, Sphere, Vec3,
};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let scene = build_scene()?;
    let options = RenderOptions::default()
        .with_resolution(800, 450)
        .with_passes(32)
        .with_max_bounce_depth(10)
        .with_concurrency(8)
        .with_seed(42);

    let job = RenderJob::new(scene, options)?;
    println!(
        "Rendering {}x{} over {} passes...",
        job.options().width,
        job.options().height,
        job.options().passes
    );

    job.start();
    job.wait();

    let stats = job.stats();
    println!("Rendered in {:?}", job.elapsed());
    println!(
        "{} rays cast, {} scattered, {} absorbed, {} reached the sky",
        stats.rays_cast, stats.rays_scattered, stats.rays_absorbed, stats.sky_rays
    );
    println!(
        "BVH: {} primitive hits, {} primitive misses, {} box misses",
        stats.primitive_hits, stats.primitive_misses, stats.aabb_misses
    );

    let fb = job.framebuffer();
    let image = image::RgbaImage::from_raw(fb.width(), fb.height(), fb.to_rgba())
        .context("framebuffer size mismatch")?;
    image.save("output.png").context("failed to save image")?;
    println!("Saved to output.png");

    Ok(())
}

fn build_scene() -> anyhow::Result<Scene> {
    let config = CameraConfig::default()
        .with_position(
            Vec3::new(13.0, 2.0, 3.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .with_lens(20.0, 0.1, 10.0)
        .with_aspect_ratio(800.0 / 450.0);
    let camera = Camera::new(&config)?;

    let mut scene = Scene::new(camera).with_sky(Box::new(GradientSky::daylight()));

    // Ground
    scene.add_object(
        "ground",
        Box::new(Plane::new(Vec3::ZERO, Vec3::Y)),
        Arc::new(Lambertian::new(Color::new(0.5, 0.5, 0.5))),
    );

    scene.add_object(
        "matte",
        Box::new(Sphere::new(Vec3::new(-4.0, 1.0, 0.0), 1.0)),
        Arc::new(Lambertian::new(Color::new(0.4, 0.2, 0.1))),
    );
    scene.add_object(
        "mirror",
        Box::new(Sphere::new(Vec3::new(4.0, 1.0, 0.0), 1.0)),
        Arc::new(Metal::new(Color::new(0.7, 0.6, 0.5), 0.0)),
    );
    scene.add_object(
        "lamp",
        Box::new(Sphere::new(Vec3::new(0.0, 1.0, 0.0), 1.0)),
        Arc::new(Emissive::new(Color::new(4.0, 3.6, 3.2))),
    );

    scene.add_light(Box::new(PointLight::new(
        Vec3::new(0.0, 8.0, 4.0),
        Color::new(1.0, 0.95, 0.9),
        40.0,
    )));


    Ok(scene)
}
