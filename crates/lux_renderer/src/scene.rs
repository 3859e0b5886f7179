//! Scene aggregate: camera, named objects, lights, and sky.

use crate::camera::Camera;
use crate::hittable::Hittable;
use crate::light::Light;
use crate::material::Material;
use crate::sky::{ConstantSky, Sky};
use std::sync::Arc;

/// A named association between geometry and how it looks.
pub struct SceneObject {
    pub name: String,
    pub geometry: Box<dyn Hittable>,
    pub material: Arc<dyn Material>,
}

/// Everything a render job needs: camera, objects, lights, and sky.
pub struct Scene {
    pub camera: Camera,
    pub objects: Vec<SceneObject>,
    pub lights: Vec<Box<dyn Light>>,
    pub sky: Box<dyn Sky>,
}

impl Scene {
    /// Create an empty scene with a black sky.
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            objects: Vec::new(),
            lights: Vec::new(),
            sky: Box::new(ConstantSky::black()),
        }
    }

    /// Add a named object to the scene.
    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        geometry: Box<dyn Hittable>,
        material: Arc<dyn Material>,
    ) {
        self.objects.push(SceneObject {
            name: name.into(),
            geometry,
            material,
        });
    }

    /// Add a light to the scene.
    pub fn add_light(&mut self, light: Box<dyn Light>) {
        self.lights.push(light);
    }

    /// Replace the sky.
    pub fn with_sky(mut self, sky: Box<dyn Sky>) -> Self {
        self.sky = sky;
        self
    }

    /// Number of objects in the scene.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
