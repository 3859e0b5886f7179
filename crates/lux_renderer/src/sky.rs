//! Sky/background radiance for rays that escape the scene.

use crate::material::Color;
use lux_math::Ray;

/// Background radiance evaluated for sky rays.
pub trait Sky: Send + Sync {
    /// Colour seen along a ray that hit nothing.
    fn sky_colour(&self, ray: &Ray) -> Color;
}

/// Vertical white-to-tint gradient sky.
pub struct GradientSky {
    horizon: Color,
    zenith: Color,
}

impl GradientSky {
    pub fn new(horizon: Color, zenith: Color) -> Self {
        Self { horizon, zenith }
    }

    /// The classic white-to-blue daylight gradient.
    pub fn daylight() -> Self {
        Self {
            horizon: Color::new(1.0, 1.0, 1.0),
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }
}

impl Sky for GradientSky {
    fn sky_colour(&self, ray: &Ray) -> Color {
        let a = 0.5 * (ray.direction().y + 1.0);
        self.horizon * (1.0 - a) + self.zenith * a
    }
}

/// Uniform background colour.
pub struct ConstantSky {
    colour: Color,
}

impl ConstantSky {
    pub fn new(colour: Color) -> Self {
        Self { colour }
    }

    /// A black background (no environment light).
    pub fn black() -> Self {
        Self::new(Color::ZERO)
    }
}

impl Sky for ConstantSky {
    fn sky_colour(&self, _ray: &Ray) -> Color {
        self.colour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lux_math::Vec3;

    #[test]
    fn test_gradient_sky() {
        let sky = GradientSky::daylight();

        // Ray pointing up should be more blue (less red than white)
        let up = sky.sky_colour(&Ray::new(Vec3::ZERO, Vec3::Y));
        // Ray pointing down should be closer to white
        let down = sky.sky_colour(&Ray::new(Vec3::ZERO, -Vec3::Y));

        assert!(up.x < down.x, "up {} should be < down {}", up.x, down.x);
    }

    #[test]
    fn test_constant_sky_ignores_direction() {
        let sky = ConstantSky::new(Color::new(0.2, 0.4, 0.6));
        let a = sky.sky_colour(&Ray::new(Vec3::ZERO, Vec3::Y));
        let b = sky.sky_colour(&Ray::new(Vec3::ZERO, Vec3::new(1.0, -2.0, 0.5)));
        assert_eq!(a, b);
    }
}
