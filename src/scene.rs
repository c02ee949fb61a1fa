//! Scene access for the trace engine.
//!
//! The engine only ever asks a scene two things: "what is the nearest
//! surface along this ray" and "which lights exist". [`SceneQuery`] is that
//! seam; [`Scene`] is the in-memory implementation used by the binary and
//! the tests.

use glam::Vec3A;
use serde::{Deserialize, Serialize};

use crate::hittable::{Hittable, HittableList, SurfaceSample};
use crate::interval::Interval;
use crate::material::{Color, Material, Texture};
use crate::plane::Plane;
use crate::random::SceneRng;
use crate::ray::Ray;
use crate::sphere::Sphere;

/// Point light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// World position.
    pub position: Vec3A,
    /// Light color.
    pub color: Color,
    /// Scalar intensity multiplier.
    pub intensity: f32,
    /// Distance beyond which the light contributes nothing.
    pub range: f32,
    /// Whether shadow rays are cast toward this light.
    pub casts_shadows: bool,
}

impl Light {
    /// White shadow-casting light with unit intensity and unlimited range.
    pub fn point(position: Vec3A) -> Self {
        Self {
            position,
            color: Color::ONE,
            intensity: 1.0,
            range: f32::INFINITY,
            casts_shadows: true,
        }
    }

    /// Linear falloff `clamp((range - distance) / range, 0, 1)`.
    pub fn falloff(&self, distance: f32) -> f32 {
        if self.range.is_infinite() {
            1.0
        } else if self.range <= 0.0 {
            0.0
        } else {
            ((self.range - distance) / self.range).clamp(0.0, 1.0)
        }
    }

    /// True if a point at `distance` is lit by this light at all.
    pub fn reaches(&self, distance: f32) -> bool {
        distance < self.range
    }
}

/// Nearest-hit queries and light enumeration.
///
/// Implementations must be deterministic for a static scene and safe to
/// query from several threads.
pub trait SceneQuery: Sync + Send {
    /// Nearest surface along `ray` closer than `max_distance`.
    fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceSample>;

    /// Snapshot of the lights, taken once per render pass.
    fn lights(&self) -> Vec<Light>;
}

/// Objects plus lights.
#[derive(Default)]
pub struct Scene {
    /// Geometry.
    pub objects: HittableList,
    /// Light sources.
    pub lights: Vec<Light>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object.
    pub fn add(&mut self, object: impl Hittable + 'static) -> &mut Self {
        self.objects.add(Box::new(object));
        self
    }

    /// Add a light.
    pub fn add_light(&mut self, light: Light) -> &mut Self {
        self.lights.push(light);
        self
    }

    /// Demo scene: checkered floor, a red diffuse sphere, a mirror, a glass
    /// sphere, and small spheres scattered by `seed`.
    pub fn demo(seed: u64) -> Self {
        let mut scene = Scene::new();
        let mut rng = SceneRng::seeded(seed);

        let floor = Material::diffuse(Color::new(0.8, 0.8, 0.8)).with_texture(Texture::Checker {
            odd: Color::new(0.2, 0.2, 0.25),
            odd_alpha: 1.0,
            scale: 1.0,
        });
        scene.add(Plane::new(Vec3A::ZERO, Vec3A::Y, floor));

        scene.add(Sphere::new(
            Vec3A::new(-2.2, 1.0, 0.0),
            1.0,
            Material::diffuse(Color::new(0.9, 0.15, 0.1)),
        ));
        scene.add(Sphere::new(
            Vec3A::new(0.0, 1.0, -1.0),
            1.0,
            Material::mirror(Color::new(0.7, 0.7, 0.75), 0.8),
        ));
        scene.add(Sphere::new(
            Vec3A::new(2.2, 1.0, 0.0),
            1.0,
            Material::glass(Color::new(0.6, 0.8, 1.0), 0.3, 0.5),
        ));

        for a in -4..4 {
            for b in -2..3 {
                let center = Vec3A::new(
                    a as f32 * 1.3 + 0.6 * rng.f32(),
                    0.25,
                    b as f32 * 1.3 + 0.6 * rng.f32(),
                );
                // Keep clear of the feature spheres
                let blocked = [-2.2_f32, 0.0, 2.2].iter().any(|&x| {
                    (center - Vec3A::new(x, 0.25, if x == 0.0 { -1.0 } else { 0.0 })).length() < 1.4
                });
                if blocked {
                    continue;
                }
                let material = if rng.f32() < 0.75 {
                    Material::diffuse(rng.color_range(0.1, 0.9))
                } else {
                    Material::mirror(rng.color_range(0.5, 1.0), rng.f32_range(0.3, 0.9))
                };
                scene.add(Sphere::new(center, 0.25, material));
            }
        }

        scene.add_light(Light {
            position: Vec3A::new(-4.0, 8.0, 6.0),
            color: Color::new(1.0, 0.95, 0.9),
            intensity: 1.0,
            range: 40.0,
            casts_shadows: true,
        });
        scene.add_light(Light {
            position: Vec3A::new(5.0, 5.0, 2.0),
            color: Color::new(0.4, 0.5, 0.8),
            intensity: 0.6,
            range: 25.0,
            casts_shadows: true,
        });
        scene
    }
}

impl SceneQuery for Scene {
    fn intersect(&self, ray: &Ray, max_distance: f32) -> Option<SurfaceSample> {
        self.objects.hit(ray, Interval::up_to(max_distance))
    }

    fn lights(&self) -> Vec<Light> {
        self.lights.clone()
    }
}
