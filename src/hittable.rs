//! Ray-object intersection system.
//!
//! Defines the [`Hittable`] trait for geometric primitives and
//! [`SurfaceSample`], the shading data returned for the nearest hit.

use glam::Vec3A;

use crate::interval::Interval;
use crate::material::{Color, Material};
use crate::ray::Ray;

/// Shading data for a ray-surface intersection.
///
/// Produced by scene queries and consumed by the trace engine; owned only
/// by the trace call that requested it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Point where the ray intersects the object
    pub point: Vec3A,
    /// Unit surface normal, facing against the incident ray
    pub normal: Vec3A,
    /// Albedo after texture sampling
    pub albedo: Color,
    /// Opacity in [0, 1] after texture sampling
    pub opacity: f32,
    /// Reflectivity in [0, 1]
    pub reflectivity: f32,
    /// Refractive index (>= 0)
    pub refractive_index: f32,
    /// Distance along the ray to the intersection point
    pub distance: f32,
    /// True if the ray hit the outside of the surface
    pub front_face: bool,
}

impl SurfaceSample {
    /// Build a sample by evaluating `material` at the hit point.
    ///
    /// Flips `outward_normal` so the stored normal always points against the
    /// incident ray.
    pub fn new(r: &Ray, distance: f32, outward_normal: Vec3A, material: &Material) -> Self {
        let point = r.at(distance);
        let front_face = r.direction().dot(outward_normal) < 0.0;
        let normal = if front_face { outward_normal } else { -outward_normal };
        let (albedo, opacity) = material.sample(point);
        Self {
            point,
            normal,
            albedo,
            opacity,
            reflectivity: material.reflectivity.clamp(0.0, 1.0),
            refractive_index: material.refractive_index.max(0.0),
            distance,
            front_face,
        }
    }

    /// Fraction of light passing through the surface.
    pub fn transparency(&self) -> f32 {
        1.0 - self.opacity
    }
}

/// Trait for objects that can be intersected by rays.
///
/// Must be thread-safe so scanline batches can be traced in parallel.
pub trait Hittable: Sync + Send {
    /// Nearest intersection with a distance strictly inside `ray_t`.
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<SurfaceSample>;
}

/// Collection of objects forming a scene.
///
/// Uses linear search for intersection testing.
#[derive(Default)]
pub struct HittableList {
    /// Vector of boxed hittable objects
    pub objects: Vec<Box<dyn Hittable>>,
}

impl HittableList {
    /// Create a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the list.
    pub fn add(&mut self, object: Box<dyn Hittable>) {
        self.objects.push(object);
    }

    /// Number of objects in the list.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the list holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl Hittable for HittableList {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<SurfaceSample> {
        if r.is_degenerate() {
            return None;
        }

        let mut closest: Option<SurfaceSample> = None;
        for object in &self.objects {
            let max = closest.map_or(ray_t.max, |s| s.distance);
            if let Some(sample) = object.hit(r, ray_t.with_max(max)) {
                closest = Some(sample);
            }
        }
        closest
    }
}
