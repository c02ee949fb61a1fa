//! Infinite plane primitive.

use glam::Vec3A;

use crate::hittable::{Hittable, SurfaceSample};
use crate::interval::Interval;
use crate::material::Material;
use crate::ray::Ray;

/// Infinite plane through `point` with unit `normal`.
#[derive(Debug, Clone)]
pub struct Plane {
    /// Any point on the plane.
    pub point: Vec3A,
    /// Unit normal; the plane is two-sided.
    pub normal: Vec3A,
    /// Surface material.
    pub material: Material,
}

impl Plane {
    /// Create a new plane; `normal` is normalized.
    pub fn new(point: Vec3A, normal: Vec3A, material: Material) -> Self {
        Self {
            point,
            normal: normal.normalize_or(Vec3A::Y),
            material,
        }
    }
}

impl Hittable for Plane {
    fn hit(&self, r: &Ray, ray_t: Interval) -> Option<SurfaceSample> {
        let denom = self.normal.dot(r.direction());
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (self.point - r.origin()).dot(self.normal) / denom;
        if !ray_t.surrounds(t) {
            return None;
        }
        Some(SurfaceSample::new(r, t, self.normal, &self.material))
    }
}
