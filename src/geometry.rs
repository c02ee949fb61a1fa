//! Geometry helpers shared by the trace engine and the animated scheduler.
//!
//! Pure functions only: mirror reflection, the simplified refraction model,
//! and normal-bias offsetting.

use glam::Vec3A;

use crate::ray::Ray;

/// Reflect a vector off a surface using the law of reflection.
pub fn reflect(v: Vec3A, n: Vec3A) -> Vec3A {
    v - 2.0 * v.dot(n) * n
}

/// Offset `point` along `normal` by `bias` to avoid self-intersection.
pub fn add_normal_bias(point: Vec3A, normal: Vec3A, bias: f32) -> Vec3A {
    point + normal * bias
}

/// Result of bending a direction through a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refraction {
    /// The direction passes through the surface.
    Transmitted(Vec3A),
    /// The radicand went negative; the ray reflects instead.
    TotalInternalReflection(Vec3A),
}

impl Refraction {
    /// The outgoing direction, whichever way the ray went.
    pub fn direction(self) -> Vec3A {
        match self {
            Refraction::Transmitted(d) | Refraction::TotalInternalReflection(d) => d,
        }
    }
}

/// Bend `d` through a surface with normal `n` and refractive index `eta`.
///
/// Uses the approximation `k = 1 / (eta + 1)`, `c1 = -n·d`,
/// `c2 = sqrt(1 - k²(1 - c1²))`, direction `k·d + (k·c1 - c2)·n`. This is not
/// Snell's law.
pub fn refraction_direction(d: Vec3A, n: Vec3A, eta: f32) -> Refraction {
    let denom = eta + 1.0;
    if denom <= 0.0 || !denom.is_finite() {
        return Refraction::TotalInternalReflection(reflect(d, n));
    }
    let k = 1.0 / denom;
    let c1 = -n.dot(d);
    let radicand = 1.0 - k * k * (1.0 - c1 * c1);
    if radicand < 0.0 {
        return Refraction::TotalInternalReflection(reflect(d, n));
    }
    let c2 = radicand.sqrt();
    Refraction::Transmitted(k * d + (k * c1 - c2) * n)
}

/// Mirror reflection ray leaving `point`, biased out along the normal.
pub fn reflection_ray(incident: Vec3A, point: Vec3A, normal: Vec3A, bias: f32) -> Ray {
    Ray::new(add_normal_bias(point, normal, bias), reflect(incident, normal))
}

/// Refraction ray leaving `point`.
///
/// Transmitted rays start just below the surface; a totally internally
/// reflected ray starts just above it.
pub fn refraction_ray(incident: Vec3A, point: Vec3A, normal: Vec3A, eta: f32, bias: f32) -> Ray {
    match refraction_direction(incident, normal, eta) {
        Refraction::Transmitted(d) => Ray::new(add_normal_bias(point, -normal, bias), d),
        Refraction::TotalInternalReflection(d) => Ray::new(add_normal_bias(point, normal, bias), d),
    }
}
