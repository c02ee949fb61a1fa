//! Ray representation for Whitted-style ray tracing.
//!
//! A ray is defined as r(t) = origin + t * direction. The direction is always
//! normalized, so `t` is a world-space distance along the ray.

use glam::Vec3A;

/// Ray in 3D space defined by origin and unit direction.
///
/// Rays are immutable once constructed; spawning a secondary ray always
/// builds a new one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    origin: Vec3A,
    direction: Vec3A,
}

impl Ray {
    /// Create a new ray, normalizing `direction`.
    ///
    /// A zero-length direction yields a degenerate ray with a zero direction,
    /// which never intersects anything.
    pub fn new(origin: Vec3A, direction: Vec3A) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray from `origin` pointing at `target`.
    pub fn towards(origin: Vec3A, target: Vec3A) -> Self {
        Self::new(origin, target - origin)
    }

    /// Starting point of the ray in world coordinates.
    pub fn origin(&self) -> Vec3A {
        self.origin
    }

    /// Unit direction of the ray (zero for degenerate rays).
    pub fn direction(&self) -> Vec3A {
        self.direction
    }

    /// True if the ray has no usable direction.
    pub fn is_degenerate(&self) -> bool {
        self.direction == Vec3A::ZERO
    }

    /// Compute a point at distance `t` along the ray.
    pub fn at(&self, t: f32) -> Vec3A {
        self.origin + t * self.direction
    }
}
