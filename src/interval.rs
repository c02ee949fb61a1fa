//! Interval arithmetic for ray parameter ranges.

/// Open interval (min, max) of ray distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    /// Minimum value of the interval
    pub min: f32,
    /// Maximum value of the interval
    pub max: f32,
}

impl Interval {
    /// Create a new interval with given min and max values
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Interval of distances in front of a ray origin, up to `max`.
    pub fn up_to(max: f32) -> Self {
        Self::new(0.0, max)
    }

    /// Check if the interval surrounds the given value (exclusive bounds)
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    /// Same interval with its upper bound pulled in to `max`.
    pub fn with_max(self, max: f32) -> Self {
        Self { max, ..self }
    }
}
