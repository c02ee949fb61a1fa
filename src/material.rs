//! Surface materials for Whitted shading.
//!
//! A material carries everything the trace engine needs at a hit point:
//! albedo (optionally modulated by a procedural texture), opacity,
//! reflectivity, and refractive index.

use glam::Vec3A;
use serde::{Deserialize, Serialize};

/// RGB color type using Vec3A for SIMD optimization.
pub type Color = Vec3A;

/// Procedural texture modulating a material's albedo and opacity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    /// No texture; albedo and opacity are used as is.
    #[default]
    Solid,
    /// 3D checkerboard. Even cells are white and opaque, odd cells use
    /// `odd` and `odd_alpha`.
    Checker {
        /// Color of odd cells.
        odd: Color,
        /// Alpha of odd cells.
        odd_alpha: f32,
        /// Cell edge length in world units.
        scale: f32,
    },
}

impl Texture {
    /// Sample color and alpha at a world-space point.
    pub fn sample(&self, p: Vec3A) -> (Color, f32) {
        match *self {
            Texture::Solid => (Color::ONE, 1.0),
            Texture::Checker { odd, odd_alpha, scale } => {
                let cell = (p / scale.max(f32::EPSILON)).floor();
                let parity = (cell.x + cell.y + cell.z).rem_euclid(2.0);
                if parity < 0.5 {
                    (Color::ONE, 1.0)
                } else {
                    (odd, odd_alpha.clamp(0.0, 1.0))
                }
            }
        }
    }
}

/// Material properties of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Base surface color.
    pub albedo: Color,
    /// 1.0 is fully opaque, 0.0 fully transparent.
    pub opacity: f32,
    /// Fraction of light mirrored, in [0, 1].
    pub reflectivity: f32,
    /// Refractive index used by the refraction approximation (>= 0).
    pub refractive_index: f32,
    /// Texture multiplied into albedo and opacity.
    #[serde(default)]
    pub texture: Texture,
}

impl Material {
    /// Opaque, non-reflective diffuse material.
    pub fn diffuse(albedo: Color) -> Self {
        Self {
            albedo,
            opacity: 1.0,
            reflectivity: 0.0,
            refractive_index: 0.0,
            texture: Texture::Solid,
        }
    }

    /// Opaque mirror-like material.
    pub fn mirror(albedo: Color, reflectivity: f32) -> Self {
        Self {
            reflectivity: reflectivity.clamp(0.0, 1.0),
            ..Self::diffuse(albedo)
        }
    }

    /// Partially transparent material.
    pub fn glass(albedo: Color, opacity: f32, refractive_index: f32) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            refractive_index: refractive_index.max(0.0),
            ..Self::diffuse(albedo)
        }
    }

    /// Replace the texture.
    pub fn with_texture(self, texture: Texture) -> Self {
        Self { texture, ..self }
    }

    /// Textured albedo and opacity at `p`.
    pub fn sample(&self, p: Vec3A) -> (Color, f32) {
        let (tex_color, tex_alpha) = self.texture.sample(p);
        (self.albedo * tex_color, (self.opacity * tex_alpha).clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_sample_is_albedo() {
        let m = Material::glass(Color::new(0.2, 0.4, 0.6), 0.5, 1.5);
        let (c, a) = m.sample(Vec3A::new(3.3, -1.0, 2.0));
        assert_eq!(c, Color::new(0.2, 0.4, 0.6));
        assert_eq!(a, 0.5);
    }

    #[test]
    fn test_checker_alternates() {
        let tex = Texture::Checker {
            odd: Color::new(1.0, 0.0, 0.0),
            odd_alpha: 0.25,
            scale: 1.0,
        };
        assert_eq!(tex.sample(Vec3A::new(0.5, 0.5, 0.5)), (Color::ONE, 1.0));
        assert_eq!(tex.sample(Vec3A::new(1.5, 0.5, 0.5)), (Color::new(1.0, 0.0, 0.0), 0.25));
        assert_eq!(tex.sample(Vec3A::new(-0.5, 0.5, 0.5)), (Color::new(1.0, 0.0, 0.0), 0.25));
    }
}
