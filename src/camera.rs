//! Viewpoint ray generation.

use glam::Vec3A;

use crate::output::Resolution;
use crate::ray::Ray;

/// Maps output pixels to viewpoint rays.
pub trait Camera: Sync + Send {
    /// Ray through the centre of pixel (`x`, `y`); (0, 0) is the top-left pixel.
    fn ray_through_pixel(&self, x: u32, y: u32, resolution: Resolution) -> Ray;
}

/// Pinhole camera.
///
/// One ray per pixel through its centre; no depth of field or jitter.
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    /// Vertical field of view in degrees
    pub vfov: f32,
    /// Point camera is looking from (camera position)
    pub lookfrom: Vec3A,
    /// Point camera is looking at (look target)
    pub lookat: Vec3A,
    /// Camera-relative "up" direction vector
    pub vup: Vec3A,
}

impl Default for PinholeCamera {
    fn default() -> Self {
        Self {
            vfov: 90.0,
            lookfrom: Vec3A::ZERO,
            lookat: Vec3A::NEG_Z,
            vup: Vec3A::Y,
        }
    }
}

/// Viewport parameters for one resolution.
struct Viewport {
    pixel00_loc: Vec3A,
    pixel_delta_u: Vec3A,
    pixel_delta_v: Vec3A,
}

impl PinholeCamera {
    /// Camera at `lookfrom` aimed at `lookat`.
    pub fn looking_at(lookfrom: Vec3A, lookat: Vec3A, vfov: f32) -> Self {
        Self {
            vfov,
            lookfrom,
            lookat,
            ..Self::default()
        }
    }

    fn viewport(&self, resolution: Resolution) -> Viewport {
        let width = resolution.width.max(1) as f32;
        let height = resolution.height.max(1) as f32;

        // Viewport sits at unit distance in front of the camera
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * (width / height);

        // u, v, w basis: right, up, and opposite the view direction
        let w = (self.lookfrom - self.lookat).normalize_or(Vec3A::Z);
        let u = self.vup.cross(w).normalize_or(Vec3A::X);
        let v = w.cross(u);

        let viewport_u = viewport_width * u;
        let viewport_v = viewport_height * -v;
        let pixel_delta_u = viewport_u / width;
        let pixel_delta_v = viewport_v / height;

        let viewport_upper_left = self.lookfrom - w - viewport_u / 2.0 - viewport_v / 2.0;
        Viewport {
            pixel00_loc: viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v),
            pixel_delta_u,
            pixel_delta_v,
        }
    }
}

impl Camera for PinholeCamera {
    fn ray_through_pixel(&self, x: u32, y: u32, resolution: Resolution) -> Ray {
        let viewport = self.viewport(resolution);
        let pixel_center = viewport.pixel00_loc
            + (x as f32 * viewport.pixel_delta_u)
            + (y as f32 * viewport.pixel_delta_v);
        Ray::towards(self.lookfrom, pixel_center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_pixel_looks_forward() {
        let camera = PinholeCamera::default();
        let ray = camera.ray_through_pixel(1, 1, Resolution::new(3, 3));
        assert!((ray.direction() - Vec3A::NEG_Z).length() < 1e-6);
        assert_eq!(ray.origin(), Vec3A::ZERO);
    }

    #[test]
    fn test_top_left_pixel_points_up_left() {
        let camera = PinholeCamera::default();
        let ray = camera.ray_through_pixel(0, 0, Resolution::new(4, 4));
        assert!(ray.direction().x < 0.0);
        assert!(ray.direction().y > 0.0);
    }
}
