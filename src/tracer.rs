//! Whitted-style recursive trace engine.
//!
//! [`Tracer::trace`] shades the nearest surface along a ray with ambient
//! plus direct lighting (with hard and transparent shadows), then recurses
//! into mirror reflection and refraction under two independent depth
//! budgets.
//!
//! Besides the composite color, a [`TraceResult`] keeps the direct-lit color
//! and the hit geometry so the animated scheduler can reveal direct light
//! first and spawn its own visualisation rays later.

use glam::Vec3A;
use log::warn;

use crate::config::TraceConfig;
use crate::debug::{DebugLineSink, DebugRayKind, RayPainter};
use crate::geometry::{add_normal_bias, reflection_ray, refraction_ray};
use crate::hittable::SurfaceSample;
use crate::material::Color;
use crate::ray::Ray;
use crate::scene::{Light, SceneQuery};

/// Output of one trace invocation.
///
/// When `hit` is false only `final_color` (the background) is meaningful;
/// every other field is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TraceResult {
    /// Whether the ray hit a surface
    pub hit: bool,
    /// Composite color including reflection and refraction
    pub final_color: Color,
    /// Ambient plus shadowed direct light, before any secondary mixing
    pub initial_color: Color,
    /// Sum of direct light contributions ignoring occluders
    pub unshadowed_color: Color,
    /// Reflection contribution, already scaled by reflectivity
    pub reflected_color: Color,
    /// Refraction contribution, already scaled by transparency
    pub refracted_color: Color,
    /// Hit point in world space
    pub hit_point: Vec3A,
    /// Surface normal at the hit point, facing the incoming ray
    pub normal: Vec3A,
    /// Distance from ray origin to the hit point
    pub distance: f32,
    /// Surface reflectivity
    pub reflectivity: f32,
    /// Surface transparency, `1 - opacity`
    pub transparency: f32,
    /// Surface refractive index
    pub refractive_index: f32,
}

impl TraceResult {
    /// Result for a ray that left the scene.
    pub fn miss(background: Color) -> Self {
        Self {
            final_color: background,
            ..Self::default()
        }
    }
}

/// The recursive tracer.
///
/// Borrows the scene, the light snapshot of the current pass, and the
/// configuration. Holds no mutable state, so one tracer can serve a whole
/// rayon batch.
#[derive(Clone, Copy)]
pub struct Tracer<'a> {
    scene: &'a dyn SceneQuery,
    lights: &'a [Light],
    config: &'a TraceConfig,
    painter: Option<RayPainter<'a>>,
}

impl<'a> Tracer<'a> {
    /// Create a tracer that draws no debug rays.
    pub fn new(scene: &'a dyn SceneQuery, lights: &'a [Light], config: &'a TraceConfig) -> Self {
        Self {
            scene,
            lights,
            config,
            painter: None,
        }
    }

    /// Draw enabled debug ray categories into `sink` while tracing.
    pub fn with_debug_sink(mut self, sink: &'a dyn DebugLineSink) -> Self {
        self.painter = Some(RayPainter::new(sink, self.config.debug.color_mode));
        self
    }

    /// Trace with both budgets set to the configured maximum depth.
    pub fn trace_primary(&self, ray: &Ray, max_distance: f32) -> TraceResult {
        let depth = self.config.max_depth;
        self.trace(ray, max_distance, depth, depth)
    }

    /// Trace `ray` against the scene.
    ///
    /// `reflection_budget` and `refraction_budget` count the remaining
    /// recursive reflection and refraction calls; each child consumes one
    /// unit of its own budget only.
    pub fn trace(
        &self,
        ray: &Ray,
        max_distance: f32,
        reflection_budget: u32,
        refraction_budget: u32,
    ) -> TraceResult {
        self.trace_as(DebugRayKind::MainRay, ray, max_distance, reflection_budget, refraction_budget)
    }

    fn trace_as(
        &self,
        kind: DebugRayKind,
        ray: &Ray,
        max_distance: f32,
        reflection_budget: u32,
        refraction_budget: u32,
    ) -> TraceResult {
        let config = self.config;

        let Some(sample) = self.scene.intersect(ray, max_distance) else {
            if config.debug.missed_rays {
                self.paint(DebugRayKind::MainRayMiss, ray, None, config.background);
            }
            return TraceResult::miss(config.background);
        };

        let (point_color, unshadowed_color) = self.direct_light(&sample);

        if config.debug.main_rays {
            self.paint(kind, ray, Some(sample.point), point_color);
        }

        let transparency = sample.transparency();
        let mut final_color = point_color;
        let mut reflected_color = Color::ZERO;
        let mut refracted_color = Color::ZERO;

        if sample.reflectivity > 0.0 && reflection_budget > 0 {
            let reflected = reflection_ray(ray.direction(), sample.point, sample.normal, config.normal_bias);
            reflected_color = self
                .trace_as(
                    DebugRayKind::ReflectedRay,
                    &reflected,
                    f32::INFINITY,
                    reflection_budget - 1,
                    refraction_budget,
                )
                .final_color
                * sample.reflectivity;
        }

        if sample.opacity < 1.0 && refraction_budget > 0 {
            let refracted = refraction_ray(
                ray.direction(),
                sample.point,
                sample.normal,
                sample.refractive_index,
                config.normal_bias,
            );
            refracted_color = self
                .trace_as(
                    DebugRayKind::RefractedRay,
                    &refracted,
                    f32::INFINITY,
                    reflection_budget,
                    refraction_budget - 1,
                )
                .final_color
                * transparency;
            final_color *= sample.opacity;
        }

        final_color += reflected_color + refracted_color;

        TraceResult {
            hit: true,
            final_color,
            initial_color: point_color,
            unshadowed_color,
            reflected_color,
            refracted_color,
            hit_point: sample.point,
            normal: sample.normal,
            distance: sample.distance,
            reflectivity: sample.reflectivity,
            transparency,
            refractive_index: sample.refractive_index,
        }
    }

    /// Ambient plus per-light direct illumination at `sample`.
    ///
    /// Returns the shadowed color (ambient included) and the sum of light
    /// contributions with occluders ignored.
    fn direct_light(&self, sample: &SurfaceSample) -> (Color, Color) {
        let config = self.config;
        let ambient = config.ambient;
        let diffuse = config.diffuse();

        let mut point_color = sample.albedo * ambient;
        let mut unshadowed = Color::ZERO;

        for light in self.lights {
            let to_light = light.position - sample.point;
            let dist_to_light = to_light.length();
            if !light.reaches(dist_to_light) {
                continue;
            }
            let dir_to_light = to_light.normalize_or_zero();

            let shade = dir_to_light.dot(sample.normal).clamp(0.0, 1.0);
            let strength = light.intensity * shade * light.falloff(dist_to_light);

            let mut light_color = sample.albedo * light.color;
            if config.shading {
                light_color *= ambient + diffuse * shade;
            }
            let lit = light_color * strength;
            unshadowed += lit;

            // Intensity and falloff only scale lights that cast a shadow ray.
            if config.shadows && light.casts_shadows {
                light_color = lit * self.shadow_factor(sample, light, dir_to_light, lit);
            }

            point_color += light_color;
        }

        (point_color, unshadowed)
    }

    /// Multiplier applied to one light's contribution by occluders.
    fn shadow_factor(&self, sample: &SurfaceSample, light: &Light, dir_to_light: Vec3A, lit: Color) -> f32 {
        let config = self.config;
        let origin = add_normal_bias(sample.point, sample.normal, config.normal_bias);
        let shadow_ray = Ray::new(origin, dir_to_light);
        let max_distance = origin.distance(light.position);

        match self.scene.intersect(&shadow_ray, max_distance) {
            None => {
                if config.debug.shadow_rays {
                    self.paint(DebugRayKind::ShadowRay, &shadow_ray, Some(light.position), light.color);
                }
                1.0
            }
            Some(occluder) => {
                let factor = if occluder.opacity < 1.0 {
                    let through = Ray::new(
                        add_normal_bias(occluder.point, shadow_ray.direction(), config.normal_bias),
                        shadow_ray.direction(),
                    );
                    let transmittance = 1.0 - config.diffuse() * occluder.opacity;
                    self.shadow_attenuation(&through, transmittance, light.position)
                        .clamp(config.ambient, 1.0)
                } else {
                    1.0 - config.diffuse()
                };
                if config.debug.shadow_rays {
                    self.paint(
                        DebugRayKind::ShadowRayBlocked,
                        &shadow_ray,
                        Some(occluder.point),
                        lit * factor,
                    );
                }
                factor
            }
        }
    }

    /// Attenuation of a shadow ray continuing toward `light_position`.
    ///
    /// Each transparent occluder multiplies `current` by its transmittance
    /// `1 - (1 - ambient) * opacity` and the ray continues past it; an opaque
    /// occluder multiplies by `ambient` and stops. Chains longer than
    /// `max_shadow_depth` are treated as opaque at the cut-off.
    pub fn shadow_attenuation(&self, ray: &Ray, current: f32, light_position: Vec3A) -> f32 {
        let config = self.config;
        let diffuse = config.diffuse();
        let mut attenuation = current;
        let mut ray = *ray;
        let mut depth = 0;

        loop {
            let max_distance = ray.origin().distance(light_position);
            let Some(occluder) = self.scene.intersect(&ray, max_distance) else {
                return attenuation;
            };
            if occluder.opacity >= 1.0 {
                return attenuation * (1.0 - diffuse * occluder.opacity);
            }
            if depth >= config.max_shadow_depth {
                warn!(
                    "Shadow ray passed {} transparent occluders, treating the rest as opaque",
                    config.max_shadow_depth
                );
                return attenuation * (1.0 - diffuse);
            }
            attenuation *= 1.0 - diffuse * occluder.opacity;
            ray = Ray::new(
                add_normal_bias(occluder.point, ray.direction(), config.normal_bias),
                ray.direction(),
            );
            depth += 1;
        }
    }

    fn paint(&self, kind: DebugRayKind, ray: &Ray, end: Option<Vec3A>, color: Color) {
        if let Some(painter) = &self.painter {
            painter.ray(kind, ray, end, color, self.config.debug_ray_duration());
        }
    }
}
