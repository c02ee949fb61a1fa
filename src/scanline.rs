//! Progressive scanline driver.
//!
//! Traces the image column by column, `update_rate` columns per tick, and
//! commits the output after every batch so the picture fills in from left
//! to right.

use std::time::Instant;

use log::{debug, info};
use rayon::prelude::*;

use crate::controller::{DriverStatus, FrameContext};
use crate::material::Color;
use crate::output::Resolution;
use crate::scene::Light;
use crate::tracer::Tracer;

/// State of one progressive pass.
pub struct ScanlineDriver {
    resolution: Resolution,
    lights: Vec<Light>,
    next_column: u32,
    started: Instant,
}

impl ScanlineDriver {
    /// Start a pass at `resolution` with a snapshot of the scene lights.
    pub fn new(resolution: Resolution, lights: Vec<Light>) -> Self {
        info!(
            "Scanline pass started: {}x{} on {} CPU cores",
            resolution.width,
            resolution.height,
            rayon::current_num_threads()
        );
        Self {
            resolution,
            lights,
            next_column: 0,
            started: Instant::now(),
        }
    }

    /// Resolution this pass renders at.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Columns traced so far.
    pub fn columns_done(&self) -> u32 {
        self.next_column
    }

    /// True once every column is traced.
    pub fn is_done(&self) -> bool {
        self.next_column >= self.resolution.width
    }

    /// Trace the next batch of columns and commit them.
    pub fn step(&mut self, ctx: &mut FrameContext<'_>) -> DriverStatus {
        if self.is_done() {
            return DriverStatus::Finished;
        }

        let config = ctx.config;
        let camera = ctx.camera;
        let height = self.resolution.height;
        let resolution = self.resolution;
        let first = self.next_column;
        let last = (first + config.update_rate.max(1)).min(resolution.width);

        let tracer = Tracer::new(ctx.scene, &self.lights, config).with_debug_sink(ctx.debug);
        let shade = &|x: u32, y: u32| -> (u32, u32, Color) {
            let ray = camera.ray_through_pixel(x, y, resolution);
            (x, y, tracer.trace_primary(&ray, f32::INFINITY).final_color)
        };

        let pixels: Vec<(u32, u32, Color)> = if config.parallel {
            (first..last)
                .into_par_iter()
                .flat_map_iter(|x| (0..height).map(move |y| shade(x, y)))
                .collect()
        } else {
            (first..last)
                .flat_map(|x| (0..height).map(move |y| shade(x, y)))
                .collect()
        };

        for (x, y, color) in pixels {
            ctx.output.set_pixel(x, y, color);
        }
        ctx.output.commit();
        self.next_column = last;
        debug!("Columns {}..{} traced", first, last);

        if self.is_done() {
            info!("Scanline pass finished in {:.2?}", self.started.elapsed());
            DriverStatus::Finished
        } else {
            DriverStatus::Running
        }
    }
}
