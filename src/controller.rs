//! Rendering mode controller.
//!
//! The host calls [`RenderController::tick`] once per frame. Each tick
//! re-reads the mode flags, aborts or starts drivers as needed, and then
//! advances the one active driver by a single bounded step.

use std::time::Duration;

use log::{debug, info};

use crate::camera::Camera;
use crate::config::TraceConfig;
use crate::debug::DebugLineSink;
use crate::output::OutputBuffer;
use crate::scanline::ScanlineDriver;
use crate::scene::SceneQuery;
use crate::scheduler::RayScheduler;

/// Result of one driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// More steps needed.
    Running,
    /// The pass is over.
    Finished,
}

/// Everything a driver needs for one tick.
pub struct FrameContext<'a> {
    /// Scene to trace against
    pub scene: &'a dyn SceneQuery,
    /// Viewpoint
    pub camera: &'a dyn Camera,
    /// Pixel target
    pub output: &'a mut dyn OutputBuffer,
    /// Debug line target
    pub debug: &'a dyn DebugLineSink,
    /// Tunables
    pub config: &'a TraceConfig,
    /// Time since the previous tick
    pub dt: Duration,
}

/// Which driver a pass uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Progressive column-by-column shading.
    Scanline,
    /// Animated ray-tree visualisation.
    Animated,
}

/// Host-controlled switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderFlags {
    /// A pass should run (or is running).
    pub render_requested: bool,
    /// The output is visible; hiding it aborts the running pass.
    pub render_shown: bool,
    /// Start a new pass as soon as one finishes.
    pub continuous: bool,
    /// Use the animated driver instead of the scanline one.
    pub animated: bool,
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self {
            render_requested: false,
            render_shown: true,
            continuous: false,
            animated: false,
        }
    }
}

impl RenderFlags {
    fn mode(&self) -> RenderMode {
        if self.animated {
            RenderMode::Animated
        } else {
            RenderMode::Scanline
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No pass running.
    Idle,
    /// The active driver took a step.
    Rendering,
    /// The active driver finished its pass this tick.
    PassFinished,
}

enum ActiveDriver {
    Idle,
    Scanline(ScanlineDriver),
    Animated(RayScheduler),
}

impl ActiveDriver {
    fn mode(&self) -> Option<RenderMode> {
        match self {
            ActiveDriver::Idle => None,
            ActiveDriver::Scanline(_) => Some(RenderMode::Scanline),
            ActiveDriver::Animated(_) => Some(RenderMode::Animated),
        }
    }
}

/// Selects and drives the active renderer.
pub struct RenderController {
    flags: RenderFlags,
    driver: ActiveDriver,
    passes: u64,
}

impl Default for RenderController {
    fn default() -> Self {
        Self::new(RenderFlags::default())
    }
}

impl RenderController {
    /// Create an idle controller.
    pub fn new(flags: RenderFlags) -> Self {
        Self {
            flags,
            driver: ActiveDriver::Idle,
            passes: 0,
        }
    }

    /// Current flags.
    pub fn flags(&self) -> RenderFlags {
        self.flags
    }

    /// Ask for a pass.
    pub fn request_render(&mut self) {
        self.flags.render_requested = true;
    }

    /// Show or hide the output.
    pub fn set_shown(&mut self, shown: bool) {
        self.flags.render_shown = shown;
    }

    /// Choose the animated or scanline driver. Takes effect on the next tick.
    pub fn set_animated(&mut self, animated: bool) {
        self.flags.animated = animated;
    }

    /// Re-arm passes automatically.
    pub fn set_continuous(&mut self, continuous: bool) {
        self.flags.continuous = continuous;
    }

    /// Mode of the running pass, if any.
    pub fn active_mode(&self) -> Option<RenderMode> {
        self.driver.mode()
    }

    /// Passes finished so far.
    pub fn passes_completed(&self) -> u64 {
        self.passes
    }

    /// Work done and total work of the running pass: columns for scanline
    /// passes, completed nodes out of live nodes for animated ones.
    pub fn progress(&self) -> Option<(u64, u64)> {
        match &self.driver {
            ActiveDriver::Idle => None,
            ActiveDriver::Scanline(driver) => Some((
                u64::from(driver.columns_done()),
                u64::from(driver.resolution().width),
            )),
            ActiveDriver::Animated(scheduler) => {
                let stats = scheduler.stats();
                Some((stats.complete as u64, stats.live as u64))
            }
        }
    }

    /// The animated scheduler of the running pass.
    pub fn scheduler(&self) -> Option<&RayScheduler> {
        match &self.driver {
            ActiveDriver::Animated(scheduler) => Some(scheduler),
            _ => None,
        }
    }

    /// Advance by one frame.
    pub fn tick(&mut self, ctx: &mut FrameContext<'_>) -> TickOutcome {
        let wanted = self.flags.mode();
        match self.driver.mode() {
            Some(active) if active != wanted => {
                // A mode switch supersedes a visibility change in the same tick.
                debug!("Switching from {:?} to {:?}, aborting the running pass", active, wanted);
                self.start(ctx);
            }
            Some(active) if !self.flags.render_shown => {
                debug!("Output hidden, aborting {:?} pass", active);
                self.driver = ActiveDriver::Idle;
                return TickOutcome::Idle;
            }
            Some(_) => {}
            None => {
                if !(self.flags.render_requested && self.flags.render_shown) {
                    return TickOutcome::Idle;
                }
                self.start(ctx);
            }
        }

        let status = match &mut self.driver {
            ActiveDriver::Idle => return TickOutcome::Idle,
            ActiveDriver::Scanline(driver) => driver.step(ctx),
            ActiveDriver::Animated(scheduler) => scheduler.step(ctx),
        };

        match status {
            DriverStatus::Running => TickOutcome::Rendering,
            DriverStatus::Finished => {
                self.passes += 1;
                self.driver = ActiveDriver::Idle;
                if self.flags.continuous {
                    debug!("Continuous mode, re-arming");
                } else {
                    self.flags.render_requested = false;
                }
                TickOutcome::PassFinished
            }
        }
    }

    /// Snapshot resolution and lights, prepare the buffer, start a driver.
    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        self.flags.render_requested = true;
        let mode = self.flags.mode();
        let resolution = ctx.config.resolution();
        if mode == RenderMode::Animated || ctx.output.resolution() != resolution {
            ctx.output.rebuild(resolution);
        }
        let lights = ctx.scene.lights();
        info!("Starting {:?} pass #{}", mode, self.passes + 1);

        self.driver = match mode {
            RenderMode::Scanline => ActiveDriver::Scanline(ScanlineDriver::new(resolution, lights)),
            RenderMode::Animated => {
                ActiveDriver::Animated(RayScheduler::new(resolution, lights, ctx.camera, ctx.config))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use crate::debug::NullSink;
    use crate::material::{Color, Material};
    use crate::output::FrameBuffer;
    use crate::scene::{Light, Scene};
    use crate::sphere::Sphere;
    use glam::Vec3A;

    struct Host {
        scene: Scene,
        camera: PinholeCamera,
        output: FrameBuffer,
        config: TraceConfig,
    }

    impl Host {
        fn new(width: u32, height: u32) -> Self {
            let mut scene = Scene::new();
            scene.add(Sphere::new(
                Vec3A::new(0.0, 0.0, -3.0),
                1.0,
                Material::diffuse(Color::new(0.8, 0.2, 0.2)),
            ));
            scene.add_light(Light::point(Vec3A::new(0.0, 4.0, 0.0)));
            let config = TraceConfig {
                width,
                height,
                update_rate: 2,
                anim_step: 5.0,
                anim_pause_secs: 0.0,
                ..TraceConfig::default()
            };
            Self {
                scene,
                camera: PinholeCamera::default(),
                output: FrameBuffer::new(config.resolution()),
                config,
            }
        }

        fn tick(&mut self, controller: &mut RenderController) -> TickOutcome {
            let mut ctx = FrameContext {
                scene: &self.scene,
                camera: &self.camera,
                output: &mut self.output,
                debug: &NullSink,
                config: &self.config,
                dt: Duration::from_millis(16),
            };
            controller.tick(&mut ctx)
        }
    }

    #[test]
    fn test_idle_until_requested() {
        let mut host = Host::new(4, 4);
        let mut controller = RenderController::default();
        assert_eq!(host.tick(&mut controller), TickOutcome::Idle);
        assert_eq!(controller.active_mode(), None);

        controller.request_render();
        assert_eq!(host.tick(&mut controller), TickOutcome::Rendering);
        assert_eq!(controller.active_mode(), Some(RenderMode::Scanline));
    }

    #[test]
    fn test_single_pass_then_idle() {
        let mut host = Host::new(4, 4);
        let mut controller = RenderController::default();
        controller.request_render();
        assert_eq!(host.tick(&mut controller), TickOutcome::Rendering);
        assert_eq!(host.tick(&mut controller), TickOutcome::PassFinished);
        assert_eq!(host.tick(&mut controller), TickOutcome::Idle);
        assert_eq!(controller.passes_completed(), 1);
        assert!(!controller.flags().render_requested);
    }

    #[test]
    fn test_continuous_rearms() {
        let mut host = Host::new(2, 2);
        let mut controller = RenderController::default();
        controller.set_continuous(true);
        controller.request_render();
        // 2x2 at two columns per tick: every tick is a whole pass
        for _ in 0..6 {
            assert_eq!(host.tick(&mut controller), TickOutcome::PassFinished);
        }
        assert_eq!(controller.passes_completed(), 6);
        assert!(controller.flags().render_requested);
    }

    #[test]
    fn test_hidden_output_aborts_and_restarts() {
        let mut host = Host::new(6, 2);
        let mut controller = RenderController::default();
        controller.request_render();
        host.tick(&mut controller);
        assert_eq!(controller.progress(), Some((2, 6)));

        controller.set_shown(false);
        assert_eq!(host.tick(&mut controller), TickOutcome::Idle);
        assert_eq!(controller.active_mode(), None);
        assert_eq!(host.tick(&mut controller), TickOutcome::Idle);

        controller.set_shown(true);
        assert_eq!(host.tick(&mut controller), TickOutcome::Rendering);
        // restarted from the first column
        assert_eq!(controller.progress(), Some((2, 6)));
        assert_eq!(controller.passes_completed(), 0);
    }

    #[test]
    fn test_mode_switch_aborts_pass() {
        let mut host = Host::new(6, 2);
        let mut controller = RenderController::default();
        controller.request_render();
        host.tick(&mut controller);
        assert_eq!(controller.active_mode(), Some(RenderMode::Scanline));

        controller.set_animated(true);
        assert_eq!(host.tick(&mut controller), TickOutcome::Rendering);
        assert_eq!(controller.active_mode(), Some(RenderMode::Animated));
        assert!(controller.scheduler().is_some());
        assert_eq!(controller.passes_completed(), 0);
    }

    #[test]
    fn test_mode_switch_wins_over_hiding() {
        let mut host = Host::new(6, 2);
        let mut controller = RenderController::default();
        controller.request_render();
        host.tick(&mut controller);

        controller.set_animated(true);
        controller.set_shown(false);
        assert_eq!(host.tick(&mut controller), TickOutcome::Rendering);
        assert_eq!(controller.active_mode(), Some(RenderMode::Animated));

        // The hide is honored on the following tick
        assert_eq!(host.tick(&mut controller), TickOutcome::Idle);
        assert_eq!(controller.active_mode(), None);
    }

    #[test]
    fn test_resolution_change_rebuilds_buffer() {
        let mut host = Host::new(4, 4);
        let mut controller = RenderController::default();
        controller.request_render();
        while host.tick(&mut controller) != TickOutcome::PassFinished {}

        host.config.width = 8;
        host.config.height = 2;
        controller.request_render();
        host.tick(&mut controller);
        assert_eq!(host.output.resolution(), host.config.resolution());
    }

    #[test]
    fn test_animated_pass_clears_buffer() {
        let mut host = Host::new(3, 3);
        host.output.set_pixel(0, 0, Color::ONE);
        let mut controller = RenderController::new(RenderFlags {
            render_requested: true,
            animated: true,
            ..RenderFlags::default()
        });
        host.tick(&mut controller);
        assert_eq!(host.output.pixel(0, 0), Some(Color::ZERO));

        let mut ticks = 0;
        while host.tick(&mut controller) != TickOutcome::PassFinished {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert_eq!(controller.passes_completed(), 1);
        assert_eq!(host.output.pixel(1, 1).map(|c| c.x > c.y), Some(true));
    }
}
