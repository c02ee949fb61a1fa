use std::time::{Duration, Instant};

use clap::Parser;
use glam::Vec3A;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

use raytree::camera::PinholeCamera;
use raytree::config::TraceConfig;
use raytree::controller::{FrameContext, RenderController, RenderFlags, RenderMode, TickOutcome};
use raytree::debug::{DebugLineSink, LogSink, NullSink};
use raytree::output::{FrameBuffer, TevPresenter};
use raytree::scene::Scene;

mod cli;
mod logger;

use cli::Args;
use logger::init_logger;

/// Frame period of the host loop while animating.
const FRAME_TIME: Duration = Duration::from_millis(16);

/// Camera framing the demo scene
fn create_camera() -> PinholeCamera {
    PinholeCamera::looking_at(Vec3A::new(0.0, 2.5, 9.0), Vec3A::new(0.0, 0.8, 0.0), 40.0)
}

/// Config file (or defaults), then command line overrides, then validation
fn load_config(args: &Args) -> raytree::Result<TraceConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TraceConfig::load(path)?
        }
        None => TraceConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn progress_bar(mode: RenderMode) -> ProgressBar {
    let template = match mode {
        RenderMode::Scanline => "{bar:40} {pos}/{len} columns ETA: {eta}",
        RenderMode::Animated => "{bar:40} {pos}/{len} rays complete",
    };
    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar().template(template) {
        Ok(style) => pb.set_style(style),
        Err(e) => warn!("Invalid progress template: {}", e),
    }
    pb
}

fn main() {
    let args = Args::parse();

    init_logger(args.debug_level.clone().into());

    info!("RayTree - Git Version {} ({})", env!("GIT_HASH"), env!("GIT_DATE"));

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Resolution {}x{}, max depth {}, ambient {}",
        config.width, config.height, config.max_depth, config.ambient
    );

    let scene = Scene::demo(args.seed);
    let camera = create_camera();

    let mut output = FrameBuffer::new(config.resolution());
    if let Some(address) = args.tev_target() {
        match TevPresenter::connect(address, "raytree") {
            Ok(presenter) => output = output.with_presenter(Box::new(presenter)),
            Err(e) => warn!("TEV disabled: {}", e),
        }
    }

    let debug = config.debug;
    let draws_rays = args.animated
        || debug.main_rays
        || debug.missed_rays
        || debug.shadow_rays
        || debug.reflection_rays
        || debug.refraction_rays;
    let sink: &dyn DebugLineSink = if draws_rays { &LogSink } else { &NullSink };

    let mut controller = RenderController::new(RenderFlags {
        render_requested: true,
        render_shown: true,
        continuous: args.continuous,
        animated: args.animated,
    });

    let started = Instant::now();
    let mut last_tick = Instant::now();
    let mut frames = 0u64;
    let mut pb: Option<ProgressBar> = None;

    loop {
        let now = Instant::now();
        let dt = now - last_tick;
        last_tick = now;

        let mut ctx = FrameContext {
            scene: &scene,
            camera: &camera,
            output: &mut output,
            debug: sink,
            config: &config,
            dt,
        };
        let outcome = controller.tick(&mut ctx);
        frames += 1;

        if let (Some(mode), Some((done, total))) = (controller.active_mode(), controller.progress()) {
            let bar = pb.get_or_insert_with(|| progress_bar(mode));
            bar.set_length(total);
            bar.set_position(done);
        }

        match outcome {
            TickOutcome::PassFinished => {
                if let Some(bar) = pb.take() {
                    bar.finish();
                }
                let passes = controller.passes_completed();
                info!("Pass {} done, {:.2?} since start", passes, started.elapsed());
                if !args.continuous {
                    if passes >= args.passes {
                        break;
                    }
                    controller.request_render();
                }
            }
            TickOutcome::Idle => break,
            TickOutcome::Rendering => {}
        }

        if args.frames.is_some_and(|limit| frames >= limit) {
            info!("Frame limit of {} reached", frames);
            break;
        }

        if args.animated {
            std::thread::sleep(FRAME_TIME.saturating_sub(now.elapsed()));
        }
    }

    if let Some(bar) = pb.take() {
        bar.abandon();
    }
    info!(
        "{} frames, {} passes, {} commits in {:.2?}",
        frames,
        controller.passes_completed(),
        output.commits(),
        started.elapsed()
    );
}
