use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use raytree::config::{ColorMode, TraceConfig};

/// Log levels selectable on the command line
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line arguments
#[derive(Parser)]
#[command(name = "raytree")]
#[command(about = "Whitted ray tracer with an animated ray-tree visualizer")]
pub struct Args {
    /// TOML configuration file; built-in defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info")]
    pub debug_level: LogLevel,

    /// Render width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Render height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Visualise the ray tree instead of shading scanlines
    #[arg(short, long)]
    pub animated: bool,

    /// Start a new pass as soon as one finishes
    #[arg(long)]
    pub continuous: bool,

    /// Stop after this many ticks
    #[arg(long)]
    pub frames: Option<u64>,

    /// Stop after this many completed passes
    #[arg(long, default_value = "1")]
    pub passes: u64,

    /// Seed of the demo scene generator
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Draw primary rays
    #[arg(long)]
    pub main_rays: bool,

    /// Draw rays that miss (and keep them alive in animated mode)
    #[arg(long)]
    pub missed_rays: bool,

    /// Draw shadow rays
    #[arg(long)]
    pub shadow_rays: bool,

    /// Draw reflection rays
    #[arg(long)]
    pub reflection_rays: bool,

    /// Draw refraction rays
    #[arg(long)]
    pub refraction_rays: bool,

    /// Color debug rays with their actual color instead of per category
    #[arg(long)]
    pub material_colors: bool,

    /// Send each committed frame to TEV
    #[arg(long)]
    pub tev: bool,

    /// TEV address and port (automatically enables --tev)
    #[arg(long)]
    pub tev_address: Option<String>,
}

impl Args {
    /// Fold command line overrides into `config`.
    pub fn apply(&self, config: &mut TraceConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        let debug = &mut config.debug;
        debug.main_rays |= self.main_rays;
        debug.missed_rays |= self.missed_rays;
        debug.shadow_rays |= self.shadow_rays;
        debug.reflection_rays |= self.reflection_rays;
        debug.refraction_rays |= self.refraction_rays;
        if self.material_colors {
            debug.color_mode = ColorMode::MaterialColor;
        }
    }

    /// TEV address if presentation is enabled.
    pub fn tev_target(&self) -> Option<&str> {
        match (&self.tev_address, self.tev) {
            (Some(address), _) => Some(address),
            (None, true) => Some("localhost:14158"),
            (None, false) => None,
        }
    }
}
