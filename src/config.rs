//! Render configuration.
//!
//! Loaded from a TOML file, then overridden from the command line. Every
//! field has a default, so a partial file (or none at all) is fine.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::material::Color;
use crate::output::Resolution;

/// How debug rays are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Fixed color per ray category.
    #[default]
    ColorCoded,
    /// The color the ray actually carries.
    MaterialColor,
}

/// Per-category debug ray toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Primary rays that hit something.
    pub main_rays: bool,
    /// Rays that miss the scene. In animated mode this also keeps missed
    /// nodes alive.
    pub missed_rays: bool,
    /// Shadow rays toward lights.
    pub shadow_rays: bool,
    /// Mirror reflection rays.
    pub reflection_rays: bool,
    /// Refraction rays.
    pub refraction_rays: bool,
    /// Color-coding mode.
    pub color_mode: ColorMode,
}

/// All tunables of the tracer and its drivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Render width in pixels
    pub width: u32,
    /// Render height in pixels
    pub height: u32,
    /// Ambient coefficient in [0, 1]
    pub ambient: f32,
    /// Offset applied along normals to secondary ray origins
    pub normal_bias: f32,
    /// Cap on each of the reflection and refraction depth budgets
    pub max_depth: u32,
    /// Cap on chains of transparent shadow occluders
    pub max_shadow_depth: u32,
    /// Lambert shading on/off
    pub shading: bool,
    /// Shadow rays on/off
    pub shadows: bool,
    /// Color returned for rays that hit nothing
    pub background: Color,
    /// Scanline columns traced per tick before committing
    pub update_rate: u32,
    /// Trace scanline batches on the rayon pool
    pub parallel: bool,
    /// Growth of an animated ray per tick
    pub anim_step: f32,
    /// Maximum length of animated primary and secondary rays
    pub anim_max_length: f32,
    /// Nodes processed per scheduler tick; 0 means all of them
    pub anim_nodes_per_tick: usize,
    /// Pause after an animated pass, in seconds
    pub anim_pause_secs: f32,
    /// How long the final ray tree stays drawn, in seconds
    pub settle_secs: f32,
    /// Lifetime of debug lines drawn by the scanline driver, in seconds
    pub debug_ray_secs: f32,
    /// Debug ray visualisation
    pub debug: DebugConfig,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 90,
            ambient: 0.1,
            normal_bias: 0.005,
            max_depth: 15,
            max_shadow_depth: 64,
            shading: true,
            shadows: true,
            background: Color::new(0.1, 0.1, 0.1),
            update_rate: 10,
            parallel: true,
            anim_step: 0.1,
            anim_max_length: 20.0,
            anim_nodes_per_tick: 0,
            anim_pause_secs: 5.0,
            settle_secs: 0.9,
            debug_ray_secs: 0.0,
            debug: DebugConfig::default(),
        }
    }
}

impl TraceConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TraceConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the drivers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.ambient) {
            return Err(Error::InvalidConfig(format!("ambient must be in [0, 1], got {}", self.ambient)));
        }
        if !(self.normal_bias >= 0.0) {
            return Err(Error::InvalidConfig(format!("normal_bias must be >= 0, got {}", self.normal_bias)));
        }
        if self.update_rate == 0 {
            return Err(Error::InvalidConfig("update_rate must be at least 1".into()));
        }
        if !(self.anim_step > 0.0) {
            return Err(Error::InvalidConfig(format!("anim_step must be > 0, got {}", self.anim_step)));
        }
        if !(self.anim_max_length > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "anim_max_length must be > 0, got {}",
                self.anim_max_length
            )));
        }
        for (name, secs) in [
            ("anim_pause_secs", self.anim_pause_secs),
            ("settle_secs", self.settle_secs),
            ("debug_ray_secs", self.debug_ray_secs),
        ] {
            if !(secs >= 0.0) || !secs.is_finite() {
                return Err(Error::InvalidConfig(format!("{} must be a finite value >= 0, got {}", name, secs)));
            }
        }
        Ok(())
    }

    /// Render resolution.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Diffuse coefficient, `1 - ambient`.
    pub fn diffuse(&self) -> f32 {
        1.0 - self.ambient
    }

    /// Pause between animated passes.
    pub fn anim_pause(&self) -> Duration {
        Duration::from_secs_f32(self.anim_pause_secs)
    }

    /// Display time of the final ray tree.
    pub fn settle_duration(&self) -> Duration {
        Duration::from_secs_f32(self.settle_secs)
    }

    /// Lifetime of scanline debug lines.
    pub fn debug_ray_duration(&self) -> Duration {
        Duration::from_secs_f32(self.debug_ray_secs)
    }
}
