//! RayTree ray tracer
//!
//! A Whitted-style tracer (direct light, hard and transparent shadows,
//! mirror reflection, refraction) with two drivers: a progressive scanline
//! renderer and an animated visualiser that grows the ray tree of every
//! pixel on screen. Rendering is cooperative; the host calls
//! [`controller::RenderController::tick`] once per frame.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ray;
pub mod interval;
pub mod geometry;
pub mod material;
pub mod hittable;
pub mod sphere;
pub mod plane;
pub mod scene;
pub mod camera;
pub mod random;
pub mod output;
pub mod debug;
pub mod tracer;
pub mod scanline;
pub mod scheduler;
pub mod controller;
pub mod config;
pub mod error;

pub use config::TraceConfig;
pub use controller::{FrameContext, RenderController, RenderFlags, RenderMode, TickOutcome};
pub use error::{Error, Result};
pub use tracer::{TraceResult, Tracer};
