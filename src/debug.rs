//! Debug line output for ray visualisation.
//!
//! The tracer and the animated scheduler describe rays as line segments;
//! where those end up (a viewport overlay, a log, a test recorder) is up to
//! the [`DebugLineSink`].

use std::sync::Mutex;
use std::time::Duration;

use glam::Vec3A;
use log::trace;

use crate::config::ColorMode;
use crate::material::Color;
use crate::ray::Ray;

/// Length used for rays that have no end point.
pub const UNBOUNDED_RAY_LENGTH: f32 = 9999.0;

/// Receives line segments to draw.
///
/// Shared across the rayon pool during scanline passes, so drawing takes
/// `&self`.
pub trait DebugLineSink: Sync {
    /// Draw a segment from `start` to `end` that stays visible for `duration`.
    fn draw(&self, start: Vec3A, end: Vec3A, color: Color, duration: Duration);
}

/// Category of a visualised ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugRayKind {
    /// Primary or animated ray that hit something
    MainRay,
    /// Ray that left the scene
    MainRayMiss,
    /// Unobstructed shadow ray
    ShadowRay,
    /// Shadow ray stopped by an occluder
    ShadowRayBlocked,
    /// Mirror reflection
    ReflectedRay,
    /// Refraction
    RefractedRay,
}

impl DebugRayKind {
    /// Fixed color used in [`ColorMode::ColorCoded`].
    pub fn palette_color(self) -> Color {
        match self {
            DebugRayKind::MainRay => Color::new(0.0, 1.0, 1.0),
            DebugRayKind::MainRayMiss => Color::splat(0.5),
            DebugRayKind::ShadowRay => Color::new(1.0, 0.92, 0.016),
            DebugRayKind::ShadowRayBlocked => Color::ZERO,
            DebugRayKind::ReflectedRay => Color::new(0.0, 1.0, 0.0),
            DebugRayKind::RefractedRay => Color::new(1.0, 0.0, 1.0),
        }
    }
}

/// Resolves ray categories to colors and forwards segments to a sink.
#[derive(Clone, Copy)]
pub struct RayPainter<'a> {
    sink: &'a dyn DebugLineSink,
    mode: ColorMode,
}

impl<'a> RayPainter<'a> {
    /// Painter drawing into `sink` with the given color mode.
    pub fn new(sink: &'a dyn DebugLineSink, mode: ColorMode) -> Self {
        Self { sink, mode }
    }

    /// Draw `ray` up to `end`, or far along its direction when `end` is `None`.
    pub fn ray(&self, kind: DebugRayKind, ray: &Ray, end: Option<Vec3A>, color: Color, duration: Duration) {
        let color = match self.mode {
            ColorMode::ColorCoded => kind.palette_color(),
            ColorMode::MaterialColor => color,
        };
        let end = end.unwrap_or_else(|| ray.at(UNBOUNDED_RAY_LENGTH));
        self.sink.draw(ray.origin(), end, color, duration);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DebugLineSink for NullSink {
    fn draw(&self, _start: Vec3A, _end: Vec3A, _color: Color, _duration: Duration) {}
}

/// Writes every segment to the log at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DebugLineSink for LogSink {
    fn draw(&self, start: Vec3A, end: Vec3A, color: Color, duration: Duration) {
        trace!(
            "line {:?} -> {:?} color {:?} for {:.3?}",
            start, end, color, duration
        );
    }
}

/// One recorded segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    /// Segment start
    pub start: Vec3A,
    /// Segment end
    pub end: Vec3A,
    /// Segment color
    pub color: Color,
    /// Display time
    pub duration: Duration,
}

/// Keeps every segment in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<DebugLine>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<DebugLine> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of recorded segments.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DebugLine>> {
        self.lines.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DebugLineSink for RecordingSink {
    fn draw(&self, start: Vec3A, end: Vec3A, color: Color, duration: Duration) {
        self.lock().push(DebugLine {
            start,
            end,
            color,
            duration,
        });
    }
}
