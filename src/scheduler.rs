//! Animated ray-tree scheduler.
//!
//! Instead of shading pixels directly, the scheduler grows the ray tree of
//! every pixel on screen: primary rays are traced, then drawn growing toward
//! their hit point a little each tick, and once a ray arrives it spawns its
//! shadow, reflection and refraction children. Pixels show the direct-lit
//! color first and the composite color once the secondary rays that feed it
//! have arrived.
//!
//! Nodes live in an append-only arena addressed by [`NodeId`]; parents are
//! ids into that arena, so children can be appended mid-tick without
//! invalidating anything. The worklist holds the ids still being shown.

use std::collections::HashSet;
use std::time::Duration;

use glam::Vec3A;
use log::{debug, info};

use crate::camera::Camera;
use crate::config::TraceConfig;
use crate::controller::{DriverStatus, FrameContext};
use crate::debug::{DebugRayKind, RayPainter};
use crate::geometry::{add_normal_bias, reflection_ray, refraction_ray};
use crate::material::Color;
use crate::output::Resolution;
use crate::ray::Ray;
use crate::scene::Light;
use crate::tracer::{TraceResult, Tracer};

/// Color of a primary ray before it arrives.
const PRIMARY_COLOR: Color = Color::ONE;
/// Color of secondary rays.
const SECONDARY_COLOR: Color = Color::splat(0.5);
/// Color of a shadow ray that found an occluder.
const OCCLUDED_COLOR: Color = Color::ZERO;

/// Stable handle of a node in the scheduler arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which secondary effect a node visualises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryKind {
    /// Mirror reflection
    Reflection,
    /// Refraction
    Refraction,
}

/// Role of a node in the ray tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind {
    /// Camera ray through a pixel.
    Primary,
    /// Reflection or refraction ray spawned at a hit.
    Secondary(SecondaryKind),
    /// Ray toward a light. `chain` counts the transparent occluders already
    /// passed through.
    Shadow {
        /// Position of the light this ray heads for
        light_position: Vec3A,
        /// Transparent occluders already crossed
        chain: u32,
    },
}

impl NodeKind {
    fn is_shadow(self) -> bool {
        matches!(self, NodeKind::Shadow { .. })
    }
}

/// Lifecycle of a node.
///
/// `Untraced → Traced → Animating → Complete`. The trace result and the
/// reveal target exist from `Traced` on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeState {
    /// Waiting for its trace.
    Untraced,
    /// Traced; the visual reveal has not started.
    Traced {
        /// Result of tracing this node's ray
        trace: TraceResult,
        /// Length the reveal grows to
        target: f32,
    },
    /// Growing toward `target`.
    Animating {
        /// Result of tracing this node's ray
        trace: TraceResult,
        /// Length the reveal grows to
        target: f32,
        /// Current visible length
        length: f32,
    },
    /// Fully revealed; children spawned and pixel written.
    Complete {
        /// Result of tracing this node's ray
        trace: TraceResult,
        /// Final visible length
        length: f32,
    },
}

impl NodeState {
    /// Trace result, once there is one.
    pub fn trace(&self) -> Option<&TraceResult> {
        match self {
            NodeState::Untraced => None,
            NodeState::Traced { trace, .. }
            | NodeState::Animating { trace, .. }
            | NodeState::Complete { trace, .. } => Some(trace),
        }
    }

    /// True once the node has finished.
    pub fn is_complete(&self) -> bool {
        matches!(self, NodeState::Complete { .. })
    }
}

/// One ray of the visualised tree.
#[derive(Debug, Clone)]
pub struct RayNode {
    ray: Ray,
    kind: NodeKind,
    parent: Option<NodeId>,
    pixel: (u32, u32),
    color: Color,
    max_length: f32,
    reflection_depth: u32,
    refraction_depth: u32,
    state: NodeState,
}

impl RayNode {
    /// Camera ray for `pixel`, traced and revealed up to `anim_max_length`.
    pub fn primary(ray: Ray, pixel: (u32, u32), config: &TraceConfig) -> Self {
        Self {
            ray,
            kind: NodeKind::Primary,
            parent: None,
            pixel,
            color: PRIMARY_COLOR,
            max_length: config.anim_max_length,
            reflection_depth: 0,
            refraction_depth: 0,
            state: NodeState::Untraced,
        }
    }

    /// Reflection or refraction child of `parent`.
    pub fn secondary(ray: Ray, kind: SecondaryKind, parent_id: NodeId, parent: &RayNode, config: &TraceConfig) -> Self {
        let (reflection_depth, refraction_depth) = match kind {
            SecondaryKind::Reflection => (parent.reflection_depth + 1, parent.refraction_depth),
            SecondaryKind::Refraction => (parent.reflection_depth, parent.refraction_depth + 1),
        };
        Self {
            ray,
            kind: NodeKind::Secondary(kind),
            parent: Some(parent_id),
            pixel: parent.pixel,
            color: SECONDARY_COLOR,
            max_length: config.anim_max_length,
            reflection_depth,
            refraction_depth,
            state: NodeState::Untraced,
        }
    }

    /// Shadow ray from `origin` toward `light_position`, attributed to `parent`.
    pub fn shadow(
        origin: Vec3A,
        light_position: Vec3A,
        color: Color,
        chain: u32,
        parent: Option<NodeId>,
        pixel: (u32, u32),
    ) -> Self {
        Self {
            ray: Ray::towards(origin, light_position),
            kind: NodeKind::Shadow { light_position, chain },
            parent,
            pixel,
            color,
            max_length: origin.distance(light_position),
            reflection_depth: 0,
            refraction_depth: 0,
            state: NodeState::Untraced,
        }
    }

    /// The ray this node traces.
    pub fn ray(&self) -> &Ray {
        &self.ray
    }

    /// Role in the tree.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Node that spawned this one.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Pixel this node contributes to.
    pub fn pixel(&self) -> (u32, u32) {
        self.pixel
    }

    /// Current display color.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Lifecycle state.
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    fn debug_kind(&self) -> DebugRayKind {
        let hit = self.state.trace().is_some_and(|t| t.hit);
        match self.kind {
            NodeKind::Primary if hit || self.state == NodeState::Untraced => DebugRayKind::MainRay,
            NodeKind::Primary => DebugRayKind::MainRayMiss,
            NodeKind::Secondary(SecondaryKind::Reflection) => DebugRayKind::ReflectedRay,
            NodeKind::Secondary(SecondaryKind::Refraction) => DebugRayKind::RefractedRay,
            NodeKind::Shadow { .. } if hit && self.state.is_complete() => DebugRayKind::ShadowRayBlocked,
            NodeKind::Shadow { .. } => DebugRayKind::ShadowRay,
        }
    }
}

/// Node counts of the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Nodes still in the worklist
    pub live: usize,
    /// Live nodes not yet traced
    pub untraced: usize,
    /// Live nodes traced but not yet growing
    pub traced: usize,
    /// Live nodes growing
    pub animating: usize,
    /// Live nodes finished
    pub complete: usize,
    /// Nodes dropped because they missed the scene
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Growing,
    Paused { remaining: Duration },
    Finished,
}

/// What a single node did during a tick.
enum NodeStep {
    Progressed,
    Removed,
}

/// Incremental ray-tree visualiser for one pass.
pub struct RayScheduler {
    resolution: Resolution,
    lights: Vec<Light>,
    nodes: Vec<RayNode>,
    worklist: Vec<NodeId>,
    removed: usize,
    ticks: u64,
    phase: Phase,
}

impl RayScheduler {
    /// Start a pass with one primary node per pixel, column by column.
    pub fn new(resolution: Resolution, lights: Vec<Light>, camera: &dyn Camera, config: &TraceConfig) -> Self {
        let mut scheduler = Self {
            resolution,
            lights,
            nodes: Vec::with_capacity(resolution.pixel_count()),
            worklist: Vec::with_capacity(resolution.pixel_count()),
            removed: 0,
            ticks: 0,
            phase: Phase::Growing,
        };
        for x in 0..resolution.width {
            for y in 0..resolution.height {
                let ray = camera.ray_through_pixel(x, y, resolution);
                scheduler.push(RayNode::primary(ray, (x, y), config));
            }
        }
        info!(
            "Animated pass started: {}x{}, {} lights",
            resolution.width,
            resolution.height,
            scheduler.lights.len()
        );
        scheduler
    }

    /// Resolution this pass renders at.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> &RayNode {
        &self.nodes[id.0]
    }

    /// Ids still in the worklist, in processing order.
    pub fn worklist(&self) -> &[NodeId] {
        &self.worklist
    }

    /// Ticks taken so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True once every node is complete (the pass may still be pausing).
    pub fn tree_complete(&self) -> bool {
        self.phase != Phase::Growing
    }

    /// Count nodes by state.
    pub fn stats(&self) -> SchedulerStats {
        let mut stats = SchedulerStats {
            live: self.worklist.len(),
            removed: self.removed,
            ..SchedulerStats::default()
        };
        for id in &self.worklist {
            match self.nodes[id.0].state {
                NodeState::Untraced => stats.untraced += 1,
                NodeState::Traced { .. } => stats.traced += 1,
                NodeState::Animating { .. } => stats.animating += 1,
                NodeState::Complete { .. } => stats.complete += 1,
            }
        }
        stats
    }

    /// Advance the pass by one frame.
    pub fn step(&mut self, ctx: &mut FrameContext<'_>) -> DriverStatus {
        match self.phase {
            Phase::Growing => {
                self.grow(ctx);
                DriverStatus::Running
            }
            Phase::Paused { remaining } => {
                let remaining = remaining.saturating_sub(ctx.dt);
                if remaining.is_zero() {
                    self.phase = Phase::Finished;
                    DriverStatus::Finished
                } else {
                    self.phase = Phase::Paused { remaining };
                    DriverStatus::Running
                }
            }
            Phase::Finished => DriverStatus::Finished,
        }
    }

    fn push(&mut self, node: RayNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.worklist.push(id);
        id
    }

    /// One tick of the growing phase.
    fn grow(&mut self, ctx: &mut FrameContext<'_>) {
        let config = ctx.config;
        let lights = std::mem::take(&mut self.lights);
        let tracer = Tracer::new(ctx.scene, &lights, config);
        let painter = RayPainter::new(ctx.debug, config.debug.color_mode);
        let budget = match config.anim_nodes_per_tick {
            0 => usize::MAX,
            n => n,
        };

        self.ticks += 1;
        let mut processed = 0;
        let mut pixels_written = false;
        let mut dropped = HashSet::new();

        // The worklist grows while we walk it; children get their first
        // step in the same tick they were spawned.
        let mut i = 0;
        while i < self.worklist.len() {
            let id = self.worklist[i];
            i += 1;

            if self.nodes[id.0].state.is_complete() {
                self.draw(id, &painter, Duration::ZERO);
                continue;
            }
            if processed >= budget {
                continue;
            }
            processed += 1;

            match self.advance(id, &tracer, &lights, &painter, ctx, &mut pixels_written) {
                NodeStep::Progressed => {}
                NodeStep::Removed => {
                    dropped.insert(id);
                }
            }
        }

        if !dropped.is_empty() {
            self.removed += dropped.len();
            self.worklist.retain(|id| !dropped.contains(id));
        }
        if pixels_written {
            ctx.output.commit();
        }

        if self.worklist.iter().all(|id| self.nodes[id.0].state.is_complete()) {
            self.settle(ctx, &painter);
        }
        self.lights = lights;
    }

    /// Move one node a single step along its lifecycle.
    fn advance(
        &mut self,
        id: NodeId,
        tracer: &Tracer<'_>,
        lights: &[Light],
        painter: &RayPainter<'_>,
        ctx: &mut FrameContext<'_>,
        pixels_written: &mut bool,
    ) -> NodeStep {
        let config = ctx.config;
        let node = &mut self.nodes[id.0];

        match node.state {
            NodeState::Untraced => {
                let depth = config.max_depth;
                let trace = tracer.trace(&node.ray, node.max_length, depth, depth);
                if !trace.hit && !node.kind.is_shadow() && !config.debug.missed_rays {
                    return NodeStep::Removed;
                }
                let target = if trace.hit { trace.distance } else { node.max_length };
                node.state = NodeState::Traced { trace, target };
            }
            NodeState::Traced { trace, target } => {
                node.state = NodeState::Animating {
                    trace,
                    target,
                    length: config.anim_step,
                };
                self.draw(id, painter, Duration::ZERO);
            }
            NodeState::Animating { trace, target, length } if length < target => {
                node.state = NodeState::Animating {
                    trace,
                    target,
                    length: length + config.anim_step,
                };
                self.draw(id, painter, Duration::ZERO);
            }
            NodeState::Animating { trace, target, .. } => {
                node.state = NodeState::Complete { trace, length: target };
                *pixels_written |= self.complete(id, &trace, lights, ctx);
            }
            NodeState::Complete { .. } => {}
        }
        NodeStep::Progressed
    }

    /// Completion actions of a node that just finished growing.
    ///
    /// Returns true if a pixel was written.
    fn complete(&mut self, id: NodeId, trace: &TraceResult, lights: &[Light], ctx: &mut FrameContext<'_>) -> bool {
        let config = ctx.config;
        let node = self.nodes[id.0].clone();

        if let NodeKind::Shadow { light_position, chain } = node.kind {
            if trace.hit {
                self.nodes[id.0].color = OCCLUDED_COLOR;
                if trace.transparency > 0.0 && chain < config.max_shadow_depth {
                    let origin = add_normal_bias(trace.hit_point, node.ray.direction(), config.normal_bias);
                    self.push(RayNode::shadow(
                        origin,
                        light_position,
                        node.color,
                        chain + 1,
                        node.parent,
                        node.pixel,
                    ));
                }
            }
            return false;
        }

        self.nodes[id.0].color = if trace.hit { trace.initial_color } else { trace.final_color };

        let mut secondaries = false;
        if trace.hit {
            if config.debug.shadow_rays {
                let origin = add_normal_bias(trace.hit_point, trace.normal, config.normal_bias);
                for light in lights {
                    self.push(RayNode::shadow(origin, light.position, light.color, 0, Some(id), node.pixel));
                }
            }

            if config.debug.reflection_rays && trace.reflectivity > 0.0 && node.reflection_depth < config.max_depth {
                secondaries = true;
                let ray = reflection_ray(node.ray.direction(), trace.hit_point, trace.normal, config.normal_bias);
                self.push(RayNode::secondary(ray, SecondaryKind::Reflection, id, &node, config));
            }

            if config.debug.refraction_rays && trace.transparency > 0.0 && node.refraction_depth < config.max_depth {
                secondaries = true;
                let ray = refraction_ray(
                    node.ray.direction(),
                    trace.hit_point,
                    trace.normal,
                    trace.refractive_index,
                    config.normal_bias,
                );
                self.push(RayNode::secondary(ray, SecondaryKind::Refraction, id, &node, config));
            }
        }

        let (x, y) = node.pixel;
        match node.kind {
            NodeKind::Primary => {
                // Direct light only; a secondary leaf reveals a composite later.
                let color = if trace.hit { trace.initial_color } else { trace.final_color };
                ctx.output.set_pixel(x, y, color);
                true
            }
            NodeKind::Secondary(_) if !secondaries => {
                let color = node
                    .parent
                    .and_then(|parent| self.nodes[parent.0].state.trace())
                    .map_or(config.background, |t| t.final_color);
                ctx.output.set_pixel(x, y, color);
                true
            }
            _ => false,
        }
    }

    fn draw(&self, id: NodeId, painter: &RayPainter<'_>, duration: Duration) {
        let node = &self.nodes[id.0];
        let length = match node.state {
            NodeState::Untraced => return,
            NodeState::Traced { .. } => 0.0,
            NodeState::Animating { target, length, .. } => length.min(target),
            NodeState::Complete { length, .. } => length,
        };
        painter.ray(node.debug_kind(), &node.ray, Some(node.ray.at(length)), node.color, duration);
    }

    /// Every node is complete: present, show the whole tree, then pause.
    fn settle(&mut self, ctx: &mut FrameContext<'_>, painter: &RayPainter<'_>) {
        ctx.output.commit();
        let settle = ctx.config.settle_duration();
        for &id in &self.worklist {
            self.draw(id, painter, settle);
        }
        let stats = self.stats();
        info!(
            "Animated pass finished after {} ticks: {} rays shown, {} dropped",
            self.ticks, stats.live, stats.removed
        );
        let pause = ctx.config.anim_pause();
        self.phase = if pause.is_zero() {
            Phase::Finished
        } else {
            debug!("Pausing {:.2?} before the next pass", pause);
            Phase::Paused { remaining: pause }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PinholeCamera;
    use crate::debug::RecordingSink;
    use crate::material::Material;
    use crate::output::FrameBuffer;
    use crate::scene::{Scene, SceneQuery};
    use crate::sphere::Sphere;

    struct Rig {
        scene: Scene,
        camera: PinholeCamera,
        output: FrameBuffer,
        sink: RecordingSink,
        config: TraceConfig,
    }

    impl Rig {
        fn new(scene: Scene, config: TraceConfig) -> Self {
            Self {
                scene,
                camera: PinholeCamera::default(),
                output: FrameBuffer::new(config.resolution()),
                sink: RecordingSink::new(),
                config,
            }
        }

        fn scheduler(&self) -> RayScheduler {
            RayScheduler::new(self.config.resolution(), self.scene.lights(), &self.camera, &self.config)
        }

        fn step(&mut self, scheduler: &mut RayScheduler) -> DriverStatus {
            let mut ctx = FrameContext {
                scene: &self.scene,
                camera: &self.camera,
                output: &mut self.output,
                debug: &self.sink,
                config: &self.config,
                dt: Duration::from_millis(16),
            };
            scheduler.step(&mut ctx)
        }
    }

    fn config(width: u32, height: u32) -> TraceConfig {
        TraceConfig {
            width,
            height,
            anim_step: 1.0,
            anim_pause_secs: 0.0,
            ..TraceConfig::default()
        }
    }

    fn sphere_scene(material: Material) -> Scene {
        let mut scene = Scene::new();
        scene.add(Sphere::new(Vec3A::new(0.0, 0.0, -5.0), 1.0, material));
        scene.add_light(Light::point(Vec3A::new(0.0, 3.0, 0.0)));
        scene
    }

    /// (rank, length) of a node; never decreases over a pass.
    fn progress(state: &NodeState) -> (u8, f32) {
        match *state {
            NodeState::Untraced => (0, 0.0),
            NodeState::Traced { .. } => (1, 0.0),
            NodeState::Animating { length, .. } => (2, length),
            NodeState::Complete { .. } => (3, 0.0),
        }
    }

    #[test]
    fn test_misses_are_dropped() {
        let mut rig = Rig::new(Scene::new(), config(4, 3));
        let mut scheduler = rig.scheduler();
        assert_eq!(scheduler.stats().untraced, 12);

        rig.step(&mut scheduler);
        let stats = scheduler.stats();
        assert_eq!(stats.live, 0);
        assert_eq!(stats.removed, 12);
        assert!(scheduler.tree_complete());
        assert_eq!(rig.step(&mut scheduler), DriverStatus::Finished);
    }

    #[test]
    fn test_missed_rays_kept_when_shown() {
        let mut cfg = config(2, 2);
        cfg.debug.missed_rays = true;
        cfg.background = Color::new(0.0, 0.0, 1.0);
        let mut rig = Rig::new(Scene::new(), cfg);
        let mut scheduler = rig.scheduler();
        while rig.step(&mut scheduler) == DriverStatus::Running {}
        let stats = scheduler.stats();
        assert_eq!(stats.live, 4);
        assert_eq!(stats.complete, 4);
        assert_eq!(rig.output.pixel(1, 1), Some(Color::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_single_node_lifecycle() {
        let mut cfg = config(1, 1);
        cfg.anim_step = 1.5;
        let mut rig = Rig::new(sphere_scene(Material::diffuse(Color::ONE)), cfg);
        let mut scheduler = rig.scheduler();
        let id = scheduler.worklist()[0];

        rig.step(&mut scheduler);
        assert!(matches!(scheduler.node(id).state(), NodeState::Traced { .. }));
        let target = match scheduler.node(id).state() {
            NodeState::Traced { target, .. } => *target,
            _ => unreachable!(),
        };
        assert!((target - 4.0).abs() < 1e-4);

        // grows to 1.5, 3.0, 4.5, then completes
        for _ in 0..3 {
            rig.step(&mut scheduler);
            assert!(matches!(scheduler.node(id).state(), NodeState::Animating { .. }));
        }
        rig.step(&mut scheduler);
        assert!(scheduler.node(id).state().is_complete());
        assert!(scheduler.tree_complete());

        let trace = *scheduler.node(id).state().trace().unwrap();
        assert_eq!(rig.output.pixel(0, 0), Some(trace.initial_color));
        assert_eq!(scheduler.node(id).color(), trace.initial_color);
    }

    #[test]
    fn test_hidden_reflection_keeps_direct_light() {
        let mut rig = Rig::new(sphere_scene(Material::mirror(Color::new(0.2, 0.2, 0.2), 0.5)), config(1, 1));
        let mut scheduler = rig.scheduler();
        let primary = scheduler.worklist()[0];
        while rig.step(&mut scheduler) == DriverStatus::Running {}

        let trace = *scheduler.node(primary).state().trace().unwrap();
        assert_ne!(trace.initial_color, trace.final_color);
        assert_eq!(scheduler.worklist().len(), 1);
        assert_eq!(rig.output.pixel(0, 0), Some(trace.initial_color));
    }

    #[test]
    fn test_reflection_chain_reveals_parent_composite() {
        let mut cfg = config(1, 1);
        cfg.max_depth = 2;
        cfg.debug.reflection_rays = true;
        let mut scene = sphere_scene(Material::mirror(Color::new(1.0, 0.0, 0.0), 0.5));
        scene.add(Sphere::new(
            Vec3A::new(0.0, 0.0, 4.0),
            1.0,
            Material::mirror(Color::new(0.0, 1.0, 0.0), 0.5),
        ));
        let mut rig = Rig::new(scene, cfg);
        let mut scheduler = rig.scheduler();
        let primary = scheduler.worklist()[0];
        while rig.step(&mut scheduler) == DriverStatus::Running {}

        // primary -> green mirror -> red mirror again
        let chain: Vec<_> = scheduler.worklist().to_vec();
        assert_eq!(chain.len(), 3);
        let leaf = chain[2];
        let parent = scheduler.node(leaf).parent().unwrap();
        assert_eq!(scheduler.node(parent).parent(), Some(primary));

        let parent_final = scheduler.node(parent).state().trace().unwrap().final_color;
        let root_final = scheduler.node(primary).state().trace().unwrap().final_color;
        assert_ne!(parent_final, root_final);
        assert_eq!(rig.output.pixel(0, 0), Some(parent_final));
    }

    #[test]
    fn test_shadow_children_spawned() {
        let mut cfg = config(1, 1);
        cfg.debug.shadow_rays = true;
        let mut scene = sphere_scene(Material::diffuse(Color::ONE));
        scene.add_light(Light::point(Vec3A::new(0.0, -3.0, 0.0)));
        let mut rig = Rig::new(scene, cfg);
        let mut scheduler = rig.scheduler();
        while rig.step(&mut scheduler) == DriverStatus::Running {}

        let shadows: Vec<_> = scheduler
            .worklist()
            .iter()
            .map(|&id| scheduler.node(id))
            .filter(|n| n.kind().is_shadow())
            .collect();
        assert_eq!(shadows.len(), 2);
        for node in shadows {
            assert_eq!(node.parent(), Some(scheduler.worklist()[0]));
            assert!(node.state().is_complete());
        }
    }

    #[test]
    fn test_reflection_reveals_composite_last() {
        let mut cfg = config(1, 1);
        cfg.debug.reflection_rays = true;
        let mut scene = sphere_scene(Material::mirror(Color::new(0.2, 0.2, 0.2), 0.5));
        // Something for the reflection to hit, behind the camera
        scene.add(Sphere::new(Vec3A::new(0.0, 0.0, 4.0), 1.0, Material::diffuse(Color::new(0.0, 1.0, 0.0))));
        let mut rig = Rig::new(scene, cfg);
        let mut scheduler = rig.scheduler();
        let primary = scheduler.worklist()[0];

        let mut saw_initial = false;
        while rig.step(&mut scheduler) == DriverStatus::Running {
            let node = scheduler.node(primary);
            if let NodeState::Complete { trace, .. } = node.state() {
                if !scheduler.tree_complete() && rig.output.pixel(0, 0) == Some(trace.initial_color) {
                    saw_initial = true;
                }
            }
        }
        let trace = *scheduler.node(primary).state().trace().unwrap();
        assert!(saw_initial);
        assert_ne!(trace.initial_color, trace.final_color);
        assert_eq!(rig.output.pixel(0, 0), Some(trace.final_color));

        let reflection = scheduler
            .worklist()
            .iter()
            .find(|&&id| scheduler.node(id).kind() == NodeKind::Secondary(SecondaryKind::Reflection))
            .copied()
            .unwrap();
        assert_eq!(scheduler.node(reflection).parent(), Some(primary));
    }

    #[test]
    fn test_every_tick_makes_progress() {
        let mut cfg = config(6, 4);
        cfg.anim_step = 0.7;
        cfg.max_depth = 3;
        cfg.debug.shadow_rays = true;
        cfg.debug.reflection_rays = true;
        cfg.debug.refraction_rays = true;
        let mut rig = Rig::new(Scene::demo(9), cfg);
        rig.camera = PinholeCamera::looking_at(Vec3A::new(0.0, 2.0, 8.0), Vec3A::new(0.0, 0.5, 0.0), 50.0);
        let mut scheduler = rig.scheduler();

        let mut ticks = 0;
        while !scheduler.tree_complete() {
            let before: Vec<_> = scheduler
                .worklist()
                .iter()
                .map(|&id| (id, progress(scheduler.node(id).state())))
                .collect();
            let live_before = scheduler.worklist().len();
            rig.step(&mut scheduler);
            ticks += 1;
            assert!(ticks < 10_000, "pass did not terminate");

            let mut advanced = scheduler.worklist().len() > live_before;
            for (id, old) in before {
                if !scheduler.worklist().contains(&id) {
                    advanced = true;
                    continue;
                }
                let new = progress(scheduler.node(id).state());
                assert!(new >= old, "node {:?} went backwards", id);
                advanced |= new > old;
            }
            assert!(advanced, "tick {} made no progress", ticks);
        }
        assert!(scheduler.worklist().iter().all(|&id| scheduler.node(id).state().is_complete()));
    }

    #[test]
    fn test_node_budget_limits_work_per_tick() {
        let mut cfg = config(3, 3);
        cfg.anim_nodes_per_tick = 2;
        let mut rig = Rig::new(sphere_scene(Material::diffuse(Color::ONE)), cfg);
        let mut scheduler = rig.scheduler();
        rig.step(&mut scheduler);
        let stats = scheduler.stats();
        assert_eq!(stats.untraced, 7);
        assert_eq!(stats.traced + stats.removed, 2);
        while rig.step(&mut scheduler) == DriverStatus::Running {}
        assert_eq!(scheduler.stats().untraced, 0);
    }

    #[test]
    fn test_settle_draws_full_tree_with_duration() {
        let mut cfg = config(1, 1);
        cfg.settle_secs = 0.5;
        let mut rig = Rig::new(sphere_scene(Material::diffuse(Color::ONE)), cfg);
        let mut scheduler = rig.scheduler();
        while !scheduler.tree_complete() {
            rig.step(&mut scheduler);
        }
        let lines = rig.sink.take();
        let last = lines.last().unwrap();
        assert_eq!(last.duration, Duration::from_millis(500));
        assert!((last.end - Vec3A::new(0.0, 0.0, -4.0)).length() < 1e-3);
    }

    #[test]
    fn test_pause_before_finishing() {
        let mut cfg = config(1, 1);
        cfg.anim_pause_secs = 0.05;
        let mut rig = Rig::new(Scene::new(), cfg);
        let mut scheduler = rig.scheduler();
        assert_eq!(rig.step(&mut scheduler), DriverStatus::Running);
        assert!(scheduler.tree_complete());
        // 16 ms per tick: 50 ms of pause takes four ticks
        let mut ticks = 0;
        while rig.step(&mut scheduler) == DriverStatus::Running {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
        assert_eq!(rig.output.commits(), 1);
    }
}
