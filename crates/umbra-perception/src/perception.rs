//! The perception facade: one object owning the registry, masks, fog, and
//! timing, exposing the per-frame entry points an embedding renderer calls.

use anyhow::Result;
use log::debug;

use crate::config::PerceptionConfig;
use crate::coords::ScenePoint;
use crate::frame::PerceptionFrameState;
use crate::group::Layer;
use crate::mask::{DepthMask, OcclusionMask};
use crate::registry::{EffectSourceRegistry, SourcePredicate};
use crate::scene::SceneState;
use crate::time::{FrameClock, TransitionOutcome, Transitions};
use crate::visibility::{VisibilityCompositor, VisibilityTestOptions};

/// Name of the darkness-level transition; starting a new one cancels any
/// in-flight animation of the same name.
const DARKNESS_TRANSITION: &str = "darkness";

/// Owns the whole perception pipeline for one scene.
pub struct Perception {
    pub config: PerceptionConfig,
    scene: SceneState,
    registry: EffectSourceRegistry,
    compositor: VisibilityCompositor,
    depth: DepthMask,
    occlusion: OcclusionMask,
    transitions: Transitions,
    clock: FrameClock,
}

impl Perception {
    pub fn new(config: PerceptionConfig, scene: SceneState) -> Self {
        let size = scene.dimensions.scene_rect.size;
        let (w, h) = (size.x.max(1.0) as u32, size.y.max(1.0) as u32);
        Self {
            config,
            scene,
            registry: EffectSourceRegistry::new(),
            compositor: VisibilityCompositor::new(w, h),
            depth: DepthMask::new(w, h),
            occlusion: OcclusionMask::new(w, h),
            transitions: Transitions::new(),
            clock: FrameClock::new(),
        }
    }

    // ── access ────────────────────────────────────────────────────────────

    #[inline]
    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    /// Mutable scene access for document updates. Callers changing object
    /// elevations or membership must also call [`Perception::mark_depth_dirty`].
    pub fn scene_mut(&mut self) -> &mut SceneState {
        &mut self.scene
    }

    #[inline]
    pub fn registry(&self) -> &EffectSourceRegistry {
        &self.registry
    }

    #[inline]
    pub fn registry_mut(&mut self) -> &mut EffectSourceRegistry {
        &mut self.registry
    }

    #[inline]
    pub fn compositor(&self) -> &VisibilityCompositor {
        &self.compositor
    }

    #[inline]
    pub fn compositor_mut(&mut self) -> &mut VisibilityCompositor {
        &mut self.compositor
    }

    #[inline]
    pub fn depth_mask(&self) -> &DepthMask {
        &self.depth
    }

    #[inline]
    pub fn occlusion_mask(&self) -> &OcclusionMask {
        &self.occlusion
    }

    pub fn mark_depth_dirty(&mut self) {
        self.depth.mark_dirty();
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Allocates the compositor buffers; must run before the first frame.
    pub fn draw(&mut self) -> Result<()> {
        self.compositor.draw()
    }

    pub fn tear_down(&mut self) {
        self.compositor.tear_down();
    }

    // ── frame loop ────────────────────────────────────────────────────────

    /// Starts a frame: advances the clock, applies running darkness
    /// transitions, animates sources, and snapshots frame state.
    pub fn begin_frame(&mut self) -> PerceptionFrameState {
        let time = self.clock.tick();

        let scene = &mut self.scene;
        self.transitions.tick(time.dt, |name, value| {
            if name == DARKNESS_TRANSITION {
                scene.darkness_level = value.clamp(0.0, 1.0);
            }
        });

        self.registry.animate(time.dt, &self.config);

        PerceptionFrameState::new(time, self.scene.darkness_level)
    }

    /// Full lighting refresh: recompute source geometry, rebuild the
    /// priority edge list, and recomposite visibility.
    pub fn refresh_lighting(&mut self, frame: &mut PerceptionFrameState) {
        self.registry.initialize_light_sources();
        self.registry.initialize_priority_light_sources();
        self.compositor
            .refresh_visibility(frame, &self.scene, &self.registry);
    }

    /// Uniform-only refresh of light and darkness sources.
    pub fn refresh_light_sources(&mut self) {
        self.registry.refresh_light_sources();
    }

    /// Re-initializes vision source geometry and uniforms.
    pub fn refresh_vision_sources(&mut self) {
        self.registry.initialize_vision_sources();
        self.registry.refresh_vision_sources();
    }

    /// Occlusion pass: redraw the occlusion mask, recompute per-object
    /// occlusion states (debounced), and refresh the depth mask.
    pub fn update_occlusion(&mut self, frame: &PerceptionFrameState) {
        self.occlusion
            .update_occlusion(&mut self.scene, frame.time.now);
        self.depth.update(&self.scene);
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn test_inside_light(
        &self,
        point: ScenePoint,
        predicate: Option<SourcePredicate<'_>>,
    ) -> bool {
        self.registry.test_inside_light(point, &self.scene, predicate)
    }

    pub fn test_inside_darkness(
        &self,
        point: ScenePoint,
        predicate: Option<SourcePredicate<'_>>,
    ) -> bool {
        self.registry.test_inside_darkness(point, predicate)
    }

    pub fn get_darkness_level(&self, point: ScenePoint) -> f32 {
        self.registry.get_darkness_level(point, &self.scene)
    }

    pub fn test_visibility(
        &mut self,
        point: ScenePoint,
        options: &VisibilityTestOptions<'_>,
    ) -> bool {
        self.compositor
            .test_visibility(point, options, &self.scene, &self.registry)
    }

    /// Depth-band mapping (greatest band at or below the elevation).
    pub fn map_elevation_depth(&self, elevation: f32) -> f32 {
        self.depth.map_elevation(elevation)
    }

    /// Occlusion-band mapping (least band at or above the elevation).
    pub fn map_elevation_occlusion(&self, elevation: f32) -> f32 {
        self.occlusion.map_elevation(elevation)
    }

    // ── darkness animation ────────────────────────────────────────────────

    /// Animates the scene darkness level toward `target` over `duration`
    /// seconds, cancelling any in-flight darkness transition.
    ///
    /// Returns true when an animated transition started; false when the
    /// level jumped instantly (zero duration or already at target).
    pub fn animate_darkness(&mut self, target: f32, duration: f32) -> bool {
        let target = target.clamp(0.0, 1.0);
        let outcome = self.transitions.start(
            DARKNESS_TRANSITION,
            self.scene.darkness_level,
            target,
            duration,
        );
        match outcome {
            TransitionOutcome::Animated => {
                debug!("darkness transition to {target} over {duration}s");
                true
            }
            TransitionOutcome::Instant => {
                self.scene.darkness_level = target;
                false
            }
        }
    }

    /// Cancels a running darkness transition, leaving the level where the
    /// animation last applied.
    pub fn cancel_darkness_transition(&mut self) {
        self.transitions.cancel(DARKNESS_TRANSITION);
    }
}
