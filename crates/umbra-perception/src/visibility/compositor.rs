//! The visibility compositor: accumulates light and vision shapes into the
//! vision mask each frame and answers point-visibility queries against the
//! live source collections.

use std::collections::HashMap;

use anyhow::Result;
use log::{debug, warn};

use crate::config::Color;
use crate::coords::{Rect, ScenePoint};
use crate::frame::PerceptionFrameState;
use crate::group::Layer;
use crate::mask::{Channel, MaskTexture, RenderTargetCache, TargetStack};
use crate::registry::EffectSourceRegistry;
use crate::scene::{SceneState, TokenDetectionMode};
use crate::source::{EffectSource, SourceKind};

use super::detection::{BasicSight, DetectionContext, DetectionMode, DetectionModeRegistry, LightPerception};
use super::fog::FogTexture;

/// Channel value written for full coverage.
const FULL: u8 = 255;

/// Options for a point-visibility query.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTestOptions<'a> {
    /// Pixel tolerance; zero tests only the center point.
    pub tolerance: f32,
    /// Target token id; `None` for non-token targets, which are only
    /// testable by the built-in modes.
    pub token_id: Option<&'a str>,
    /// A viewer that bypasses vision restriction entirely.
    pub unrestricted_viewer: bool,
}

/// A secondary scene-wide illumination layer gated by a darkness range.
#[derive(Debug, Clone)]
pub struct IlluminationMesh {
    pub id: String,
    /// Inclusive darkness-level range [min, max] within which the mesh
    /// shows.
    pub darkness_range: (f32, f32),
    /// An excluded mesh forces an extra containment step in later masking
    /// passes instead of contributing to the accumulated light.
    pub excluded: bool,
    visible: bool,
}

impl IlluminationMesh {
    pub fn new(id: impl Into<String>, darkness_range: (f32, f32), excluded: bool) -> Self {
        Self {
            id: id.into(),
            darkness_range,
            excluded,
            visible: false,
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Buffers that exist only while the compositor is drawn.
struct Buffers {
    /// Frame accumulation. Channels: red = lit area, green = vision
    /// field-of-view, blue = light perception.
    vision: MaskTexture,
    /// Preview accumulation; same channel layout, never committed to fog.
    preview: MaskTexture,
    /// Cached static-light layer, re-rendered only on invalidation.
    light_cache: RenderTargetCache,
    fog: FogTexture,
}

/// Per-frame visibility composition over the effect source registry.
///
/// Follows the two-phase lifecycle: buffers are allocated by `draw` and
/// dropped by `tear_down`; refresh and query calls before `draw` are a
/// programmer error and panic.
pub struct VisibilityCompositor {
    width: u32,
    height: u32,
    buffers: Option<Buffers>,
    targets: TargetStack,

    /// Cacheable light sources currently baked into the light cache,
    /// by update id.
    cached: HashMap<String, u64>,
    /// Diagnostic: how many times the light cache was actually re-rendered.
    cache_renders: u64,

    illumination_meshes: Vec<IlluminationMesh>,
    global_light_active: bool,
    /// Set when a visible excluded mesh requires the extra containment step.
    excluded_containment: bool,

    detection: DetectionModeRegistry,
    /// Detection filter assigned per detected token, keyed by token id.
    assigned_filters: HashMap<String, String>,

    /// Whether fog/vision masking applies this frame.
    visible: bool,
    /// Frame-level viewer restriction snapshot, taken at refresh.
    unrestricted_viewer: bool,
}

impl VisibilityCompositor {
    pub fn new(scene_width: u32, scene_height: u32) -> Self {
        Self {
            width: scene_width.max(1),
            height: scene_height.max(1),
            buffers: None,
            targets: TargetStack::new(),
            cached: HashMap::new(),
            cache_renders: 0,
            illumination_meshes: Vec::new(),
            global_light_active: false,
            excluded_containment: false,
            detection: DetectionModeRegistry::with_builtins(),
            assigned_filters: HashMap::new(),
            visible: false,
            unrestricted_viewer: false,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn global_light_active(&self) -> bool {
        self.global_light_active
    }

    /// Whether a visible excluded illumination mesh requires the extra
    /// containment step in later masking passes.
    #[inline]
    pub fn excluded_containment(&self) -> bool {
        self.excluded_containment
    }

    #[inline]
    pub fn cache_renders(&self) -> u64 {
        self.cache_renders
    }

    pub fn detection_modes_mut(&mut self) -> &mut DetectionModeRegistry {
        &mut self.detection
    }

    /// Detection filter last assigned to a token, if it was detected by a
    /// non-built-in mode.
    pub fn assigned_filter(&self, token_id: &str) -> Option<&str> {
        self.assigned_filters.get(token_id).map(String::as_str)
    }

    pub fn add_illumination_mesh(&mut self, mesh: IlluminationMesh) {
        self.illumination_meshes.push(mesh);
    }

    pub fn vision_mask(&self) -> &MaskTexture {
        &self.buffers().vision
    }

    pub fn preview_mask(&self) -> &MaskTexture {
        &self.buffers().preview
    }

    pub fn fog(&self) -> &FogTexture {
        &self.buffers().fog
    }

    fn buffers(&self) -> &Buffers {
        self.buffers
            .as_ref()
            .unwrap_or_else(|| panic!("visibility compositor used before draw()"))
    }

    /// Reallocates all buffers for new scene dimensions.
    pub fn resize(&mut self, scene_width: u32, scene_height: u32) {
        self.width = scene_width.max(1);
        self.height = scene_height.max(1);
        if let Some(bufs) = self.buffers.as_mut() {
            bufs.vision.resize(self.width, self.height);
            bufs.preview.resize(self.width, self.height);
            bufs.light_cache.resize(self.width, self.height);
            bufs.fog.resize(self.width, self.height);
            self.cached.clear();
        }
    }

    // ── per-frame refresh ─────────────────────────────────────────────────

    /// Recomposites the vision mask from the current source collections.
    ///
    /// # Panics
    /// Panics when called before `draw`.
    pub fn refresh_visibility(
        &mut self,
        frame: &mut PerceptionFrameState,
        scene: &SceneState,
        registry: &EffectSourceRegistry,
    ) {
        let Some(bufs) = self.buffers.as_mut() else {
            panic!("visibility compositor refreshed before draw()");
        };

        self.unrestricted_viewer = frame.unrestricted_viewer;

        if !scene.token_vision {
            self.visible = false;
            return;
        }
        self.visible = true;

        bufs.vision.clear(Color::TRANSPARENT);
        bufs.preview.clear(Color::TRANSPARENT);

        // ── cached + live lights ──────────────────────────────────────────
        let mut cacheable_now: HashMap<String, u64> = HashMap::new();
        for src in registry.lights() {
            if src.is_active() && !src.data().global && Self::is_cacheable(src, scene) {
                cacheable_now.insert(src.id().to_string(), src.core().update_id());
            }
        }
        // Any membership or update-id difference invalidates the whole
        // cached layer; partial repaints of a shared buffer are not sound.
        if cacheable_now != self.cached {
            self.cached = cacheable_now;
            bufs.light_cache.mark_dirty();
        }

        let cached = &self.cached;
        let mut renders = 0u64;
        bufs.light_cache.render(
            &mut self.targets,
            |tex| {
                renders += 1;
                for src in registry.lights() {
                    if !src.is_active() || !cached.contains_key(src.id()) {
                        continue;
                    }
                    tex.fill_polygon_channel(src.shape(), Channel::Red, FULL);
                    if src.data().provides_vision {
                        tex.fill_polygon_channel(src.shape(), Channel::Green, FULL);
                    }
                }
            },
            None,
        );
        self.cache_renders += renders;
        bufs.vision.blend_max(bufs.light_cache.texture());

        for src in registry.lights() {
            if !src.is_active() || src.data().global {
                continue;
            }
            let data = src.data();
            if !self.cached.contains_key(src.id()) {
                let target = if data.preview { &mut bufs.preview } else { &mut bufs.vision };
                target.fill_polygon_channel(src.shape(), Channel::Red, FULL);
                if data.provides_vision {
                    target.fill_polygon_channel(src.shape(), Channel::Green, FULL);
                }
            }
            if data.provides_vision && !data.preview {
                frame.fog_commit = true;
            }
        }

        // ── dynamic illumination ──────────────────────────────────────────
        let env = &scene.environment;
        self.global_light_active =
            env.global_light && in_range(frame.darkness_level, env.global_light_darkness_range);
        if self.global_light_active {
            let whole = Rect::new(0.0, 0.0, self.width as f32, self.height as f32);
            bufs.vision.fill_polygon_channel(
                &crate::geometry::Polygon::from_rect(whole),
                Channel::Red,
                FULL,
            );
        }

        // ── darkness erasure ──────────────────────────────────────────────
        // Darkness erases the light accumulated beneath it. When any
        // darkness source is active, light and darkness shapes repaint in
        // ascending priority with darkness after light at equal priority:
        // darkness wins ties, and only strictly higher-priority lights
        // re-light an erased area.
        let mut order: Vec<&EffectSource> = registry
            .darkness_sources()
            .iter()
            .filter(|s| s.is_active())
            .collect();
        if !order.is_empty() {
            order.extend(
                registry
                    .lights()
                    .iter()
                    .filter(|s| s.is_active() && !s.data().global),
            );
            order.sort_by_key(|s| (s.data().priority, s.kind() == SourceKind::Darkness));
            for src in order {
                let data = src.data();
                let target = if data.preview { &mut bufs.preview } else { &mut bufs.vision };
                if src.kind() == SourceKind::Darkness {
                    target.fill_polygon_channel(src.shape(), Channel::Red, 0);
                    target.fill_polygon_channel(src.shape(), Channel::Green, 0);
                } else {
                    target.fill_polygon_channel(src.shape(), Channel::Red, FULL);
                    if data.provides_vision {
                        target.fill_polygon_channel(src.shape(), Channel::Green, FULL);
                    }
                }
            }
        }

        for mesh in &mut self.illumination_meshes {
            mesh.visible = in_range(frame.darkness_level, mesh.darkness_range);
        }
        self.excluded_containment = self
            .illumination_meshes
            .iter()
            .any(|m| m.visible && m.excluded);

        // ── vision sources ────────────────────────────────────────────────
        for src in registry.vision_sources() {
            if !src.is_active() {
                continue;
            }
            let data = src.data();
            let target = if data.preview { &mut bufs.preview } else { &mut bufs.vision };
            target.fill_polygon_channel(src.shape(), Channel::Green, FULL);
            if let Some(vision) = src.as_vision() {
                target.fill_polygon_channel(vision.perception_shape(), Channel::Blue, FULL);
            }
            if !data.preview {
                frame.fog_commit = true;
            }
        }

        // ── fog commit ────────────────────────────────────────────────────
        if frame.fog_commit {
            bufs.fog.commit(&bufs.vision);
        }
    }

    /// A source qualifies for the cached layer when its geometry cannot
    /// change silently mid-frame: not a drag preview, and not attached to a
    /// token that is currently moving.
    fn is_cacheable(src: &EffectSource, scene: &SceneState) -> bool {
        if src.data().preview {
            return false;
        }
        match src.data().attached_token.as_deref() {
            Some(token_id) => scene.token(token_id).is_none_or(|t| !t.moving),
            None => true,
        }
    }

    // ── point queries ─────────────────────────────────────────────────────

    /// Tests whether the current viewer can see `point`.
    pub fn test_visibility(
        &mut self,
        point: ScenePoint,
        options: &VisibilityTestOptions<'_>,
        scene: &SceneState,
        registry: &EffectSourceRegistry,
    ) -> bool {
        let detected = self.run_visibility_test(point, options, scene, registry);
        if !detected
            && let Some(token_id) = options.token_id
        {
            self.assigned_filters.remove(token_id);
        }
        detected
    }

    fn run_visibility_test(
        &mut self,
        point: ScenePoint,
        options: &VisibilityTestOptions<'_>,
        scene: &SceneState,
        registry: &EffectSourceRegistry,
    ) -> bool {
        let has_vision_source = registry.vision_sources().iter().any(|s| s.is_active());
        if !has_vision_source {
            // Without a single vision source the unrestricted viewer sees
            // everything and the restricted viewer nothing. The per-query
            // option and the per-frame viewer restriction both qualify.
            return options.unrestricted_viewer || self.unrestricted_viewer;
        }

        let points = offset_points(point, options.tolerance);

        // Vision-providing light sources win first.
        for src in registry.lights() {
            if !src.is_active() || !src.data().provides_vision {
                continue;
            }
            if src.data().global {
                let (min, max) = src.data().darkness_range;
                let level = registry.get_darkness_level(point, scene);
                if level >= min && level <= max {
                    return true;
                }
                continue;
            }
            if points.iter().any(|&p| src.test_point(p.xy())) {
                return true;
            }
        }

        // Vision sources on the other side of the padding boundary cannot
        // see across it.
        let candidates: Vec<&EffectSource> = registry
            .vision_sources()
            .iter()
            .filter(|s| s.is_active())
            .filter(|s| {
                scene
                    .dimensions
                    .same_padding_side(s.data().position.xy(), point.xy())
            })
            .collect();

        let ctx = DetectionContext {
            points: &points,
            registry,
            scene,
        };
        let sight = unlimited(BasicSight::ID);
        if candidates
            .iter()
            .any(|src| BasicSight.test_visibility(src, &sight, &ctx))
        {
            return true;
        }
        let perception = unlimited(LightPerception::ID);
        if candidates
            .iter()
            .any(|src| LightPerception.test_visibility(src, &perception, &ctx))
        {
            return true;
        }

        // Non-token targets are only testable by the built-in modes.
        let Some(token_id) = options.token_id else {
            return false;
        };
        let Some(token) = scene.token(token_id) else {
            debug!("test_visibility: token '{token_id}' not in scene");
            return false;
        };

        let declared: Vec<TokenDetectionMode> = token
            .detection_modes
            .iter()
            .filter(|m| {
                m.enabled && m.mode_id != BasicSight::ID && m.mode_id != LightPerception::ID
            })
            .cloned()
            .collect();
        for config in &declared {
            let Some(mode) = self.detection.get(&config.mode_id) else {
                warn!("unknown detection mode '{}'; skipping", config.mode_id);
                continue;
            };
            if candidates
                .iter()
                .any(|src| mode.test_visibility(src, config, &ctx))
            {
                self.assigned_filters
                    .insert(token_id.to_string(), config.mode_id.clone());
                return true;
            }
        }
        false
    }
}

impl Layer for VisibilityCompositor {
    fn name(&self) -> &str {
        "visibility"
    }

    fn draw(&mut self) -> Result<()> {
        self.tear_down();
        self.buffers = Some(Buffers {
            vision: MaskTexture::new(self.width, self.height),
            preview: MaskTexture::new(self.width, self.height),
            light_cache: RenderTargetCache::new("light-cache", self.width, self.height),
            fog: FogTexture::new(self.width, self.height),
        });
        debug!("visibility compositor drawn at {}x{}", self.width, self.height);
        Ok(())
    }

    fn tear_down(&mut self) {
        if self.buffers.take().is_some() {
            debug!("visibility compositor torn down");
        }
        self.cached.clear();
        self.assigned_filters.clear();
        self.visible = false;
        self.global_light_active = false;
        self.excluded_containment = false;
        self.unrestricted_viewer = false;
    }
}

#[inline]
fn in_range(value: f32, range: (f32, f32)) -> bool {
    value >= range.0 && value <= range.1
}

fn unlimited(mode_id: &str) -> TokenDetectionMode {
    TokenDetectionMode {
        mode_id: mode_id.to_string(),
        enabled: true,
        range: 0.0,
    }
}

/// Center point plus, for a positive tolerance, eight surrounding offsets.
fn offset_points(point: ScenePoint, tolerance: f32) -> Vec<ScenePoint> {
    if tolerance <= 0.0 {
        return vec![point];
    }
    let t = tolerance;
    let mut points = Vec::with_capacity(9);
    points.push(point);
    for (dx, dy) in [
        (-t, 0.0),
        (t, 0.0),
        (0.0, -t),
        (0.0, t),
        (-t, -t),
        (t, -t),
        (-t, t),
        (t, t),
    ] {
        points.push(point.offset(dx, dy));
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceData;
    use crate::time::FrameClock;

    fn drawn_compositor(w: u32, h: u32) -> VisibilityCompositor {
        let mut c = VisibilityCompositor::new(w, h);
        c.draw().unwrap();
        c
    }

    fn scene_with_vision() -> SceneState {
        SceneState {
            token_vision: true,
            ..SceneState::default()
        }
    }

    fn frame() -> PerceptionFrameState {
        PerceptionFrameState::new(FrameClock::new().tick(), 0.0)
    }

    fn static_light(id: &str, x: f32, y: f32, radius: f32) -> EffectSource {
        let data = SourceData {
            position: ScenePoint::flat(x, y),
            radius,
            provides_vision: true,
            ..SourceData::default()
        };
        let mut src = EffectSource::light(id, data.clone());
        src.initialize(data);
        src
    }

    fn plain_light(id: &str, x: f32, y: f32, radius: f32) -> EffectSource {
        let data = SourceData {
            position: ScenePoint::flat(x, y),
            radius,
            ..SourceData::default()
        };
        let mut src = EffectSource::light(id, data.clone());
        src.initialize(data);
        src
    }

    fn dark_source(id: &str, x: f32, y: f32, radius: f32, priority: i32) -> EffectSource {
        let data = SourceData {
            position: ScenePoint::flat(x, y),
            radius,
            priority,
            ..SourceData::default()
        };
        let mut src = EffectSource::darkness(id, data.clone());
        src.initialize(data);
        src
    }

    fn vision_source(id: &str, x: f32, y: f32, radius: f32) -> EffectSource {
        let data = SourceData {
            position: ScenePoint::flat(x, y),
            radius,
            perception_radius: radius * 2.0,
            ..SourceData::default()
        };
        let mut src = EffectSource::vision(id, data.clone());
        src.initialize(data);
        src
    }

    fn red_at(c: &VisibilityCompositor, x: f32, y: f32) -> u8 {
        c.vision_mask().sample(crate::coords::Vec2::new(x, y), Channel::Red)
    }

    // ── light caching ─────────────────────────────────────────────────────

    #[test]
    fn static_light_rendered_once_and_cached() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 100.0, 100.0, 50.0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);

        assert_eq!(c.cache_renders(), 1);
        assert!(c.vision_mask().any_coverage(Channel::Red));
        // A non-preview vision-providing light commits fog.
        assert_eq!(c.fog().commits(), 2);
    }

    #[test]
    fn cacheability_change_invalidates_whole_cache() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 100.0, 100.0, 50.0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert_eq!(c.cache_renders(), 1);

        // The same source becomes a drag preview: no longer cacheable.
        let data = SourceData {
            position: ScenePoint::flat(100.0, 100.0),
            radius: 50.0,
            provides_vision: true,
            preview: true,
            ..SourceData::default()
        };
        let mut preview = EffectSource::light("lamp", data.clone());
        preview.initialize(data);
        registry.insert(preview);

        let commits_before = c.fog().commits();
        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);

        assert_eq!(c.cache_renders(), 2);
        assert!(c.preview_mask().any_coverage(Channel::Red));
        // Preview sources never commit fog.
        assert_eq!(c.fog().commits(), commits_before);
    }

    #[test]
    fn moved_light_invalidates_by_update_id() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 50.0, 50.0, 40.0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);

        registry.reinitialize(
            crate::source::SourceKind::Light,
            "lamp",
            SourceData {
                position: ScenePoint::flat(200.0, 200.0),
                radius: 40.0,
                provides_vision: true,
                ..SourceData::default()
            },
        );
        registry.initialize_light_sources();

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert_eq!(c.cache_renders(), 2);
        assert_ne!(c.vision_mask().sample(crate::coords::Vec2::new(200.0, 200.0), Channel::Red), 0);
    }

    #[test]
    fn non_vision_light_cached_without_fog_commit() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(plain_light("lamp", 100.0, 100.0, 50.0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);

        // Lit but not seen: red only, and the exploration buffer never
        // receives a commit.
        assert_eq!(c.cache_renders(), 1);
        assert!(c.vision_mask().any_coverage(Channel::Red));
        assert!(!c.vision_mask().any_coverage(Channel::Green));
        assert_eq!(c.fog().commits(), 0);
    }

    // ── darkness erasure ──────────────────────────────────────────────────

    #[test]
    fn darkness_erases_overlapping_light() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 100.0, 100.0, 80.0));
        registry.insert(dark_source("gloom", 100.0, 100.0, 40.0, 0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);

        // Erased inside the darkness shape, lit in the surrounding ring.
        assert_eq!(red_at(&c, 100.0, 100.0), 0);
        assert_eq!(red_at(&c, 170.0, 100.0), 255);

        // The erased area never reaches the exploration buffer.
        assert!(!c.fog().is_explored(crate::coords::Vec2::new(100.0, 100.0)));
        assert!(c.fog().is_explored(crate::coords::Vec2::new(170.0, 100.0)));
    }

    #[test]
    fn darkness_wins_priority_ties() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 100.0, 100.0, 80.0));
        registry.insert(dark_source("gloom", 100.0, 100.0, 40.0, 0));
        // Same priority as the darkness source: still erased.

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert_eq!(red_at(&c, 100.0, 100.0), 0);
    }

    #[test]
    fn higher_priority_light_relights_erased_area() {
        let mut c = drawn_compositor(256, 256);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        let data = SourceData {
            position: ScenePoint::flat(100.0, 100.0),
            radius: 80.0,
            priority: 5,
            ..SourceData::default()
        };
        let mut lamp = EffectSource::light("beacon", data.clone());
        lamp.initialize(data);
        registry.insert(lamp);
        registry.insert(dark_source("gloom", 100.0, 100.0, 40.0, 1));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert_eq!(red_at(&c, 100.0, 100.0), 255);
    }

    // ── global light gating ───────────────────────────────────────────────

    #[test]
    fn global_light_gated_by_darkness_range() {
        let mut c = drawn_compositor(128, 128);
        let mut scene = scene_with_vision();
        scene.environment.global_light = true;
        scene.environment.global_light_darkness_range = (0.0, 0.25);
        let registry = EffectSourceRegistry::new();

        let mut f = frame();
        f.darkness_level = 0.1;
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(c.global_light_active());
        assert!(c.vision_mask().any_coverage(Channel::Red));

        let mut f = frame();
        f.darkness_level = 0.5;
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(!c.global_light_active());
        assert!(!c.vision_mask().any_coverage(Channel::Red));
    }

    #[test]
    fn excluded_mesh_forces_containment_step() {
        let mut c = drawn_compositor(64, 64);
        c.add_illumination_mesh(IlluminationMesh::new("cave-glow", (0.5, 1.0), true));
        let scene = scene_with_vision();
        let registry = EffectSourceRegistry::new();

        let mut f = frame();
        f.darkness_level = 0.2;
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(!c.excluded_containment());

        let mut f = frame();
        f.darkness_level = 0.8;
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(c.excluded_containment());
    }

    // ── hidden group ──────────────────────────────────────────────────────

    #[test]
    fn disabled_token_vision_hides_masking() {
        let mut c = drawn_compositor(64, 64);
        let scene = SceneState::default(); // token_vision = false
        let registry = EffectSourceRegistry::new();

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(!c.is_visible());
    }

    // ── point queries ─────────────────────────────────────────────────────

    #[test]
    fn no_vision_source_defaults_by_viewer_restriction() {
        let mut c = drawn_compositor(64, 64);
        let scene = scene_with_vision();
        let registry = EffectSourceRegistry::new();
        let p = ScenePoint::flat(10.0, 10.0);

        let restricted = VisibilityTestOptions::default();
        assert!(!c.test_visibility(p, &restricted, &scene, &registry));

        let unrestricted = VisibilityTestOptions {
            unrestricted_viewer: true,
            ..VisibilityTestOptions::default()
        };
        assert!(c.test_visibility(p, &unrestricted, &scene, &registry));
    }

    #[test]
    fn frame_viewer_restriction_reaches_point_queries() {
        let mut c = drawn_compositor(64, 64);
        let scene = scene_with_vision();
        let registry = EffectSourceRegistry::new();
        let p = ScenePoint::flat(10.0, 10.0);
        let opts = VisibilityTestOptions::default();

        // An unrestricted frame viewer sees everything even with default
        // query options.
        let mut f = frame();
        f.unrestricted_viewer = true;
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(c.test_visibility(p, &opts, &scene, &registry));

        // The snapshot is per-frame, not sticky.
        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(!c.test_visibility(p, &opts, &scene, &registry));
    }

    #[test]
    fn tolerance_zero_is_symmetric_between_viewers() {
        let mut c = drawn_compositor(64, 64);
        let scene = scene_with_vision();
        let a = ScenePoint::flat(100.0, 100.0);
        let b = ScenePoint::flat(400.0, 100.0);
        let opts = VisibilityTestOptions::default();

        // Equal sight radii: A seeing B's position implies the reverse.
        for radius in [350.0, 100.0] {
            let mut from_a = EffectSourceRegistry::new();
            from_a.insert(vision_source("a", a.x, a.y, radius));
            let mut from_b = EffectSourceRegistry::new();
            from_b.insert(vision_source("b", b.x, b.y, radius));

            assert_eq!(
                c.test_visibility(b, &opts, &scene, &from_a),
                c.test_visibility(a, &opts, &scene, &from_b),
            );
        }
    }

    #[test]
    fn tolerance_expands_the_probe() {
        let mut c = drawn_compositor(64, 64);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(vision_source("v", 0.0, 0.0, 100.0));

        // Just outside the FOV at the center, inside with an offset probe.
        let p = ScenePoint::flat(110.0, 0.0);
        let exact = VisibilityTestOptions::default();
        assert!(!c.test_visibility(p, &exact, &scene, &registry));

        let loose = VisibilityTestOptions {
            tolerance: 20.0,
            ..VisibilityTestOptions::default()
        };
        assert!(c.test_visibility(p, &loose, &scene, &registry));
    }

    #[test]
    fn padding_boundary_filters_vision_sources() {
        let mut c = drawn_compositor(64, 64);
        let mut scene = scene_with_vision();
        scene.dimensions = crate::scene::SceneDimensions::new(1000.0, 1000.0, 200.0);
        let mut registry = EffectSourceRegistry::new();
        // Viewer stands in the padding ring.
        registry.insert(vision_source("v", -100.0, 500.0, 400.0));

        // A point inside the playable area is across the boundary.
        let inside = ScenePoint::flat(100.0, 500.0);
        let opts = VisibilityTestOptions::default();
        assert!(!c.test_visibility(inside, &opts, &scene, &registry));

        // A point in the padding on the same side is visible.
        let padding = ScenePoint::flat(-50.0, 500.0);
        assert!(c.test_visibility(padding, &opts, &scene, &registry));
    }

    #[test]
    fn token_detection_mode_assigns_filter() {
        struct Tremorsense;
        impl DetectionMode for Tremorsense {
            fn id(&self) -> &str {
                "tremorsense"
            }
            fn test_visibility(
                &self,
                source: &EffectSource,
                config: &TokenDetectionMode,
                ctx: &DetectionContext<'_>,
            ) -> bool {
                ctx.points.iter().any(|p| {
                    source.data().position.xy().distance(p.xy()) <= config.range
                })
            }
        }

        let mut c = drawn_compositor(64, 64);
        let mut scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(vision_source("v", 0.0, 0.0, 50.0));
        c.detection_modes_mut().register(Box::new(Tremorsense));

        let mut target = crate::scene::Token::new(
            "burrower",
            crate::coords::Vec2::new(200.0, 0.0),
            Rect::new(195.0, -5.0, 10.0, 10.0),
        );
        target.detection_modes.push(TokenDetectionMode {
            mode_id: "tremorsense".into(),
            enabled: true,
            range: 300.0,
        });
        scene.tokens.push(target);

        // Out of sight (FOV radius 50) but within tremorsense range.
        let p = ScenePoint::flat(200.0, 0.0);
        let opts = VisibilityTestOptions {
            token_id: Some("burrower"),
            ..VisibilityTestOptions::default()
        };
        assert!(c.test_visibility(p, &opts, &scene, &registry));
        assert_eq!(c.assigned_filter("burrower"), Some("tremorsense"));

        // Undetected on a later test: the filter assignment is cleared.
        let far = ScenePoint::flat(2000.0, 0.0);
        assert!(!c.test_visibility(far, &opts, &scene, &registry));
        assert_eq!(c.assigned_filter("burrower"), None);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    #[should_panic(expected = "before draw()")]
    fn refresh_before_draw_panics() {
        let mut c = VisibilityCompositor::new(64, 64);
        let scene = scene_with_vision();
        let registry = EffectSourceRegistry::new();
        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
    }

    #[test]
    fn tear_down_then_redraw_starts_clean() {
        let mut c = drawn_compositor(128, 128);
        let scene = scene_with_vision();
        let mut registry = EffectSourceRegistry::new();
        registry.insert(static_light("lamp", 50.0, 50.0, 40.0));

        let mut f = frame();
        c.refresh_visibility(&mut f, &scene, &registry);
        assert!(c.fog().commits() > 0);

        c.tear_down();
        c.draw().unwrap();
        assert_eq!(c.fog().commits(), 0);
        assert!(!c.vision_mask().any_coverage(Channel::Red));
    }
}
