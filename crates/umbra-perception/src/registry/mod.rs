//! Effect source registry: the canonical collections of active light,
//! darkness, and vision sources plus the derived priority edge list.

use log::debug;

use crate::config::PerceptionConfig;
use crate::coords::ScenePoint;
use crate::scene::SceneState;
use crate::source::{EffectSource, SourceData, SourceKind};

/// Optional caller-supplied filter for point queries.
pub type SourcePredicate<'a> = &'a dyn Fn(&EffectSource) -> bool;

/// Entry in the derived edge list: which collection and which id.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EdgeEntry {
    pub kind: SourceKind,
    pub id: String,
}

/// Owns the three named source collections and the derived,
/// descending-priority list of edge-contributing sources.
///
/// Collections are insertion-ordered; the edge list is rebuilt only when
/// membership or data changes, never on pure repaint.
pub struct EffectSourceRegistry {
    lights: Vec<EffectSource>,
    darkness: Vec<EffectSource>,
    vision: Vec<EffectSource>,

    edge_list: Vec<EdgeEntry>,
    edge_dirty: bool,

    /// Light sources contribute edges only above this priority.
    pub light_priority_threshold: i32,
}

impl EffectSourceRegistry {
    pub fn new() -> Self {
        Self {
            lights: Vec::new(),
            darkness: Vec::new(),
            vision: Vec::new(),
            edge_list: Vec::new(),
            edge_dirty: true,
            light_priority_threshold: 0,
        }
    }

    fn collection(&self, kind: SourceKind) -> &Vec<EffectSource> {
        match kind {
            SourceKind::Light => &self.lights,
            SourceKind::Darkness => &self.darkness,
            SourceKind::Vision => &self.vision,
        }
    }

    fn collection_mut(&mut self, kind: SourceKind) -> &mut Vec<EffectSource> {
        match kind {
            SourceKind::Light => &mut self.lights,
            SourceKind::Darkness => &mut self.darkness,
            SourceKind::Vision => &mut self.vision,
        }
    }

    // ── membership ────────────────────────────────────────────────────────

    /// Registers a source, replacing any existing source with the same id
    /// in its collection.
    pub fn insert(&mut self, source: EffectSource) {
        let kind = source.kind();
        let id = source.id().to_string();
        let coll = self.collection_mut(kind);
        if let Some(existing) = coll.iter_mut().find(|s| s.id() == id) {
            *existing = source;
        } else {
            coll.push(source);
        }
        self.edge_dirty = true;
    }

    /// Removes a source. A missing id is already absent, not an error.
    pub fn remove(&mut self, kind: SourceKind, id: &str) {
        let coll = self.collection_mut(kind);
        let before = coll.len();
        coll.retain(|s| s.id() != id);
        if coll.len() != before {
            self.edge_dirty = true;
        }
    }

    pub fn get(&self, kind: SourceKind, id: &str) -> Option<&EffectSource> {
        self.collection(kind).iter().find(|s| s.id() == id)
    }

    pub fn lights(&self) -> &[EffectSource] {
        &self.lights
    }

    pub fn darkness_sources(&self) -> &[EffectSource] {
        &self.darkness
    }

    pub fn vision_sources(&self) -> &[EffectSource] {
        &self.vision
    }

    /// Re-initializes one source from new data and marks the edge list
    /// stale. The source must already be registered.
    pub fn reinitialize(&mut self, kind: SourceKind, id: &str, data: SourceData) {
        if let Some(src) = self
            .collection_mut(kind)
            .iter_mut()
            .find(|s| s.id() == id)
        {
            src.initialize(data);
            self.edge_dirty = true;
        } else {
            debug!("reinitialize: source '{id}' not registered; ignoring");
        }
    }

    // ── geometry / uniforms ───────────────────────────────────────────────

    /// Re-evaluates every light and darkness source's computed shape from
    /// its current data.
    pub fn initialize_light_sources(&mut self) {
        for src in self.lights.iter_mut().chain(self.darkness.iter_mut()) {
            let data = src.data().clone();
            src.initialize(data);
        }
    }

    /// Re-evaluates every vision source's shapes from current data.
    pub fn initialize_vision_sources(&mut self) {
        for src in &mut self.vision {
            let data = src.data().clone();
            src.initialize(data);
        }
    }

    /// Rebuilds the descending-priority edge list if stale and re-initializes
    /// each member's geometry regardless of whether the list itself changed.
    pub fn initialize_priority_light_sources(&mut self) -> &[EdgeEntry] {
        if self.edge_dirty {
            self.rebuild_edge_list();
        }

        // Geometry is always refreshed for members, even on a clean list.
        for i in 0..self.edge_list.len() {
            let EdgeEntry { kind, ref id } = self.edge_list[i];
            let id = id.clone();
            if let Some(src) = self
                .collection_mut(kind)
                .iter_mut()
                .find(|s| s.id() == id)
            {
                let data = src.data().clone();
                src.initialize(data);
            }
        }

        &self.edge_list
    }

    fn rebuild_edge_list(&mut self) {
        self.edge_list.clear();

        // Darkness always contributes; light only above the threshold.
        for src in &self.darkness {
            self.edge_list.push(EdgeEntry {
                kind: SourceKind::Darkness,
                id: src.id().to_string(),
            });
        }
        let threshold = self.light_priority_threshold;
        for src in &self.lights {
            if src.data().priority > threshold {
                self.edge_list.push(EdgeEntry {
                    kind: SourceKind::Light,
                    id: src.id().to_string(),
                });
            }
        }

        // Stable sort: descending priority, darkness before light at equal
        // priority (darkness entries were pushed first), insertion order
        // within a category.
        let priorities: Vec<i32> = self
            .edge_list
            .iter()
            .map(|e| self.get(e.kind, &e.id).map(|s| s.data().priority).unwrap_or(0))
            .collect();
        let mut order: Vec<usize> = (0..self.edge_list.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(priorities[i]));
        self.edge_list = order.iter().map(|&i| self.edge_list[i].clone()).collect();

        self.edge_dirty = false;
        debug!("edge list rebuilt: {} entries", self.edge_list.len());
    }

    /// Updates cached uniform state of light and darkness sources without
    /// recomputing geometry.
    pub fn refresh_light_sources(&mut self) {
        for src in self.lights.iter_mut().chain(self.darkness.iter_mut()) {
            src.refresh();
        }
    }

    /// Updates cached uniform state of vision sources without recomputing
    /// geometry.
    pub fn refresh_vision_sources(&mut self) {
        for src in &mut self.vision {
            src.refresh();
        }
    }

    // ── point queries ─────────────────────────────────────────────────────

    /// True when any active light source contains `point`.
    ///
    /// The scene-global light is tested for darkness-level range membership
    /// rather than polygon containment. Short-circuits on first match.
    pub fn test_inside_light(
        &self,
        point: ScenePoint,
        scene: &SceneState,
        predicate: Option<SourcePredicate<'_>>,
    ) -> bool {
        for src in &self.lights {
            if !src.is_active() {
                continue;
            }
            if let Some(pred) = predicate
                && !pred(src)
            {
                continue;
            }
            if src.data().global {
                let (min, max) = src.data().darkness_range;
                let level = self.get_darkness_level(point, scene);
                if level >= min && level <= max {
                    return true;
                }
                continue;
            }
            if src.test_point(point.xy()) {
                return true;
            }
        }
        false
    }

    /// True when any active darkness source contains `point`.
    pub fn test_inside_darkness(
        &self,
        point: ScenePoint,
        predicate: Option<SourcePredicate<'_>>,
    ) -> bool {
        for src in &self.darkness {
            if !src.is_active() {
                continue;
            }
            if let Some(pred) = predicate
                && !pred(src)
            {
                continue;
            }
            if src.test_point(point.xy()) {
                return true;
            }
        }
        false
    }

    /// Darkness level at `point`: the most specific containing region wins,
    /// falling back to the scene's ambient level.
    pub fn get_darkness_level(&self, point: ScenePoint, scene: &SceneState) -> f32 {
        let mut order: Vec<usize> = (0..scene.darkness_regions.len()).collect();
        // Most specific first: narrower elevation span, later insertion
        // breaking ties.
        order.sort_by(|&a, &b| {
            let ra = &scene.darkness_regions[a];
            let rb = &scene.darkness_regions[b];
            ra.elevation_span()
                .total_cmp(&rb.elevation_span())
                .then(b.cmp(&a))
        });
        for i in order {
            let region = &scene.darkness_regions[i];
            if region.contains(point) {
                return region.darkness_level;
            }
        }
        scene.darkness_level
    }

    // ── animation ─────────────────────────────────────────────────────────

    /// Per-tick animation. `animate_sources` gates light/darkness,
    /// `animate_vision` gates vision independently.
    pub fn animate(&mut self, dt: f32, config: &PerceptionConfig) {
        if config.animate_sources {
            for src in self.lights.iter_mut().chain(self.darkness.iter_mut()) {
                if src.is_active() {
                    src.animate(dt);
                }
            }
        }
        if config.animate_vision {
            for src in &mut self.vision {
                if src.is_active() {
                    src.animate(dt);
                }
            }
        }
    }
}

impl Default for EffectSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
