//! Detection modes: pluggable per-source visibility tests.
//!
//! A token declares which modes it can be detected by; the compositor
//! dispatches them in declaration order against every candidate vision
//! source. Built-ins cover ordinary sight and noticing lit areas; systems
//! register additional senses under their own ids.

use std::collections::HashMap;

use crate::coords::ScenePoint;
use crate::registry::EffectSourceRegistry;
use crate::scene::{SceneState, TokenDetectionMode};
use crate::source::EffectSource;

/// Shared inputs of one visibility test: the offset points being probed and
/// read access to the scene and source collections.
pub struct DetectionContext<'a> {
    pub points: &'a [ScenePoint],
    pub registry: &'a EffectSourceRegistry,
    pub scene: &'a SceneState,
}

/// One way a vision source can detect a target.
pub trait DetectionMode {
    fn id(&self) -> &str;

    /// True when `source` detects any of the context's test points under
    /// this mode, within the declared `config.range`.
    fn test_visibility(
        &self,
        source: &EffectSource,
        config: &TokenDetectionMode,
        ctx: &DetectionContext<'_>,
    ) -> bool;
}

/// Distance gate shared by the built-in modes: a non-positive range means
/// unlimited.
fn within_range(source: &EffectSource, point: ScenePoint, range: f32) -> bool {
    range <= 0.0 || source.data().position.xy().distance(point.xy()) <= range
}

/// Ordinary sight: the point falls inside the source's field-of-view
/// polygon.
pub struct BasicSight;

impl BasicSight {
    pub const ID: &'static str = "basic-sight";
}

impl DetectionMode for BasicSight {
    fn id(&self) -> &str {
        Self::ID
    }

    fn test_visibility(
        &self,
        source: &EffectSource,
        config: &TokenDetectionMode,
        ctx: &DetectionContext<'_>,
    ) -> bool {
        ctx.points
            .iter()
            .any(|&p| within_range(source, p, config.range) && source.test_point(p.xy()))
    }
}

/// Noticing lit areas: the point is both inside the source's
/// light-perception boundary and inside some active light.
pub struct LightPerception;

impl LightPerception {
    pub const ID: &'static str = "light-perception";
}

impl DetectionMode for LightPerception {
    fn id(&self) -> &str {
        Self::ID
    }

    fn test_visibility(
        &self,
        source: &EffectSource,
        config: &TokenDetectionMode,
        ctx: &DetectionContext<'_>,
    ) -> bool {
        let Some(vision) = source.as_vision() else { return false };
        ctx.points.iter().any(|&p| {
            within_range(source, p, config.range)
                && vision.test_perception(p.xy())
                && ctx.registry.test_inside_light(p, ctx.scene, None)
        })
    }
}

/// Id-keyed registry of detection modes.
pub struct DetectionModeRegistry {
    modes: HashMap<String, Box<dyn DetectionMode>>,
}

impl DetectionModeRegistry {
    pub fn new() -> Self {
        Self {
            modes: HashMap::new(),
        }
    }

    /// Registry pre-populated with the built-in modes.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register(Box::new(BasicSight));
        reg.register(Box::new(LightPerception));
        reg
    }

    /// Registers a mode, replacing any mode with the same id.
    pub fn register(&mut self, mode: Box<dyn DetectionMode>) {
        self.modes.insert(mode.id().to_string(), mode);
    }

    pub fn get(&self, id: &str) -> Option<&dyn DetectionMode> {
        self.modes.get(id).map(Box::as_ref)
    }
}

impl Default for DetectionModeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceData;

    fn vision_at(x: f32, y: f32, radius: f32, perception: f32) -> EffectSource {
        let data = SourceData {
            position: ScenePoint::flat(x, y),
            radius,
            perception_radius: perception,
            ..SourceData::default()
        };
        let mut src = EffectSource::vision("v", data.clone());
        src.initialize(data);
        src
    }

    fn unlimited(mode_id: &str) -> TokenDetectionMode {
        TokenDetectionMode {
            mode_id: mode_id.into(),
            enabled: true,
            range: 0.0,
        }
    }

    #[test]
    fn basic_sight_matches_inside_fov_only() {
        let src = vision_at(0.0, 0.0, 50.0, 150.0);
        let registry = EffectSourceRegistry::new();
        let scene = SceneState::default();
        let config = unlimited(BasicSight::ID);

        let inside = [ScenePoint::flat(20.0, 0.0)];
        let outside = [ScenePoint::flat(100.0, 0.0)];

        let ctx = DetectionContext { points: &inside, registry: &registry, scene: &scene };
        assert!(BasicSight.test_visibility(&src, &config, &ctx));

        let ctx = DetectionContext { points: &outside, registry: &registry, scene: &scene };
        assert!(!BasicSight.test_visibility(&src, &config, &ctx));
    }

    #[test]
    fn basic_sight_respects_declared_range() {
        let src = vision_at(0.0, 0.0, 50.0, 150.0);
        let registry = EffectSourceRegistry::new();
        let scene = SceneState::default();
        let config = TokenDetectionMode {
            mode_id: BasicSight::ID.into(),
            enabled: true,
            range: 10.0,
        };

        let points = [ScenePoint::flat(20.0, 0.0)];
        let ctx = DetectionContext { points: &points, registry: &registry, scene: &scene };
        assert!(!BasicSight.test_visibility(&src, &config, &ctx));
    }

    #[test]
    fn light_perception_needs_both_perception_and_light() {
        let src = vision_at(0.0, 0.0, 50.0, 150.0);
        let scene = SceneState::default();
        let config = unlimited(LightPerception::ID);

        // No lights registered: nothing to perceive.
        let registry = EffectSourceRegistry::new();
        let points = [ScenePoint::flat(100.0, 0.0)];
        let ctx = DetectionContext { points: &points, registry: &registry, scene: &scene };
        assert!(!LightPerception.test_visibility(&src, &config, &ctx));

        // A lamp at the probe point, within the perception boundary.
        let mut registry = EffectSourceRegistry::new();
        let data = SourceData {
            position: ScenePoint::flat(100.0, 0.0),
            radius: 30.0,
            ..SourceData::default()
        };
        let mut lamp = EffectSource::light("lamp", data.clone());
        lamp.initialize(data);
        registry.insert(lamp);

        let ctx = DetectionContext { points: &points, registry: &registry, scene: &scene };
        assert!(LightPerception.test_visibility(&src, &config, &ctx));

        // Lit but beyond the perception boundary.
        let data = SourceData {
            position: ScenePoint::flat(400.0, 0.0),
            radius: 30.0,
            ..SourceData::default()
        };
        let mut far_lamp = EffectSource::light("far-lamp", data.clone());
        far_lamp.initialize(data);
        registry.insert(far_lamp);

        let far = [ScenePoint::flat(400.0, 0.0)];
        let ctx = DetectionContext { points: &far, registry: &registry, scene: &scene };
        assert!(!LightPerception.test_visibility(&src, &config, &ctx));
    }

    #[test]
    fn registry_lookup_and_replacement() {
        let reg = DetectionModeRegistry::with_builtins();
        assert!(reg.get(BasicSight::ID).is_some());
        assert!(reg.get(LightPerception::ID).is_some());
        assert!(reg.get("tremorsense").is_none());
    }
}
