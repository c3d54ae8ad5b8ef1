use crate::config::{AmbientColors, EnvironmentData};
use crate::coords::{Rect, ScenePoint, Vec2};
use crate::geometry::Polygon;

use super::objects::{SceneObject, Token};

/// Scene dimensions: the playable area plus the surrounding padding ring.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneDimensions {
    /// Playable scene rectangle.
    pub scene_rect: Rect,
    /// Outer rectangle including padding.
    pub outer_rect: Rect,
}

impl SceneDimensions {
    pub fn new(width: f32, height: f32, padding: f32) -> Self {
        let scene_rect = Rect::new(0.0, 0.0, width, height);
        Self {
            scene_rect,
            outer_rect: scene_rect.expanded(padding),
        }
    }

    /// True when both points are on the same side of the padding boundary:
    /// both inside the playable area, or both inside the padding ring.
    ///
    /// Keeps a vision source standing in the padding from seeing into the
    /// scene and vice versa.
    #[inline]
    pub fn same_padding_side(&self, a: Vec2, b: Vec2) -> bool {
        self.scene_rect.contains(a) == self.scene_rect.contains(b)
    }
}

impl Default for SceneDimensions {
    fn default() -> Self {
        Self::new(4000.0, 3000.0, 0.0)
    }
}

/// An elevation-banded region overriding the ambient darkness level.
#[derive(Debug, Clone)]
pub struct DarknessRegion {
    pub id: String,
    pub shape: Polygon,
    /// Inclusive elevation range the region applies to.
    pub elevation_range: (f32, f32),
    pub darkness_level: f32,
}

impl DarknessRegion {
    /// 2D containment plus elevation-range membership.
    pub fn contains(&self, point: ScenePoint) -> bool {
        let (lo, hi) = self.elevation_range;
        point.elevation >= lo && point.elevation <= hi && self.shape.contains(point.xy())
    }

    /// Specificity metric for most-specific-first ordering: a narrower
    /// elevation span wins.
    pub fn elevation_span(&self) -> f32 {
        self.elevation_range.1 - self.elevation_range.0
    }
}

/// Per-frame snapshot of the scene document fields perception reads.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    pub dimensions: SceneDimensions,
    /// Ambient darkness level in [0, 1].
    pub darkness_level: f32,
    /// Whether token vision applies to this scene at all.
    pub token_vision: bool,
    pub colors: AmbientColors,
    pub environment: EnvironmentData,
    /// Darkness-level override regions, insertion-ordered.
    pub darkness_regions: Vec<DarknessRegion>,
    /// Drawable objects in draw order.
    pub objects: Vec<SceneObject>,
    pub tokens: Vec<Token>,
}

impl SceneState {
    pub fn object(&self, id: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn object_mut(&mut self, id: &str) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    pub fn token(&self, id: &str) -> Option<&Token> {
        self.tokens.iter().find(|t| t.id == id)
    }

    /// Tokens that can hide elevated objects this frame.
    pub fn occludable_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.occludable && t.controlled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_padding_side_inside_and_outside() {
        let dims = SceneDimensions::new(100.0, 100.0, 20.0);
        let inside_a = Vec2::new(10.0, 10.0);
        let inside_b = Vec2::new(90.0, 90.0);
        let padding = Vec2::new(-10.0, 50.0);

        assert!(dims.same_padding_side(inside_a, inside_b));
        assert!(!dims.same_padding_side(inside_a, padding));
        assert!(dims.same_padding_side(padding, Vec2::new(110.0, 50.0)));
    }

    #[test]
    fn darkness_region_respects_elevation_range() {
        let region = DarknessRegion {
            id: "r1".into(),
            shape: Polygon::from_rect(Rect::new(0.0, 0.0, 50.0, 50.0)),
            elevation_range: (0.0, 10.0),
            darkness_level: 0.9,
        };
        assert!(region.contains(ScenePoint::new(25.0, 25.0, 5.0)));
        assert!(!region.contains(ScenePoint::new(25.0, 25.0, 20.0)));
        assert!(!region.contains(ScenePoint::new(80.0, 25.0, 5.0)));
    }
}
