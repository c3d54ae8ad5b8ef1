use crate::coords::{Rect, Vec2};

/// A drawable scene object that participates in depth/occlusion decisions
/// (tiles, roofs, overhead drawings).
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Stable document id.
    pub id: String,
    pub bounds: Rect,
    pub elevation: f32,
    /// Whether the object contributes to the depth band array.
    pub depth_contributing: bool,
    pub restricts_light: bool,
    pub restricts_weather: bool,
    /// Applied occlusion state. Written only through the debounced toggle.
    pub occluded: bool,
}

impl SceneObject {
    pub fn new(id: impl Into<String>, bounds: Rect, elevation: f32) -> Self {
        Self {
            id: id.into(),
            bounds,
            elevation,
            depth_contributing: false,
            restricts_light: false,
            restricts_weather: false,
            occluded: false,
        }
    }
}

/// One detection mode declared on a token, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenDetectionMode {
    /// Id resolved against the detection-mode registry.
    pub mode_id: String,
    pub enabled: bool,
    /// Maximum detection distance in scene pixels; zero or negative means
    /// unlimited.
    pub range: f32,
}

/// A token placeable as seen by the perception engine.
#[derive(Debug, Clone)]
pub struct Token {
    pub id: String,
    pub center: Vec2,
    pub elevation: f32,
    /// Grid-aligned footprint in scene pixels.
    pub footprint: Rect,
    pub has_vision: bool,
    /// Effective emitted-light radius (bright or dim, whichever is larger).
    pub light_radius: f32,
    /// Whether this token makes elevated objects above it fade.
    pub occludable: bool,
    /// Controlled by the current viewer.
    pub controlled: bool,
    /// Mid-drag or mid-animation this frame.
    pub moving: bool,
    /// Declared detection modes, dispatched in declaration order.
    pub detection_modes: Vec<TokenDetectionMode>,
}

impl Token {
    pub fn new(id: impl Into<String>, center: Vec2, footprint: Rect) -> Self {
        Self {
            id: id.into(),
            center,
            elevation: 0.0,
            footprint,
            has_vision: false,
            light_radius: 0.0,
            occludable: true,
            controlled: false,
            moving: false,
            detection_modes: Vec::new(),
        }
    }

    /// Footprint grown to cover the emitted light, used by the radial
    /// occlusion shape.
    pub fn occlusion_radius(&self) -> f32 {
        let half_w = self.footprint.size.x * 0.5;
        let half_h = self.footprint.size.y * 0.5;
        half_w.max(half_h).max(self.light_radius)
    }
}
