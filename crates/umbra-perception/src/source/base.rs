use crate::coords::{ScenePoint, Vec2};
use crate::geometry::Polygon;

/// Which collection a source belongs to and how the compositor draws it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SourceKind {
    Light,
    Darkness,
    Vision,
}

/// Input data a source's geometry is computed from.
///
/// Re-initializing with identical data keeps the update id stable, which is
/// what lets the light-cache skip unchanged sources.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceData {
    pub position: ScenePoint,
    pub radius: f32,
    /// Draw/animation priority; higher first.
    pub priority: i32,
    pub active: bool,
    /// Drag-ghost sources never commit fog.
    pub preview: bool,
    /// Light only: also provides vision to any viewer.
    pub provides_vision: bool,
    /// Vision only: radius of the light-perception shape.
    pub perception_radius: f32,
    /// Owning token id when the source is token-borne.
    pub attached_token: Option<String>,
    /// Darkness-level range [min, max] within which the source is active.
    /// Only consulted for the scene-global light.
    pub darkness_range: (f32, f32),
    /// Marks the scene-wide ambient light source.
    pub global: bool,
}

impl Default for SourceData {
    fn default() -> Self {
        Self {
            position: ScenePoint::flat(0.0, 0.0),
            radius: 0.0,
            priority: 0,
            active: true,
            preview: false,
            provides_vision: false,
            perception_radius: 0.0,
            attached_token: None,
            darkness_range: (0.0, 1.0),
            global: false,
        }
    }
}

/// Shared state of every source kind.
#[derive(Debug, Clone)]
pub struct SourceCore {
    id: String,
    data: SourceData,
    shape: Option<Polygon>,
    /// Bumped whenever `initialize` sees changed data. The light cache
    /// tracks this to detect stale cached geometry.
    update_id: u64,
    /// Accumulated animation time, fed to the shader uniforms.
    animation_time: f32,
}

impl SourceCore {
    pub fn new(id: impl Into<String>, data: SourceData) -> Self {
        Self {
            id: id.into(),
            data,
            shape: None,
            update_id: 0,
            animation_time: 0.0,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn data(&self) -> &SourceData {
        &self.data
    }

    #[inline]
    pub fn update_id(&self) -> u64 {
        self.update_id
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.data.active
    }

    #[inline]
    pub fn animation_time(&self) -> f32 {
        self.animation_time
    }

    /// Recomputes the shape from `data`. The polygon backend (wall clipping,
    /// angular sweep) runs upstream; here the unclipped emission boundary is
    /// produced from position and radius.
    pub fn initialize(&mut self, data: SourceData) {
        if self.shape.is_none() || data != self.data {
            self.update_id = self.update_id.wrapping_add(1);
        }
        self.shape = Some(Self::compute_shape(&data, data.radius));
        self.data = data;
    }

    pub(super) fn compute_shape(data: &SourceData, radius: f32) -> Polygon {
        // Segment count scales with radius so large sources keep a smooth
        // boundary without over-tessellating torch-sized ones.
        let segments = ((radius / 10.0) as usize).clamp(16, 128);
        Polygon::circle(data.position.xy(), radius.max(0.0), segments)
    }

    /// The computed shape.
    ///
    /// # Panics
    /// Panics when queried before `initialize` — a stale shape must never
    /// leak into containment tests.
    pub fn shape(&self) -> &Polygon {
        self.shape
            .as_ref()
            .unwrap_or_else(|| panic!("source '{}' queried before initialize()", self.id))
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.shape.is_some()
    }

    /// Drops the computed shape, forcing re-initialization before the next
    /// containment query.
    pub fn invalidate(&mut self) {
        self.shape = None;
    }

    pub fn animate(&mut self, dt: f32) {
        self.animation_time += dt;
    }

    /// 2D containment against the computed shape.
    pub fn test_point(&self, point: Vec2) -> bool {
        self.shape().contains(point)
    }
}
