use crate::coords::Vec2;
use crate::geometry::Polygon;

use super::base::{SourceCore, SourceData, SourceKind};

/// A light emitter.
pub struct LightSource {
    core: SourceCore,
}

impl LightSource {
    pub fn new(id: impl Into<String>, data: SourceData) -> Self {
        Self { core: SourceCore::new(id, data) }
    }
}

/// A darkness emitter. Darkness erases light and always contributes to the
/// priority edge list.
pub struct DarknessSource {
    core: SourceCore,
}

impl DarknessSource {
    pub fn new(id: impl Into<String>, data: SourceData) -> Self {
        Self { core: SourceCore::new(id, data) }
    }
}

/// A token's sight. Carries two shapes: the field of view (limited by the
/// sight radius) and the light-perception boundary (how far the token can
/// notice lit areas).
pub struct VisionSource {
    core: SourceCore,
    perception_shape: Option<Polygon>,
}

impl VisionSource {
    pub fn new(id: impl Into<String>, data: SourceData) -> Self {
        Self {
            core: SourceCore::new(id, data),
            perception_shape: None,
        }
    }

    /// Light-perception boundary; valid after `initialize`.
    ///
    /// # Panics
    /// Panics when queried before initialization, like [`SourceCore::shape`].
    pub fn perception_shape(&self) -> &Polygon {
        self.perception_shape.as_ref().unwrap_or_else(|| {
            panic!(
                "vision source '{}' perception shape queried before initialize()",
                self.core.id()
            )
        })
    }

    pub fn test_perception(&self, point: Vec2) -> bool {
        self.perception_shape().contains(point)
    }
}

/// Tagged union over the three source kinds.
///
/// Every kind exposes the common capability set (`initialize`, `refresh`,
/// `animate`, `test_point`, `shape`); vision additionally carries the
/// light-perception shape.
pub enum EffectSource {
    Light(LightSource),
    Darkness(DarknessSource),
    Vision(VisionSource),
}

impl EffectSource {
    pub fn light(id: impl Into<String>, data: SourceData) -> Self {
        Self::Light(LightSource::new(id, data))
    }

    pub fn darkness(id: impl Into<String>, data: SourceData) -> Self {
        Self::Darkness(DarknessSource::new(id, data))
    }

    pub fn vision(id: impl Into<String>, data: SourceData) -> Self {
        Self::Vision(VisionSource::new(id, data))
    }

    #[inline]
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Light(_) => SourceKind::Light,
            Self::Darkness(_) => SourceKind::Darkness,
            Self::Vision(_) => SourceKind::Vision,
        }
    }

    #[inline]
    pub fn core(&self) -> &SourceCore {
        match self {
            Self::Light(s) => &s.core,
            Self::Darkness(s) => &s.core,
            Self::Vision(s) => &s.core,
        }
    }

    #[inline]
    pub fn core_mut(&mut self) -> &mut SourceCore {
        match self {
            Self::Light(s) => &mut s.core,
            Self::Darkness(s) => &mut s.core,
            Self::Vision(s) => &mut s.core,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        self.core().id()
    }

    #[inline]
    pub fn data(&self) -> &SourceData {
        self.core().data()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.core().is_active()
    }

    /// Recomputes geometry from `data`. Vision sources also rebuild their
    /// light-perception shape.
    pub fn initialize(&mut self, data: SourceData) {
        match self {
            Self::Vision(s) => {
                s.perception_shape =
                    Some(SourceCore::compute_shape(&data, data.perception_radius));
                s.core.initialize(data);
            }
            _ => self.core_mut().initialize(data),
        }
    }

    /// Updates cached uniform state without recomputing geometry.
    ///
    /// Geometry stays untouched by contract; only per-frame uniforms (e.g.
    /// animation time exposure) are refreshed here.
    pub fn refresh(&mut self) {
        // Uniform state currently derives entirely from `data` and
        // `animation_time`; nothing extra is cached CPU-side yet.
    }

    pub fn animate(&mut self, dt: f32) {
        self.core_mut().animate(dt);
    }

    pub fn test_point(&self, point: Vec2) -> bool {
        self.core().test_point(point)
    }

    pub fn shape(&self) -> &Polygon {
        self.core().shape()
    }

    pub fn as_vision(&self) -> Option<&VisionSource> {
        match self {
            Self::Vision(s) => Some(s),
            _ => None,
        }
    }
}
