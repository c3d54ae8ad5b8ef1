use super::Vec2;

/// A scene position with elevation.
///
/// Elevation does not participate in 2D containment tests; it selects the
/// depth band and the darkness-level region a point falls into.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ScenePoint {
    pub x: f32,
    pub y: f32,
    pub elevation: f32,
}

impl ScenePoint {
    #[inline]
    pub const fn new(x: f32, y: f32, elevation: f32) -> Self {
        Self { x, y, elevation }
    }

    #[inline]
    pub const fn flat(x: f32, y: f32) -> Self {
        Self { x, y, elevation: 0.0 }
    }

    #[inline]
    pub fn xy(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.elevation.is_finite()
    }

    /// Offsets the 2D position, keeping elevation.
    #[inline]
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.elevation)
    }
}

impl From<Vec2> for ScenePoint {
    fn from(v: Vec2) -> Self {
        Self::flat(v.x, v.y)
    }
}
