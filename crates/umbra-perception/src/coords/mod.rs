//! Coordinate primitives shared across the perception pipeline.
//!
//! Convention:
//! - scene geometry is in scene pixels (top-left origin, +Y down)
//! - elevation is an unbounded scalar in scene-specific units

mod point;
mod rect;
mod vec2;

pub use point::ScenePoint;
pub use rect::Rect;
pub use vec2::Vec2;
