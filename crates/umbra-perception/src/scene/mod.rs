//! Scene document state consumed by the perception pipeline.
//!
//! The perception engine never owns scene documents; it reads a per-frame
//! snapshot of the fields it needs (dimensions, darkness, per-object
//! elevation and restriction flags) and mutates only the occlusion state it
//! is responsible for.

mod objects;
mod spatial;
mod state;

pub use objects::{SceneObject, Token, TokenDetectionMode};
pub use spatial::{SpatialIndex, UniformGridIndex};
pub use state::{DarknessRegion, SceneDimensions, SceneState};
