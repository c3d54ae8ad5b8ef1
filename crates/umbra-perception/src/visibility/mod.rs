//! Visibility composition: fog of war, detection modes, and the per-frame
//! compositor that accumulates light and vision shapes into the vision mask.

mod compositor;
mod detection;
mod fog;

pub use compositor::{IlluminationMesh, VisibilityCompositor, VisibilityTestOptions};
pub use detection::{
    BasicSight, DetectionContext, DetectionMode, DetectionModeRegistry, LightPerception,
};
pub use fog::{FogTexture, fog_resolution};
