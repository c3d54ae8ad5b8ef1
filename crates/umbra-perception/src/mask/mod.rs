//! Mask textures and the components that draw into them.
//!
//! A mask is a 2D buffer whose pixel channels encode semantically distinct
//! scalar fields. Channel semantics are fixed per mask type and documented
//! on the owning component; writers must never blend unrelated semantics
//! into one channel.

mod depth;
mod elevation;
mod occlusion;
mod target;
mod texture;

pub use depth::DepthMask;
pub use elevation::{BandRounding, ElevationBands, MAX_ELEVATION_BANDS};
pub use occlusion::OcclusionMask;
pub use target::{RenderTargetCache, SecondaryPass, TargetStack};
pub use texture::{Channel, MaskTexture};
