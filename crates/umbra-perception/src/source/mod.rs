//! Effect sources: light, darkness, and vision emitters.
//!
//! A source is owned by the placeable that created it (a lamp, a token) and
//! registered with the [`registry`](crate::registry) under a stable string
//! id. Its computed shape is only valid after `initialize` has run for the
//! current data; querying a stale shape across a data change is a
//! programmer error and panics.

mod base;
mod kinds;

pub use base::{SourceCore, SourceData, SourceKind};
pub use kinds::{DarknessSource, EffectSource, LightSource, VisionSource};
