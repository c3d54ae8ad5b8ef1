//! Polygon primitives used for source shapes and mask fills.
//!
//! Shape construction (wall clipping, angular sweeps) happens upstream in
//! the polygon backend; this module only stores the resulting boundary and
//! answers containment/bounds queries on it.

mod polygon;

pub use polygon::Polygon;
