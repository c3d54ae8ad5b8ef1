//! Umbra GPU residency crate.
//!
//! Keeps the CPU-computed perception masks resident on the GPU: headless
//! device acquisition, mask pixel upload, and the vision compositing blit.

pub mod composite;
pub mod context;
pub mod upload;

pub use composite::CompositePipeline;
pub use context::{Gpu, GpuInit};
pub use upload::MaskUpload;
