//! Umbra perception crate.
//!
//! The client-side perception engine of a 2D tabletop scene renderer: per
//! frame it determines what light, darkness, and vision reach which parts of
//! a scene, renders that into reusable masks, and uses the masks to decide
//! which objects are visible, occluded, or explored.

pub mod config;
pub mod coords;
pub mod frame;
pub mod geometry;
pub mod group;
pub mod mask;
pub mod registry;
pub mod scene;
pub mod source;
pub mod time;
pub mod visibility;

pub mod logging;
mod perception;

pub use perception::Perception;
