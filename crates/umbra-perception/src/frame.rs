//! Explicit per-frame state threaded through the refresh calls.

use crate::time::FrameTime;

/// Everything a refresh pass needs to know about the current frame,
/// passed by reference instead of read from ambient globals.
#[derive(Debug, Clone)]
pub struct PerceptionFrameState {
    pub time: FrameTime,

    /// Set by any non-preview source that newly illuminates area; consumed
    /// at the end of the visibility refresh to commit exploration.
    pub fog_commit: bool,

    /// Whether the current viewer bypasses vision restriction entirely
    /// (a game master view).
    pub unrestricted_viewer: bool,

    /// Snapshot of the scene darkness level at frame start. Refresh passes
    /// read this, not the live document, so a mid-frame transition tick
    /// cannot split one frame across two levels.
    pub darkness_level: f32,
}

impl PerceptionFrameState {
    pub fn new(time: FrameTime, darkness_level: f32) -> Self {
        Self {
            time,
            fog_commit: false,
            unrestricted_viewer: false,
            darkness_level,
        }
    }
}
