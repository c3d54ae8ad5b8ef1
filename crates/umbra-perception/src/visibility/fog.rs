//! Fog of war: the persistent record of everything ever explored.

use log::{debug, warn};

use crate::config::MAX_FOG_TEXTURE_SIZE;
use crate::coords::Vec2;
use crate::mask::{Channel, MaskTexture};

/// Picks the integral downscale divisor for the fog texture.
///
/// Returns `(width, height, divisor)` such that both dimensions fit under
/// [`MAX_FOG_TEXTURE_SIZE`]. Divisors that divide both dimensions exactly
/// are preferred so scene coordinates map to whole fog pixels; when none
/// exists the smallest sufficient divisor is used with a logged warning
/// (edge pixels then land on fractional boundaries).
pub fn fog_resolution(scene_width: u32, scene_height: u32) -> (u32, u32, u32) {
    assert!(scene_width > 0 && scene_height > 0, "scene must be non-empty");

    let needed = |d: u32| scene_width.div_ceil(d) <= MAX_FOG_TEXTURE_SIZE
        && scene_height.div_ceil(d) <= MAX_FOG_TEXTURE_SIZE;

    let mut divisor = 1;
    while !needed(divisor) {
        divisor += 1;
    }

    // Prefer an exact divisor at or above the minimum.
    let mut exact = divisor;
    while exact <= scene_width.max(scene_height) {
        if scene_width % exact == 0 && scene_height % exact == 0 && needed(exact) {
            return (scene_width / exact, scene_height / exact, exact);
        }
        exact += 1;
    }

    warn!(
        "no exact fog divisor for {scene_width}x{scene_height}; \
         using {divisor} with fractional edges"
    );
    (
        scene_width.div_ceil(divisor),
        scene_height.div_ceil(divisor),
        divisor,
    )
}

/// Persistent exploration buffer.
///
/// Explored coverage lives in the red channel and only ever grows between
/// resets. Commits are driven by the compositor when a non-preview source
/// newly illuminates area; preview sources must never reach this buffer.
pub struct FogTexture {
    texture: MaskTexture,
    divisor: u32,
    commits: u64,
}

impl FogTexture {
    pub fn new(scene_width: u32, scene_height: u32) -> Self {
        let (w, h, divisor) = fog_resolution(scene_width, scene_height);
        debug!("fog texture {w}x{h} (divisor {divisor})");
        Self {
            texture: MaskTexture::new(w, h),
            divisor,
            commits: 0,
        }
    }

    #[inline]
    pub fn texture(&self) -> &MaskTexture {
        &self.texture
    }

    #[inline]
    pub fn divisor(&self) -> u32 {
        self.divisor
    }

    /// Number of commits since the last reset; lets callers skip GPU
    /// re-upload when nothing changed.
    #[inline]
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Merges the frame's accumulated vision mask into the explored buffer.
    ///
    /// Any scene pixel with red (light) or green (vision) coverage marks its
    /// fog pixel explored. Downsampling samples the vision mask at each fog
    /// pixel's center.
    pub fn commit(&mut self, vision: &MaskTexture) {
        let d = self.divisor as f32;
        for y in 0..self.texture.height() {
            for x in 0..self.texture.width() {
                let scene_pos = Vec2::new((x as f32 + 0.5) * d, (y as f32 + 0.5) * d);
                let lit = vision.sample(scene_pos, Channel::Red) != 0
                    || vision.sample(scene_pos, Channel::Green) != 0;
                if lit {
                    self.texture.set_channel(x, y, Channel::Red, 255);
                }
            }
        }
        self.commits += 1;
    }

    /// True when the scene position has ever been explored.
    pub fn is_explored(&self, scene_pos: Vec2) -> bool {
        let d = self.divisor as f32;
        self.texture
            .sample(Vec2::new(scene_pos.x / d, scene_pos.y / d), Channel::Red)
            != 0
    }

    /// Forgets all exploration.
    pub fn reset(&mut self) {
        self.texture.clear(crate::config::Color::TRANSPARENT);
        self.commits = 0;
    }

    /// Re-chooses the resolution for new scene dimensions. Exploration is
    /// discarded; the caller restores it from persisted data if needed.
    pub fn resize(&mut self, scene_width: u32, scene_height: u32) {
        let (w, h, divisor) = fog_resolution(scene_width, scene_height);
        self.divisor = divisor;
        self.texture.resize(w, h);
        self.commits = 0;
    }
}
