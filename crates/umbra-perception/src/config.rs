//! Configuration surface accepted by perception initialization.
//!
//! Keep these structures stable and minimal; add fields only when a concrete
//! scene or renderer requirement exists.

/// Linear RGBA color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Named ambient colors consumed by the compositing filter and fog overlay.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AmbientColors {
    pub background: Color,
    pub brightest: Color,
    pub darkness: Color,
    pub daylight: Color,
    pub fog_explored: Color,
    pub fog_unexplored: Color,
}

impl Default for AmbientColors {
    fn default() -> Self {
        Self {
            background: Color::rgba(0.6, 0.6, 0.6, 1.0),
            brightest: Color::WHITE,
            darkness: Color::rgba(0.1, 0.1, 0.16, 1.0),
            daylight: Color::WHITE,
            fog_explored: Color::rgba(0.47, 0.47, 0.47, 1.0),
            fog_unexplored: Color::BLACK,
        }
    }
}

/// Hue/luminosity/intensity/saturation/shadow tuning for one lighting pole.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EnvironmentPole {
    pub hue: f32,
    pub luminosity: f32,
    pub intensity: f32,
    pub saturation: f32,
    pub shadows: f32,
}

impl Default for EnvironmentPole {
    fn default() -> Self {
        Self {
            hue: 0.0,
            luminosity: 0.0,
            intensity: 0.5,
            saturation: 0.0,
            shadows: 0.0,
        }
    }
}

/// Per-scene environment data: the base (lit) and dark poles plus global
/// light settings. The darkness level interpolates between the poles.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct EnvironmentData {
    pub base: EnvironmentPole,
    pub dark: EnvironmentPole,
    /// Whether the scene-wide global light source exists at all.
    pub global_light: bool,
    /// Brightness of the global light in [0, 1].
    pub global_light_brightness: f32,
    /// Darkness-level range [min, max] within which the global light is
    /// active.
    pub global_light_darkness_range: (f32, f32),
}

/// Hard ceiling on either dimension of the fog/exploration texture.
///
/// Bounds GPU memory for very large scenes; the fog resolution is chosen so
/// neither downscaled dimension exceeds this.
pub const MAX_FOG_TEXTURE_SIZE: u32 = 4096;

/// Top-level perception configuration.
#[derive(Debug, Clone, Default)]
pub struct PerceptionConfig {
    pub colors: AmbientColors,
    pub environment: EnvironmentData,
    /// Master switch for light/darkness source animation.
    pub animate_sources: bool,
    /// Separately gates vision-source animation.
    pub animate_vision: bool,
}
