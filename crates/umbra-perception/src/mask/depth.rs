use log::trace;

use crate::config::Color;
use crate::geometry::Polygon;
use crate::scene::SceneState;

use super::elevation::{BandRounding, ElevationBands};
use super::texture::{Channel, MaskTexture};

/// Depth mask: maps the unbounded elevation axis into discrete render-order
/// bands.
///
/// Channel semantics (fixed): red = quantized elevation band of the
/// topmost depth-contributing object covering the pixel. Other channels are
/// unused and stay zero.
pub struct DepthMask {
    texture: MaskTexture,
    bands: ElevationBands,
    dirty: bool,
}

impl DepthMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            texture: MaskTexture::new(width, height),
            bands: ElevationBands::new(BandRounding::Floor),
            dirty: true,
        }
    }

    #[inline]
    pub fn texture(&self) -> &MaskTexture {
        &self.texture
    }

    #[inline]
    pub fn bands(&self) -> &ElevationBands {
        &self.bands
    }

    /// Flags the band array for rebuild when the set of distinct elevations
    /// may have changed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Normalized band for `elevation`: greatest tracked entry ≤ the query,
    /// `(index + 1) / 255`. Values below the minimum map to band 0.
    ///
    /// # Panics
    /// Panics on a NaN elevation.
    pub fn map_elevation(&self, elevation: f32) -> f32 {
        self.bands.map_elevation(elevation)
    }

    /// Rebuilds the band array and redraws the mask, only when dirty.
    ///
    /// Depth-contributing objects are scanned in their current draw order;
    /// each distinct elevation becomes one band (capped by the channel
    /// width), and each object's footprint is stamped with its band value.
    pub fn update(&mut self, scene: &SceneState) {
        if !self.dirty {
            return;
        }

        self.bands.rebuild(
            scene
                .objects
                .iter()
                .filter(|o| o.depth_contributing)
                .map(|o| o.elevation),
        );

        self.texture.clear(Color::TRANSPARENT);
        for object in scene.objects.iter().filter(|o| o.depth_contributing) {
            let value = self.bands.channel_value(object.elevation);
            let shape = Polygon::from_rect(object.bounds);
            self.texture.fill_polygon_channel(&shape, Channel::Red, value);
        }

        self.dirty = false;
        trace!("depth mask rebuilt: {} bands", self.bands.values().len());
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.texture.resize(width, height);
        self.dirty = true;
    }
}
