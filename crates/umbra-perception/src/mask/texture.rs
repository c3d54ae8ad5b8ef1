use crate::config::Color;
use crate::coords::Vec2;
use crate::geometry::Polygon;

/// One pixel channel of a mask texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Channel {
    Red,
    Green,
    Blue,
    Alpha,
}

impl Channel {
    #[inline]
    fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
            Channel::Alpha => 3,
        }
    }
}

/// CPU-resident RGBA8 mask buffer.
///
/// This is the canonical pixel storage for every mask; GPU residency is a
/// straight upload of `bytes()` by the render backend. Scanline polygon
/// fills are exact for the pixel-center sampling the readback queries use.
#[derive(Debug, Clone)]
pub struct MaskTexture {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl MaskTexture {
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "mask texture must be non-empty");
        Self {
            width,
            height,
            pixels: vec![[0; 4]; (width * height) as usize],
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major, for GPU upload.
    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn channel_at(&self, x: u32, y: u32, channel: Channel) -> u8 {
        self.pixel(x, y)[channel.index()]
    }

    /// Writes a single channel of one pixel, leaving the others untouched.
    #[inline]
    pub fn set_channel(&mut self, x: u32, y: u32, channel: Channel, value: u8) {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        self.pixels[(y * self.width + x) as usize][channel.index()] = value;
    }

    pub fn clear(&mut self, color: Color) {
        let px = [
            (color.r.clamp(0.0, 1.0) * 255.0) as u8,
            (color.g.clamp(0.0, 1.0) * 255.0) as u8,
            (color.b.clamp(0.0, 1.0) * 255.0) as u8,
            (color.a.clamp(0.0, 1.0) * 255.0) as u8,
        ];
        self.pixels.fill(px);
    }

    /// Resizes the buffer, discarding previous contents.
    pub fn resize(&mut self, width: u32, height: u32) {
        assert!(width > 0 && height > 0, "mask texture must be non-empty");
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize((width * height) as usize, [0; 4]);
    }

    /// Scanline-fills `polygon`, writing `value` into a single channel and
    /// leaving the other channels of covered pixels untouched.
    pub fn fill_polygon_channel(&mut self, polygon: &Polygon, channel: Channel, value: u8) {
        self.fill_rows(polygon, |px| px[channel.index()] = value);
    }

    /// Scanline-fills `polygon` with a full RGBA color.
    pub fn fill_polygon(&mut self, polygon: &Polygon, color: Color) {
        let rgba = [
            (color.r.clamp(0.0, 1.0) * 255.0) as u8,
            (color.g.clamp(0.0, 1.0) * 255.0) as u8,
            (color.b.clamp(0.0, 1.0) * 255.0) as u8,
            (color.a.clamp(0.0, 1.0) * 255.0) as u8,
        ];
        self.fill_rows(polygon, |px| *px = rgba);
    }

    /// Channel-wise max blend of `other` into `self`. Both buffers must have
    /// identical dimensions.
    pub fn blend_max(&mut self, other: &MaskTexture) {
        assert!(
            self.width == other.width && self.height == other.height,
            "blend_max requires matching dimensions"
        );
        for (dst, src) in self.pixels.iter_mut().zip(&other.pixels) {
            for c in 0..4 {
                dst[c] = dst[c].max(src[c]);
            }
        }
    }

    /// True when any pixel has a non-zero value in `channel`.
    pub fn any_coverage(&self, channel: Channel) -> bool {
        let i = channel.index();
        self.pixels.iter().any(|px| px[i] != 0)
    }

    fn fill_rows(&mut self, polygon: &Polygon, mut write: impl FnMut(&mut [u8; 4])) {
        if polygon.is_degenerate() {
            return;
        }
        let Some(bounds) = polygon.bounds() else { return };

        let y0 = bounds.min().y.floor().max(0.0) as u32;
        let y1 = (bounds.max().y.ceil().min(self.height as f32)) as u32;
        let points = polygon.points();
        let n = points.len();

        let mut crossings: Vec<f32> = Vec::new();
        for y in y0..y1 {
            let sample_y = y as f32 + 0.5;
            crossings.clear();

            let mut j = n - 1;
            for i in 0..n {
                let a = points[i];
                let b = points[j];
                if (a.y > sample_y) != (b.y > sample_y) {
                    crossings.push((b.x - a.x) * (sample_y - a.y) / (b.y - a.y) + a.x);
                }
                j = i;
            }
            crossings.sort_by(f32::total_cmp);

            for pair in crossings.chunks_exact(2) {
                let x0 = pair[0].max(0.0).round() as u32;
                let x1 = (pair[1].min(self.width as f32)).round() as u32;
                for x in x0..x1 {
                    write(&mut self.pixels[(y * self.width + x) as usize]);
                }
            }
        }
    }

    /// Fraction of pixels with non-zero `channel` coverage.
    pub fn coverage_ratio(&self, channel: Channel) -> f32 {
        let i = channel.index();
        let covered = self.pixels.iter().filter(|px| px[i] != 0).count();
        covered as f32 / self.pixels.len() as f32
    }

    /// Channel value sampled at a scene position with nearest-pixel lookup;
    /// out-of-bounds samples read as zero.
    pub fn sample(&self, pos: Vec2, channel: Channel) -> u8 {
        if pos.x < 0.0 || pos.y < 0.0 {
            return 0;
        }
        let x = pos.x as u32;
        let y = pos.y as u32;
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.channel_at(x, y, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rect;

    #[test]
    fn clear_sets_every_pixel() {
        let mut tex = MaskTexture::new(4, 4);
        tex.clear(Color::rgba(1.0, 0.0, 0.0, 1.0));
        assert_eq!(tex.pixel(0, 0), [255, 0, 0, 255]);
        assert_eq!(tex.pixel(3, 3), [255, 0, 0, 255]);
    }

    #[test]
    fn fill_polygon_covers_interior_only() {
        let mut tex = MaskTexture::new(16, 16);
        let square = Polygon::from_rect(Rect::new(4.0, 4.0, 8.0, 8.0));
        tex.fill_polygon(&square, Color::WHITE);

        assert_eq!(tex.pixel(8, 8), [255, 255, 255, 255]);
        assert_eq!(tex.pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(tex.pixel(14, 8), [0, 0, 0, 0]);
    }

    #[test]
    fn channel_fill_preserves_other_channels() {
        let mut tex = MaskTexture::new(8, 8);
        let square = Polygon::from_rect(Rect::new(0.0, 0.0, 8.0, 8.0));
        tex.fill_polygon_channel(&square, Channel::Red, 100);
        tex.fill_polygon_channel(&square, Channel::Blue, 200);

        assert_eq!(tex.pixel(4, 4), [100, 0, 200, 0]);
    }

    #[test]
    fn blend_max_takes_channelwise_maximum() {
        let mut a = MaskTexture::new(2, 2);
        let mut b = MaskTexture::new(2, 2);
        a.clear(Color::rgba(0.5, 0.0, 0.0, 0.0));
        b.clear(Color::rgba(0.2, 0.8, 0.0, 0.0));
        a.blend_max(&b);

        let px = a.pixel(0, 0);
        assert_eq!(px[0], 127);
        assert_eq!(px[1], 204);
    }

    #[test]
    fn any_coverage_detects_single_channel() {
        let mut tex = MaskTexture::new(8, 8);
        assert!(!tex.any_coverage(Channel::Green));
        let dot = Polygon::from_rect(Rect::new(2.0, 2.0, 2.0, 2.0));
        tex.fill_polygon_channel(&dot, Channel::Green, 1);
        assert!(tex.any_coverage(Channel::Green));
        assert!(!tex.any_coverage(Channel::Red));
    }

    #[test]
    fn resize_discards_and_redimensions() {
        let mut tex = MaskTexture::new(4, 4);
        tex.clear(Color::WHITE);
        tex.resize(8, 2);
        assert_eq!(tex.width(), 8);
        assert_eq!(tex.height(), 2);
        assert_eq!(tex.pixel(7, 1), [0, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn pixel_out_of_bounds_panics() {
        let tex = MaskTexture::new(4, 4);
        let _ = tex.pixel(4, 0);
    }
}
