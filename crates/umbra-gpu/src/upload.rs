use anyhow::{Result, ensure};
use log::trace;

use umbra_perception::mask::MaskTexture;

/// GPU residency for one CPU mask buffer.
///
/// Owns an RGBA8 `wgpu::Texture` mirroring a [`MaskTexture`] and re-uploads
/// the pixel bytes when asked. Uploads are full-texture; masks are small and
/// partial damage tracking has not been worth it.
pub struct MaskUpload {
    label: String,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl MaskUpload {
    /// Mask textures are linear data, not color; never sRGB.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Result<Self> {
        ensure!(width > 0 && height > 0, "mask texture must be non-empty");
        let texture = create_texture(device, label, width, height);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(Self {
            label: label.to_string(),
            texture,
            view,
            width,
            height,
        })
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Uploads the mask's current pixels, reallocating on a size change.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, mask: &MaskTexture) {
        if (mask.width(), mask.height()) != (self.width, self.height) {
            trace!(
                "mask '{}' resized to {}x{}; reallocating",
                self.label,
                mask.width(),
                mask.height()
            );
            self.width = mask.width();
            self.height = mask.height();
            self.texture = create_texture(device, &self.label, self.width, self.height);
            self.view = self
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default());
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            mask.bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

fn create_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: MaskUpload::FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}
