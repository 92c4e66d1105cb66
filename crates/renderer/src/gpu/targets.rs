use scene::post::BLOOM_LEVELS;
use winit::dpi::PhysicalSize;

pub(crate) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) struct Target {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: (u32, u32),
}

impl Target {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let size = (size.0.max(1), size.1.max(1));
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            size,
        }
    }

    fn hdr(device: &wgpu::Device, label: &str, size: (u32, u32)) -> Self {
        Self::new(
            device,
            label,
            size,
            HDR_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        )
    }
}

/// One blur level: horizontal then vertical pass at the same resolution.
pub(crate) struct BloomLevel {
    pub horizontal: Target,
    pub vertical: Target,
}

/// Every size-dependent texture of the frame. Rebuilt on resize and when
/// the pixel block size changes.
pub(crate) struct RenderTargets {
    pub output_size: PhysicalSize<u32>,
    pub pixel_size: u32,
    /// Low-resolution scene colour.
    pub scene: Target,
    pub depth: Target,
    /// Scene upscaled to full resolution.
    pub pixelated: Target,
    pub bright: Target,
    pub bloom: Vec<BloomLevel>,
    /// Pixelated frame plus bloom, before tone mapping.
    pub composite: Target,
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, output_size: PhysicalSize<u32>, pixel_size: u32) -> Self {
        let full = (output_size.width.max(1), output_size.height.max(1));
        let low = scene_extent(full, pixel_size);

        let scene = Target::hdr(device, "scene colour", low);
        let depth = Target::new(
            device,
            "scene depth",
            low,
            DEPTH_FORMAT,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let bloom = bloom_extents(full)
            .into_iter()
            .map(|extent| BloomLevel {
                horizontal: Target::hdr(device, "bloom horizontal", extent),
                vertical: Target::hdr(device, "bloom vertical", extent),
            })
            .collect();

        tracing::debug!(
            width = full.0,
            height = full.1,
            scene_width = low.0,
            scene_height = low.1,
            pixel_size,
            "allocated render targets"
        );

        Self {
            output_size: PhysicalSize::new(full.0, full.1),
            pixel_size,
            scene,
            depth,
            pixelated: Target::hdr(device, "pixelated", full),
            bright: Target::hdr(device, "bloom bright pass", full),
            bloom,
            composite: Target::hdr(device, "bloom composite", full),
        }
    }

    pub fn matches(&self, output_size: PhysicalSize<u32>, pixel_size: u32) -> bool {
        self.output_size == output_size && self.pixel_size == pixel_size
    }
}

/// `floor(size / pixel_size)`, never below one texel.
pub(crate) fn scene_extent(full: (u32, u32), pixel_size: u32) -> (u32, u32) {
    let pixel_size = pixel_size.max(1);
    ((full.0 / pixel_size).max(1), (full.1 / pixel_size).max(1))
}

/// Resolutions of the bloom levels, starting at half size.
pub(crate) fn bloom_extents(full: (u32, u32)) -> [(u32, u32); BLOOM_LEVELS] {
    let mut extent = full;
    std::array::from_fn(|_| {
        extent = ((extent.0 / 2).max(1), (extent.1 / 2).max(1));
        extent
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_extent_floors_and_clamps() {
        assert_eq!(scene_extent((1280, 720), 3), (426, 240));
        assert_eq!(scene_extent((1280, 720), 1), (1280, 720));
        assert_eq!(scene_extent((2, 2), 8), (1, 1));
        assert_eq!(scene_extent((10, 10), 0), (10, 10));
    }

    #[test]
    fn bloom_levels_halve_from_full_size() {
        assert_eq!(
            bloom_extents((1280, 720)),
            [(640, 360), (320, 180), (160, 90), (80, 45), (40, 22)]
        );
        assert_eq!(bloom_extents((4, 4))[4], (1, 1));
    }
}
