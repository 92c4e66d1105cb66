use std::collections::HashMap;

use painter::{FilterMode, RasterSurface, SamplingParams, WrapMode};
use scene::material::SurfaceId;
use scene::AvatarScene;

/// Surfaces hold sRGB-encoded colour; sampling decodes to linear.
const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Remembers which content version each surface was last uploaded at.
#[derive(Debug, Default)]
pub(crate) struct UploadTracker {
    uploaded: Vec<Option<u64>>,
}

impl UploadTracker {
    /// Returns true when `version` has not been uploaded yet and records it.
    pub fn take_stale(&mut self, index: usize, version: u64) -> bool {
        if self.uploaded.len() <= index {
            self.uploaded.resize(index + 1, None);
        }
        let slot = &mut self.uploaded[index];
        if *slot == Some(version) {
            return false;
        }
        *slot = Some(version);
        true
    }
}

struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One GPU texture per raster surface plus shared samplers.
pub(crate) struct TextureCache {
    textures: Vec<GpuTexture>,
    tracker: UploadTracker,
    samplers: HashMap<SamplingParams, wgpu::Sampler>,
    white: GpuTexture,
    white_sampler: wgpu::Sampler,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = create_texture(device, "white", 1, 1);
        write_pixels(queue, &white.texture, 1, 1, &[255, 255, 255, 255]);
        Self {
            textures: Vec::new(),
            tracker: UploadTracker::default(),
            samplers: HashMap::new(),
            white,
            white_sampler: create_sampler(device, SamplingParams::TILED),
        }
    }

    /// Uploads every surface whose content changed since the last sync.
    /// Returns the number of uploads.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &AvatarScene) -> usize {
        let mut uploads = 0;
        for (id, surface) in scene.surface_ids() {
            let index = id.index();
            if index >= self.textures.len() {
                self.textures
                    .push(create_texture(device, surface.label(), surface.width(), surface.height()));
                self.samplers
                    .entry(surface.sampling())
                    .or_insert_with(|| create_sampler(device, surface.sampling()));
            }
            if self.tracker.take_stale(index, surface.version()) {
                upload(queue, &self.textures[index], surface);
                uploads += 1;
            }
        }
        uploads
    }

    pub fn view(&self, surface: Option<SurfaceId>) -> &wgpu::TextureView {
        surface
            .and_then(|id| self.textures.get(id.index()))
            .map(|texture| &texture.view)
            .unwrap_or(&self.white.view)
    }

    /// Sampler matching the surface's sampling parameters. Untextured
    /// materials share the sampler of the white texture.
    pub fn sampler(&self, surface: Option<&RasterSurface>) -> &wgpu::Sampler {
        surface
            .and_then(|surface| self.samplers.get(&surface.sampling()))
            .unwrap_or(&self.white_sampler)
    }
}

fn create_texture(device: &wgpu::Device, label: &str, width: u32, height: u32) -> GpuTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture { texture, view }
}

fn upload(queue: &wgpu::Queue, target: &GpuTexture, surface: &RasterSurface) {
    let pixels = surface.straight_rgba();
    write_pixels(queue, &target.texture, surface.width(), surface.height(), &pixels);
    tracing::trace!(
        surface = surface.label(),
        version = surface.version(),
        "uploaded surface"
    );
}

fn write_pixels(queue: &wgpu::Queue, texture: &wgpu::Texture, width: u32, height: u32, pixels: &[u8]) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

pub(crate) fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Clamp => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    }
}

pub(crate) fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn create_sampler(device: &wgpu::Device, sampling: SamplingParams) -> wgpu::Sampler {
    let address = address_mode(sampling.wrap);
    let filter = filter_mode(sampling.filter);
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("surface sampler"),
        address_mode_u: address,
        address_mode_v: address,
        address_mode_w: address,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_version_is_uploaded_once() {
        let mut tracker = UploadTracker::default();
        assert!(tracker.take_stale(2, 0));
        assert!(!tracker.take_stale(2, 0));
        assert!(tracker.take_stale(2, 1));
        assert!(!tracker.take_stale(2, 1));
        assert!(tracker.take_stale(0, 1));
    }

    #[test]
    fn tracker_follows_scene_repaints() {
        use scene::{assemble, AnimationDriver, SceneOptions, SteppedTimeSource};

        let scene = assemble(SceneOptions::default()).unwrap();
        let mut driver = AnimationDriver::new(scene, Box::new(SteppedTimeSource::new(0.1)));
        let mut tracker = UploadTracker::default();
        let mut count_uploads = |scene: &AvatarScene| {
            scene
                .surface_ids()
                .filter(|(id, surface)| tracker.take_stale(id.index(), surface.version()))
                .count()
        };

        // bricks, grid, sun and name tag all start out unseen
        assert_eq!(count_uploads(driver.scene()), 4);
        assert_eq!(count_uploads(driver.scene()), 0);

        driver.advance();
        // first tick paints the sun and the name tag
        assert_eq!(count_uploads(driver.scene()), 2);
        driver.advance();
        assert_eq!(count_uploads(driver.scene()), 1);
    }

    #[test]
    fn sampling_maps_onto_wgpu_modes() {
        assert_eq!(address_mode(WrapMode::Repeat), wgpu::AddressMode::Repeat);
        assert_eq!(address_mode(WrapMode::Clamp), wgpu::AddressMode::ClampToEdge);
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
    }
}
