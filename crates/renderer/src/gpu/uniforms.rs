use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use scene::material::Material;
use scene::post::{BloomSettings, Environment, BLOOM_LEVELS};

/// Largest blur kernel the `BlurParams` weight table can hold.
pub(crate) const MAX_KERNEL_RADIUS: usize = 12;

/// Per-frame camera and fog block, bound at group 0 of the scene pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub fog: [f32; 4],
}

impl FrameUniforms {
    pub fn new(projection: Mat4, view: Mat4, eye: Vec3, environment: &Environment) -> Self {
        Self {
            projection: projection.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            camera_position: eye.extend(1.0).to_array(),
            fog: environment.fog_color.extend(environment.fog_density).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub uv_transform: [f32; 4],
    pub flags: [f32; 4],
}

impl ObjectUniforms {
    pub fn new(world: Mat4, material: &Material) -> Self {
        let flag = |value: bool| if value { 1.0 } else { 0.0 };
        Self {
            model: world.to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            uv_transform: [
                material.uv.repeat.x,
                material.uv.repeat.y,
                material.uv.offset.x,
                material.uv.offset.y,
            ],
            flags: [flag(material.billboard), 0.0, flag(material.fog), 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct PixelateParams {
    pub source_size: [f32; 2],
    pub pixel_size: f32,
    pub _pad: f32,
}

impl PixelateParams {
    pub fn new(source: (u32, u32), pixel_size: u32) -> Self {
        Self {
            source_size: [source.0 as f32, source.1 as f32],
            pixel_size: pixel_size.max(1) as f32,
            _pad: 0.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct HighPassParams {
    pub threshold: f32,
    pub smooth_width: f32,
    pub _pad: [f32; 2],
}

impl HighPassParams {
    pub fn new(bloom: &BloomSettings) -> Self {
        Self {
            threshold: bloom.threshold,
            smooth_width: bloom.smooth_width,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct BlurParams {
    pub direction: [f32; 2],
    pub kernel_radius: u32,
    pub _pad: u32,
    pub weights: [[f32; 4]; MAX_KERNEL_RADIUS / 4],
}

impl BlurParams {
    /// `direction` is a unit axis scaled by the texel size of the target.
    pub fn new(direction: [f32; 2], kernel_radius: u32) -> Self {
        let radius = kernel_radius.clamp(1, MAX_KERNEL_RADIUS as u32);
        let mut weights = [[0.0; 4]; MAX_KERNEL_RADIUS / 4];
        for (tap, weight) in BloomSettings::kernel_weights(radius).into_iter().enumerate() {
            weights[tap / 4][tap % 4] = weight;
        }
        Self {
            direction,
            kernel_radius: radius,
            _pad: 0,
            weights,
        }
    }

    pub fn weight(&self, tap: usize) -> f32 {
        self.weights[tap / 4][tap % 4]
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct CompositeParams {
    pub factors: [f32; 4],
    pub last_factor: f32,
    pub strength: f32,
    pub _pad: [f32; 2],
}

impl CompositeParams {
    pub fn new(bloom: &BloomSettings) -> Self {
        let mixed: [f32; BLOOM_LEVELS] = bloom.mixed_factors();
        Self {
            factors: [mixed[0], mixed[1], mixed[2], mixed[3]],
            last_factor: mixed[4],
            strength: bloom.strength,
            _pad: [0.0; 2],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct OutputParams {
    pub exposure: f32,
    pub encode_srgb: u32,
    pub _pad: [u32; 2],
}

impl OutputParams {
    pub fn new(exposure: f32, target: wgpu::TextureFormat) -> Self {
        Self {
            exposure,
            encode_srgb: u32::from(!target.is_srgb()),
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use scene::material::srgb_hex;

    #[test]
    fn uniform_blocks_match_wgsl_layouts() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 112);
        assert_eq!(std::mem::size_of::<PixelateParams>(), 16);
        assert_eq!(std::mem::size_of::<HighPassParams>(), 16);
        assert_eq!(std::mem::size_of::<BlurParams>(), 64);
        assert_eq!(std::mem::size_of::<CompositeParams>(), 32);
        assert_eq!(std::mem::size_of::<OutputParams>(), 16);
    }

    #[test]
    fn object_uniforms_carry_material_state() {
        let mut material = Material::basic("floor", srgb_hex(0xffffff))
            .with_uv_repeat(Vec2::new(8.0, 8.0))
            .transparent(0.5)
            .billboard();
        material.uv.offset.y = 0.25;

        let uniforms = ObjectUniforms::new(Mat4::IDENTITY, &material);
        assert_eq!(uniforms.uv_transform, [8.0, 8.0, 0.0, 0.25]);
        assert_eq!(uniforms.color[3], 0.5);
        assert_eq!(uniforms.flags[0], 1.0);
        assert_eq!(uniforms.flags[2], if material.fog { 1.0 } else { 0.0 });
    }

    #[test]
    fn blur_weights_are_packed_in_tap_order() {
        let params = BlurParams::new([0.01, 0.0], 11);
        let expected = BloomSettings::kernel_weights(11);
        assert_eq!(params.kernel_radius, 11);
        for (tap, weight) in expected.iter().enumerate() {
            assert_eq!(params.weight(tap), *weight);
        }
        assert_eq!(params.weight(11), 0.0);
    }

    #[test]
    fn composite_uses_mixed_bloom_factors() {
        let bloom = BloomSettings::default();
        let params = CompositeParams::new(&bloom);
        let mixed = bloom.mixed_factors();
        assert_eq!(params.factors, [mixed[0], mixed[1], mixed[2], mixed[3]]);
        assert_eq!(params.last_factor, mixed[4]);
        assert_eq!(params.strength, 0.3);
    }

    #[test]
    fn output_encodes_only_for_linear_targets() {
        let srgb = OutputParams::new(0.85, wgpu::TextureFormat::Bgra8UnormSrgb);
        let unorm = OutputParams::new(0.85, wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(srgb.encode_srgb, 0);
        assert_eq!(unorm.encode_srgb, 1);
    }
}
