use std::collections::HashMap;

use scene::post::BLOOM_LEVELS;
use scene::AvatarScene;

use super::targets::{bloom_extents, RenderTargets, Target, HDR_FORMAT};
use super::uniforms::{BlurParams, CompositeParams, HighPassParams, OutputParams, PixelateParams};
use crate::shaders;

/// Uniform buffer of one post stage.
struct ParamBuffer {
    buffer: wgpu::Buffer,
}

impl ParamBuffer {
    fn new<T: bytemuck::Pod>(device: &wgpu::Device, label: &str) -> Self {
        Self {
            buffer: device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<T>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }),
        }
    }

    fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

struct BlurStage {
    horizontal: ParamBuffer,
    vertical: ParamBuffer,
}

/// Bind groups tied to one set of render targets.
struct TargetBindings {
    pixelate: wgpu::BindGroup,
    high_pass: wgpu::BindGroup,
    /// (horizontal, vertical) per bloom level.
    blur: Vec<(wgpu::BindGroup, wgpu::BindGroup)>,
    composite: wgpu::BindGroup,
    output: wgpu::BindGroup,
}

/// Blur direction for a pass writing a target of `extent`.
pub(crate) fn blur_direction(horizontal: bool, extent: (u32, u32)) -> [f32; 2] {
    if horizontal {
        [1.0 / extent.0.max(1) as f32, 0.0]
    } else {
        [0.0, 1.0 / extent.1.max(1) as f32]
    }
}

/// Pixelation, bloom and tone mapping applied to the low-resolution scene.
pub(crate) struct PostComposer {
    post_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    pixelate: wgpu::RenderPipeline,
    high_pass: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    output_module: wgpu::ShaderModule,
    output_pipeline_layout: wgpu::PipelineLayout,
    outputs: HashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
    pixelate_params: ParamBuffer,
    high_pass_params: ParamBuffer,
    blur_params: Vec<BlurStage>,
    composite_params: ParamBuffer,
    output_params: ParamBuffer,
    bindings: Option<TargetBindings>,
}

impl PostComposer {
    pub fn new(device: &wgpu::Device) -> Self {
        let post_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post layout"),
            entries: &[texture_entry(0), sampler_entry(), uniform_entry()],
        });

        let mut composite_entries = vec![texture_entry(0), sampler_entry(), uniform_entry()];
        composite_entries.extend((0..BLOOM_LEVELS as u32).map(|level| texture_entry(3 + level)));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom composite layout"),
            entries: &composite_entries,
        });

        let post_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("post pipeline layout"),
            bind_group_layouts: &[&post_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("composite pipeline layout"),
                bind_group_layouts: &[&composite_layout],
                push_constant_ranges: &[],
            });

        let stage = |label: &str, body: &str, entry: &str, layout: &wgpu::PipelineLayout| {
            let module = post_module(device, label, body);
            fullscreen_pipeline(device, label, layout, &module, entry, HDR_FORMAT)
        };
        let pixelate = stage("pixelate", shaders::PIXELATE, "fs_pixelate", &post_pipeline_layout);
        let high_pass = stage("bloom high pass", shaders::HIGH_PASS, "fs_high_pass", &post_pipeline_layout);
        let blur = stage("bloom blur", shaders::BLUR, "fs_blur", &post_pipeline_layout);
        let composite = stage(
            "bloom composite",
            shaders::COMPOSITE,
            "fs_composite",
            &composite_pipeline_layout,
        );

        let blur_params = (0..BLOOM_LEVELS)
            .map(|_| BlurStage {
                horizontal: ParamBuffer::new::<BlurParams>(device, "blur horizontal params"),
                vertical: ParamBuffer::new::<BlurParams>(device, "blur vertical params"),
            })
            .collect();

        Self {
            output_module: post_module(device, "output", shaders::OUTPUT),
            output_pipeline_layout: post_pipeline_layout,
            outputs: HashMap::new(),
            post_layout,
            composite_layout,
            pixelate,
            high_pass,
            blur,
            composite,
            nearest: create_sampler(device, wgpu::FilterMode::Nearest),
            linear: create_sampler(device, wgpu::FilterMode::Linear),
            pixelate_params: ParamBuffer::new::<PixelateParams>(device, "pixelate params"),
            high_pass_params: ParamBuffer::new::<HighPassParams>(device, "high pass params"),
            blur_params,
            composite_params: ParamBuffer::new::<CompositeParams>(device, "composite params"),
            output_params: ParamBuffer::new::<OutputParams>(device, "output params"),
            bindings: None,
        }
    }

    /// Drops bind groups that reference old targets.
    pub fn invalidate(&mut self) {
        self.bindings = None;
    }

    /// Writes parameters and builds whatever is missing for this target
    /// set and output format.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &RenderTargets,
        scene: &AvatarScene,
        output_format: wgpu::TextureFormat,
    ) {
        let bloom = scene.post().bloom();
        let full = (targets.output_size.width, targets.output_size.height);

        self.pixelate_params
            .write(queue, &PixelateParams::new(targets.scene.size, targets.pixel_size));
        self.high_pass_params.write(queue, &HighPassParams::new(bloom));
        for ((stage, extent), radius) in self
            .blur_params
            .iter()
            .zip(bloom_extents(full))
            .zip(bloom.kernel_radii)
        {
            stage
                .horizontal
                .write(queue, &BlurParams::new(blur_direction(true, extent), radius));
            stage
                .vertical
                .write(queue, &BlurParams::new(blur_direction(false, extent), radius));
        }
        self.composite_params.write(queue, &CompositeParams::new(bloom));
        self.output_params.write(
            queue,
            &OutputParams::new(scene.environment().exposure, output_format),
        );

        if !self.outputs.contains_key(&output_format) {
            tracing::debug!(?output_format, "building output pipeline");
            let pipeline = fullscreen_pipeline(
                device,
                "output",
                &self.output_pipeline_layout,
                &self.output_module,
                "fs_output",
                output_format,
            );
            self.outputs.insert(output_format, pipeline);
        }

        if self.bindings.is_none() {
            self.bindings = Some(self.bind_targets(device, targets));
        }
    }

    fn bind_targets(&self, device: &wgpu::Device, targets: &RenderTargets) -> TargetBindings {
        let single = |label: &str, source: &Target, sampler: &wgpu::Sampler, params: &ParamBuffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.post_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&source.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: params.buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let mut blur = Vec::with_capacity(BLOOM_LEVELS);
        let mut source = &targets.bright;
        for (level, stage) in targets.bloom.iter().zip(&self.blur_params) {
            let horizontal = single("blur horizontal", source, &self.linear, &stage.horizontal);
            let vertical = single("blur vertical", &level.horizontal, &self.linear, &stage.vertical);
            blur.push((horizontal, vertical));
            source = &level.vertical;
        }

        let mut composite_entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&targets.pixelated.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&self.linear),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: self.composite_params.buffer.as_entire_binding(),
            },
        ];
        composite_entries.extend(targets.bloom.iter().enumerate().map(|(index, level)| {
            wgpu::BindGroupEntry {
                binding: 3 + index as u32,
                resource: wgpu::BindingResource::TextureView(&level.vertical.view),
            }
        }));

        TargetBindings {
            pixelate: single("pixelate", &targets.scene, &self.nearest, &self.pixelate_params),
            high_pass: single("high pass", &targets.pixelated, &self.linear, &self.high_pass_params),
            blur,
            composite: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bloom composite"),
                layout: &self.composite_layout,
                entries: &composite_entries,
            }),
            output: single("output", &targets.composite, &self.nearest, &self.output_params),
        }
    }

    /// Records every post stage, ending in `output_view`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        output_view: &wgpu::TextureView,
        output_format: wgpu::TextureFormat,
    ) {
        let (Some(bindings), Some(output)) = (self.bindings.as_ref(), self.outputs.get(&output_format))
        else {
            tracing::warn!("post stages used before prepare; skipping frame");
            return;
        };

        fullscreen_pass(encoder, "pixelate", &targets.pixelated.view, &self.pixelate, &bindings.pixelate);
        fullscreen_pass(encoder, "bloom high pass", &targets.bright.view, &self.high_pass, &bindings.high_pass);
        for (level, (horizontal, vertical)) in targets.bloom.iter().zip(&bindings.blur) {
            fullscreen_pass(encoder, "bloom blur", &level.horizontal.view, &self.blur, horizontal);
            fullscreen_pass(encoder, "bloom blur", &level.vertical.view, &self.blur, vertical);
        }
        fullscreen_pass(encoder, "bloom composite", &targets.composite.view, &self.composite, &bindings.composite);
        fullscreen_pass(encoder, "output", output_view, output, &bindings.output);
    }
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

fn post_module(device: &wgpu::Device, label: &str, body: &str) -> wgpu::ShaderModule {
    shaders::create_module(
        device,
        label,
        &[shaders::FULLSCREEN, shaders::POST_BINDINGS, body],
    )
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_fullscreen"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn create_sampler(device: &wgpu::Device, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("post sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 1,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry() -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 2,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_steps_one_texel_of_the_target() {
        assert_eq!(blur_direction(true, (640, 360)), [1.0 / 640.0, 0.0]);
        assert_eq!(blur_direction(false, (640, 360)), [0.0, 1.0 / 360.0]);
        assert_eq!(blur_direction(false, (4, 0)), [0.0, 1.0]);
    }
}
