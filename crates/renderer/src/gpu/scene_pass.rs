use std::collections::HashMap;

use glam::Mat4;
use scene::material::{Material, MaterialKind};
use scene::{AvatarScene, DrawItem, NodeId};

use super::meshes::{GpuVertex, MeshCache};
use super::targets::{RenderTargets, DEPTH_FORMAT, HDR_FORMAT};
use super::textures::TextureCache;
use super::uniforms::{FrameUniforms, ObjectUniforms};
use crate::shaders;

/// Draw order buckets of the scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum DrawStage {
    Opaque,
    Lines,
    /// Alpha blended, sorted back to front.
    Transparent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PlannedDraw {
    pub item: DrawItem,
    pub stage: DrawStage,
    /// View-space distance of the node origin.
    pub depth: f32,
}

pub(crate) fn stage_for(material: &Material) -> DrawStage {
    if material.kind == MaterialKind::Line {
        DrawStage::Lines
    } else if material.is_transparent() {
        DrawStage::Transparent
    } else {
        DrawStage::Opaque
    }
}

/// Orders the scene's drawables: opaque meshes in graph order, then
/// lines, then transparent meshes farthest first.
pub(crate) fn plan_draws(scene: &AvatarScene, view: Mat4) -> Vec<PlannedDraw> {
    let mut draws: Vec<PlannedDraw> = scene
        .draw_list()
        .into_iter()
        .map(|item| {
            let origin = view.transform_point3(item.world.w_axis.truncate());
            PlannedDraw {
                item,
                stage: stage_for(scene.material(item.drawable.material)),
                depth: -origin.z,
            }
        })
        .collect();

    // stable: ties keep graph order
    draws.sort_by(|a, b| {
        a.stage.cmp(&b.stage).then_with(|| {
            if a.stage == DrawStage::Transparent {
                b.depth.total_cmp(&a.depth)
            } else {
                std::cmp::Ordering::Equal
            }
        })
    });
    draws
}

/// Fixed-function state a material needs from its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    stage: DrawStage,
    double_sided: bool,
    /// Polygon offset as (units, factor bits).
    depth_bias: Option<(i32, u32)>,
}

impl PipelineKey {
    pub fn for_material(material: &Material) -> Self {
        let stage = stage_for(material);
        Self {
            stage,
            double_sided: material.double_sided,
            depth_bias: material
                .polygon_offset
                .filter(|_| stage != DrawStage::Lines)
                .map(|offset| (offset.units.round() as i32, offset.factor.to_bits())),
        }
    }
}

struct ObjectBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Renders the scene graph into the low-resolution HDR target.
pub(crate) struct ScenePass {
    module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    object_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    objects: HashMap<NodeId, ObjectBinding>,
    plan: Vec<PlannedDraw>,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame bind group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        Self {
            module: shaders::create_module(device, "scene shader", &[shaders::SCENE]),
            pipeline_layout,
            object_layout,
            frame_buffer,
            frame_bind_group,
            pipelines: HashMap::new(),
            objects: HashMap::new(),
            plan: Vec::new(),
        }
    }

    /// Writes this frame's uniforms and creates any missing per-node
    /// resources and pipelines.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &AvatarScene,
        textures: &TextureCache,
    ) {
        let view = scene.controls().view();
        let frame = FrameUniforms::new(
            scene.camera().projection(),
            view,
            scene.controls().eye(),
            scene.environment(),
        );
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        self.plan = plan_draws(scene, view);
        for draw in &self.plan {
            let material = scene.material(draw.item.drawable.material);
            let uniforms = ObjectUniforms::new(draw.item.world, material);

            let key = PipelineKey::for_material(material);
            if !self.pipelines.contains_key(&key) {
                let pipeline = build_pipeline(device, &self.pipeline_layout, &self.module, key);
                self.pipelines.insert(key, pipeline);
            }

            let binding = self.objects.entry(draw.item.node).or_insert_with(|| {
                let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(material.label),
                    size: std::mem::size_of::<ObjectUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                let surface = material.texture.map(|id| scene.surface(id));
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(material.label),
                    layout: &self.object_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(
                                textures.view(material.texture),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(textures.sampler(surface)),
                        },
                    ],
                });
                ObjectBinding { buffer, bind_group }
            });
            queue.write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&uniforms));
        }
    }

    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        meshes: &MeshCache,
        scene: &AvatarScene,
    ) {
        let background = scene.environment().background;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.scene.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(background.x),
                        g: f64::from(background.y),
                        b: f64::from(background.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_bind_group(0, &self.frame_bind_group, &[]);

        for draw in &self.plan {
            let material = scene.material(draw.item.drawable.material);
            let (Some(pipeline), Some(binding), Some(mesh)) = (
                self.pipelines.get(&PipelineKey::for_material(material)),
                self.objects.get(&draw.item.node),
                meshes.get(draw.item.drawable.geometry.index()),
            ) else {
                tracing::warn!(node = draw.item.node.index(), "skipping unprepared drawable");
                continue;
            };

            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, &binding.bind_group, &[]);
            pass.set_vertex_buffer(0, mesh.vertices.slice(..));
            pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let topology = match key.stage {
        DrawStage::Lines => wgpu::PrimitiveTopology::LineList,
        _ => wgpu::PrimitiveTopology::TriangleList,
    };
    let cull_mode = if key.double_sided || key.stage == DrawStage::Lines {
        None
    } else {
        Some(wgpu::Face::Back)
    };
    let blend = match key.stage {
        DrawStage::Transparent => Some(wgpu::BlendState::ALPHA_BLENDING),
        _ => Some(wgpu::BlendState::REPLACE),
    };
    let bias = key
        .depth_bias
        .map(|(units, factor)| wgpu::DepthBiasState {
            constant: units,
            slope_scale: f32::from_bits(factor),
            clamp: 0.0,
        })
        .unwrap_or_default();
    tracing::debug!(?key, "building scene pipeline");

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some("vs_scene"),
            buffers: &[GpuVertex::layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_scene"),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene::{assemble, SceneOptions};

    fn planned() -> (AvatarScene, Vec<PlannedDraw>) {
        let scene = assemble(SceneOptions::default()).unwrap();
        let plan = plan_draws(&scene, scene.controls().view());
        (scene, plan)
    }

    #[test]
    fn stages_run_opaque_lines_transparent() {
        let (_, plan) = planned();
        let stages: Vec<DrawStage> = plan.iter().map(|draw| draw.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort();
        assert_eq!(stages, sorted);
        assert_eq!(stages.iter().filter(|s| **s == DrawStage::Lines).count(), 1);
        assert_eq!(stages.iter().filter(|s| **s == DrawStage::Transparent).count(), 3);
    }

    #[test]
    fn transparent_draws_go_back_to_front() {
        let (scene, plan) = planned();
        let handles = scene.handles();
        let order: Vec<NodeId> = plan
            .iter()
            .filter(|draw| draw.stage == DrawStage::Transparent)
            .map(|draw| draw.item.node)
            .collect();
        assert_eq!(order, vec![handles.sun, handles.floor, handles.name_tag]);
    }

    #[test]
    fn pipeline_keys_follow_material_state() {
        let (scene, plan) = planned();
        let handles = scene.handles();
        let key_of = |node: NodeId| {
            let draw = plan.iter().find(|draw| draw.item.node == node).unwrap();
            PipelineKey::for_material(scene.material(draw.item.drawable.material))
        };

        let body = key_of(handles.pyramid_body);
        assert_eq!(body.stage, DrawStage::Opaque);
        assert!(body.depth_bias.is_some());

        let edges = key_of(handles.pyramid_edges);
        assert_eq!(edges.stage, DrawStage::Lines);
        assert!(edges.depth_bias.is_none());

        let floor = key_of(handles.floor);
        assert!(floor.double_sided);
        assert_eq!(key_of(handles.markers[0]), key_of(handles.markers[4]));
    }
}
