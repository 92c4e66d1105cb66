use bytemuck::{Pod, Zeroable};
use scene::geometry::Geometry;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub(crate) struct GpuVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub(crate) struct GpuMesh {
    pub vertices: wgpu::Buffer,
    pub indices: wgpu::Buffer,
    pub index_count: u32,
}

/// Vertex and index buffers for every scene geometry, indexed like
/// `AvatarScene::geometries`. Geometry never changes after assembly, so
/// each one is uploaded exactly once.
pub(crate) struct MeshCache {
    meshes: Vec<GpuMesh>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    pub fn sync(&mut self, device: &wgpu::Device, geometries: &[Geometry]) {
        for geometry in geometries.iter().skip(self.meshes.len()) {
            self.meshes.push(upload(device, geometry));
        }
    }

    pub fn get(&self, index: usize) -> Option<&GpuMesh> {
        self.meshes.get(index)
    }
}

fn upload(device: &wgpu::Device, geometry: &Geometry) -> GpuMesh {
    let vertices: Vec<GpuVertex> = geometry
        .vertices
        .iter()
        .map(|vertex| GpuVertex {
            position: vertex.position,
            uv: vertex.uv,
        })
        .collect();
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(geometry.label),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(geometry.label),
        contents: bytemuck::cast_slice(&geometry.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    tracing::trace!(
        geometry = geometry.label,
        vertices = vertices.len(),
        indices = geometry.indices.len(),
        "uploaded mesh"
    );

    GpuMesh {
        vertices: vertex_buffer,
        indices: index_buffer,
        index_count: geometry.indices.len() as u32,
    }
}
