use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Shader location of the `aPos` attribute.
pub(crate) const POSITION_LOCATION: u32 = 0;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadVertex {
    pub position: [f32; 2],
}

/// Full-viewport quad drawn as a triangle strip.
pub(crate) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0] },
    QuadVertex { position: [-1.0, -1.0] },
    QuadVertex { position: [1.0, 1.0] },
    QuadVertex { position: [1.0, -1.0] },
];

const ATTRIBUTES: [wgpu::VertexAttribute; 1] =
    wgpu::vertex_attr_array![POSITION_LOCATION => Float32x2];

/// Static vertex buffer for [`QUAD_VERTICES`], created once per device.
pub(crate) struct GeometryBuffer {
    buffer: wgpu::Buffer,
}

impl GeometryBuffer {
    pub const TOPOLOGY: wgpu::PrimitiveTopology = wgpu::PrimitiveTopology::TriangleStrip;

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flip quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }

    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }

    pub fn vertex_count(&self) -> u32 {
        QUAD_VERTICES.len() as u32
    }
}
