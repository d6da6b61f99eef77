use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Mirrors the `FlipParams` std140 block in `flip.frag`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FlipUniforms {
    pub uniform_y: f32,
    pub padding: [f32; 3],
}

unsafe impl Zeroable for FlipUniforms {}
unsafe impl Pod for FlipUniforms {}

impl FlipUniforms {
    pub fn new(progress: f32) -> Self {
        Self {
            uniform_y: progress.clamp(-1.0, 1.0),
            padding: [0.0; 3],
        }
    }
}

/// GPU buffer holding [`FlipUniforms`]; rewritten only when progress changes.
pub(crate) struct UniformBuffer {
    buffer: wgpu::Buffer,
    current: FlipUniforms,
}

impl UniformBuffer {
    pub fn new(device: &wgpu::Device) -> Self {
        let current = FlipUniforms::new(-1.0);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("flip uniforms"),
            contents: bytemuck::bytes_of(&current),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self { buffer, current }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn write(&mut self, queue: &wgpu::Queue, progress: f32) {
        let next = FlipUniforms::new(progress);
        if next == self.current {
            return;
        }
        self.current = next;
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&self.current));
    }
}
