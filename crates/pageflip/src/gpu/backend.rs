use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::RenderError;
use crate::renderer::RenderBackend;
use crate::snapshot::Snapshot;
use crate::types::{RenderSettings, TextureSlot, Viewport};

use super::context::GpuContext;
use super::geometry::GeometryBuffer;
use super::program::{ShaderProgram, ShaderSources};
use super::textures::TextureSlots;
use super::uniforms::UniformBuffer;

/// Everything that is rebuilt when the render context is (re)created.
struct Prepared {
    program: ShaderProgram,
    textures: TextureSlots,
    bind_group: wgpu::BindGroup,
}

/// [`RenderBackend`] drawing into a window surface with wgpu.
///
/// The device and surface are created up front; the program and the snapshot
/// textures are built in [`RenderBackend::prepare`].
pub struct WgpuBackend {
    context: GpuContext,
    geometry: GeometryBuffer,
    uniforms: UniformBuffer,
    sources: ShaderSources,
    settings: RenderSettings,
    prepared: Option<Prepared>,
}

impl WgpuBackend {
    pub fn new<W>(
        window: Arc<W>,
        viewport: Viewport,
        settings: RenderSettings,
    ) -> Result<Self, RenderError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        Self::with_shaders(window, viewport, settings, ShaderSources::builtin())
    }

    pub fn with_shaders<W>(
        window: Arc<W>,
        viewport: Viewport,
        settings: RenderSettings,
        sources: ShaderSources,
    ) -> Result<Self, RenderError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let context = GpuContext::new(window, viewport, &settings)?;
        let geometry = GeometryBuffer::new(&context.device);
        let uniforms = UniformBuffer::new(&context.device);
        Ok(Self {
            context,
            geometry,
            uniforms,
            sources,
            settings,
            prepared: None,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.context.viewport()
    }

    fn prepared(&self) -> Result<&Prepared, RenderError> {
        self.prepared.as_ref().ok_or(RenderError::ContextUnavailable)
    }

    fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.settings.clear_color;
        wgpu::Color { r, g, b, a }
    }

    fn render(&mut self, progress: Option<f32>) -> Result<(), RenderError> {
        let Some(frame) = self.context.acquire()? else {
            return Ok(());
        };
        if let Some(progress) = progress {
            self.uniforms.write(&self.context.queue, progress);
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("flip encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("flip pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            if let (Some(_), Some(prepared)) = (progress, self.prepared.as_ref()) {
                pass.set_pipeline(prepared.program.pipeline());
                pass.set_bind_group(0, &prepared.bind_group, &[]);
                pass.set_vertex_buffer(0, self.geometry.slice());
                pass.draw(0..self.geometry.vertex_count(), 0..1);
            }
        }
        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn prepare(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.prepared = None;
        self.context.resize(viewport);
        let device = &self.context.device;

        let program = ShaderProgram::link(device, &self.sources, self.context.surface_format)?;
        let textures = TextureSlots::allocate(
            device,
            self.context.viewport(),
            self.context.color_space.texture_format(),
            self.settings.filter,
        )?;
        let bind_group = program.bind(device, &self.uniforms, &textures);
        self.prepared = Some(Prepared {
            program,
            textures,
            bind_group,
        });
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        self.context.resize(viewport);
        Ok(())
    }

    fn reallocate(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        let Some(prepared) = self.prepared.as_mut() else {
            return Ok(());
        };
        if viewport.is_empty() || prepared.textures.size() == viewport {
            return Ok(());
        }

        let device = &self.context.device;
        prepared.textures = TextureSlots::allocate(
            device,
            viewport,
            self.context.color_space.texture_format(),
            self.settings.filter,
        )?;
        prepared.bind_group = prepared
            .program
            .bind(device, &self.uniforms, &prepared.textures);
        Ok(())
    }

    fn upload(&mut self, slot: TextureSlot, snapshot: Snapshot) -> Result<(), RenderError> {
        let prepared = self.prepared()?;
        prepared
            .textures
            .upload(&self.context.queue, slot, snapshot);
        Ok(())
    }

    fn draw(&mut self, progress: f32) -> Result<(), RenderError> {
        self.prepared()?;
        self.render(Some(progress))
    }

    fn draw_blank(&mut self) -> Result<(), RenderError> {
        self.render(None)
    }
}
