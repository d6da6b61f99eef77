use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::RenderError;
use crate::types::{ColorSpaceMode, GpuPowerPreference, RenderSettings, Viewport};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SurfaceColorSpace {
    Gamma,
    Linear,
}

impl SurfaceColorSpace {
    /// Format for snapshot textures so their bytes reach the swapchain unchanged.
    pub fn texture_format(self) -> wgpu::TextureFormat {
        match self {
            SurfaceColorSpace::Gamma => wgpu::TextureFormat::Rgba8Unorm,
            SurfaceColorSpace::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    pub color_space: SurfaceColorSpace,
}

impl GpuContext {
    pub(crate) fn new<W>(
        window: Arc<W>,
        viewport: Viewport,
        settings: &RenderSettings,
    ) -> Result<Self, RenderError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::Surface(format!("failed to create surface: {err}")))?;

        let power_preference = match settings.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| {
            tracing::error!(error = %err, "no suitable GPU adapter");
            RenderError::ContextUnavailable
        })?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        if viewport.width > max_dimension || viewport.height > max_dimension {
            return Err(RenderError::ResourceExhaustion(format!(
                "GPU max texture dimension is {max_dimension}, surface is {}x{}",
                viewport.width, viewport.height
            )));
        }

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("pageflip device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| {
            tracing::error!(error = %err, "failed to create GPU device");
            RenderError::ContextUnavailable
        })?;

        // Scoped errors are handled at the call site; anything else is logged
        // instead of aborting the host.
        device.on_uncaptured_error(Box::new(|err| {
            tracing::error!(error = %err, "uncaptured wgpu error");
        }));

        let surface_caps = surface.get_capabilities(&adapter);
        let color_space = match settings.color_space {
            ColorSpaceMode::Auto | ColorSpaceMode::Gamma => SurfaceColorSpace::Gamma,
            ColorSpaceMode::Linear => SurfaceColorSpace::Linear,
        };
        let wants_srgb = color_space == SurfaceColorSpace::Linear;
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb() == wants_srgb)
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| RenderError::Surface("surface reports no formats".into()))?;
        if surface_format.is_srgb() != wants_srgb {
            tracing::warn!(
                ?surface_format,
                requested = ?color_space,
                "preferred surface color space unavailable; falling back"
            );
        }

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or(wgpu::PresentMode::AutoVsync);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: viewport.width.max(1),
            height: viewport.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?surface_format, ?present_mode, "configured surface");

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_format,
            color_space,
        })
    }

    pub(crate) fn viewport(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    pub(crate) fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() || viewport == self.viewport() {
            return;
        }
        self.config.width = viewport.width;
        self.config.height = viewport.height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Acquires the next swapchain image.
    ///
    /// Returns `Ok(None)` when the frame should be skipped; lost and outdated
    /// surfaces are reconfigured for the next attempt.
    pub(crate) fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        match self.surface.get_current_texture() {
            Ok(frame) => Ok(Some(frame)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout; retrying next frame");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::ResourceExhaustion(
                "surface out of memory".into(),
            )),
            Err(other) => Err(RenderError::Surface(other.to_string())),
        }
    }
}
