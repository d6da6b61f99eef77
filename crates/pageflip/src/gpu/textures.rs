use crate::error::RenderError;
use crate::snapshot::Snapshot;
use crate::types::{TextureFilter, TextureSlot, Viewport};

const BYTES_PER_PIXEL: u32 = 4;

pub(crate) struct SlotTexture {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// The two snapshot textures plus their shared sampler.
///
/// Allocated when the program is prepared and on viewport changes only;
/// uploads write into the existing storage.
pub(crate) struct TextureSlots {
    slots: [SlotTexture; 2],
    pub sampler: wgpu::Sampler,
    size: Viewport,
}

impl TextureSlots {
    pub fn allocate(
        device: &wgpu::Device,
        size: Viewport,
        format: wgpu::TextureFormat,
        filter: TextureFilter,
    ) -> Result<Self, RenderError> {
        let size = Viewport::new(size.width.max(1), size.height.max(1));

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let slots = TextureSlot::ALL.map(|slot| create_slot(device, slot, size, format));
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(err) = oom.or(validation) {
            return Err(RenderError::ResourceExhaustion(format!(
                "failed to allocate {}x{} snapshot textures: {err}",
                size.width, size.height
            )));
        }

        let filter_mode = match filter {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("snapshot sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter_mode,
            min_filter: filter_mode,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        tracing::debug!(
            width = size.width,
            height = size.height,
            ?format,
            "allocated snapshot textures"
        );
        Ok(Self {
            slots,
            sampler,
            size,
        })
    }

    pub fn size(&self) -> Viewport {
        self.size
    }

    pub fn view(&self, slot: TextureSlot) -> &wgpu::TextureView {
        &self.slots[slot.index()].view
    }

    /// Writes `snapshot` into `slot` and releases its pixels.
    ///
    /// Snapshots captured for a different size are skipped. Slots are resized
    /// only between flips, so this happens when a capture raced a resize.
    pub fn upload(&self, queue: &wgpu::Queue, slot: TextureSlot, snapshot: Snapshot) {
        if snapshot.viewport() != self.size {
            tracing::warn!(
                %slot,
                snapshot_width = snapshot.width(),
                snapshot_height = snapshot.height(),
                texture_width = self.size.width,
                texture_height = self.size.height,
                "snapshot size does not match texture; skipping upload"
            );
            return;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.slots[slot.index()].texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            snapshot.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.size.width * BYTES_PER_PIXEL),
                rows_per_image: Some(self.size.height),
            },
            extent(self.size),
        );
    }
}

fn create_slot(
    device: &wgpu::Device,
    slot: TextureSlot,
    size: Viewport,
    format: wgpu::TextureFormat,
) -> SlotTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{slot} snapshot texture")),
        size: extent(size),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    SlotTexture { texture, view }
}

fn extent(size: Viewport) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}
