use image::RgbaImage;

use crate::panel::Panel;
use crate::types::Viewport;

/// Captured RGBA8 pixels of a panel, sized to the viewport.
///
/// A snapshot is consumed exactly once by a texture upload and dropped right
/// after, so pixel buffers never outlive the frame that uploads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pixels: RgbaImage,
}

impl Snapshot {
    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width(), self.height())
    }

    /// Tightly packed RGBA rows, top row first.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }
}

/// The two snapshots a flip animates between.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPair {
    pub top: Snapshot,
    pub bottom: Snapshot,
}

/// Rasterises `panel` into a fresh buffer the size of `viewport`.
///
/// The buffer starts fully transparent, so panels that do not cover the whole
/// viewport leave the remainder clear.
pub fn capture_snapshot(panel: &dyn Panel, viewport: Viewport) -> Snapshot {
    let mut canvas = RgbaImage::new(viewport.width, viewport.height);
    panel.draw(&mut canvas);
    tracing::trace!(
        width = viewport.width,
        height = viewport.height,
        panel_width = panel.size().0,
        panel_height = panel.size().1,
        "captured panel snapshot"
    );
    Snapshot::from_image(canvas)
}
