use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flipconfig::{HexColor, PanelSource};
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use pageflip::{Attachment, Panel};

/// Fallback shown in place of an image that failed to load.
const PLACEHOLDER: HexColor = HexColor([0xbf, 0x61, 0x6a, 0xff]);

/// Builds the panel for one configured source. Unreadable images degrade to
/// a placeholder colour so a broken file never aborts the viewer.
pub fn create(source: &PanelSource) -> Box<dyn Panel> {
    match source {
        PanelSource::Color(color) => Box::new(ColorPanel::new(*color)),
        PanelSource::Image(path) => match ImagePanel::open(path) {
            Ok(panel) => Box::new(panel),
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{error:#}"),
                    "failed to load panel image; using placeholder"
                );
                Box::new(ColorPanel::new(PLACEHOLDER))
            }
        },
    }
}

pub struct ColorPanel {
    color: Rgba<u8>,
}

impl ColorPanel {
    pub fn new(color: HexColor) -> Self {
        Self {
            color: Rgba(color.0),
        }
    }
}

impl Panel for ColorPanel {
    fn size(&self) -> (u32, u32) {
        (1, 1)
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        for pixel in canvas.pixels_mut() {
            *pixel = self.color;
        }
    }
}

/// Image scaled to the viewport when drawn.
pub struct ImagePanel {
    path: PathBuf,
    pixels: RgbaImage,
    attachment: Attachment,
}

impl ImagePanel {
    pub fn open(path: &Path) -> Result<Self> {
        let pixels = image::open(path)
            .with_context(|| format!("failed to decode {}", path.display()))?
            .to_rgba8();
        tracing::debug!(
            path = %path.display(),
            width = pixels.width(),
            height = pixels.height(),
            "loaded panel image"
        );
        Ok(Self::from_image(path.to_path_buf(), pixels))
    }

    pub fn from_image(path: PathBuf, pixels: RgbaImage) -> Self {
        Self {
            path,
            pixels,
            attachment: Attachment::Detached,
        }
    }
}

impl Panel for ImagePanel {
    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        if canvas.dimensions() == self.pixels.dimensions() {
            canvas.copy_from_slice(self.pixels.as_raw());
            return;
        }
        let scaled = imageops::resize(
            &self.pixels,
            canvas.width(),
            canvas.height(),
            FilterType::Triangle,
        );
        canvas.copy_from_slice(scaled.as_raw());
    }

    fn set_attachment(&mut self, attachment: Attachment) {
        if attachment != self.attachment {
            tracing::trace!(
                path = %self.path.display(),
                from = ?self.attachment,
                to = ?attachment,
                "image panel attachment changed"
            );
            self.attachment = attachment;
        }
    }
}
