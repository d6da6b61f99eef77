use image::RgbaImage;

use crate::error::ContainerError;
use crate::types::{Attachment, PointerEvent};

/// A renderable surface supplied by the host.
///
/// The container only needs three capabilities from a panel: its size, the
/// ability to paint its current appearance into an RGBA buffer, and a chance to
/// consume pointer input before a flip gesture is considered.
pub trait Panel {
    /// Intrinsic size of the panel in pixels.
    fn size(&self) -> (u32, u32);

    /// Paints the panel's current appearance into `canvas`.
    ///
    /// The canvas is sized to the container viewport, which may differ from
    /// [`Panel::size`]; panels decide how to fit themselves.
    fn draw(&self, canvas: &mut RgbaImage);

    /// Offers a pointer event to the panel. Returning `true` marks it handled
    /// and prevents a flip from starting.
    fn on_pointer(&mut self, _event: &PointerEvent) -> bool {
        false
    }

    /// Notifies the panel that the container attached, hid or detached it.
    fn set_attachment(&mut self, _attachment: Attachment) {}
}

/// Ordered, fixed-length list of panels plus the visible index.
///
/// `current < len()` holds whenever the sequence is non-empty.
pub(crate) struct PanelSequence {
    panels: Vec<Box<dyn Panel>>,
    attachments: Vec<Attachment>,
    current: usize,
}

impl PanelSequence {
    pub fn empty() -> Self {
        Self {
            panels: Vec::new(),
            attachments: Vec::new(),
            current: 0,
        }
    }

    pub fn from_factory<F>(count: usize, mut factory: F) -> Self
    where
        F: FnMut(usize) -> Box<dyn Panel>,
    {
        let panels: Vec<_> = (0..count).map(&mut factory).collect();
        Self {
            attachments: vec![Attachment::Detached; panels.len()],
            panels,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.panels.len()
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0 && !self.panels.is_empty()
    }

    pub fn advance(&mut self) {
        if self.has_next() {
            self.current += 1;
        }
    }

    pub fn retreat(&mut self) {
        if self.has_previous() {
            self.current -= 1;
        }
    }

    pub fn checked(&self, index: usize) -> Result<usize, ContainerError> {
        if index < self.panels.len() {
            Ok(index)
        } else {
            Err(ContainerError::InvalidIndex {
                index,
                len: self.panels.len(),
            })
        }
    }

    pub fn get(&self, index: usize) -> Option<&dyn Panel> {
        self.panels.get(index).map(|panel| panel.as_ref())
    }

    pub fn current_mut(&mut self) -> Option<&mut (dyn Panel + 'static)> {
        self.panels.get_mut(self.current).map(|panel| panel.as_mut())
    }

    pub fn attachment(&self, index: usize) -> Option<Attachment> {
        self.attachments.get(index).copied()
    }

    /// Applies `attachment` to the panel at `index`, notifying it only on change.
    pub fn set_attachment(&mut self, index: usize, attachment: Attachment) {
        let (Some(slot), Some(panel)) = (
            self.attachments.get_mut(index),
            self.panels.get_mut(index),
        ) else {
            return;
        };
        if *slot != attachment {
            *slot = attachment;
            panel.set_attachment(attachment);
        }
    }
}
