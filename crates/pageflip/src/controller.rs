use tracing::{debug, info};

use crate::link::FlipLink;
use crate::panel::PanelSequence;
use crate::snapshot::{capture_snapshot, SnapshotPair};
use crate::types::{FlipState, PointerAction, PointerEvent, Viewport, PROGRESS_BOTTOM, PROGRESS_TOP};

/// What a pointer event did to the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GestureOutcome {
    /// Nothing happened; the event is free for someone else.
    Ignored,
    /// The current panel handled the event itself.
    HandledByPanel,
    Started(FlipState),
    Moved,
    Released { committed: bool },
}

impl GestureOutcome {
    pub fn consumed(self) -> bool {
        !matches!(self, GestureOutcome::Ignored)
    }
}

/// Interprets pointer events into flip decisions.
///
/// The surface is split at its vertical midpoint: the lower half is the
/// "forward" half (toward the next panel), the upper half the "backward" half.
pub(crate) struct FlipController {
    state: FlipState,
    link: FlipLink,
}

impl FlipController {
    pub fn new(link: FlipLink) -> Self {
        Self {
            state: FlipState::Idle,
            link,
        }
    }

    pub fn state(&self) -> FlipState {
        self.state
    }

    pub fn on_pointer(
        &mut self,
        event: &PointerEvent,
        panels: &mut PanelSequence,
        viewport: Viewport,
    ) -> GestureOutcome {
        if self.state.is_idle() {
            match panels.current_mut() {
                // Nothing to show, nothing to flip.
                None => return GestureOutcome::HandledByPanel,
                Some(panel) => {
                    if panel.on_pointer(event) {
                        return GestureOutcome::HandledByPanel;
                    }
                }
            }
        }
        if viewport.is_empty() {
            return GestureOutcome::Ignored;
        }

        let height = viewport.height as f32;
        let doubled_y = event.y * 2.0;
        let in_forward_half = doubled_y > height;
        let in_backward_half = doubled_y < height;

        match event.action {
            PointerAction::Down => {
                if !self.state.is_idle() {
                    return GestureOutcome::Moved;
                }
                if in_forward_half && panels.has_next() {
                    self.start(FlipState::FlippingForward, panels, viewport)
                } else if in_backward_half && panels.has_previous() {
                    self.start(FlipState::FlippingBackward, panels, viewport)
                } else {
                    GestureOutcome::Ignored
                }
            }
            PointerAction::Move => {
                if self.state.is_idle() {
                    return GestureOutcome::Ignored;
                }
                let progress = ((height - doubled_y) / height).clamp(-1.0, 1.0);
                self.link.move_target(progress);
                GestureOutcome::Moved
            }
            PointerAction::Up => {
                let committed = match self.state {
                    FlipState::Idle => return GestureOutcome::Ignored,
                    FlipState::FlippingForward if in_backward_half => {
                        panels.advance();
                        true
                    }
                    FlipState::FlippingBackward if in_forward_half => {
                        panels.retreat();
                        true
                    }
                    _ => false,
                };
                info!(
                    direction = ?self.state,
                    committed,
                    index = panels.current(),
                    "flip gesture released"
                );
                self.state = FlipState::Idle;
                let target = if in_forward_half {
                    PROGRESS_TOP
                } else {
                    PROGRESS_BOTTOM
                };
                self.link.release(target);
                GestureOutcome::Released { committed }
            }
        }
    }

    fn start(
        &mut self,
        direction: FlipState,
        panels: &PanelSequence,
        viewport: Viewport,
    ) -> GestureOutcome {
        let current = panels.current();
        let (top_index, bottom_index, start) = match direction {
            FlipState::FlippingForward => (current, current + 1, PROGRESS_TOP),
            FlipState::FlippingBackward => (current - 1, current, PROGRESS_BOTTOM),
            FlipState::Idle => return GestureOutcome::Ignored,
        };
        let (Some(top), Some(bottom)) = (panels.get(top_index), panels.get(bottom_index)) else {
            return GestureOutcome::Ignored;
        };

        let snapshots = SnapshotPair {
            top: capture_snapshot(top, viewport),
            bottom: capture_snapshot(bottom, viewport),
        };
        let generation = self.link.begin_flip(snapshots, start);
        self.state = direction;
        debug!(
            ?direction,
            top = top_index,
            bottom = bottom_index,
            generation,
            "flip gesture started"
        );
        GestureOutcome::Started(direction)
    }
}
