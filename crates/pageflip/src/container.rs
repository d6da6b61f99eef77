use tracing::{debug, info, warn};

use crate::controller::{FlipController, GestureOutcome};
use crate::error::RenderError;
use crate::link::{FlipEvent, FlipLink};
use crate::panel::{Panel, PanelSequence};
use crate::types::{Attachment, FlipState, PointerEvent, Viewport, PROGRESS_TOP};

/// UI-thread half of the page flip: owns the panels and the gesture state.
///
/// Pointer events go to the current panel first, then to the flip gesture.
/// Frames are requested from the host through the shared link; the render
/// thread reports back through [`PanelContainer::handle_render_event`].
pub struct PanelContainer {
    panels: PanelSequence,
    controller: FlipController,
    link: FlipLink,
    viewport: Viewport,
    flip_surface_on_top: bool,
    renderer_failed: bool,
}

impl PanelContainer {
    pub(crate) fn new(link: FlipLink) -> Self {
        Self {
            panels: PanelSequence::empty(),
            controller: FlipController::new(link.clone()),
            link,
            viewport: Viewport::default(),
            flip_surface_on_top: false,
            renderer_failed: false,
        }
    }

    /// Replaces the panel sequence with `count` panels built eagerly by `factory`.
    ///
    /// The current index resets to 0. Binding again drops the previous panels
    /// and abandons any gesture in progress.
    pub fn bind<F>(&mut self, count: usize, factory: F)
    where
        F: FnMut(usize) -> Box<dyn Panel>,
    {
        if !self.controller.state().is_idle() {
            debug!("rebinding during a flip; abandoning gesture");
            self.link.release(PROGRESS_TOP);
        }
        self.controller = FlipController::new(self.link.clone());
        self.panels = PanelSequence::from_factory(count, factory);
        info!(panels = count, "bound panel sequence");
        self.settle();
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.panels.current()
    }

    pub fn current_panel(&self) -> Option<&dyn Panel> {
        self.panels.get(self.panels.current())
    }

    /// Panel at `index`. Out-of-range indices are logged and yield `None`.
    pub fn panel(&self, index: usize) -> Option<&dyn Panel> {
        match self.panels.checked(index) {
            Ok(index) => self.panels.get(index),
            Err(err) => {
                warn!(error = %err, "ignoring panel lookup");
                None
            }
        }
    }

    /// Attachment state of the panel at `index`, `None` when out of range.
    pub fn attachment(&self, index: usize) -> Option<Attachment> {
        match self.panels.checked(index) {
            Ok(index) => self.panels.attachment(index),
            Err(err) => {
                warn!(error = %err, "ignoring attachment lookup");
                None
            }
        }
    }

    pub fn flip_state(&self) -> FlipState {
        self.controller.state()
    }

    /// `true` while the flip surface is composited above the panels.
    pub fn flip_surface_on_top(&self) -> bool {
        self.flip_surface_on_top
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Records the surface size used for hit-testing and snapshots.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Feeds one pointer event. Returns whether it was consumed.
    pub fn on_pointer_event(&mut self, event: &PointerEvent) -> bool {
        let outcome = self
            .controller
            .on_pointer(event, &mut self.panels, self.viewport);
        match outcome {
            GestureOutcome::Started(_) => self.flip_surface_on_top = true,
            // No frames will come to report the settle.
            GestureOutcome::Released { .. } if self.renderer_failed => self.settle(),
            _ => {}
        }
        outcome.consumed()
    }

    /// Reacts to a renderer notification. Returns the error when the renderer
    /// disabled itself so the host can surface it.
    pub fn handle_render_event(&mut self, event: FlipEvent) -> Option<RenderError> {
        match event {
            FlipEvent::Settled { generation } => {
                let latest = self.link.generation();
                if generation != latest {
                    debug!(generation, latest, "ignoring stale settle");
                } else if !self.controller.state().is_idle() {
                    debug!(generation, "ignoring settle during an active gesture");
                } else {
                    self.settle();
                }
                None
            }
            FlipEvent::RendererFailed(err) => {
                warn!(error = %err, "flip renderer failed; showing panels directly");
                self.renderer_failed = true;
                if self.controller.state().is_idle() {
                    self.settle();
                }
                Some(err)
            }
        }
    }

    /// Clears the failure flag once the host recreated the render context.
    pub fn renderer_recovered(&mut self) {
        self.renderer_failed = false;
    }

    /// Finalizes panel visibility around the current index.
    ///
    /// The current panel becomes visible, its immediate neighbours stay
    /// attached but hidden, everything further away is detached. Calling it
    /// again without an index change is a no-op.
    pub fn settle(&mut self) {
        let current = self.panels.current();
        for index in 0..self.panels.len() {
            let attachment = match index.abs_diff(current) {
                0 => Attachment::Visible,
                1 => Attachment::Hidden,
                _ => Attachment::Detached,
            };
            self.panels.set_attachment(index, attachment);
        }
        self.flip_surface_on_top = false;
        debug!(current, "panels settled");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::link::tests::counting_link;
    use crate::panel::tests::ProbePanel;

    fn container(count: usize) -> (PanelContainer, FlipLink) {
        let (link, _) = counting_link();
        let mut container = PanelContainer::new(link.clone());
        container.resize(Viewport::new(10, 100));
        container.bind(count, ProbePanel::boxed);
        (container, link)
    }

    fn attachments(container: &PanelContainer) -> Vec<Attachment> {
        (0..container.len())
            .filter_map(|index| container.attachment(index))
            .collect()
    }

    #[test]
    fn bind_starts_at_first_panel() {
        let (container, _) = container(4);
        assert_eq!(container.current_index(), 0);
        assert_eq!(
            attachments(&container),
            vec![
                Attachment::Visible,
                Attachment::Hidden,
                Attachment::Detached,
                Attachment::Detached,
            ]
        );
        assert!(!container.flip_surface_on_top());
    }

    #[test]
    fn rebinding_resets_index_and_drops_old_panels() {
        let (mut container, link) = container(3);
        container.on_pointer_event(&PointerEvent::down(90.0));
        container.on_pointer_event(&PointerEvent::up(10.0));
        let generation = link.generation();
        container.handle_render_event(FlipEvent::Settled { generation });
        assert_eq!(container.current_index(), 1);

        container.bind(2, ProbePanel::boxed);
        assert_eq!(container.current_index(), 0);
        assert_eq!(container.len(), 2);
        assert_eq!(
            attachments(&container),
            vec![Attachment::Visible, Attachment::Hidden]
        );
    }

    #[test]
    fn flip_raises_surface_until_settled() {
        let (mut container, link) = container(3);
        assert!(container.on_pointer_event(&PointerEvent::down(90.0)));
        assert!(container.flip_surface_on_top());
        assert_eq!(container.flip_state(), FlipState::FlippingForward);

        let generation = link.generation();
        container.handle_render_event(FlipEvent::Settled { generation });
        assert!(container.flip_surface_on_top(), "gesture still active");

        container.on_pointer_event(&PointerEvent::up(10.0));
        container.handle_render_event(FlipEvent::Settled { generation });
        assert!(!container.flip_surface_on_top());
        assert_eq!(
            attachments(&container),
            vec![Attachment::Hidden, Attachment::Visible, Attachment::Hidden]
        );
    }

    #[test]
    fn stale_settle_is_ignored() {
        let (mut container, link) = container(3);
        container.on_pointer_event(&PointerEvent::down(90.0));
        container.on_pointer_event(&PointerEvent::up(10.0));
        let stale = link.generation() - 1;
        container.handle_render_event(FlipEvent::Settled { generation: stale });
        assert!(container.flip_surface_on_top());
    }

    #[test]
    fn settle_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (link, _) = counting_link();
        let mut container = PanelContainer::new(link);
        let panel_log = log.clone();
        container.bind(1, move |_| {
            Box::new(ProbePanel {
                color: [0; 4],
                consumes_touch: false,
                log: panel_log.clone(),
            })
        });
        container.settle();
        container.settle();
        assert_eq!(container.current_index(), 0);
        assert_eq!(*log.borrow(), vec![Attachment::Visible]);
    }

    #[test]
    fn renderer_failure_is_surfaced_and_panels_shown() {
        let (mut container, _) = container(3);
        container.on_pointer_event(&PointerEvent::down(90.0));
        let err = RenderError::ShaderLink("no sBottom".into());
        assert_eq!(
            container.handle_render_event(FlipEvent::RendererFailed(err.clone())),
            Some(err)
        );
        assert!(container.flip_surface_on_top());

        container.on_pointer_event(&PointerEvent::up(10.0));
        assert_eq!(container.current_index(), 1);
        assert!(!container.flip_surface_on_top());
        assert_eq!(container.attachment(1), Some(Attachment::Visible));
    }

    #[test]
    fn out_of_range_lookups_are_no_ops() {
        let (container, _) = container(2);
        assert!(container.panel(2).is_none());
        assert!(container.attachment(7).is_none());
        assert!(container.panel(1).is_some());
    }

    #[test]
    fn empty_container_swallows_touches() {
        let (mut container, link) = container(0);
        assert!(container.is_empty());
        assert!(container.current_panel().is_none());
        assert!(container.on_pointer_event(&PointerEvent::down(90.0)));
        assert_eq!(container.flip_state(), FlipState::Idle);
        assert_eq!(link.generation(), 0);
    }
}
