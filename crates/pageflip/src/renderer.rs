use std::time::Instant;

use tracing::{debug, error, trace};

use crate::animation::FlipAnimator;
use crate::error::RenderError;
use crate::link::{Drained, FlipEvent, FlipEventSink, FlipLink};
use crate::snapshot::Snapshot;
use crate::types::{AnimationSettings, TextureSlot, Viewport};

/// GPU operations the flip renderer needs from its host surface.
///
/// Every method must be called from the thread that owns the rendering
/// context.
pub trait RenderBackend {
    /// Compiles and links the flip program and allocates both texture slots.
    ///
    /// Called on context (re)creation; discards any previous program.
    fn prepare(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Reconfigures the presentation surface for a new viewport.
    fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Reallocates both texture slots at `viewport` size if it differs.
    ///
    /// Never called while a flip is animating; the slots would lose its snapshots.
    fn reallocate(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    /// Uploads `snapshot` into `slot`. The snapshot is released afterwards.
    fn upload(&mut self, slot: TextureSlot, snapshot: Snapshot) -> Result<(), RenderError>;

    /// Draws one full-viewport quad with the given fold progress.
    fn draw(&mut self, progress: f32) -> Result<(), RenderError>;

    /// Presents an empty frame; used once the renderer has disabled itself.
    fn draw_blank(&mut self) -> Result<(), RenderError>;
}

/// Owns the backend and the progress animation, driven once per frame.
pub struct FlipRenderer<B> {
    backend: B,
    animator: FlipAnimator,
    link: FlipLink,
    events: Box<dyn FlipEventSink>,
    generation: u64,
    prepared: bool,
    failed: bool,
    /// `false` from the first frame of a flip until its Settled event.
    settle_reported: bool,
    /// Texture size waiting for the current flip to settle.
    deferred_reallocation: Option<Viewport>,
}

impl<B: RenderBackend> FlipRenderer<B> {
    pub(crate) fn new(
        backend: B,
        link: FlipLink,
        events: Box<dyn FlipEventSink>,
        settings: AnimationSettings,
    ) -> Self {
        Self {
            backend,
            animator: FlipAnimator::new(settings, Instant::now()),
            link,
            events,
            generation: 0,
            prepared: false,
            failed: false,
            settle_reported: true,
            deferred_reallocation: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn progress(&self) -> f32 {
        self.animator.progress()
    }

    pub fn target(&self) -> f32 {
        self.animator.target()
    }

    /// `true` once a failure disabled the renderer until the next context creation.
    pub fn is_disabled(&self) -> bool {
        self.failed
    }

    /// Context creation callback. Rebuilds the program from scratch.
    pub fn surface_created(&mut self, viewport: Viewport) {
        self.failed = false;
        self.prepared = false;
        self.deferred_reallocation = None;
        match self.backend.prepare(viewport) {
            Ok(()) => {
                self.prepared = true;
                debug!(
                    width = viewport.width,
                    height = viewport.height,
                    "flip renderer prepared"
                );
            }
            Err(err) => self.fail(err),
        }
        self.link.request_render();
    }

    /// Viewport resize callback.
    pub fn surface_changed(&mut self, viewport: Viewport) {
        if viewport.is_empty() || !self.prepared || self.failed {
            return;
        }
        let result = self.backend.resize(viewport).and_then(|()| {
            if self.settle_reported {
                self.backend.reallocate(viewport)
            } else {
                debug!(
                    width = viewport.width,
                    height = viewport.height,
                    "deferring texture reallocation until the flip settles"
                );
                self.deferred_reallocation = Some(viewport);
                Ok(())
            }
        });
        if let Err(err) = result {
            self.fail(err);
        }
        self.link.request_render();
    }

    /// Per-frame draw callback.
    pub fn draw_frame(&mut self, now: Instant) {
        self.link.clear_dirty();
        let drained = self.link.take_pending();

        // Pending snapshots are discarded unused on this path.
        if self.failed || !self.prepared {
            if let Err(err) = self.backend.draw_blank() {
                trace!(error = %err, "blank frame failed");
            }
            return;
        }

        let gesture_active = drained.gesture_active;
        if let Err(err) = self.apply(drained, now) {
            self.fail(err);
            return;
        }

        let animating = self.animator.advance(now);
        if let Err(err) = self.backend.draw(self.animator.progress()) {
            self.fail(err);
            return;
        }

        if animating {
            self.link.request_render();
        } else if !gesture_active && !self.settle_reported {
            if let Err(err) = self.reallocate_deferred() {
                self.fail(err);
                return;
            }
            self.settle_reported = true;
            trace!(
                generation = self.generation,
                progress = self.animator.progress(),
                "flip settled"
            );
            self.events.emit(FlipEvent::Settled {
                generation: self.generation,
            });
        }
    }

    fn apply(&mut self, drained: Drained, now: Instant) -> Result<(), RenderError> {
        let Drained {
            pending,
            generation,
            ..
        } = drained;
        if pending.is_empty() {
            return Ok(());
        }
        self.settle_reported = false;
        self.generation = generation;

        if let Some(pair) = pending.snapshots {
            // A new flip replaces both slots anyway.
            self.reallocate_deferred()?;
            self.backend.upload(TextureSlot::Top, pair.top)?;
            self.backend.upload(TextureSlot::Bottom, pair.bottom)?;
            trace!(generation, "uploaded flip snapshots");
        }
        if let Some(position) = pending.jump {
            self.animator.jump(position, now);
        }
        if let Some(target) = pending.target {
            self.animator.retarget(target, now);
        }
        Ok(())
    }

    fn reallocate_deferred(&mut self) -> Result<(), RenderError> {
        match self.deferred_reallocation.take() {
            Some(viewport) => self.backend.reallocate(viewport),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: RenderError) {
        if self.failed {
            return;
        }
        self.failed = true;
        error!(error = %err, "flip renderer disabled");
        self.events.emit(FlipEvent::RendererFailed(err));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crossbeam_channel::Receiver;

    use super::*;
    use crate::link::event_channel;
    use crate::link::tests::{counting_link, solid_pair};

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Prepare(Viewport),
        Resize(Viewport),
        Reallocate(Viewport),
        Upload(TextureSlot, u8),
        Draw(f32),
        Blank,
    }

    /// Backend double that records calls and can be told to fail.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Arc<Mutex<Vec<Call>>>,
        pub fail_prepare: Option<RenderError>,
        pub fail_upload: Option<RenderError>,
    }

    impl RecordingBackend {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl RenderBackend for RecordingBackend {
        fn prepare(&mut self, viewport: Viewport) -> Result<(), RenderError> {
            self.record(Call::Prepare(viewport));
            match self.fail_prepare.clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
            self.record(Call::Resize(viewport));
            Ok(())
        }

        fn reallocate(&mut self, viewport: Viewport) -> Result<(), RenderError> {
            self.record(Call::Reallocate(viewport));
            Ok(())
        }

        fn upload(&mut self, slot: TextureSlot, snapshot: Snapshot) -> Result<(), RenderError> {
            if let Some(err) = self.fail_upload.clone() {
                return Err(err);
            }
            self.record(Call::Upload(slot, snapshot.as_bytes()[0]));
            Ok(())
        }

        fn draw(&mut self, progress: f32) -> Result<(), RenderError> {
            self.record(Call::Draw(progress));
            Ok(())
        }

        fn draw_blank(&mut self) -> Result<(), RenderError> {
            self.record(Call::Blank);
            Ok(())
        }
    }

    fn renderer(
        backend: RecordingBackend,
    ) -> (FlipRenderer<RecordingBackend>, FlipLink, Receiver<FlipEvent>) {
        let (link, _) = counting_link();
        let (sender, receiver) = event_channel();
        let renderer = FlipRenderer::new(
            backend,
            link.clone(),
            Box::new(sender),
            AnimationSettings::default(),
        );
        (renderer, link, receiver)
    }

    #[test]
    fn uploads_snapshots_then_draws_at_jump_position() {
        let backend = RecordingBackend::default();
        let (mut renderer, link, _events) = renderer(backend.clone());
        renderer.surface_created(Viewport::new(2, 2));

        link.begin_flip(solid_pair(10, 20), -1.0);
        renderer.draw_frame(Instant::now());

        assert_eq!(
            backend.calls(),
            vec![
                Call::Prepare(Viewport::new(2, 2)),
                Call::Upload(TextureSlot::Top, 10),
                Call::Upload(TextureSlot::Bottom, 20),
                Call::Draw(-1.0),
            ]
        );
    }

    #[test]
    fn settles_once_after_release() {
        let backend = RecordingBackend::default();
        let (mut renderer, link, events) = renderer(backend);
        renderer.surface_created(Viewport::new(2, 2));

        let start = Instant::now();
        let generation = link.begin_flip(solid_pair(1, 2), -1.0);
        renderer.draw_frame(start);
        link.release(1.0);

        let mut now = start;
        for _ in 0..200 {
            now += Duration::from_millis(16);
            renderer.draw_frame(now);
        }
        assert_eq!(renderer.progress(), 1.0);

        let settled: Vec<_> = events.try_iter().collect();
        assert_eq!(settled, vec![FlipEvent::Settled { generation }]);
    }

    #[test]
    fn no_settle_while_gesture_is_active() {
        let backend = RecordingBackend::default();
        let (mut renderer, link, events) = renderer(backend);
        renderer.surface_created(Viewport::new(2, 2));

        link.begin_flip(solid_pair(1, 2), -1.0);
        let start = Instant::now();
        renderer.draw_frame(start);
        renderer.draw_frame(start + Duration::from_millis(16));
        assert!(events.try_iter().next().is_none());
    }

    #[test]
    fn prepare_failure_is_reported_once_and_frames_go_blank() {
        let backend = RecordingBackend {
            fail_prepare: Some(RenderError::ShaderLink("missing sTop".into())),
            ..Default::default()
        };
        let (mut renderer, link, events) = renderer(backend.clone());
        renderer.surface_created(Viewport::new(2, 2));
        link.begin_flip(solid_pair(1, 2), -1.0);
        renderer.draw_frame(Instant::now());
        renderer.draw_frame(Instant::now());

        assert!(renderer.is_disabled());
        let reported: Vec<_> = events.try_iter().collect();
        assert_eq!(
            reported,
            vec![FlipEvent::RendererFailed(RenderError::ShaderLink(
                "missing sTop".into()
            ))]
        );
        let calls = backend.calls();
        assert!(!calls.iter().any(|call| matches!(call, Call::Upload(..))));
        assert_eq!(calls.iter().filter(|call| **call == Call::Blank).count(), 2);
    }

    #[test]
    fn recreating_the_context_retries_compilation() {
        let mut backend = RecordingBackend {
            fail_prepare: Some(RenderError::ShaderCompile {
                stage: "fragment",
                message: "boom".into(),
            }),
            ..Default::default()
        };
        let (mut renderer, _link, _events) = renderer(backend.clone());
        renderer.surface_created(Viewport::new(2, 2));
        assert!(renderer.is_disabled());

        backend.fail_prepare = None;
        *renderer.backend_mut() = backend;
        renderer.surface_created(Viewport::new(2, 2));
        assert!(!renderer.is_disabled());
    }

    #[test]
    fn texture_exhaustion_disables_renderer() {
        let backend = RecordingBackend {
            fail_upload: Some(RenderError::ResourceExhaustion("texture".into())),
            ..Default::default()
        };
        let (mut renderer, link, events) = renderer(backend);
        renderer.surface_created(Viewport::new(2, 2));
        link.begin_flip(solid_pair(1, 2), -1.0);
        renderer.draw_frame(Instant::now());
        assert!(renderer.is_disabled());
        assert!(matches!(
            events.try_recv(),
            Ok(FlipEvent::RendererFailed(RenderError::ResourceExhaustion(_)))
        ));
    }

    #[test]
    fn resize_is_forwarded_after_prepare() {
        let backend = RecordingBackend::default();
        let (mut renderer, _link, _events) = renderer(backend.clone());
        renderer.surface_changed(Viewport::new(4, 4));
        renderer.surface_created(Viewport::new(2, 2));
        renderer.surface_changed(Viewport::new(0, 4));
        renderer.surface_changed(Viewport::new(4, 4));
        assert_eq!(
            backend.calls(),
            vec![
                Call::Prepare(Viewport::new(2, 2)),
                Call::Resize(Viewport::new(4, 4)),
                Call::Reallocate(Viewport::new(4, 4)),
            ]
        );
    }

    fn reallocations(backend: &RecordingBackend) -> usize {
        backend
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::Reallocate(_)))
            .count()
    }

    #[test]
    fn resize_during_flip_keeps_textures_until_settled() {
        let backend = RecordingBackend::default();
        let (mut renderer, link, events) = renderer(backend.clone());
        renderer.surface_created(Viewport::new(2, 2));

        let start = Instant::now();
        let generation = link.begin_flip(solid_pair(1, 2), -1.0);
        renderer.draw_frame(start);
        renderer.surface_changed(Viewport::new(4, 4));
        assert!(backend.calls().contains(&Call::Resize(Viewport::new(4, 4))));
        assert_eq!(reallocations(&backend), 0);

        link.release(1.0);
        let mut now = start;
        let mut settled = Vec::new();
        while settled.is_empty() {
            assert!(now < start + Duration::from_secs(10), "flip never settled");
            assert_eq!(reallocations(&backend), 0);
            now += Duration::from_millis(16);
            renderer.draw_frame(now);
            settled.extend(events.try_iter());
        }

        assert_eq!(settled, vec![FlipEvent::Settled { generation }]);
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Reallocate(Viewport::new(4, 4)))
        );
        assert_eq!(reallocations(&backend), 1);
    }

    #[test]
    fn new_flip_applies_deferred_reallocation_before_upload() {
        let backend = RecordingBackend::default();
        let (mut renderer, link, _events) = renderer(backend.clone());
        renderer.surface_created(Viewport::new(2, 2));

        let start = Instant::now();
        link.begin_flip(solid_pair(1, 2), -1.0);
        renderer.draw_frame(start);
        renderer.surface_changed(Viewport::new(4, 4));
        link.release(1.0);
        link.begin_flip(solid_pair(3, 4), -1.0);
        renderer.draw_frame(start + Duration::from_millis(16));

        let calls = backend.calls();
        let realloc = calls
            .iter()
            .position(|call| *call == Call::Reallocate(Viewport::new(4, 4)))
            .expect("reallocated");
        assert_eq!(calls[realloc + 1], Call::Upload(TextureSlot::Top, 3));
    }
}
