use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, Sender};
use pageflip::{FlipRenderer, RenderBackend, Snapshot, TextureSlot, Viewport};
use tracing::{debug, warn};

/// Work items for the render thread, in arrival order.
#[derive(Debug)]
pub enum RenderCommand {
    /// The flip renderer asked for a frame.
    Frame,
    Resize(Viewport),
    /// Fill both texture slots with the resting panel so it shows between flips.
    ShowPanel(Snapshot),
    Shutdown,
}

/// Owns the thread that drives the flip renderer.
pub struct RenderRuntime {
    commands: Sender<RenderCommand>,
    join_handle: Option<JoinHandle<()>>,
}

impl RenderRuntime {
    pub fn spawn<B>(
        renderer: FlipRenderer<B>,
        viewport: Viewport,
        commands: Sender<RenderCommand>,
        receiver: Receiver<RenderCommand>,
    ) -> Result<Self>
    where
        B: RenderBackend + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("flipview-render".into())
            .spawn(move || run_render_thread(renderer, viewport, receiver))
            .map_err(|err| anyhow!("failed to spawn render thread: {err}"))?;
        Ok(Self {
            commands,
            join_handle: Some(handle),
        })
    }

    pub fn resize(&self, viewport: Viewport) {
        self.send(RenderCommand::Resize(viewport));
    }

    pub fn show_panel(&self, snapshot: Snapshot) {
        self.send(RenderCommand::ShowPanel(snapshot));
    }

    fn send(&self, command: RenderCommand) {
        if self.commands.send(command).is_err() {
            debug!("render thread already stopped");
        }
    }
}

impl Drop for RenderRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.commands.send(RenderCommand::Shutdown);
            if handle.join().is_err() {
                warn!("render thread panicked during shutdown");
            }
        }
    }
}

/// Commands drained in one batch, applied in a fixed order.
#[derive(Debug, Default)]
struct Batch {
    resize: Option<Viewport>,
    panel: Option<Snapshot>,
    frame: bool,
    shutdown: bool,
}

impl Batch {
    fn push(&mut self, command: RenderCommand) {
        match command {
            RenderCommand::Frame => self.frame = true,
            RenderCommand::Resize(viewport) => {
                self.resize = Some(viewport);
                // Textures are reallocated, so any older resting panel is stale.
                self.panel = None;
            }
            RenderCommand::ShowPanel(snapshot) => self.panel = Some(snapshot),
            RenderCommand::Shutdown => self.shutdown = true,
        }
    }

    fn collect(first: RenderCommand, receiver: &Receiver<RenderCommand>) -> Self {
        let mut batch = Self::default();
        batch.push(first);
        for command in receiver.try_iter() {
            batch.push(command);
        }
        batch
    }
}

fn run_render_thread<B: RenderBackend>(
    mut renderer: FlipRenderer<B>,
    viewport: Viewport,
    receiver: Receiver<RenderCommand>,
) {
    renderer.surface_created(viewport);
    while let Ok(first) = receiver.recv() {
        let batch = Batch::collect(first, &receiver);
        if batch.shutdown {
            break;
        }
        if let Some(viewport) = batch.resize {
            renderer.surface_changed(viewport);
        }
        let redraw = batch.frame || batch.panel.is_some();
        if let Some(snapshot) = batch.panel {
            show_panel(&mut renderer, snapshot);
        }
        if redraw {
            renderer.draw_frame(Instant::now());
        }
    }
    debug!("render thread exiting");
}

fn show_panel<B: RenderBackend>(renderer: &mut FlipRenderer<B>, snapshot: Snapshot) {
    if renderer.is_disabled() {
        return;
    }
    let backend = renderer.backend_mut();
    let result = backend
        .upload(TextureSlot::Top, snapshot.clone())
        .and_then(|()| backend.upload(TextureSlot::Bottom, snapshot));
    if let Err(err) = result {
        warn!(error = %err, "failed to upload resting panel");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crossbeam_channel::unbounded;
    use image::RgbaImage;
    use pageflip::{build, event_channel, AnimationSettings, RenderError};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Prepare,
        Resize(Viewport),
        Upload(TextureSlot),
        Draw,
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<Call>>>);

    impl Recorder {
        fn record(&self, call: Call) {
            self.0.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.0.lock().unwrap().clone()
        }
    }

    impl RenderBackend for Recorder {
        fn prepare(&mut self, _viewport: Viewport) -> Result<(), RenderError> {
            self.record(Call::Prepare);
            Ok(())
        }

        fn resize(&mut self, viewport: Viewport) -> Result<(), RenderError> {
            self.record(Call::Resize(viewport));
            Ok(())
        }

        fn reallocate(&mut self, _viewport: Viewport) -> Result<(), RenderError> {
            Ok(())
        }

        fn upload(&mut self, slot: TextureSlot, _snapshot: Snapshot) -> Result<(), RenderError> {
            self.record(Call::Upload(slot));
            Ok(())
        }

        fn draw(&mut self, _progress: f32) -> Result<(), RenderError> {
            self.record(Call::Draw);
            Ok(())
        }

        fn draw_blank(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[test]
    fn batch_applies_resize_before_panel() {
        let (tx, rx) = unbounded();
        let snapshot = Snapshot::from_image(RgbaImage::new(2, 2));
        tx.send(RenderCommand::ShowPanel(snapshot.clone())).unwrap();
        tx.send(RenderCommand::Resize(Viewport::new(4, 4))).unwrap();
        tx.send(RenderCommand::ShowPanel(snapshot)).unwrap();
        tx.send(RenderCommand::Frame).unwrap();

        let first = rx.recv().unwrap();
        let batch = Batch::collect(first, &rx);
        assert_eq!(batch.resize, Some(Viewport::new(4, 4)));
        assert!(batch.panel.is_some());
        assert!(batch.frame);
        assert!(!batch.shutdown);
    }

    #[test]
    fn stale_panel_is_dropped_by_resize() {
        let (tx, rx) = unbounded();
        tx.send(RenderCommand::ShowPanel(Snapshot::from_image(RgbaImage::new(2, 2))))
            .unwrap();
        tx.send(RenderCommand::Resize(Viewport::new(4, 4))).unwrap();
        let first = rx.recv().unwrap();
        assert!(Batch::collect(first, &rx).panel.is_none());
    }

    #[test]
    fn runtime_prepares_shows_panel_and_stops_on_drop() {
        let backend = Recorder::default();
        let (commands, receiver) = unbounded();
        let frames = commands.clone();
        let (sink, _events) = event_channel();
        let (_container, renderer) = build(
            backend.clone(),
            Arc::new(move || {
                let _ = frames.send(RenderCommand::Frame);
            }),
            sink,
            AnimationSettings::default(),
        );

        let runtime =
            RenderRuntime::spawn(renderer, Viewport::new(2, 2), commands, receiver).unwrap();
        runtime.show_panel(Snapshot::from_image(RgbaImage::new(2, 2)));
        let deadline = Instant::now() + Duration::from_secs(5);
        while !backend.calls().contains(&Call::Upload(TextureSlot::Bottom)) {
            assert!(Instant::now() < deadline, "resting panel never uploaded");
            thread::sleep(Duration::from_millis(1));
        }
        drop(runtime);

        let calls = backend.calls();
        assert_eq!(calls.first(), Some(&Call::Prepare));
        assert!(calls.contains(&Call::Upload(TextureSlot::Top)));
        assert!(calls.contains(&Call::Upload(TextureSlot::Bottom)));
    }
}
