use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::unbounded;
use flipconfig::FlipConfig;
use pageflip::{
    capture_snapshot, FlipEvent, FlipEventSink, FrameRequester, PanelContainer, PointerAction,
    PointerEvent, Viewport, WgpuBackend,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, TouchPhase, WindowEvent};
use winit::event_loop::{EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowBuilder;

use crate::cli::Cli;
use crate::panels;
use crate::render_thread::{RenderCommand, RenderRuntime};
use crate::settings;

const WINDOW_TITLE: &str = "flipview";

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[derive(Debug)]
enum AppEvent {
    Flip(FlipEvent),
}

/// Forwards renderer notifications into the winit event loop.
struct ProxySink(EventLoopProxy<AppEvent>);

impl FlipEventSink for ProxySink {
    fn emit(&self, event: FlipEvent) {
        if self.0.send_event(AppEvent::Flip(event)).is_err() {
            tracing::debug!("event loop closed; dropping flip event");
        }
    }
}

pub fn run(args: Cli) -> Result<()> {
    let config = match &args.config {
        Some(path) => FlipConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => FlipConfig::default(),
    };
    let settings = settings::resolve(&args, &config)?;

    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = settings.window_size;
    let window = WindowBuilder::new()
        .with_title(WINDOW_TITLE)
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);
    let size = window.inner_size();
    let viewport = Viewport::new(size.width, size.height);

    let backend = WgpuBackend::new(window.clone(), viewport, settings.render.clone())
        .context("failed to initialise flip renderer")?;

    let (commands, receiver) = unbounded();
    let frames = commands.clone();
    let requester: Arc<dyn FrameRequester> = Arc::new(move || {
        let _ = frames.send(RenderCommand::Frame);
    });
    let sink = ProxySink(event_loop.create_proxy());
    let (mut container, renderer) =
        pageflip::build(backend, requester, sink, settings.animation);

    let sources = settings.panels;
    container.resize(viewport);
    container.bind(sources.len(), |index| panels::create(&sources[index]));
    info!(
        panels = container.len(),
        width = viewport.width,
        height = viewport.height,
        "flipview ready"
    );

    let runtime = RenderRuntime::spawn(renderer, viewport, commands, receiver)?;
    show_current_panel(&container, &runtime);

    let mut pointer = PointerTracker::default();
    let mut failure: Option<String> = None;
    window.set_title(&window_title(&container, failure.as_deref()));

    event_loop
        .run(move |event, elwt| match event {
            Event::UserEvent(AppEvent::Flip(event)) => {
                let settled = matches!(event, FlipEvent::Settled { .. });
                if let Some(err) = container.handle_render_event(event) {
                    error!(error = %err, "page flip unavailable");
                    failure = Some(err.to_string());
                }
                if settled {
                    // Slots may have been reallocated for a resize during the flip.
                    show_current_panel(&container, &runtime);
                }
                window.set_title(&window_title(&container, failure.as_deref()));
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                let pointer_event = match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                        None
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state == ElementState::Pressed
                            && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                        {
                            elwt.exit();
                        }
                        None
                    }
                    WindowEvent::CursorMoved { position, .. } => pointer.cursor_moved(position),
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => pointer.mouse_button(state),
                    WindowEvent::Touch(touch) => {
                        pointer.touch(touch.id, touch.phase, touch.location)
                    }
                    WindowEvent::Resized(size) => {
                        let viewport = Viewport::new(size.width, size.height);
                        container.resize(viewport);
                        runtime.resize(viewport);
                        show_current_panel(&container, &runtime);
                        None
                    }
                    _ => None,
                };
                if let Some(pointer_event) = pointer_event {
                    container.on_pointer_event(&pointer_event);
                    if pointer_event.action == PointerAction::Up {
                        window.set_title(&window_title(&container, failure.as_deref()));
                    }
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}

/// Hands the current panel to the render thread as the resting image.
fn show_current_panel(container: &PanelContainer, runtime: &RenderRuntime) {
    let viewport = container.viewport();
    if viewport.is_empty() || container.flip_surface_on_top() {
        return;
    }
    if let Some(panel) = container.current_panel() {
        runtime.show_panel(capture_snapshot(panel, viewport));
    }
}

fn window_title(container: &PanelContainer, failure: Option<&str>) -> String {
    let mut title = if container.is_empty() {
        WINDOW_TITLE.to_string()
    } else {
        format!(
            "{WINDOW_TITLE} {}/{}",
            container.current_index() + 1,
            container.len()
        )
    };
    if let Some(message) = failure {
        title.push_str(&format!(" (flip disabled: {message})"));
    }
    title
}

/// Turns mouse and touch input into a single pointer stream.
///
/// Only one contact drives a gesture at a time; other touches and mouse
/// presses are ignored until it lifts.
#[derive(Debug, Default)]
struct PointerTracker {
    cursor: PhysicalPosition<f64>,
    mouse_down: bool,
    touch: Option<u64>,
}

impl PointerTracker {
    fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<PointerEvent> {
        self.cursor = position;
        self.mouse_down
            .then(|| pointer_event(PointerAction::Move, position))
    }

    fn mouse_button(&mut self, state: ElementState) -> Option<PointerEvent> {
        match state {
            ElementState::Pressed if !self.mouse_down && self.touch.is_none() => {
                self.mouse_down = true;
                Some(pointer_event(PointerAction::Down, self.cursor))
            }
            ElementState::Released if self.mouse_down => {
                self.mouse_down = false;
                Some(pointer_event(PointerAction::Up, self.cursor))
            }
            _ => None,
        }
    }

    fn touch(
        &mut self,
        id: u64,
        phase: TouchPhase,
        location: PhysicalPosition<f64>,
    ) -> Option<PointerEvent> {
        match phase {
            TouchPhase::Started if self.touch.is_none() && !self.mouse_down => {
                self.touch = Some(id);
                Some(pointer_event(PointerAction::Down, location))
            }
            TouchPhase::Moved if self.touch == Some(id) => {
                Some(pointer_event(PointerAction::Move, location))
            }
            TouchPhase::Ended | TouchPhase::Cancelled if self.touch == Some(id) => {
                self.touch = None;
                Some(pointer_event(PointerAction::Up, location))
            }
            _ => None,
        }
    }
}

fn pointer_event(action: PointerAction, position: PhysicalPosition<f64>) -> PointerEvent {
    PointerEvent::new(action, position.x as f32, position.y as f32)
}
