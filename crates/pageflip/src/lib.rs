//! Page-flip transition between a sequence of panels.
//!
//! The crate splits into a UI-thread half and a render-thread half that share
//! a single-slot mailbox:
//!
//! ```text
//!   pointer events                                    host frame callback
//!        │                                                   │
//!        ▼                                                   ▼
//!   PanelContainer ──▶ FlipController ──▶ FlipLink ──▶ FlipRenderer ──▶ RenderBackend
//!        ▲              (snapshots, targets)  │              │
//!        │                                    └─▶ FrameRequester (request a frame)
//!        └──────────── FlipEvent (Settled / RendererFailed) ◀┘
//! ```
//!
//! `PanelContainer` owns the panels and the gesture state machine. When a flip
//! starts it rasterises the two panels involved into snapshots and hands them
//! to the renderer together with the progress the fold should start from.
//! `FlipRenderer` eases the fold progress toward the latest target every frame,
//! drives the backend and reports back once the animation settles. The
//! [`WgpuBackend`] renders the fold with a GLSL program compiled through naga.
//!
//! [`build`] wires both halves together.

mod animation;
mod container;
mod controller;
mod error;
mod gpu;
mod link;
mod panel;
mod renderer;
mod snapshot;
mod types;

use std::sync::Arc;

pub use container::PanelContainer;
pub use error::{ContainerError, RenderError};
pub use gpu::{ShaderSources, WgpuBackend};
pub use link::{event_channel, FlipEvent, FlipEventSink, FrameRequester};
pub use panel::Panel;
pub use renderer::{FlipRenderer, RenderBackend};
pub use snapshot::{capture_snapshot, Snapshot, SnapshotPair};
pub use types::{
    AnimationSettings, Attachment, ColorSpaceMode, FlipState, GpuPowerPreference, PointerAction,
    PointerEvent, RenderSettings, TextureFilter, TextureSlot, Viewport, DEFAULT_EASING_RATE,
    DEFAULT_SETTLE_EPSILON, PROGRESS_BOTTOM, PROGRESS_TOP,
};

use link::FlipLink;

/// Creates a connected container (for the UI thread) and renderer (for the
/// render thread).
///
/// `requester` is called whenever a new frame is needed; `events` receives
/// settle and failure notifications from the renderer and should forward
/// them to [`PanelContainer::handle_render_event`].
pub fn build<B, S>(
    backend: B,
    requester: Arc<dyn FrameRequester>,
    events: S,
    settings: AnimationSettings,
) -> (PanelContainer, FlipRenderer<B>)
where
    B: RenderBackend,
    S: FlipEventSink + 'static,
{
    let link = FlipLink::new(requester);
    let container = PanelContainer::new(link.clone());
    let renderer = FlipRenderer::new(backend, link, Box::new(events), settings);
    (container, renderer)
}
