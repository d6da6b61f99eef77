//! Handoff between the UI thread (container + controller) and the render
//! thread (renderer).
//!
//! Only the latest value of each kind matters, so the UI side writes into a
//! single-slot mailbox and the renderer drains it once per frame. Frame
//! requests are level-triggered through a dirty flag: any number of pointer
//! moves between two frames produce one request to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::RenderError;
use crate::snapshot::SnapshotPair;

/// Host signal that asks the render surface for a new frame.
///
/// May be called from any thread.
pub trait FrameRequester: Send + Sync {
    fn request_frame(&self);
}

impl<F> FrameRequester for F
where
    F: Fn() + Send + Sync,
{
    fn request_frame(&self) {
        self()
    }
}

/// Notifications emitted by the renderer at the end of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FlipEvent {
    /// Progress converged while no gesture is active.
    Settled { generation: u64 },
    /// The renderer disabled itself; emitted once per failure.
    RendererFailed(RenderError),
}

/// Destination for [`FlipEvent`]s, typically forwarding to the UI thread.
pub trait FlipEventSink: Send {
    fn emit(&self, event: FlipEvent);
}

impl FlipEventSink for Sender<FlipEvent> {
    fn emit(&self, event: FlipEvent) {
        if self.send(event).is_err() {
            tracing::debug!("flip event receiver dropped; discarding event");
        }
    }
}

/// Creates a channel-backed event sink and the matching receiver.
pub fn event_channel() -> (Sender<FlipEvent>, Receiver<FlipEvent>) {
    unbounded()
}

/// Everything the UI thread has published since the last frame.
#[derive(Debug, Default)]
pub(crate) struct PendingFlip {
    pub snapshots: Option<SnapshotPair>,
    /// Position to snap to without easing (flip start).
    pub jump: Option<f32>,
    /// Position to ease toward.
    pub target: Option<f32>,
}

impl PendingFlip {
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_none() && self.jump.is_none() && self.target.is_none()
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    pending: PendingFlip,
    generation: u64,
    /// Guarded together with `pending` so the renderer never sees a finished
    /// gesture whose release target it has not taken yet.
    gesture_active: bool,
}

/// What the renderer drains from the mailbox at the start of a frame.
#[derive(Debug)]
pub(crate) struct Drained {
    pub pending: PendingFlip,
    pub generation: u64,
    pub gesture_active: bool,
}

struct Shared {
    mailbox: Mutex<Mailbox>,
    dirty: AtomicBool,
    requester: Arc<dyn FrameRequester>,
}

/// Cloneable handle to the shared handoff state.
#[derive(Clone)]
pub(crate) struct FlipLink {
    shared: Arc<Shared>,
}

impl FlipLink {
    pub fn new(requester: Arc<dyn FrameRequester>) -> Self {
        Self {
            shared: Arc::new(Shared {
                mailbox: Mutex::new(Mailbox::default()),
                dirty: AtomicBool::new(false),
                requester,
            }),
        }
    }

    fn mailbox(&self) -> MutexGuard<'_, Mailbox> {
        self.shared
            .mailbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes the snapshots of a new flip and the position it starts from.
    ///
    /// Any snapshots the renderer has not consumed yet are dropped.
    pub fn begin_flip(&self, snapshots: SnapshotPair, start: f32) -> u64 {
        let generation = {
            let mut mailbox = self.mailbox();
            if mailbox.pending.snapshots.is_some() {
                tracing::debug!(
                    generation = mailbox.generation,
                    "superseding snapshots that were never uploaded"
                );
            }
            mailbox.generation += 1;
            mailbox.gesture_active = true;
            mailbox.pending = PendingFlip {
                snapshots: Some(snapshots),
                jump: Some(start.clamp(-1.0, 1.0)),
                target: None,
            };
            mailbox.generation
        };
        self.request_render();
        generation
    }

    /// Replaces the easing target; intermediate targets are never queued.
    pub fn move_target(&self, target: f32) {
        self.mailbox().pending.target = Some(target.clamp(-1.0, 1.0));
        self.request_render();
    }

    /// Ends the gesture and lets the renderer ease toward `target`.
    pub fn release(&self, target: f32) {
        {
            let mut mailbox = self.mailbox();
            mailbox.pending.target = Some(target.clamp(-1.0, 1.0));
            mailbox.gesture_active = false;
        }
        self.request_render();
    }

    pub fn take_pending(&self) -> Drained {
        let mut mailbox = self.mailbox();
        Drained {
            pending: std::mem::take(&mut mailbox.pending),
            generation: mailbox.generation,
            gesture_active: mailbox.gesture_active,
        }
    }

    pub fn generation(&self) -> u64 {
        self.mailbox().generation
    }

    pub fn gesture_active(&self) -> bool {
        self.mailbox().gesture_active
    }

    /// Requests a frame unless one is already outstanding.
    pub fn request_render(&self) {
        if !self.shared.dirty.swap(true, Ordering::AcqRel) {
            self.shared.requester.request_frame();
        }
    }

    /// Called by the renderer when it starts drawing a frame.
    pub fn clear_dirty(&self) {
        self.shared.dirty.store(false, Ordering::Release);
    }
}
