use std::time::Instant;

use crate::types::AnimationSettings;

/// Time-based exponential approach of the flip progress toward its target.
///
/// Each step covers `min(1, elapsed_ms * easing_rate)` of the remaining
/// distance. Progress and target always stay within `[-1, 1]`.
#[derive(Debug, Clone)]
pub(crate) struct FlipAnimator {
    progress: f32,
    target: f32,
    last_frame: Instant,
    settings: AnimationSettings,
}

impl FlipAnimator {
    pub fn new(settings: AnimationSettings, now: Instant) -> Self {
        Self {
            progress: 0.0,
            target: 0.0,
            last_frame: now,
            settings,
        }
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_converged(&self) -> bool {
        (self.progress - self.target).abs() <= self.settings.settle_epsilon
    }

    /// Snaps progress and target to `position`.
    pub fn jump(&mut self, position: f32, now: Instant) {
        let position = position.clamp(-1.0, 1.0);
        self.progress = position;
        self.target = position;
        self.last_frame = now;
    }

    /// Sets a new easing target without moving progress.
    pub fn retarget(&mut self, target: f32, now: Instant) {
        // A stale timestamp from a resting animator would make the first step
        // cover the whole distance at once.
        if self.is_converged() {
            self.last_frame = now;
        }
        self.target = target.clamp(-1.0, 1.0);
    }

    /// Advances one frame. Returns `true` while another frame is needed.
    ///
    /// Once converged, progress is pinned to the target exactly.
    pub fn advance(&mut self, now: Instant) -> bool {
        if self.is_converged() {
            self.progress = self.target;
            return false;
        }

        let elapsed_ms = now.saturating_duration_since(self.last_frame).as_secs_f32() * 1000.0;
        let step = (elapsed_ms * self.settings.easing_rate).min(1.0);
        self.progress = (self.progress + (self.target - self.progress) * step).clamp(-1.0, 1.0);
        self.last_frame = now;
        true
    }
}
