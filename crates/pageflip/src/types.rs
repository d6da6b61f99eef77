/// Default easing rate constant `k`, applied per elapsed millisecond.
pub const DEFAULT_EASING_RATE: f32 = 0.01;

/// Default convergence threshold between progress and its target.
pub const DEFAULT_SETTLE_EPSILON: f32 = 0.01;

/// Progress value that shows the "top" snapshot across the whole surface.
pub const PROGRESS_TOP: f32 = -1.0;

/// Progress value that shows the "bottom" snapshot across the whole surface.
pub const PROGRESS_BOTTOM: f32 = 1.0;

/// Phase of a raw pointer event delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Down,
    Move,
    Up,
}

/// Pointer event in surface-local coordinates (origin top-left, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(action: PointerAction, x: f32, y: f32) -> Self {
        Self { action, x, y }
    }

    pub fn down(y: f32) -> Self {
        Self::new(PointerAction::Down, 0.0, y)
    }

    pub fn moved(y: f32) -> Self {
        Self::new(PointerAction::Move, 0.0, y)
    }

    pub fn up(y: f32) -> Self {
        Self::new(PointerAction::Up, 0.0, y)
    }
}

/// Size of the render surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Gesture state of the flip controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlipState {
    #[default]
    Idle,
    /// Flipping from the current panel to the next one.
    FlippingForward,
    /// Flipping from the current panel to the previous one.
    FlippingBackward,
}

impl FlipState {
    pub fn is_idle(self) -> bool {
        matches!(self, FlipState::Idle)
    }
}

/// How a panel is held by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// Not part of the container's composition.
    Detached,
    /// Attached for instant flips but not drawn.
    Hidden,
    /// The panel the user currently sees.
    Visible,
}

/// One of the two textures the flip shader samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Top,
    Bottom,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 2] = [TextureSlot::Top, TextureSlot::Bottom];

    pub(crate) fn index(self) -> usize {
        match self {
            TextureSlot::Top => 0,
            TextureSlot::Bottom => 1,
        }
    }
}

impl std::fmt::Display for TextureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextureSlot::Top => f.write_str("top"),
            TextureSlot::Bottom => f.write_str("bottom"),
        }
    }
}

/// Tuning for the exponential approach of progress toward its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    /// Fraction of the remaining distance covered per elapsed millisecond.
    pub easing_rate: f32,
    /// Distance below which progress is considered settled.
    pub settle_epsilon: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            easing_rate: DEFAULT_EASING_RATE,
            settle_epsilon: DEFAULT_SETTLE_EPSILON,
        }
    }
}

/// Sampling filter for the snapshot textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

/// Adapter selection hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Output color handling for the swapchain and snapshot textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Prefer a non-sRGB swapchain so snapshot bytes pass through untouched.
    #[default]
    Auto,
    Gamma,
    /// Use sRGB swapchain and textures.
    Linear,
}

/// Options consumed by the wgpu backend when it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub filter: TextureFilter,
    pub power: GpuPowerPreference,
    pub color_space: ColorSpaceMode,
    pub clear_color: [f64; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            filter: TextureFilter::default(),
            power: GpuPowerPreference::default(),
            color_space: ColorSpaceMode::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}
