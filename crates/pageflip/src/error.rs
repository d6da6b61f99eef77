/// Failures raised by the render backend.
///
/// All of them are fatal to the renderer instance: the error is reported to the
/// host once and subsequent frames are drawn blank until the host re-creates the
/// rendering context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("failed to compile {stage} shader: {message}")]
    ShaderCompile {
        stage: &'static str,
        message: String,
    },
    #[error("failed to link flip program: {0}")]
    ShaderLink(String),
    #[error("GPU resources exhausted: {0}")]
    ResourceExhaustion(String),
    #[error("surface error: {0}")]
    Surface(String),
    #[error("rendering context is not ready")]
    ContextUnavailable,
}

/// Bounds violations on the panel sequence.
///
/// These are programmer errors on the host side. The container logs them and
/// treats the request as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContainerError {
    #[error("panel index {index} is out of bounds for {len} panels")]
    InvalidIndex { index: usize, len: usize },
}
