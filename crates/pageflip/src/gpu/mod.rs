//! wgpu implementation of the flip renderer's backend.
//!
//! - `context` owns the instance, device and window surface and reconfigures
//!   the swapchain on resize or loss.
//! - `geometry` holds the static full-viewport quad.
//! - `program` compiles the GLSL flip shaders through naga, links the
//!   pipeline and resolves its bindings.
//! - `textures` owns the two snapshot textures and their sampler.
//! - `uniforms` mirrors the single `uniformY` parameter.
//! - `backend` glues them together behind [`crate::RenderBackend`].

mod backend;
mod context;
mod geometry;
mod program;
mod textures;
mod uniforms;

pub use backend::WgpuBackend;
pub use program::ShaderSources;
