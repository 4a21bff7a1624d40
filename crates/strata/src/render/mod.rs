//! Rendering subsystem — wgpu context and frame orchestration.

pub mod gpu;
pub mod pass;

pub use gpu::GpuContext;
pub use pass::{ClearColor, render_frame};
