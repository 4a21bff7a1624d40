//! Convenience re-exports — `use strata::prelude::*` for the common items.

pub use crate::config::RendererConfig;
pub use crate::error::RenderError;
pub use crate::logging::init_logger;
pub use crate::math::{Mat4, Rect, Transform2d, Vec2, Vec3, Vec4};
pub use crate::render::{ClearColor, GpuContext, render_frame};
pub use crate::render2d::{
    Camera, Camera2d, Color, HeadlessDevice, HeadlessShader, RenderBatch, RenderDevice,
    RenderStats, Renderer, Shader, SpriteHandle, SpriteRecord, SpriteShader, Texture,
    TextureCache, WgpuDevice,
};
pub use crate::scene::{Component, ComponentKind, GameObject, Scene, SpriteRenderer};
