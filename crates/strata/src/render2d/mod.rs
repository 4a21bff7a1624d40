//! # Render2d — Depth-Bucketed Sprite Batching
//!
//! A 2D scene is mostly quads: hundreds or thousands of textured rectangles,
//! each with its own position, rotation, and tint. Drawing them one at a time
//! costs a draw call each. This module groups them so that every distinct
//! depth costs one draw call instead.
//!
//! ## Architecture
//!
//! ```text
//!   SpriteHandle (shared with the scene)
//!         │ add / destroy / update_z_index
//!         ▼
//!   ┌────────────────────────────────────────────┐
//!   │ Renderer                                   │
//!   │   batches[depth - min_depth] ─► RenderBatch │
//!   │   occupied: [1003, 1005, ...]  (ascending)  │
//!   └──────────────────┬─────────────────────────┘
//!                      │ render(shader, camera)
//!                      ▼
//!   for each occupied bucket:
//!     rebuild dirty vertices → upload once → bind textures → draw_indexed
//! ```
//!
//! ## Design Decisions
//!
//! **Buckets instead of sorting.** Depth is an integer in a fixed window, so
//! each depth gets a slot in an array and draw order falls out of walking the
//! occupied slots. Nothing is sorted per frame; the occupied list is kept in
//! order as buckets fill and empty.
//!
//! **Persistent vertex buffers.** A batch keeps its vertex buffer across
//! frames and only rewrites sprites whose dirty flag is set. A static scene
//! uploads nothing after its first frame.
//!
//! **CPU-side vertex transform.** Corner positions are computed on the CPU,
//! so sprites with different transforms share one buffer and one draw. The
//! shader only applies the camera.
//!
//! **A device seam.** Batches talk to a [`RenderDevice`] rather than to wgpu
//! directly. [`WgpuDevice`] draws for real; [`HeadlessDevice`] records, which
//! is what the tests run against.
//!
//! ## Comparison
//!
//! - **Bevy** (`bevy_sprite`): extracts sprites every frame, sorts them, and
//!   builds instance buffers from scratch. No persistent per-depth batches.
//! - **Love2D**: batches consecutive same-texture draws in submission order,
//!   with no notion of depth.

pub mod batch;
pub mod camera;
pub mod device;
pub mod draw;
pub mod pipeline;
pub mod renderer;
pub mod sprite;
pub mod texture;
pub mod vertex;

pub use batch::RenderBatch;
pub use camera::{Camera, Camera2d};
pub use device::{BatchBuffers, DrawRecord, HeadlessDevice, HeadlessShader, RenderDevice, Shader};
pub use draw::WgpuDevice;
pub use pipeline::SpriteShader;
pub use renderer::{RenderStats, Renderer};
pub use sprite::{SpriteHandle, SpriteRecord};
pub use texture::{Texture, TextureCache};

/// An RGBA color with floating-point components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const RED: Self = Self { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Self = Self { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Self = Self { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };

    /// Create a color from RGB (alpha = 1).
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create a color from RGBA.
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}
