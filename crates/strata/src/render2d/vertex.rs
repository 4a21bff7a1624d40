//! # Vertex — Per-Corner Data Sent to the GPU
//!
//! Each batch keeps a flat `Vec<f32>` that mirrors its GPU vertex buffer
//! exactly. A sprite occupies four consecutive vertices (one per quad corner),
//! and every vertex is [`VERTEX_SIZE`] floats:
//!
//! ```text
//! Sprite vertex (40 bytes)
//! ┌──────────┬──────────────────┬──────────┬────────┬───────────┐
//! │ position │ color            │ uv       │ tex id │ entity id │
//! │ 2 × f32  │ 4 × f32          │ 2 × f32  │ f32    │ f32       │
//! │ offset 0 │ offset 8         │ offset 24│ off 32 │ offset 36 │
//! │ loc(0)   │ loc(1)           │ loc(2)   │ loc(3) │ loc(4)    │
//! └──────────┴──────────────────┴──────────┴────────┴───────────┘
//! ```
//!
//! Slot `i` of a batch starts at float `i * 4 * VERTEX_SIZE`.
//!
//! ## Why Position Is World-Space
//!
//! Positions are pre-transformed on the CPU, so the shader only applies the
//! camera projection and view. Sprites with different transforms share one
//! vertex buffer and one draw call.
//!
//! ## Index Buffer
//!
//! The index pattern never changes, so it is computed once per batch for the
//! full capacity: quad `i` uses vertices `4i..4i+4` with the triangles
//! `(3, 2, 0)` and `(0, 2, 1)`. With corners ordered top-right, bottom-right,
//! bottom-left, top-left, both triangles wind counter-clockwise.

use bytemuck::{Pod, Zeroable};

pub const POS_SIZE: usize = 2;
pub const COLOR_SIZE: usize = 4;
pub const TEX_COORDS_SIZE: usize = 2;
pub const TEX_ID_SIZE: usize = 1;
pub const ENTITY_ID_SIZE: usize = 1;

pub const POS_OFFSET: usize = 0;
pub const COLOR_OFFSET: usize = POS_OFFSET + POS_SIZE;
pub const TEX_COORDS_OFFSET: usize = COLOR_OFFSET + COLOR_SIZE;
pub const TEX_ID_OFFSET: usize = TEX_COORDS_OFFSET + TEX_COORDS_SIZE;
pub const ENTITY_ID_OFFSET: usize = TEX_ID_OFFSET + TEX_ID_SIZE;

/// Floats per vertex.
pub const VERTEX_SIZE: usize = ENTITY_ID_OFFSET + ENTITY_ID_SIZE;
/// Bytes per vertex.
pub const VERTEX_SIZE_BYTES: usize = VERTEX_SIZE * std::mem::size_of::<f32>();

pub const VERTICES_PER_QUAD: usize = 4;
pub const INDICES_PER_QUAD: usize = 6;

/// Floats per quad.
pub const QUAD_FLOATS: usize = VERTICES_PER_QUAD * VERTEX_SIZE;

const fn byte_offset(floats: usize) -> wgpu::BufferAddress {
    (floats * std::mem::size_of::<f32>()) as wgpu::BufferAddress
}

/// Vertex buffer layout matching the float layout above.
pub const SPRITE_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: VERTEX_SIZE_BYTES as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        // position
        wgpu::VertexAttribute {
            offset: byte_offset(POS_OFFSET),
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x2,
        },
        // color
        wgpu::VertexAttribute {
            offset: byte_offset(COLOR_OFFSET),
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x4,
        },
        // uv
        wgpu::VertexAttribute {
            offset: byte_offset(TEX_COORDS_OFFSET),
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
        // texture slot
        wgpu::VertexAttribute {
            offset: byte_offset(TEX_ID_OFFSET),
            shader_location: 3,
            format: wgpu::VertexFormat::Float32,
        },
        // entity id + 1
        wgpu::VertexAttribute {
            offset: byte_offset(ENTITY_ID_OFFSET),
            shader_location: 4,
            format: wgpu::VertexFormat::Float32,
        },
    ],
};

/// Static index buffer contents for `max_quads` quads.
pub fn quad_indices(max_quads: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(max_quads * INDICES_PER_QUAD);
    for quad in 0..max_quads {
        let offset = (quad * VERTICES_PER_QUAD) as u32;
        indices.extend_from_slice(&[
            offset + 3,
            offset + 2,
            offset,
            offset,
            offset + 2,
            offset + 1,
        ]);
    }
    indices
}

/// Number of texture units bound per batch: slot 0 plus the texture table.
pub const TEXTURE_UNITS: usize = crate::config::MAX_TEXTURE_SLOTS + 1;

/// Uniform block read by the sprite shader.
///
/// `texture_units` is the `uTextures` int array packed four per `vec4<i32>`
/// so it satisfies WGSL's 16-byte array stride for uniforms.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub texture_units: [[i32; 4]; 3],
}

impl Default for SpriteUniform {
    fn default() -> Self {
        let mut uniform = Self {
            projection: glam::Mat4::IDENTITY.to_cols_array_2d(),
            view: glam::Mat4::IDENTITY.to_cols_array_2d(),
            texture_units: [[0; 4]; 3],
        };
        let units: Vec<i32> = (0..TEXTURE_UNITS as i32).collect();
        uniform.set_texture_units(&units);
        uniform
    }
}

impl SpriteUniform {
    /// Pack up to [`TEXTURE_UNITS`] values; extra values are ignored.
    pub fn set_texture_units(&mut self, units: &[i32]) {
        for (i, unit) in units.iter().take(TEXTURE_UNITS).enumerate() {
            self.texture_units[i / 4][i % 4] = *unit;
        }
    }
}
