//! # Device — The GPU Seam
//!
//! A [`RenderBatch`](super::RenderBatch) needs a handful of GPU operations:
//! allocate a vertex/index buffer pair, upload vertex floats, bind textures to
//! slots, and issue an indexed draw with a shader. [`RenderDevice`] and
//! [`Shader`] name exactly those operations and nothing else.
//!
//! Two backends implement them:
//!
//! | Backend | Used for |
//! |---------|----------|
//! | [`WgpuDevice`](super::draw::WgpuDevice) + [`SpriteShader`](super::pipeline::SpriteShader) | Real frames on a wgpu surface |
//! | [`HeadlessDevice`] + [`HeadlessShader`] | Tests, servers, and anything without a GPU |
//!
//! The headless backend keeps a copy of every uploaded buffer and a log of
//! draws, so the batching logic can be checked end to end without a window.

use std::collections::{HashMap, HashSet};

use glam::Mat4;

use super::texture::{Texture, check_rgba_len};
use crate::error::Result;

/// Uniform name for the camera projection matrix.
pub const U_PROJECTION: &str = "uProjection";
/// Uniform name for the camera view matrix.
pub const U_VIEW: &str = "uView";
/// Uniform name for the texture-unit array.
pub const U_TEXTURES: &str = "uTextures";

/// Opaque id for a batch's vertex/index buffer pair, issued by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchBuffers(u32);

impl BatchBuffers {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

/// A shader program that accepts named uniforms.
///
/// Uploading to a name the program doesn't declare is a silent no-op.
pub trait Shader {
    fn bind(&mut self);
    fn unbind(&mut self);
    fn upload_mat4(&mut self, name: &str, value: &Mat4);
    fn upload_int_array(&mut self, name: &str, values: &[i32]);
}

/// GPU operations used by the sprite batcher.
pub trait RenderDevice {
    type Shader: Shader;

    /// Allocate a vertex buffer of `vertex_floats` floats and an index buffer
    /// filled with `indices`.
    fn create_batch_buffers(&mut self, vertex_floats: usize, indices: &[u32]) -> BatchBuffers;

    /// Replace the contents of the vertex buffer from offset 0.
    fn upload_vertices(&mut self, buffers: BatchBuffers, vertices: &[f32]);

    /// Bind `texture` to texture unit `slot` for the next draw.
    fn bind_texture(&mut self, slot: u32, texture: &Texture);

    /// Clear all texture bindings.
    fn unbind_textures(&mut self);

    /// Draw the first `index_count` indices of `buffers` with `shader`.
    fn draw_indexed(&mut self, shader: &Self::Shader, buffers: BatchBuffers, index_count: u32);

    /// Free a buffer pair. The id must not be used afterwards.
    fn release_batch_buffers(&mut self, buffers: BatchBuffers);

    /// Create a texture from RGBA8 pixels.
    fn create_texture(&mut self, source: &str, width: u32, height: u32, rgba: &[u8]) -> Result<Texture>;

    /// Free a texture. No sprite may still reference it.
    fn release_texture(&mut self, texture: &Texture);
}

/// One draw issued to a [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub buffers: BatchBuffers,
    pub index_count: u32,
    /// `(slot, texture)` pairs bound at draw time.
    pub textures: Vec<(u32, Texture)>,
    /// Whether the shader was bound when the draw was issued.
    pub shader_bound: bool,
}

/// A [`RenderDevice`] that records instead of rendering.
pub struct HeadlessDevice {
    next_buffers: u32,
    next_texture: u32,
    buffers: HashMap<BatchBuffers, Vec<f32>>,
    textures: HashSet<u32>,
    bound: Vec<(u32, Texture)>,
    draws: Vec<DrawRecord>,
    uploads: usize,
    buffers_created: usize,
    textures_created: usize,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self {
            next_buffers: 0,
            // Texture id 0 is the white slot-0 texture on real devices.
            next_texture: 1,
            buffers: HashMap::new(),
            textures: HashSet::new(),
            bound: Vec::new(),
            draws: Vec::new(),
            uploads: 0,
            buffers_created: 0,
            textures_created: 0,
        }
    }

    /// Every draw since the last [`take_draws`](Self::take_draws).
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }

    /// Number of vertex uploads so far.
    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// Last uploaded contents of a live buffer.
    pub fn vertex_data(&self, buffers: BatchBuffers) -> Option<&[f32]> {
        self.buffers.get(&buffers).map(Vec::as_slice)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    /// Textures created and not yet released.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for HeadlessDevice {
    type Shader = HeadlessShader;

    fn create_batch_buffers(&mut self, vertex_floats: usize, _indices: &[u32]) -> BatchBuffers {
        let id = BatchBuffers(self.next_buffers);
        self.next_buffers += 1;
        self.buffers_created += 1;
        self.buffers.insert(id, vec![0.0; vertex_floats]);
        id
    }

    fn upload_vertices(&mut self, buffers: BatchBuffers, vertices: &[f32]) {
        let Some(target) = self.buffers.get_mut(&buffers) else {
            log::warn!("Upload to released batch buffers {buffers:?} ignored");
            return;
        };
        let n = vertices.len().min(target.len());
        target[..n].copy_from_slice(&vertices[..n]);
        self.uploads += 1;
    }

    fn bind_texture(&mut self, slot: u32, texture: &Texture) {
        self.bound.retain(|(s, _)| *s != slot);
        self.bound.push((slot, texture.clone()));
    }

    fn unbind_textures(&mut self) {
        self.bound.clear();
    }

    fn draw_indexed(&mut self, shader: &HeadlessShader, buffers: BatchBuffers, index_count: u32) {
        if !self.buffers.contains_key(&buffers) {
            log::warn!("Draw with released batch buffers {buffers:?} ignored");
            return;
        }
        self.draws.push(DrawRecord {
            buffers,
            index_count,
            textures: self.bound.clone(),
            shader_bound: shader.is_bound(),
        });
    }

    fn release_batch_buffers(&mut self, buffers: BatchBuffers) {
        self.buffers.remove(&buffers);
    }

    fn create_texture(&mut self, source: &str, width: u32, height: u32, rgba: &[u8]) -> Result<Texture> {
        check_rgba_len(source, width, height, rgba)?;
        let texture = Texture::new(self.next_texture, width, height, source);
        self.next_texture += 1;
        self.textures_created += 1;
        self.textures.insert(texture.id());
        Ok(texture)
    }

    fn release_texture(&mut self, texture: &Texture) {
        if !self.textures.remove(&texture.id()) {
            log::warn!("Release of unknown texture {} ignored", texture.id());
        }
    }
}

/// A [`Shader`] that stores uploaded uniforms for inspection.
#[derive(Debug, Default)]
pub struct HeadlessShader {
    bound: bool,
    bind_count: usize,
    mat4s: HashMap<String, Mat4>,
    int_arrays: HashMap<String, Vec<i32>>,
}

impl HeadlessShader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        self.mat4s.get(name).copied()
    }

    pub fn int_array(&self, name: &str) -> Option<&[i32]> {
        self.int_arrays.get(name).map(Vec::as_slice)
    }
}

impl Shader for HeadlessShader {
    fn bind(&mut self) {
        self.bound = true;
        self.bind_count += 1;
    }

    fn unbind(&mut self) {
        self.bound = false;
    }

    fn upload_mat4(&mut self, name: &str, value: &Mat4) {
        self.mat4s.insert(name.to_owned(), *value);
    }

    fn upload_int_array(&mut self, name: &str, values: &[i32]) {
        self.int_arrays.insert(name.to_owned(), values.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_records_draws_with_bound_textures() {
        let mut device = HeadlessDevice::new();
        let mut shader = HeadlessShader::new();
        let buffers = device.create_batch_buffers(8, &[0, 1, 2]);
        let tex = device.create_texture("t", 1, 1, &[0, 0, 0, 255]).unwrap();

        shader.bind();
        device.bind_texture(1, &tex);
        device.draw_indexed(&shader, buffers, 6);
        device.unbind_textures();
        shader.unbind();

        let draws = device.take_draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].index_count, 6);
        assert_eq!(draws[0].textures, vec![(1, tex)]);
        assert!(draws[0].shader_bound);
        assert!(device.draws().is_empty());
    }

    #[test]
    fn released_buffers_are_ignored() {
        let mut device = HeadlessDevice::new();
        let shader = HeadlessShader::new();
        let buffers = device.create_batch_buffers(4, &[]);
        device.release_batch_buffers(buffers);
        device.upload_vertices(buffers, &[1.0; 4]);
        device.draw_indexed(&shader, buffers, 6);
        assert_eq!(device.uploads(), 0);
        assert!(device.draws().is_empty());
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn texture_ids_start_after_the_white_slot() {
        let mut device = HeadlessDevice::new();
        let a = device.create_texture("a", 1, 1, &[0; 4]).unwrap();
        let b = device.create_texture("b", 1, 1, &[0; 4]).unwrap();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
    }

    #[test]
    fn released_textures_stop_counting_as_live() {
        let mut device = HeadlessDevice::new();
        let a = device.create_texture("a", 1, 1, &[0; 4]).unwrap();
        let b = device.create_texture("b", 1, 1, &[0; 4]).unwrap();
        device.release_texture(&a);
        device.release_texture(&a);
        assert_eq!(device.live_textures(), 1);
        assert_eq!(device.textures_created(), 2);

        // Ids are never reused.
        let c = device.create_texture("c", 1, 1, &[0; 4]).unwrap();
        assert_eq!(c.id(), b.id() + 1);
    }
}
