//! # Batch — One Depth Bucket, One Draw Call
//!
//! A [`RenderBatch`] holds every sprite that shares a z-index, up to
//! `max_batch_size` of them. It owns a CPU mirror of its vertex buffer and a
//! small texture table, and draws all its sprites with a single
//! `draw_indexed`.
//!
//! ```text
//! sprites:   [ A ][ B ][ C ][   ][   ] ...     (insertion order)
//! vertices:  [A0 A1 A2 A3][B0 B1 B2 B3][C0 ...  (4 × VERTEX_SIZE floats each)
//! textures:  [ grass.png ][ hero.png ]          slot 1, slot 2
//!                                                (slot 0 = untextured)
//! ```
//!
//! ## Texture Slots
//!
//! A sprite's texture is stored in the table the first time the batch sees
//! it, if there is room. Its slot is its table position plus one. Slot 0 is
//! reserved for "no texture", and is also where a sprite lands when its
//! texture doesn't fit: it still draws, tinted but untextured.
//!
//! The table only holds textures some sprite still uses. When a sprite
//! leaves or swaps its texture, unused entries are dropped and every slot id
//! is rewritten, and sprites stuck in slot 0 get another chance at a slot.
//!
//! ## Dirty Rebuilds
//!
//! Rendering walks the sprites, rebuilds the vertex block of each dirty one,
//! and clears its flag. If anything changed, the whole buffer is uploaded
//! once. A frame with no changes uploads nothing.

use glam::{Vec2, Vec3};

use super::camera::Camera;
use super::device::{BatchBuffers, RenderDevice, Shader, U_PROJECTION, U_TEXTURES, U_VIEW};
use super::renderer::RenderStats;
use super::sprite::{SpriteHandle, SpriteRecord};
use super::texture::Texture;
use super::vertex::{
    COLOR_OFFSET, ENTITY_ID_OFFSET, INDICES_PER_QUAD, POS_OFFSET, QUAD_FLOATS, TEX_COORDS_OFFSET,
    TEX_ID_OFFSET, VERTEX_SIZE, VERTICES_PER_QUAD, quad_indices,
};
use crate::config::RendererConfig;

/// Quad corner offsets in corner order: top-right, bottom-right, bottom-left,
/// top-left.
const CORNERS: [Vec2; VERTICES_PER_QUAD] = [
    Vec2::new(0.5, 0.5),
    Vec2::new(0.5, -0.5),
    Vec2::new(-0.5, -0.5),
    Vec2::new(-0.5, 0.5),
];

/// All sprites at one depth, drawn together.
pub struct RenderBatch {
    sprites: Vec<SpriteHandle>,
    vertices: Vec<f32>,
    textures: Vec<Texture>,
    z_index: i32,
    max_batch_size: usize,
    max_textures: usize,
    buffers: Option<BatchBuffers>,
    upload_pending: bool,
}

impl RenderBatch {
    pub fn new(z_index: i32, config: &RendererConfig) -> Self {
        Self {
            sprites: Vec::with_capacity(config.max_batch_size),
            vertices: vec![0.0; config.max_batch_size * QUAD_FLOATS],
            textures: Vec::with_capacity(config.max_textures),
            z_index,
            max_batch_size: config.max_batch_size,
            max_textures: config.max_textures,
            buffers: None,
            upload_pending: false,
        }
    }

    /// Prepare the batch for use. Creates the GPU buffers the first time;
    /// later calls keep them and reset the CPU state.
    pub fn start(&mut self, device: &mut impl RenderDevice) {
        if self.buffers.is_none() {
            let indices = quad_indices(self.max_batch_size);
            self.buffers = Some(device.create_batch_buffers(self.vertices.len(), &indices));
        }
        self.sprites.clear();
        self.textures.clear();
        self.vertices.fill(0.0);
        self.upload_pending = false;
    }

    /// Append a sprite. Does nothing when the batch is full.
    pub fn add_sprite(&mut self, sprite: SpriteHandle) {
        if !self.has_room() {
            log::trace!("Batch at depth {} is full, sprite dropped", self.z_index);
            return;
        }

        let index = self.sprites.len();
        if let Some(texture) = sprite.borrow().get_texture() {
            if !self.has_texture(texture) && !self.has_texture_room() {
                self.prune_textures();
            }
            self.register_texture(texture);
        }
        self.sprites.push(sprite);
        self.load_vertex_properties(index);
        self.upload_pending = true;
    }

    /// Remove `sprite` if this batch holds it. Later sprites shift down one
    /// slot and are marked dirty. Returns whether the sprite was found.
    pub fn destroy_if_exists(&mut self, sprite: &SpriteHandle) -> bool {
        let Some(index) = self.sprites.iter().position(|s| s.ptr_eq(sprite)) else {
            return false;
        };

        self.sprites.remove(index);
        for shifted in &self.sprites[index..] {
            shifted.borrow_mut().mark_dirty();
        }
        if self.sprites.is_empty() {
            self.textures.clear();
        } else {
            self.prune_textures();
        }
        true
    }

    /// Whether `texture` already has a slot in this batch.
    pub fn has_texture(&self, texture: &Texture) -> bool {
        self.textures.contains(texture)
    }

    pub fn has_texture_room(&self) -> bool {
        self.textures.len() < self.max_textures
    }

    pub fn has_room(&self) -> bool {
        self.sprites.len() < self.max_batch_size
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn sprites(&self) -> &[SpriteHandle] {
        &self.sprites
    }

    /// Textures in slot order; slot `i + 1` holds `textures()[i]`.
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// The CPU vertex mirror for the first `len()` quads.
    pub fn vertices(&self) -> &[f32] {
        &self.vertices[..self.sprites.len() * QUAD_FLOATS]
    }

    pub fn buffers(&self) -> Option<BatchBuffers> {
        self.buffers
    }

    /// Slot for `texture`: table position + 1, or 0 when absent.
    pub fn texture_slot(&self, texture: &Texture) -> u32 {
        self.textures
            .iter()
            .position(|t| t == texture)
            .map_or(0, |i| i as u32 + 1)
    }

    /// Rebuild dirty sprites, upload if needed, and draw.
    pub fn render<D: RenderDevice>(
        &mut self,
        device: &mut D,
        shader: &mut D::Shader,
        camera: &impl Camera,
        stats: &mut RenderStats,
    ) {
        let Some(buffers) = self.buffers else {
            log::warn!("Batch at depth {} rendered before start()", self.z_index);
            return;
        };
        if self.sprites.is_empty() {
            return;
        }

        if self.sprites.iter().any(|s| s.borrow().is_dirty()) {
            // A dirty sprite may have dropped the last use of a texture.
            self.prune_textures();
        }

        let mut rebuilt = false;
        for index in 0..self.sprites.len() {
            if self.sprites[index].borrow().is_dirty() {
                self.load_vertex_properties(index);
                self.sprites[index].borrow_mut().clear_dirty();
                rebuilt = true;
            }
        }
        if rebuilt || self.upload_pending {
            device.upload_vertices(buffers, &self.vertices);
            self.upload_pending = false;
            stats.uploads += 1;
        }

        shader.bind();
        shader.upload_mat4(U_PROJECTION, &camera.projection_matrix());
        shader.upload_mat4(U_VIEW, &camera.view_matrix());
        let units: Vec<i32> = (0..=self.max_textures as i32).collect();
        shader.upload_int_array(U_TEXTURES, &units);

        for (i, texture) in self.textures.iter().enumerate() {
            device.bind_texture(i as u32 + 1, texture);
        }

        let index_count = (self.sprites.len() * INDICES_PER_QUAD) as u32;
        device.draw_indexed(shader, buffers, index_count);
        stats.draw_calls += 1;
        stats.sprites += self.sprites.len();

        device.unbind_textures();
        shader.unbind();
    }

    /// Free the GPU buffers. The batch must be started again before use.
    pub fn release(&mut self, device: &mut impl RenderDevice) {
        if let Some(buffers) = self.buffers.take() {
            device.release_batch_buffers(buffers);
        }
        self.sprites.clear();
        self.textures.clear();
        self.upload_pending = false;
    }

    /// Drop textures no sprite references any more, then rewrite every
    /// sprite's slot id, since removal shifts the slots after it.
    fn prune_textures(&mut self) {
        let sprites = &self.sprites;
        let before = self.textures.len();
        self.textures
            .retain(|t| sprites.iter().any(|s| s.borrow().get_texture() == Some(t)));
        if self.textures.len() != before {
            self.refresh_texture_slots();
        }
    }

    /// Rewrite the slot id of every sprite in place. Sprites that fell back
    /// to slot 0 get their texture registered if the table now has room.
    fn refresh_texture_slots(&mut self) {
        for index in 0..self.sprites.len() {
            let texture = self.sprites[index].borrow().get_texture().cloned();
            let slot = match texture {
                Some(texture) => {
                    self.register_texture(&texture);
                    self.texture_slot(&texture)
                }
                None => 0,
            };
            let base = index * QUAD_FLOATS;
            for corner in 0..VERTICES_PER_QUAD {
                self.vertices[base + corner * VERTEX_SIZE + TEX_ID_OFFSET] = slot as f32;
            }
        }
        self.upload_pending = true;
    }

    fn register_texture(&mut self, texture: &Texture) {
        if !self.has_texture(texture) && self.has_texture_room() {
            self.textures.push(texture.clone());
        }
    }

    /// Write the four vertices of the sprite in `index` into the mirror.
    fn load_vertex_properties(&mut self, index: usize) {
        let sprite = self.sprites[index].clone();
        let record = sprite.borrow();

        let tex_id = match record.get_texture() {
            Some(texture) => {
                self.register_texture(texture);
                self.texture_slot(texture)
            }
            None => 0,
        };

        let positions = corner_positions(&record);
        let color = record.get_color().to_array();
        let tex_coords = record.get_tex_coords();
        // 0 means "no entity"; ids are shifted up by one.
        let entity = record.get_entity_id().map_or(0.0, |id| (id as f64 + 1.0) as f32);

        let base = index * QUAD_FLOATS;
        for corner in 0..VERTICES_PER_QUAD {
            let v = &mut self.vertices[base + corner * VERTEX_SIZE..][..VERTEX_SIZE];
            v[POS_OFFSET] = positions[corner].x;
            v[POS_OFFSET + 1] = positions[corner].y;
            v[COLOR_OFFSET..COLOR_OFFSET + 4].copy_from_slice(&color);
            v[TEX_COORDS_OFFSET] = tex_coords[corner].x;
            v[TEX_COORDS_OFFSET + 1] = tex_coords[corner].y;
            v[TEX_ID_OFFSET] = tex_id as f32;
            v[ENTITY_ID_OFFSET] = entity;
        }
    }
}

/// World-space corners of a sprite's quad.
fn corner_positions(record: &SpriteRecord) -> [Vec2; VERTICES_PER_QUAD] {
    let transform = record.get_transform();
    let extent = record.get_size() * transform.scale;

    if transform.rotation == 0.0 {
        return CORNERS.map(|offset| transform.position + offset * extent);
    }

    let model = transform.matrix(extent);
    CORNERS.map(|offset| model.transform_point3(Vec3::new(offset.x, offset.y, 0.0)).truncate())
}
