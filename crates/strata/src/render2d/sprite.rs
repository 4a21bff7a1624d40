//! # Sprite Records
//!
//! A [`SpriteRecord`] is everything the batcher needs to draw one quad. The
//! entity that owns the sprite and the batch that draws it both need access,
//! so records are shared through a [`SpriteHandle`] (`Rc<RefCell<_>>`): the
//! renderer never owns sprite storage, it only keeps handles.
//!
//! ## Dirty Tracking
//!
//! Every setter that changes what the quad looks like raises the dirty flag.
//! The owning batch rebuilds the sprite's four vertices on the next render and
//! clears the flag. Setters compare against the current value first, so
//! writing the same color every frame costs nothing.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::Color;
use super::texture::Texture;
use crate::math::{Rect, Transform2d, Vec2};

/// One renderable quad.
#[derive(Debug, Clone)]
pub struct SpriteRecord {
    size: Vec2,
    texture: Option<Texture>,
    tex_coords: [Vec2; 4],
    color: Color,
    transform: Transform2d,
    entity_id: Option<u32>,
    dirty: bool,
}

impl SpriteRecord {
    /// A white, untextured, 1×1 sprite at the origin. Starts dirty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tint color (builder).
    pub fn color(mut self, color: Color) -> Self {
        self.set_color(color);
        self
    }

    /// Set the texture (builder).
    pub fn texture(mut self, texture: Texture) -> Self {
        self.set_texture(Some(texture));
        self
    }

    /// Set the size in world units (builder).
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.set_size(Vec2::new(width, height));
        self
    }

    /// Set the transform (builder).
    pub fn transform(mut self, transform: Transform2d) -> Self {
        self.set_transform(transform);
        self
    }

    /// Select a sub-region of the texture (builder).
    pub fn rect(mut self, rect: Rect) -> Self {
        self.set_tex_coords(rect.corners());
        self
    }

    /// Tag the quad with an entity id (builder).
    pub fn entity(mut self, entity_id: u32) -> Self {
        self.set_entity_id(Some(entity_id));
        self
    }

    pub fn get_color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        if self.color != color {
            self.color = color;
            self.dirty = true;
        }
    }

    pub fn get_texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Option<Texture>) {
        if self.texture != texture {
            self.texture = texture;
            self.dirty = true;
        }
    }

    /// Width and height before the transform's scale is applied.
    pub fn get_size(&self) -> Vec2 {
        self.size
    }

    pub fn set_size(&mut self, size: Vec2) {
        if self.size != size {
            self.size = size;
            self.dirty = true;
        }
    }

    /// UVs in corner order: top-right, bottom-right, bottom-left, top-left.
    pub fn get_tex_coords(&self) -> &[Vec2; 4] {
        &self.tex_coords
    }

    pub fn set_tex_coords(&mut self, tex_coords: [Vec2; 4]) {
        if self.tex_coords != tex_coords {
            self.tex_coords = tex_coords;
            self.dirty = true;
        }
    }

    pub fn get_transform(&self) -> &Transform2d {
        &self.transform
    }

    /// Replace the transform. A changed `z_index` only takes effect in the
    /// renderer after [`Renderer::update_z_index`](super::Renderer::update_z_index).
    pub fn set_transform(&mut self, transform: Transform2d) {
        if self.transform != transform {
            self.transform = transform;
            self.dirty = true;
        }
    }

    pub fn z_index(&self) -> i32 {
        self.transform.z_index
    }

    pub fn get_entity_id(&self) -> Option<u32> {
        self.entity_id
    }

    pub fn set_entity_id(&mut self, entity_id: Option<u32>) {
        if self.entity_id != entity_id {
            self.entity_id = entity_id;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a vertex rebuild on the next render.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for SpriteRecord {
    fn default() -> Self {
        Self {
            size: Vec2::ONE,
            texture: None,
            tex_coords: Rect::FULL.corners(),
            color: Color::WHITE,
            transform: Transform2d::IDENTITY,
            entity_id: None,
            dirty: true,
        }
    }
}

/// Shared, identity-compared reference to a [`SpriteRecord`].
///
/// Cloning the handle clones the reference, not the sprite. Batches find
/// sprites by identity ([`ptr_eq`](Self::ptr_eq)), never by value.
#[derive(Clone)]
pub struct SpriteHandle(Rc<RefCell<SpriteRecord>>);

impl SpriteHandle {
    pub fn new(record: SpriteRecord) -> Self {
        Self(Rc::new(RefCell::new(record)))
    }

    /// # Panics
    ///
    /// Panics if the sprite is currently mutably borrowed.
    pub fn borrow(&self) -> Ref<'_, SpriteRecord> {
        self.0.borrow()
    }

    /// # Panics
    ///
    /// Panics if the sprite is currently borrowed.
    pub fn borrow_mut(&self) -> RefMut<'_, SpriteRecord> {
        self.0.borrow_mut()
    }

    /// `true` when both handles point at the same sprite.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn z_index(&self) -> i32 {
        self.0.borrow().z_index()
    }
}

impl From<SpriteRecord> for SpriteHandle {
    fn from(record: SpriteRecord) -> Self {
        Self::new(record)
    }
}

impl fmt::Debug for SpriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpriteHandle").field(&*self.0.borrow()).finish()
    }
}
