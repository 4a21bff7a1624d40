//! # Scene — Game Objects That Feed the Renderer
//!
//! A minimal object layer on top of the batcher. A [`Scene`] owns a
//! [`Renderer`] and a list of [`GameObject`]s; each object carries a
//! transform and a set of components. The one component that matters for
//! drawing is [`SpriteRenderer`], which owns a sprite and keeps it in sync
//! with its object's transform.
//!
//! ## Frame Order
//!
//! ```text
//! Scene::frame(dt)
//!   ├─ update: every component sees the latest transform
//!   │          (SpriteRenderer pushes it into the sprite → dirty,
//!   │           and moves the sprite if its depth changed)
//!   ├─ reap:   destroyed objects leave the renderer
//!   └─ render: Renderer::render(shader, camera)
//! ```
//!
//! Updates always run before rendering, so a frame never draws stale
//! vertices.
//!
//! ## Components
//!
//! Components are a closed set: [`ComponentKind`] lists every kind, and
//! implements [`Component`] by dispatching to the variant. Adding a kind
//! means adding a variant.

use crate::math::Transform2d;
use crate::render2d::{Camera, RenderDevice, Renderer, SpriteHandle, SpriteRecord};

/// Lifecycle hooks driven by the owning [`Scene`].
pub trait Component {
    /// Called once, when the object enters a running scene. `uid` is the
    /// owning object's id.
    fn start<D: RenderDevice>(&mut self, uid: u32, transform: &Transform2d, renderer: &mut Renderer<D>);

    /// Called every frame before rendering.
    fn update<D: RenderDevice>(&mut self, dt: f32, transform: &Transform2d, renderer: &mut Renderer<D>);

    /// Called once, when the object is removed.
    fn destroy<D: RenderDevice>(&mut self, renderer: &mut Renderer<D>);
}

/// Every component kind an object can carry.
#[derive(Debug)]
pub enum ComponentKind {
    SpriteRenderer(SpriteRenderer),
}

impl Component for ComponentKind {
    fn start<D: RenderDevice>(&mut self, uid: u32, transform: &Transform2d, renderer: &mut Renderer<D>) {
        match self {
            Self::SpriteRenderer(c) => c.start(uid, transform, renderer),
        }
    }

    fn update<D: RenderDevice>(&mut self, dt: f32, transform: &Transform2d, renderer: &mut Renderer<D>) {
        match self {
            Self::SpriteRenderer(c) => c.update(dt, transform, renderer),
        }
    }

    fn destroy<D: RenderDevice>(&mut self, renderer: &mut Renderer<D>) {
        match self {
            Self::SpriteRenderer(c) => c.destroy(renderer),
        }
    }
}

impl From<SpriteRenderer> for ComponentKind {
    fn from(c: SpriteRenderer) -> Self {
        Self::SpriteRenderer(c)
    }
}

/// Draws one sprite at its object's transform.
#[derive(Debug)]
pub struct SpriteRenderer {
    sprite: SpriteHandle,
    last_transform: Option<Transform2d>,
}

impl SpriteRenderer {
    pub fn new(sprite: SpriteRecord) -> Self {
        Self {
            sprite: SpriteHandle::new(sprite),
            last_transform: None,
        }
    }

    /// The shared sprite. Mutating it (color, texture, ...) marks it dirty.
    pub fn sprite(&self) -> &SpriteHandle {
        &self.sprite
    }

    fn sync_transform(&mut self, transform: &Transform2d) -> bool {
        if self.last_transform.as_ref() == Some(transform) {
            return false;
        }
        self.last_transform = Some(*transform);
        self.sprite.borrow_mut().set_transform(*transform);
        true
    }
}

impl Component for SpriteRenderer {
    fn start<D: RenderDevice>(&mut self, uid: u32, transform: &Transform2d, renderer: &mut Renderer<D>) {
        self.sprite.borrow_mut().set_entity_id(Some(uid));
        self.sync_transform(transform);
        renderer.add(self.sprite.clone());
    }

    fn update<D: RenderDevice>(&mut self, _dt: f32, transform: &Transform2d, renderer: &mut Renderer<D>) {
        let old_depth = self.sprite.z_index();
        if self.sync_transform(transform) && transform.z_index != old_depth {
            renderer.update_z_index(&self.sprite);
        }
    }

    fn destroy<D: RenderDevice>(&mut self, renderer: &mut Renderer<D>) {
        renderer.destroy(&self.sprite);
    }
}

/// Something in the scene: a transform plus components.
#[derive(Debug)]
pub struct GameObject {
    uid: u32,
    pub name: String,
    pub transform: Transform2d,
    components: Vec<ComponentKind>,
    started: bool,
    destroyed: bool,
}

impl GameObject {
    pub fn new(name: impl Into<String>, transform: Transform2d) -> Self {
        Self {
            uid: 0,
            name: name.into(),
            transform,
            components: Vec::new(),
            started: false,
            destroyed: false,
        }
    }

    /// Add a component (builder).
    pub fn with(mut self, component: impl Into<ComponentKind>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Scene-assigned id; 0 until the object is added to a scene.
    pub fn uid(&self) -> u32 {
        self.uid
    }

    pub fn components(&self) -> &[ComponentKind] {
        &self.components
    }

    /// The first sprite renderer, if any.
    pub fn sprite_renderer(&self) -> Option<&SpriteRenderer> {
        self.components.iter().find_map(|c| match c {
            ComponentKind::SpriteRenderer(s) => Some(s),
        })
    }

    /// Remove the object at the end of the current update.
    pub fn destroy(&mut self) {
        self.destroyed = true;
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn start<D: RenderDevice>(&mut self, renderer: &mut Renderer<D>) {
        if self.started {
            return;
        }
        self.started = true;
        for component in &mut self.components {
            component.start(self.uid, &self.transform, renderer);
        }
    }

    fn update<D: RenderDevice>(&mut self, dt: f32, renderer: &mut Renderer<D>) {
        for component in &mut self.components {
            component.update(dt, &self.transform, renderer);
        }
    }

    fn teardown<D: RenderDevice>(&mut self, renderer: &mut Renderer<D>) {
        for component in &mut self.components {
            component.destroy(renderer);
        }
    }
}

/// Owns the renderer and every live object.
pub struct Scene<D: RenderDevice> {
    renderer: Renderer<D>,
    objects: Vec<GameObject>,
    next_uid: u32,
    running: bool,
}

impl<D: RenderDevice> Scene<D> {
    pub fn new(renderer: Renderer<D>) -> Self {
        Self {
            renderer,
            objects: Vec::new(),
            next_uid: 1,
            running: false,
        }
    }

    /// Add an object and return its uid. In a running scene it starts
    /// immediately.
    pub fn add_game_object(&mut self, mut object: GameObject) -> u32 {
        object.uid = self.next_uid;
        // 0 is never handed out.
        self.next_uid = self.next_uid.checked_add(1).unwrap_or(1);
        if self.running {
            object.start(&mut self.renderer);
        }
        let uid = object.uid;
        self.objects.push(object);
        uid
    }

    /// Start every object added so far.
    pub fn start(&mut self) {
        for object in &mut self.objects {
            object.start(&mut self.renderer);
        }
        self.running = true;
        log::debug!("Scene started with {} objects", self.objects.len());
    }

    /// Run component updates, then remove destroyed objects.
    pub fn update(&mut self, dt: f32) {
        for object in &mut self.objects {
            if !object.destroyed {
                object.update(dt, &mut self.renderer);
            }
        }

        let renderer = &mut self.renderer;
        self.objects.retain_mut(|object| {
            if object.destroyed {
                object.teardown(renderer);
                false
            } else {
                true
            }
        });
    }

    pub fn render(&mut self, shader: &mut D::Shader, camera: &impl Camera) {
        self.renderer.render(shader, camera);
    }

    /// One frame: update, then render.
    pub fn frame(&mut self, dt: f32, shader: &mut D::Shader, camera: &impl Camera) {
        self.update(dt);
        self.render(shader, camera);
    }

    pub fn get(&self, uid: u32) -> Option<&GameObject> {
        self.objects.iter().find(|o| o.uid == uid)
    }

    pub fn get_mut(&mut self, uid: u32) -> Option<&mut GameObject> {
        self.objects.iter_mut().find(|o| o.uid == uid)
    }

    pub fn objects(&self) -> &[GameObject] {
        &self.objects
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn renderer(&self) -> &Renderer<D> {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer<D> {
        &mut self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RendererConfig;
    use crate::render2d::vertex::{ENTITY_ID_OFFSET, VERTEX_SIZE};
    use crate::render2d::{Camera2d, Color, HeadlessDevice, HeadlessShader};

    fn scene() -> Scene<HeadlessDevice> {
        let renderer = Renderer::new(HeadlessDevice::new(), RendererConfig::default()).unwrap();
        Scene::new(renderer)
    }

    fn sprite_object(name: &str, transform: Transform2d) -> GameObject {
        GameObject::new(name, transform).with(SpriteRenderer::new(SpriteRecord::new()))
    }

    #[test]
    fn start_registers_sprites() {
        let mut scene = scene();
        scene.add_game_object(sprite_object("a", Transform2d::IDENTITY.with_z_index(2)));
        assert_eq!(scene.renderer().sprite_count(), 0);
        scene.start();
        assert_eq!(scene.renderer().sprite_count(), 1);
        assert!(scene.renderer().batch_at_depth(2).is_some());
    }

    #[test]
    fn objects_added_while_running_start_immediately() {
        let mut scene = scene();
        scene.start();
        let uid = scene.add_game_object(sprite_object("late", Transform2d::IDENTITY));
        assert_eq!(scene.renderer().sprite_count(), 1);
        assert_eq!(scene.get(uid).unwrap().name, "late");
    }

    #[test]
    fn uids_are_unique() {
        let mut scene = scene();
        let a = scene.add_game_object(GameObject::new("a", Transform2d::IDENTITY));
        let b = scene.add_game_object(GameObject::new("b", Transform2d::IDENTITY));
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn sprites_carry_their_object_uid() {
        let mut scene = scene();
        let uid = scene.add_game_object(sprite_object("a", Transform2d::IDENTITY));
        scene.start();

        assert_eq!(uid, 1);
        let sprite = scene.get(uid).unwrap().sprite_renderer().unwrap().sprite().clone();
        assert_eq!(sprite.borrow().get_entity_id(), Some(1));
        let batch = scene.renderer().batch_at_depth(0).unwrap();
        for corner in 0..4 {
            assert_eq!(batch.vertices()[corner * VERTEX_SIZE + ENTITY_ID_OFFSET], 2.0);
        }
    }

    #[test]
    fn moving_an_object_dirties_its_sprite() {
        let mut scene = scene();
        let uid = scene.add_game_object(sprite_object("a", Transform2d::IDENTITY));
        scene.start();
        let mut shader = HeadlessShader::new();
        let camera = Camera2d::default();
        scene.frame(0.016, &mut shader, &camera);

        scene.get_mut(uid).unwrap().transform.position.x = 10.0;
        scene.frame(0.016, &mut shader, &camera);

        let sprite = scene.get(uid).unwrap().sprite_renderer().unwrap().sprite().clone();
        assert_eq!(sprite.borrow().get_transform().position.x, 10.0);
        assert!(!sprite.borrow().is_dirty());
        assert_eq!(scene.renderer().stats().uploads, 1);
    }

    #[test]
    fn unchanged_frame_uploads_nothing() {
        let mut scene = scene();
        scene.add_game_object(sprite_object("a", Transform2d::IDENTITY));
        scene.start();
        let mut shader = HeadlessShader::new();
        let camera = Camera2d::default();
        scene.frame(0.016, &mut shader, &camera);
        scene.frame(0.016, &mut shader, &camera);
        assert_eq!(scene.renderer().stats().uploads, 0);
        assert_eq!(scene.renderer().stats().draw_calls, 1);
    }

    #[test]
    fn depth_change_moves_between_buckets() {
        let mut scene = scene();
        let uid = scene.add_game_object(sprite_object("a", Transform2d::IDENTITY.with_z_index(1)));
        scene.start();

        scene.get_mut(uid).unwrap().transform.z_index = 8;
        scene.update(0.016);

        assert!(scene.renderer().batch_at_depth(1).is_none());
        assert_eq!(scene.renderer().batch_at_depth(8).unwrap().len(), 1);
    }

    #[test]
    fn sprite_edits_reach_the_batch() {
        let mut scene = scene();
        let uid = scene.add_game_object(sprite_object("a", Transform2d::IDENTITY));
        scene.start();
        let sprite = scene.get(uid).unwrap().sprite_renderer().unwrap().sprite().clone();
        sprite.borrow_mut().set_color(Color::BLUE);

        let mut shader = HeadlessShader::new();
        scene.frame(0.016, &mut shader, &Camera2d::default());
        let batch = scene.renderer().batch_at_depth(0).unwrap();
        assert_eq!(&batch.vertices()[2..6], &Color::BLUE.to_array());
    }

    #[test]
    fn destroyed_objects_leave_the_renderer() {
        let mut scene = scene();
        let uid = scene.add_game_object(sprite_object("a", Transform2d::IDENTITY));
        scene.add_game_object(sprite_object("b", Transform2d::IDENTITY));
        scene.start();

        scene.get_mut(uid).unwrap().destroy();
        scene.update(0.016);

        assert!(scene.get(uid).is_none());
        assert_eq!(scene.objects().len(), 1);
        assert_eq!(scene.renderer().sprite_count(), 1);
    }
}
