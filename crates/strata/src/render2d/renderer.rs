//! # Renderer — Depth Buckets and the Occupied List
//!
//! The renderer owns one optional [`RenderBatch`] per integer depth in the
//! configured window, plus a sorted list of the buckets that currently hold
//! sprites:
//!
//! ```text
//! batches:   [None, None, ..., Some(B@3), None, Some(B@5), None, ...]
//!                                 1003            1005
//! occupied:  [1003, 1005]        ← the only thing walked at render time
//! ```
//!
//! Batches are created the first time a depth is used and kept afterwards,
//! so a sprite bouncing between two depths doesn't reallocate GPU buffers.
//! The occupied list is kept sorted by binary-search insertion, so drawing it
//! front to back is drawing by ascending depth without a per-frame sort.
//!
//! Capacity limits never fail loudly: a sprite outside the depth window or
//! beyond a full bucket is dropped with a `debug` log.

use super::batch::RenderBatch;
use super::camera::Camera;
use super::device::RenderDevice;
use super::sprite::SpriteHandle;
use crate::config::RendererConfig;
use crate::error::Result;

/// Counters for the most recent [`Renderer::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: usize,
    /// Whole-buffer vertex uploads.
    pub uploads: usize,
    pub sprites: usize,
}

/// Depth-bucketed sprite batcher.
pub struct Renderer<D: RenderDevice> {
    device: D,
    config: RendererConfig,
    batches: Vec<Option<RenderBatch>>,
    occupied: Vec<usize>,
    stats: RenderStats,
}

impl<D: RenderDevice> Renderer<D> {
    pub fn new(device: D, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        let mut batches = Vec::new();
        batches.resize_with(config.bucket_count, || None);
        log::debug!(
            "Renderer created: depths {}..={}, {} quads x {} textures per batch",
            config.min_depth,
            config.max_depth(),
            config.max_batch_size,
            config.max_textures
        );
        Ok(Self {
            device,
            config,
            batches,
            occupied: Vec::new(),
            stats: RenderStats::default(),
        })
    }

    /// Start drawing `sprite` in the bucket for its current z-index.
    pub fn add(&mut self, sprite: SpriteHandle) {
        let depth = sprite.z_index();
        let Some(bucket) = self.config.depth_to_bucket(depth) else {
            log::debug!(
                "Sprite at depth {depth} outside {}..={}, dropped",
                self.config.min_depth,
                self.config.max_depth()
            );
            return;
        };

        let config = &self.config;
        let batch = self.batches[bucket].get_or_insert_with(|| RenderBatch::new(depth, config));
        if !batch.has_room() {
            log::debug!("Bucket for depth {depth} is full, sprite dropped");
            return;
        }
        if batch.is_empty() {
            batch.start(&mut self.device);
            insert_sorted(&mut self.occupied, bucket);
            log::debug!("Depth {depth} occupied ({} buckets in use)", self.occupied.len());
        }
        batch.add_sprite(sprite);
    }

    /// Stop drawing `sprite`. Returns whether it was found.
    pub fn destroy(&mut self, sprite: &SpriteHandle) -> bool {
        for pos in 0..self.occupied.len() {
            let bucket = self.occupied[pos];
            let Some(batch) = self.batches[bucket].as_mut() else {
                continue;
            };
            if !batch.destroy_if_exists(sprite) {
                continue;
            }
            if batch.is_empty() {
                self.occupied.remove(pos);
                log::debug!("Depth {} vacated", batch.z_index());
            }
            return true;
        }
        false
    }

    /// Move `sprite` to the bucket matching its current z-index. Call after
    /// changing the sprite's transform depth. Unknown sprites are ignored.
    pub fn update_z_index(&mut self, sprite: &SpriteHandle) {
        if !self.destroy(sprite) {
            return;
        }
        self.add(sprite.clone());
    }

    /// Draw every occupied bucket in ascending depth order.
    pub fn render(&mut self, shader: &mut D::Shader, camera: &impl Camera) {
        self.stats = RenderStats::default();
        for &bucket in &self.occupied {
            if let Some(batch) = self.batches[bucket].as_mut() {
                batch.render(&mut self.device, shader, camera, &mut self.stats);
            }
        }
    }

    /// Release every batch's GPU buffers and forget all sprites.
    pub fn release(&mut self) {
        for slot in &mut self.batches {
            if let Some(mut batch) = slot.take() {
                batch.release(&mut self.device);
            }
        }
        self.occupied.clear();
    }

    /// Occupied bucket indices, ascending.
    pub fn occupied_buckets(&self) -> &[usize] {
        &self.occupied
    }

    pub fn depth_to_bucket(&self, depth: i32) -> Option<usize> {
        self.config.depth_to_bucket(depth)
    }

    /// The batch for `depth`, if it currently holds sprites.
    pub fn batch_at_depth(&self, depth: i32) -> Option<&RenderBatch> {
        let bucket = self.config.depth_to_bucket(depth)?;
        self.batches[bucket].as_ref().filter(|b| !b.is_empty())
    }

    /// Sprites across all buckets.
    pub fn sprite_count(&self) -> usize {
        self.occupied
            .iter()
            .filter_map(|&bucket| self.batches[bucket].as_ref())
            .map(RenderBatch::len)
            .sum()
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }
}

/// Insert `value` into the ascending `list`, keeping it sorted and free of
/// duplicates. Returns whether it was inserted.
fn insert_sorted(list: &mut Vec<usize>, value: usize) -> bool {
    let mut lo = 0;
    let mut hi = list.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if list[mid] == value {
            return false;
        }
        if list[mid] < value {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    list.insert(lo, value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform2d;
    use crate::render2d::camera::Camera2d;
    use crate::render2d::device::{HeadlessDevice, HeadlessShader};
    use crate::render2d::sprite::SpriteRecord;
    use crate::render2d::texture::Texture;
    use crate::render2d::vertex::{QUAD_FLOATS, TEX_ID_OFFSET};

    fn renderer() -> Renderer<HeadlessDevice> {
        Renderer::new(HeadlessDevice::new(), RendererConfig::default()).unwrap()
    }

    fn at_depth(depth: i32) -> SpriteHandle {
        SpriteRecord::new()
            .transform(Transform2d::IDENTITY.with_z_index(depth))
            .into()
    }

    fn set_depth(sprite: &SpriteHandle, depth: i32) {
        let transform = sprite.borrow().get_transform().with_z_index(depth);
        sprite.borrow_mut().set_transform(transform);
    }

    fn frame(renderer: &mut Renderer<HeadlessDevice>) -> RenderStats {
        let mut shader = HeadlessShader::new();
        renderer.render(&mut shader, &Camera2d::default());
        renderer.stats()
    }

    #[test]
    fn insert_sorted_keeps_order_and_uniqueness() {
        let mut list = Vec::new();
        for v in [5, 1, 9, 3, 5, 7, 1] {
            insert_sorted(&mut list, v);
        }
        assert_eq!(list, vec![1, 3, 5, 7, 9]);
        assert!(!insert_sorted(&mut list, 7));
        assert!(insert_sorted(&mut list, 0));
        assert_eq!(list[0], 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = RendererConfig {
            bucket_count: 0,
            ..RendererConfig::default()
        };
        assert!(Renderer::new(HeadlessDevice::new(), config).is_err());
    }

    #[test]
    fn shared_depths_batch_together() {
        let mut renderer = renderer();
        let a = at_depth(5);
        let b = at_depth(3);
        let c = at_depth(5);
        renderer.add(a.clone());
        renderer.add(b.clone());
        renderer.add(c.clone());

        assert_eq!(renderer.occupied_buckets(), &[1003, 1005]);
        let five = renderer.batch_at_depth(5).unwrap();
        assert_eq!(five.len(), 2);
        assert!(five.sprites()[0].ptr_eq(&a));
        assert!(five.sprites()[1].ptr_eq(&c));

        let stats = frame(&mut renderer);
        assert_eq!(stats.draw_calls, 2);
        let draws = renderer.device().draws();
        let three = renderer.batch_at_depth(3).unwrap().buffers().unwrap();
        assert_eq!(draws[0].buffers, three);
        assert_eq!(draws[0].index_count, 6);
        assert_eq!(draws[1].index_count, 12);
    }

    #[test]
    fn draws_ascend_regardless_of_insertion_order() {
        let mut renderer = renderer();
        let depths = [40, -7, 1499, -1000, 0, 12];
        for depth in depths {
            renderer.add(at_depth(depth));
        }
        frame(&mut renderer);

        let mut expected = depths;
        expected.sort();
        let drawn: Vec<i32> = renderer
            .device()
            .draws()
            .iter()
            .map(|draw| {
                expected
                    .iter()
                    .copied()
                    .find(|&d| renderer.batch_at_depth(d).and_then(|b| b.buffers()) == Some(draw.buffers))
                    .unwrap()
            })
            .collect();
        assert_eq!(drawn, expected);
        assert!(renderer.occupied_buckets().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn out_of_range_depths_are_dropped() {
        let mut renderer = renderer();
        renderer.add(at_depth(1500));
        renderer.add(at_depth(-1001));
        assert_eq!(renderer.sprite_count(), 0);
        assert!(renderer.occupied_buckets().is_empty());
    }

    #[test]
    fn full_bucket_drops_extra_sprites() {
        let config = RendererConfig {
            max_batch_size: 3,
            ..RendererConfig::default()
        };
        let mut renderer = Renderer::new(HeadlessDevice::new(), config).unwrap();
        for _ in 0..5 {
            renderer.add(at_depth(0));
        }
        assert_eq!(renderer.batch_at_depth(0).unwrap().len(), 3);
        assert_eq!(renderer.sprite_count(), 3);
    }

    #[test]
    fn texture_overflow_still_draws_sprite() {
        let config = RendererConfig {
            max_textures: 2,
            ..RendererConfig::default()
        };
        let mut renderer = Renderer::new(HeadlessDevice::new(), config).unwrap();
        for id in 1..=3 {
            renderer.add(
                SpriteRecord::new()
                    .texture(Texture::new(id, 1, 1, format!("{id}.png")))
                    .into(),
            );
        }
        let batch = renderer.batch_at_depth(0).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.textures().len(), 2);
        assert_eq!(batch.vertices()[2 * QUAD_FLOATS + TEX_ID_OFFSET], 0.0);
    }

    #[test]
    fn destroy_vacates_empty_buckets() {
        let mut renderer = renderer();
        let a = at_depth(2);
        let b = at_depth(4);
        renderer.add(a.clone());
        renderer.add(b.clone());

        assert!(renderer.destroy(&a));
        assert!(!renderer.destroy(&a));
        assert_eq!(renderer.occupied_buckets(), &[1004]);
        assert!(renderer.batch_at_depth(2).is_none());

        frame(&mut renderer);
        assert_eq!(renderer.device().draws().len(), 1);
    }

    #[test]
    fn emptied_bucket_reuses_its_buffers() {
        let mut renderer = renderer();
        let a = at_depth(1);
        renderer.add(a.clone());
        renderer.destroy(&a);
        renderer.add(a.clone());
        assert_eq!(renderer.device().buffers_created(), 1);
        assert_eq!(renderer.occupied_buckets(), &[1001]);
    }

    #[test]
    fn second_frame_without_changes_uploads_nothing() {
        let mut renderer = renderer();
        let sprites: Vec<_> = (0..4).map(|d| at_depth(d % 2)).collect();
        for s in &sprites {
            renderer.add(s.clone());
        }

        assert_eq!(frame(&mut renderer).uploads, 2);
        assert!(sprites.iter().all(|s| !s.borrow().is_dirty()));
        let stats = frame(&mut renderer);
        assert_eq!(stats.uploads, 0);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.sprites, 4);
    }

    #[test]
    fn remove_and_readd_restores_content() {
        let mut renderer = renderer();
        let sprite: SpriteHandle = SpriteRecord::new()
            .size(3.0, 2.0)
            .transform(Transform2d::from_xy(7.0, -2.0).with_z_index(9))
            .into();
        renderer.add(sprite.clone());
        frame(&mut renderer);
        let before = renderer.batch_at_depth(9).unwrap().vertices().to_vec();

        renderer.destroy(&sprite);
        assert_eq!(renderer.sprite_count(), 0);
        renderer.add(sprite.clone());
        frame(&mut renderer);

        assert_eq!(renderer.sprite_count(), 1);
        assert_eq!(renderer.batch_at_depth(9).unwrap().vertices(), before.as_slice());
        let buffers = renderer.batch_at_depth(9).unwrap().buffers().unwrap();
        assert_eq!(
            &renderer.device().vertex_data(buffers).unwrap()[..QUAD_FLOATS],
            before.as_slice()
        );
    }

    #[test]
    fn z_index_change_moves_sprite() {
        let mut renderer = renderer();
        let a = at_depth(1);
        let b = at_depth(1);
        renderer.add(a.clone());
        renderer.add(b.clone());

        set_depth(&a, -3);
        renderer.update_z_index(&a);
        assert_eq!(renderer.occupied_buckets(), &[997, 1001]);
        assert!(renderer.batch_at_depth(-3).unwrap().sprites()[0].ptr_eq(&a));

        set_depth(&b, -3);
        renderer.update_z_index(&b);
        assert_eq!(renderer.occupied_buckets(), &[997]);
        assert_eq!(renderer.batch_at_depth(-3).unwrap().len(), 2);
    }

    #[test]
    fn moving_into_a_full_bucket_drops_the_sprite() {
        let config = RendererConfig {
            max_batch_size: 1,
            ..RendererConfig::default()
        };
        let mut renderer = Renderer::new(HeadlessDevice::new(), config).unwrap();
        let resident = at_depth(4);
        let mover = at_depth(2);
        renderer.add(resident.clone());
        renderer.add(mover.clone());

        set_depth(&mover, 4);
        renderer.update_z_index(&mover);

        assert_eq!(renderer.occupied_buckets(), &[1004]);
        assert_eq!(renderer.sprite_count(), 1);
        assert!(renderer.batch_at_depth(4).unwrap().sprites()[0].ptr_eq(&resident));
        assert!(!renderer.destroy(&mover));
    }

    #[test]
    fn z_index_update_ignores_unknown_sprites() {
        let mut renderer = renderer();
        renderer.update_z_index(&at_depth(3));
        assert_eq!(renderer.sprite_count(), 0);
    }

    #[test]
    fn moving_out_of_range_drops_the_sprite() {
        let mut renderer = renderer();
        let a = at_depth(0);
        renderer.add(a.clone());
        set_depth(&a, 5000);
        renderer.update_z_index(&a);
        assert_eq!(renderer.sprite_count(), 0);
        assert!(renderer.occupied_buckets().is_empty());
    }

    #[test]
    fn release_frees_everything() {
        let mut renderer = renderer();
        renderer.add(at_depth(0));
        renderer.add(at_depth(1));
        renderer.release();
        assert_eq!(renderer.device().live_buffers(), 0);
        assert_eq!(renderer.sprite_count(), 0);
        frame(&mut renderer);
        assert!(renderer.device().draws().is_empty());
    }
}
