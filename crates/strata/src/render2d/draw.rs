//! # Draw — The wgpu Render Device
//!
//! [`WgpuDevice`] turns the batcher's device calls into wgpu work:
//!
//! | Device call | wgpu |
//! |-------------|------|
//! | `create_batch_buffers` | vertex buffer (`VERTEX \| COPY_DST`) + static index buffer |
//! | `upload_vertices` | `Queue::write_buffer` at offset 0 |
//! | `bind_texture` | remembered until the next draw |
//! | `draw_indexed` | set pipeline, bind groups, buffers, `draw_indexed` |
//! | `create_texture` | `create_texture_with_data`, RGBA8 sRGB |
//!
//! Draws are recorded into a render pass opened with
//! [`begin_pass`](WgpuDevice::begin_pass). The pass outlives the borrow of
//! the encoder (`forget_lifetime`), so the renderer can drive it through
//! `&mut self` calls. A draw without an open pass is dropped with a warning.
//!
//! ## Texture Bind Groups
//!
//! The shader samples nine texture bindings. At draw time every slot without
//! a bound texture gets the built-in 1×1 white texture (id 0). Bind groups
//! are cached by shader id plus the nine texture ids, so a batch whose
//! texture table hasn't changed reuses its bind group every frame, and a
//! group is never reused with another shader's layout. Releasing a texture
//! evicts every group that samples it.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::device::{BatchBuffers, RenderDevice};
use super::pipeline::SpriteShader;
use super::texture::{Texture, check_rgba_len};
use super::vertex::TEXTURE_UNITS;
use crate::error::Result;
use crate::render::{ClearColor, GpuContext};

/// Id of the white texture every empty slot samples.
const WHITE_TEXTURE: u32 = 0;

struct GpuBatchBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
}

/// [`RenderDevice`] backed by a wgpu device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    next_buffers: u32,
    next_texture: u32,
    buffers: HashMap<BatchBuffers, GpuBatchBuffers>,
    textures: HashMap<u32, wgpu::TextureView>,
    bound: [u32; TEXTURE_UNITS],
    bind_groups: BindGroupCache<wgpu::BindGroup>,
    pass: Option<wgpu::RenderPass<'static>>,
}

impl WgpuDevice {
    pub fn new(gpu: &GpuContext) -> Self {
        let white = gpu.device.create_texture_with_data(
            &gpu.queue,
            &texture_descriptor("white 1x1", 1, 1),
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255u8, 255, 255, 255],
        );
        let mut textures = HashMap::new();
        textures.insert(
            WHITE_TEXTURE,
            white.create_view(&wgpu::TextureViewDescriptor::default()),
        );

        Self {
            device: gpu.device.clone(),
            queue: gpu.queue.clone(),
            next_buffers: 0,
            next_texture: WHITE_TEXTURE + 1,
            buffers: HashMap::new(),
            textures,
            bound: [WHITE_TEXTURE; TEXTURE_UNITS],
            bind_groups: BindGroupCache::default(),
            pass: None,
        }
    }

    /// Open a render pass on `view`, clearing it to `clear`. Draws issued
    /// until [`end_pass`](Self::end_pass) are recorded into it.
    pub fn begin_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        clear: ClearColor,
    ) {
        if self.pass.is_some() {
            log::warn!("begin_pass called with a pass already open; closing it");
            self.end_pass();
        }
        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("sprite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.pass = Some(pass.forget_lifetime());
    }

    /// Close the current render pass. The encoder can be finished afterwards.
    pub fn end_pass(&mut self) {
        self.pass = None;
    }

    pub fn in_pass(&self) -> bool {
        self.pass.is_some()
    }

    fn texture_bind_group(&mut self, shader: &SpriteShader) -> Option<wgpu::BindGroup> {
        let key = self.bound;
        if let Some(group) = self.bind_groups.get(shader.id(), &key) {
            return Some(group.clone());
        }

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Sampler(shader.sampler()),
        }];
        for (unit, id) in key.iter().enumerate() {
            let Some(view) = self.textures.get(id) else {
                log::warn!("Texture {id} bound to slot {unit} no longer exists");
                return None;
            };
            entries.push(wgpu::BindGroupEntry {
                binding: unit as u32 + 1,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }

        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite texture bind group"),
            layout: shader.texture_bind_group_layout(),
            entries: &entries,
        });
        self.bind_groups.insert(shader.id(), key, group.clone());
        Some(group)
    }
}

impl RenderDevice for WgpuDevice {
    type Shader = SpriteShader;

    fn create_batch_buffers(&mut self, vertex_floats: usize, indices: &[u32]) -> BatchBuffers {
        let vertex = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sprite batch vertex buffer"),
            size: (vertex_floats * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite batch index buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let id = BatchBuffers::new(self.next_buffers);
        self.next_buffers += 1;
        self.buffers.insert(id, GpuBatchBuffers { vertex, index });
        id
    }

    fn upload_vertices(&mut self, buffers: BatchBuffers, vertices: &[f32]) {
        let Some(gpu) = self.buffers.get(&buffers) else {
            log::warn!("Upload to released batch buffers {buffers:?} ignored");
            return;
        };
        self.queue
            .write_buffer(&gpu.vertex, 0, bytemuck::cast_slice(vertices));
    }

    fn bind_texture(&mut self, slot: u32, texture: &Texture) {
        let Some(unit) = self.bound.get_mut(slot as usize) else {
            log::trace!("Texture slot {slot} out of range, ignored");
            return;
        };
        *unit = texture.id();
    }

    fn unbind_textures(&mut self) {
        self.bound = [WHITE_TEXTURE; TEXTURE_UNITS];
    }

    fn draw_indexed(&mut self, shader: &SpriteShader, buffers: BatchBuffers, index_count: u32) {
        if self.pass.is_none() {
            log::warn!("Draw of {index_count} indices issued outside a render pass, skipped");
            return;
        }
        let Some(texture_group) = self.texture_bind_group(shader) else {
            return;
        };
        let (Some(gpu), Some(pass)) = (self.buffers.get(&buffers), self.pass.as_mut()) else {
            log::warn!("Draw with released batch buffers {buffers:?} ignored");
            return;
        };

        pass.set_pipeline(shader.pipeline());
        pass.set_bind_group(0, shader.uniform_bind_group(), &[]);
        pass.set_bind_group(1, &texture_group, &[]);
        pass.set_vertex_buffer(0, gpu.vertex.slice(..));
        pass.set_index_buffer(gpu.index.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..index_count, 0, 0..1);
    }

    fn release_batch_buffers(&mut self, buffers: BatchBuffers) {
        if let Some(gpu) = self.buffers.remove(&buffers) {
            gpu.vertex.destroy();
            gpu.index.destroy();
        }
    }

    fn create_texture(&mut self, source: &str, width: u32, height: u32, rgba: &[u8]) -> Result<Texture> {
        check_rgba_len(source, width, height, rgba)?;
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &texture_descriptor(source, width, height),
            wgpu::util::TextureDataOrder::LayerMajor,
            rgba,
        );
        let id = self.next_texture;
        self.next_texture += 1;
        self.textures
            .insert(id, texture.create_view(&wgpu::TextureViewDescriptor::default()));
        Ok(Texture::new(id, width, height, source))
    }

    fn release_texture(&mut self, texture: &Texture) {
        let id = texture.id();
        if id == WHITE_TEXTURE {
            return;
        }
        if self.textures.remove(&id).is_none() {
            log::warn!("Release of unknown texture {id} ignored");
            return;
        }
        let evicted = self.bind_groups.evict_texture(id);
        for unit in self.bound.iter_mut().filter(|unit| **unit == id) {
            *unit = WHITE_TEXTURE;
        }
        log::debug!("Texture {id} released, {evicted} bind groups evicted");
    }
}

/// Bind groups keyed by the shader that owns the layout and the texture id
/// in each unit.
struct BindGroupCache<G> {
    groups: HashMap<(u64, [u32; TEXTURE_UNITS]), G>,
}

impl<G> Default for BindGroupCache<G> {
    fn default() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }
}

impl<G> BindGroupCache<G> {
    fn get(&self, shader: u64, units: &[u32; TEXTURE_UNITS]) -> Option<&G> {
        self.groups.get(&(shader, *units))
    }

    fn insert(&mut self, shader: u64, units: [u32; TEXTURE_UNITS], group: G) {
        self.groups.insert((shader, units), group);
    }

    /// Drop every group that samples `texture`. Returns how many went.
    fn evict_texture(&mut self, texture: u32) -> usize {
        let before = self.groups.len();
        self.groups.retain(|(_, units), _| !units.contains(&texture));
        before - self.groups.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.groups.len()
    }
}

fn texture_descriptor(label: &str, width: u32, height: u32) -> wgpu::TextureDescriptor<'_> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(ids: &[u32]) -> [u32; TEXTURE_UNITS] {
        let mut units = [WHITE_TEXTURE; TEXTURE_UNITS];
        units[..ids.len()].copy_from_slice(ids);
        units
    }

    #[test]
    fn bind_groups_are_per_shader() {
        let mut cache = BindGroupCache::default();
        cache.insert(0, units(&[0, 1]), "first");
        assert_eq!(cache.get(0, &units(&[0, 1])), Some(&"first"));
        assert_eq!(cache.get(1, &units(&[0, 1])), None);

        cache.insert(1, units(&[0, 1]), "second");
        assert_eq!(cache.get(0, &units(&[0, 1])), Some(&"first"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn released_texture_evicts_its_groups() {
        let mut cache = BindGroupCache::default();
        cache.insert(0, units(&[0, 1, 2]), "a");
        cache.insert(0, units(&[0, 2]), "b");
        cache.insert(1, units(&[0, 3]), "c");

        assert_eq!(cache.evict_texture(2), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1, &units(&[0, 3])), Some(&"c"));
        assert_eq!(cache.evict_texture(2), 0);
    }
}
