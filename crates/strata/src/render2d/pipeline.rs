//! # Pipeline — The Sprite Shader on wgpu
//!
//! [`SpriteShader`] is the wgpu implementation of [`Shader`]. It bundles the
//! render pipeline with the resources the pipeline reads:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ SpriteShader                                                │
//! │                                                             │
//! │  shader.wgsl ─── vs_main + fs_main                          │
//! │                                                             │
//! │  group 0: uniform { projection, view, texture_units[9] }    │
//! │           written by upload_mat4 / upload_int_array         │
//! │                                                             │
//! │  group 1: binding 0 sampler, bindings 1..=9 textures        │
//! │           built per draw by WgpuDevice from bound slots     │
//! │                                                             │
//! │  Blend ─── ALPHA_BLENDING, no depth buffer, no culling      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Uniform names follow the classic GL spelling (`uProjection`, `uView`,
//! `uTextures`) so batch code reads the same on every backend. Names the
//! shader doesn't know are ignored.
//!
//! Uniform writes go through `Queue::write_buffer`, which lands before the
//! frame's command buffer runs. Every batch in a frame uploads the same
//! camera, so one uniform buffer serves the whole frame.

use std::sync::atomic::{AtomicU64, Ordering};

use wgpu::util::DeviceExt;

use super::device::{Shader, U_PROJECTION, U_TEXTURES, U_VIEW};
use super::vertex::{SPRITE_VERTEX_LAYOUT, SpriteUniform, TEXTURE_UNITS};
use crate::error::{RenderError, Result};
use crate::math::Mat4;
use crate::render::GpuContext;

/// Source of the built-in sprite shader.
pub const SPRITE_SHADER_WGSL: &str = include_str!("shader.wgsl");

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(0);

/// The sprite render pipeline and its uniform state.
pub struct SpriteShader {
    id: u64,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    queue: wgpu::Queue,
    uniform: SpriteUniform,
    bound: bool,
}

impl SpriteShader {
    /// Build the built-in sprite shader for the surface format of `gpu`.
    pub fn new(gpu: &GpuContext) -> Result<Self> {
        Self::from_wgsl(gpu, "sprite shader", SPRITE_SHADER_WGSL)
    }

    /// Build from custom WGSL. The source must declare the same bindings,
    /// vertex inputs, and entry points as the built-in shader.
    pub fn from_wgsl(gpu: &GpuContext, label: &str, source: &str) -> Result<Self> {
        let device = &gpu.device;

        // Catch compile and pipeline validation errors instead of panicking.
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sprite uniform bind group layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let mut texture_entries = vec![wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        }];
        texture_entries.extend((0..TEXTURE_UNITS as u32).map(|unit| wgpu::BindGroupLayoutEntry {
            binding: unit + 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        }));
        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("sprite texture bind group layout"),
                entries: &texture_entries,
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("sprite pipeline layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("sprite pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[SPRITE_VERTEX_LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::Shader(format!("'{label}': {err}")));
        }

        let uniform = SpriteUniform::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("sprite uniform buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sprite uniform bind group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sprite sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::info!("Sprite pipeline '{label}' created ({:?})", gpu.surface_format());

        Ok(Self {
            id: NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed),
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group_layout,
            sampler,
            queue: gpu.queue.clone(),
            uniform,
            bound: false,
        })
    }

    /// Process-unique id. Bind groups built against this shader's layout
    /// are cached under it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bind_group
    }

    pub fn texture_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_bind_group_layout
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Current CPU copy of the uniform block.
    pub fn uniform(&self) -> &SpriteUniform {
        &self.uniform
    }

    fn write_uniform(&mut self, next: SpriteUniform) {
        if next != self.uniform {
            self.uniform = next;
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[self.uniform]));
        }
    }
}

impl Shader for SpriteShader {
    fn bind(&mut self) {
        self.bound = true;
    }

    fn unbind(&mut self) {
        self.bound = false;
    }

    fn upload_mat4(&mut self, name: &str, value: &Mat4) {
        let mut next = self.uniform;
        match name {
            U_PROJECTION => next.projection = value.to_cols_array_2d(),
            U_VIEW => next.view = value.to_cols_array_2d(),
            _ => {
                log::trace!("Sprite shader has no mat4 uniform '{name}'");
                return;
            }
        }
        self.write_uniform(next);
    }

    fn upload_int_array(&mut self, name: &str, values: &[i32]) {
        if name != U_TEXTURES {
            log::trace!("Sprite shader has no int array uniform '{name}'");
            return;
        }
        let mut next = self.uniform;
        next.set_texture_units(values);
        self.write_uniform(next);
    }
}
