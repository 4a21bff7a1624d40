//! Layered sprites — three depths of colored quads, one draw call each.
//!
//! The middle row spins, so its batch re-uploads every frame while the other
//! two upload once. Press Space to move the white marker between depths.

use std::sync::Arc;
use std::time::Instant;

use strata::prelude::*;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

struct Gfx {
    window: Arc<Window>,
    gpu: GpuContext,
    shader: SpriteShader,
    scene: Scene<WgpuDevice>,
    camera: Camera2d,
    spinners: Vec<u32>,
    marker: u32,
}

#[derive(Default)]
struct Demo {
    gfx: Option<Gfx>,
    last_frame: Option<Instant>,
}

fn quad(name: &str, x: f32, y: f32, depth: i32, color: Color) -> GameObject {
    GameObject::new(name, Transform2d::from_xy(x, y).with_z_index(depth))
        .with(SpriteRenderer::new(SpriteRecord::new().size(96.0, 96.0).color(color)))
}

fn build(window: Arc<Window>) -> strata::error::Result<Gfx> {
    let gpu = GpuContext::new(window.clone())?;
    let shader = SpriteShader::new(&gpu)?;
    let renderer = Renderer::new(WgpuDevice::new(&gpu), RendererConfig::default())?;
    let mut scene = Scene::new(renderer);

    let mut spinners = Vec::new();
    for i in 0..8 {
        let x = 120.0 + i as f32 * 130.0;
        scene.add_game_object(quad("back", x, 520.0, -1, Color::rgb(0.2, 0.3, 0.8)));
        spinners.push(scene.add_game_object(quad("spinner", x, 340.0, 0, Color::rgb(0.9, 0.4, 0.2))));
        scene.add_game_object(quad("front", x, 160.0, 1, Color::rgb(0.3, 0.8, 0.4)));
    }
    let marker = scene.add_game_object(
        GameObject::new("marker", Transform2d::from_xy(640.0, 340.0).with_z_index(-1))
            .with(SpriteRenderer::new(SpriteRecord::new().size(40.0, 40.0))),
    );
    scene.start();

    let (w, h) = gpu.surface_size();
    let camera = Camera2d::with_projection_size(Vec2::ZERO, Vec2::new(w as f32, h as f32));

    Ok(Gfx {
        window,
        gpu,
        shader,
        scene,
        camera,
        spinners,
        marker,
    })
}

impl ApplicationHandler for Demo {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gfx.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("strata — layered sprites")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match build(window) {
            Ok(gfx) => self.gfx = Some(gfx),
            Err(e) => {
                log::error!("{e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                gfx.gpu.resize(size.width, size.height);
                gfx.camera.projection_size = Vec2::new(size.width as f32, size.height as f32);
                gfx.camera.adjust_projection();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Space),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(marker) = gfx.scene.get_mut(gfx.marker) {
                    // Cycle -1 → 0 → 1 → 2 → -1.
                    marker.transform.z_index = (marker.transform.z_index + 2) % 4 - 1;
                    log::info!("Marker now at depth {}", marker.transform.z_index);
                }
            }

            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = self
                    .last_frame
                    .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
                self.last_frame = Some(now);

                for uid in &gfx.spinners {
                    if let Some(object) = gfx.scene.get_mut(*uid) {
                        object.transform.rotation += 90.0 * dt;
                    }
                }
                gfx.scene.update(dt);

                match render_frame(
                    &gfx.gpu,
                    gfx.scene.renderer_mut(),
                    &mut gfx.shader,
                    &gfx.camera,
                    ClearColor::default(),
                ) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let (w, h) = gfx.gpu.surface_size();
                        gfx.gpu.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory!");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Surface error: {e:?}"),
                }

                gfx.window.request_redraw();
            }

            _ => {}
        }
    }
}

fn main() {
    init_logger();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("Failed to create event loop: {e}");
            return;
        }
    };
    if let Err(e) = event_loop.run_app(&mut Demo::default()) {
        log::error!("Event loop error: {e}");
    }
}
