//! Frame orchestration: acquire, clear, draw every bucket, present.

use crate::render2d::{Camera, Renderer, SpriteShader, WgpuDevice};

use super::gpu::GpuContext;

/// Background color the frame is cleared to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor(pub [f64; 4]);

impl ClearColor {
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.0[0],
            g: self.0[1],
            b: self.0[2],
            a: self.0[3],
        }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        // A pleasant dark blue, like a night sky.
        Self([0.1, 0.1, 0.15, 1.0])
    }
}

/// Render a single frame of sprites to the window surface.
///
/// Everything the renderer draws goes into one render pass, in ascending
/// depth order.
pub fn render_frame(
    gpu: &GpuContext,
    renderer: &mut Renderer<WgpuDevice>,
    shader: &mut SpriteShader,
    camera: &impl Camera,
    clear: ClearColor,
) -> Result<(), wgpu::SurfaceError> {
    let output = gpu.surface.get_current_texture()?;
    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("strata frame encoder"),
        });

    renderer.device_mut().begin_pass(&mut encoder, &view, clear);
    renderer.render(shader, camera);
    renderer.device_mut().end_pass();

    let stats = renderer.stats();
    log::trace!(
        "Frame: {} draws, {} uploads, {} sprites",
        stats.draw_calls,
        stats.uploads,
        stats.sprites
    );

    gpu.queue.submit(std::iter::once(encoder.finish()));
    output.present();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_color_converts_components_in_order() {
        let c = ClearColor([0.25, 0.5, 0.75, 1.0]).to_wgpu();
        assert_eq!((c.r, c.g, c.b, c.a), (0.25, 0.5, 0.75, 1.0));
        assert_eq!(ClearColor::default().0[3], 1.0);
    }
}
