//! Cameras supply the projection and view matrices uploaded to every batch.
//!
//! [`Camera2d`] is an orthographic camera whose bottom-left corner sits at
//! `position`. The visible area is `projection_size * zoom` world units.
//! Matrices are cached and only recomputed by
//! [`adjust_projection`](Camera2d::adjust_projection), which the owner calls
//! after moving, zooming, or resizing and before the frame renders.

use glam::{Mat4, Vec2, Vec3};

/// Anything that can provide camera matrices for a frame.
pub trait Camera {
    fn projection_matrix(&self) -> Mat4;
    fn view_matrix(&self) -> Mat4;
}

/// Orthographic 2D camera.
#[derive(Debug, Clone)]
pub struct Camera2d {
    pub position: Vec2,
    pub projection_size: Vec2,
    pub zoom: f32,
    projection: Mat4,
    view: Mat4,
}

impl Camera2d {
    /// Default visible area: 40 × 21 tiles of 32 units.
    pub const DEFAULT_PROJECTION_SIZE: Vec2 = Vec2::new(32.0 * 40.0, 32.0 * 21.0);

    /// Eye height above the sprite plane.
    const EYE_Z: f32 = 20.0;
    const NEAR: f32 = 0.0;
    const FAR: f32 = 100.0;

    pub fn new(position: Vec2) -> Self {
        Self::with_projection_size(position, Self::DEFAULT_PROJECTION_SIZE)
    }

    pub fn with_projection_size(position: Vec2, projection_size: Vec2) -> Self {
        let mut camera = Self {
            position,
            projection_size,
            zoom: 1.0,
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        };
        camera.adjust_projection();
        camera
    }

    /// Recompute the cached projection and view matrices.
    pub fn adjust_projection(&mut self) {
        let size = self.projection_size * self.zoom;
        self.projection = Mat4::orthographic_rh(0.0, size.x, 0.0, size.y, Self::NEAR, Self::FAR);

        let eye = Vec3::new(self.position.x, self.position.y, Self::EYE_Z);
        let target = Vec3::new(self.position.x, self.position.y, -1.0);
        self.view = Mat4::look_at_rh(eye, target, Vec3::Y);
    }

    /// World units covered by the view at the current zoom.
    pub fn visible_size(&self) -> Vec2 {
        self.projection_size * self.zoom
    }
}

impl Default for Camera2d {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl Camera for Camera2d {
    fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    fn view_matrix(&self) -> Mat4 {
        self.view
    }
}
