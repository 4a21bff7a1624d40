//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. The [`Transform2d`] type provides position,
//! rotation, scale, and draw depth for sprites.

use serde::{Deserialize, Serialize};

pub use glam::{Mat4, Vec2, Vec3, Vec4};

/// A 2D transform: position, scale, rotation, and an integer draw depth.
///
/// `z_index` selects the depth bucket the sprite is batched into. Higher
/// values draw later, on top of lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2d {
    /// Center of the quad in world units.
    pub position: Vec2,
    /// Multiplies the sprite's width and height.
    pub scale: Vec2,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f32,
    /// Draw depth.
    pub z_index: i32,
}

impl Transform2d {
    /// Identity transform (origin, no rotation, unit scale, depth 0).
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        scale: Vec2::ONE,
        rotation: 0.0,
        z_index: 0,
    };

    /// Create a transform at the given position.
    pub fn from_xy(x: f32, y: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::IDENTITY
        }
    }

    /// Return a copy with the given scale.
    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Vec2::new(x, y);
        self
    }

    /// Return a copy with the given rotation in degrees.
    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }

    /// Return a copy at the given depth.
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    /// Model matrix for a quad of the given size centered on `position`.
    pub fn matrix(&self, size: Vec2) -> Mat4 {
        Mat4::from_translation(self.position.extend(0.0))
            * Mat4::from_rotation_z(self.rotation.to_radians())
            * Mat4::from_scale(size.extend(1.0))
    }
}

impl Default for Transform2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A normalized rectangle within a texture (UV space, 0.0–1.0).
///
/// Used to select a sub-region of a texture for rendering, for example a
/// single frame from a sprite sheet. Coordinates are in UV space where (0,0) is
/// the top-left corner and (1,1) is the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// The full texture (0,0) to (1,1).
    pub const FULL: Self = Self {
        min: Vec2::ZERO,
        max: Vec2::ONE,
    };

    /// Build from pixel coordinates and texture dimensions.
    pub fn from_pixels(x: f32, y: f32, w: f32, h: f32, tex_w: f32, tex_h: f32) -> Self {
        Self {
            min: Vec2::new(x / tex_w, y / tex_h),
            max: Vec2::new((x + w) / tex_w, (y + h) / tex_h),
        }
    }

    /// UVs in quad corner order: top-right, bottom-right, bottom-left, top-left.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.max.x, self.min.y),
            Vec2::new(self.max.x, self.max.y),
            Vec2::new(self.min.x, self.max.y),
            Vec2::new(self.min.x, self.min.y),
        ]
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_places_unit_corner() {
        let t = Transform2d::from_xy(10.0, 20.0);
        let p = t.matrix(Vec2::new(4.0, 2.0)).transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!((p - Vec3::new(12.0, 21.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_is_counter_clockwise_degrees() {
        let t = Transform2d::IDENTITY.with_rotation(90.0);
        let p = t.matrix(Vec2::ONE).transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!((p - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn rect_from_pixels_and_corners() {
        let r = Rect::from_pixels(16.0, 0.0, 16.0, 16.0, 64.0, 32.0);
        assert_eq!(r.min, Vec2::new(0.25, 0.0));
        assert_eq!(r.max, Vec2::new(0.5, 0.5));
        let c = r.corners();
        assert_eq!(c[0], Vec2::new(0.5, 0.0));
        assert_eq!(c[2], Vec2::new(0.25, 0.5));
    }
}
