//! # Texture — Handles and the Path Cache
//!
//! Users never hold a `wgpu::Texture` directly. A [`RenderDevice`] creates the
//! GPU resource and hands back a [`Texture`]: a small value that names it.
//! Two textures are equal when their GPU id, dimensions, and source path all
//! match. A batch relies on that equality to keep each texture in its slot
//! table only once.
//!
//! ```text
//! TextureCache                           RenderDevice
//! ┌──────────────────────────────┐      ┌───────────────────────┐
//! │ "player.png"  → Texture(1)   │ ───► │ id 1 → GPU view       │
//! │ "tileset.png" → Texture(2)   │      │ id 2 → GPU view       │
//! └──────────────────────────────┘      └───────────────────────┘
//! ```
//!
//! The cache deduplicates by path, so loading the same image twice returns the
//! same handle without a second upload.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::device::RenderDevice;
use crate::error::Result;

/// Handle to a GPU texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Texture {
    id: u32,
    width: u32,
    height: u32,
    source: Arc<str>,
}

impl Texture {
    /// Wrap a device-assigned id. Only render devices should call this.
    pub fn new(id: u32, width: u32, height: u32, source: impl Into<Arc<str>>) -> Self {
        Self {
            id,
            width,
            height,
            source: source.into(),
        }
    }

    /// The device-assigned id.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// File path, or a label for generated textures.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Path-keyed texture cache.
#[derive(Default)]
pub struct TextureCache {
    by_source: HashMap<String, Texture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a texture from disk, or return the cached handle for this path.
    pub fn load(&mut self, device: &mut impl RenderDevice, path: impl AsRef<Path>) -> Result<Texture> {
        let path = path.as_ref();
        let key = path.to_string_lossy().into_owned();
        if let Some(texture) = self.by_source.get(&key) {
            return Ok(texture.clone());
        }

        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        let texture = device.create_texture(&key, width, height, img.as_raw())?;
        log::info!("Loaded texture '{key}' ({width}x{height})");

        self.by_source.insert(key, texture.clone());
        Ok(texture)
    }

    /// Create a texture from raw RGBA8 data under `label`, or return the
    /// handle already registered for that label.
    pub fn insert_rgba(
        &mut self,
        device: &mut impl RenderDevice,
        label: &str,
        width: u32,
        height: u32,
        data: &[u8],
    ) -> Result<Texture> {
        if let Some(texture) = self.by_source.get(label) {
            return Ok(texture.clone());
        }
        let texture = device.create_texture(label, width, height, data)?;
        self.by_source.insert(label.to_owned(), texture.clone());
        Ok(texture)
    }

    /// Drop the texture registered under `source` and free it on `device`.
    /// Returns whether one was registered. Sprites must stop using it first.
    pub fn remove(&mut self, device: &mut impl RenderDevice, source: &str) -> bool {
        let Some(texture) = self.by_source.remove(source) else {
            return false;
        };
        device.release_texture(&texture);
        log::debug!("Released texture '{source}'");
        true
    }

    /// Look up a previously loaded texture.
    pub fn get(&self, source: &str) -> Option<&Texture> {
        self.by_source.get(source)
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Check that `data` holds exactly `width * height` RGBA8 pixels.
pub(crate) fn check_rgba_len(label: &str, width: u32, height: u32, data: &[u8]) -> Result<()> {
    let expected = width as usize * height as usize * 4;
    if width == 0 || height == 0 || data.len() != expected {
        return Err(crate::error::RenderError::Texture(format!(
            "'{label}': expected {expected} bytes for {width}x{height} RGBA8, got {}",
            data.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::render2d::device::HeadlessDevice;

    #[test]
    fn equality_uses_id_size_and_source() {
        let a = Texture::new(1, 16, 16, "a.png");
        assert_eq!(a, Texture::new(1, 16, 16, "a.png"));
        assert_ne!(a, Texture::new(2, 16, 16, "a.png"));
        assert_ne!(a, Texture::new(1, 32, 16, "a.png"));
        assert_ne!(a, Texture::new(1, 16, 16, "b.png"));
    }

    #[test]
    fn rgba_insert_is_deduplicated_by_label() {
        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let pixels = [255u8; 2 * 2 * 4];

        let first = cache.insert_rgba(&mut device, "checker", 2, 2, &pixels).unwrap();
        let second = cache.insert_rgba(&mut device, "checker", 2, 2, &pixels).unwrap();
        assert_eq!(first, second);
        assert_eq!(device.textures_created(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn rgba_size_mismatch_is_an_error() {
        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let err = cache.insert_rgba(&mut device, "bad", 4, 4, &[0u8; 3]).unwrap_err();
        assert!(matches!(err, RenderError::Texture(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn load_decodes_png_once() {
        let path = std::env::temp_dir().join(format!("strata-tex-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let a = cache.load(&mut device, &path).unwrap();
        let b = cache.load(&mut device, &path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(a, b);
        assert_eq!((a.width(), a.height()), (3, 2));
        assert_eq!(device.textures_created(), 1);
        assert_eq!(cache.get(a.source()), Some(&a));
    }

    #[test]
    fn remove_releases_and_allows_reload() {
        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        let pixels = [255u8; 4];

        let first = cache.insert_rgba(&mut device, "dot", 1, 1, &pixels).unwrap();
        assert!(cache.remove(&mut device, "dot"));
        assert!(!cache.remove(&mut device, "dot"));
        assert!(cache.get("dot").is_none());
        assert_eq!(device.live_textures(), 0);

        let second = cache.insert_rgba(&mut device, "dot", 1, 1, &pixels).unwrap();
        assert_ne!(first, second);
        assert_eq!(device.live_textures(), 1);
    }

    #[test]
    fn load_missing_file_fails() {
        let mut device = HeadlessDevice::new();
        let mut cache = TextureCache::new();
        assert!(cache.load(&mut device, "/no/such/sprite.png").is_err());
    }
}
