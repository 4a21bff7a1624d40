//! # Config — Batching Limits
//!
//! The batching engine is bounded everywhere: a batch holds at most
//! `max_batch_size` quads, binds at most `max_textures` textures, and the
//! renderer owns one bucket per integer depth in a fixed window. These limits
//! live in [`RendererConfig`] rather than being baked into array sizes, so a
//! game can tune them from a JSON file:
//!
//! ```json
//! { "max_batch_size": 500, "min_depth": -100, "bucket_count": 200 }
//! ```
//!
//! Missing fields fall back to the defaults below.
//!
//! ## Depth Window
//!
//! ```text
//!  depth:   min_depth ........ -1 0 1 ........ min_depth + bucket_count - 1
//!  bucket:      0     ........   ...  ........        bucket_count - 1
//! ```
//!
//! With the defaults, depth −1000..=1499 maps to buckets 0..=2499.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};

/// Default number of quads per batch.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Default number of distinct textures per batch (slot 0 is extra and reserved
/// for "no texture").
pub const MAX_TEXTURES: usize = 8;

/// Hard ceiling on `max_textures`. The sprite shader declares exactly this
/// many texture bindings plus the slot-0 white texture.
pub const MAX_TEXTURE_SLOTS: usize = 8;

/// Default lowest representable depth.
pub const MIN_DEPTH: i32 = -1000;

/// Default number of depth buckets.
pub const BUCKET_COUNT: usize = 2500;

/// Capacity limits for the sprite [`Renderer`](crate::render2d::Renderer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Quads per batch.
    pub max_batch_size: usize,
    /// Distinct textures per batch.
    pub max_textures: usize,
    /// Depth that maps to bucket 0.
    pub min_depth: i32,
    /// Number of depth buckets.
    pub bucket_count: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_textures: MAX_TEXTURES,
            min_depth: MIN_DEPTH,
            bucket_count: BUCKET_COUNT,
        }
    }
}

impl RendererConfig {
    /// Parse and validate a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Io(format!("'{}': {e}", path.display())))?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded renderer config from '{}'", path.display());
        Ok(config)
    }

    /// Check that every limit is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(RenderError::Config("max_batch_size must be at least 1".into()));
        }
        // Vertex indices are u32: 4 vertices per quad must stay addressable.
        if self.max_batch_size > (u32::MAX / 4) as usize {
            return Err(RenderError::Config(format!(
                "max_batch_size {} exceeds the u32 index range",
                self.max_batch_size
            )));
        }
        if self.max_textures > MAX_TEXTURE_SLOTS {
            return Err(RenderError::Config(format!(
                "max_textures {} exceeds the {MAX_TEXTURE_SLOTS} texture slots the sprite shader binds",
                self.max_textures
            )));
        }
        if self.bucket_count == 0 {
            return Err(RenderError::Config("bucket_count must be at least 1".into()));
        }
        // Buckets left between min_depth and i32::MAX, inclusive.
        let room = i64::from(i32::MAX) - i64::from(self.min_depth) + 1;
        if i64::try_from(self.bucket_count).map_or(true, |count| count > room) {
            return Err(RenderError::Config(format!(
                "depth window starting at {} with {} buckets overflows i32",
                self.min_depth, self.bucket_count
            )));
        }
        Ok(())
    }

    /// Highest depth that still maps to a bucket.
    pub fn max_depth(&self) -> i32 {
        // validate() guarantees this fits.
        (i64::from(self.min_depth) + self.bucket_count as i64 - 1) as i32
    }

    /// Map a depth to its bucket index, or `None` when outside the window.
    pub fn depth_to_bucket(&self, depth: i32) -> Option<usize> {
        let offset = i64::from(depth) - i64::from(self.min_depth);
        if offset < 0 || offset >= self.bucket_count as i64 {
            None
        } else {
            Some(offset as usize)
        }
    }

    /// Inverse of [`depth_to_bucket`](Self::depth_to_bucket).
    pub fn bucket_to_depth(&self, bucket: usize) -> i32 {
        (i64::from(self.min_depth) + bucket as i64) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_minus_1000_to_1499() {
        let config = RendererConfig::default();
        assert_eq!(config.depth_to_bucket(-1000), Some(0));
        assert_eq!(config.depth_to_bucket(0), Some(1000));
        assert_eq!(config.depth_to_bucket(1499), Some(2499));
        assert_eq!(config.depth_to_bucket(1500), None);
        assert_eq!(config.depth_to_bucket(-1001), None);
        assert_eq!(config.max_depth(), 1499);
        assert_eq!(config.bucket_to_depth(1005), 5);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RendererConfig::from_json_str(r#"{ "max_batch_size": 4 }"#).unwrap();
        assert_eq!(config.max_batch_size, 4);
        assert_eq!(config.max_textures, MAX_TEXTURES);
        assert_eq!(config.bucket_count, BUCKET_COUNT);
    }

    #[test]
    fn rejects_unusable_limits() {
        assert!(RendererConfig::from_json_str(r#"{ "max_batch_size": 0 }"#).is_err());
        assert!(RendererConfig::from_json_str(r#"{ "bucket_count": 0 }"#).is_err());
        assert!(RendererConfig::from_json_str(r#"{ "max_textures": 9 }"#).is_err());
        assert!(
            RendererConfig::from_json_str(r#"{ "min_depth": 2147483000, "bucket_count": 2500 }"#)
                .is_err()
        );
        assert!(
            RendererConfig::from_json_str(
                r#"{ "min_depth": 5, "bucket_count": 18446744073709551615 }"#
            )
            .is_err()
        );
        assert!(
            RendererConfig::from_json_str(r#"{ "min_depth": 2147483647, "bucket_count": 1 }"#)
                .is_ok()
        );
    }

    #[test]
    fn zero_textures_is_allowed() {
        let config = RendererConfig::from_json_str(r#"{ "max_textures": 0 }"#).unwrap();
        assert_eq!(config.max_textures, 0);
    }

    #[test]
    fn load_reads_file() {
        let path = std::env::temp_dir().join(format!("strata-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "min_depth": -10, "bucket_count": 20 }"#).unwrap();
        let config = RendererConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.depth_to_bucket(9), Some(19));
        assert_eq!(config.depth_to_bucket(10), None);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = RendererConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
