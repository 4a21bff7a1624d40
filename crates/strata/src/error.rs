//! Errors for one-time setup work.
//!
//! The per-frame batching path (add, destroy, z-index moves, render) never
//! fails: capacity problems are silent drops and lookup misses are plain
//! `bool`s. Only initialisation can go wrong in a way the caller has to see:
//! finding a GPU, compiling the sprite pipeline, decoding a texture, or
//! reading a bad config file. Those paths return [`RenderError`] and the
//! caller is expected to abort startup.

use std::fmt;

/// Errors raised while setting up the renderer and its resources.
#[derive(Debug)]
pub enum RenderError {
    /// The renderer configuration is malformed or out of range.
    Config(String),
    /// A file could not be read.
    Io(String),
    /// A texture could not be decoded or its pixel data is inconsistent.
    Texture(String),
    /// The sprite shader or pipeline failed validation.
    Shader(String),
    /// No usable adapter, device, or surface.
    Gpu(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Config(e) => write!(f, "invalid renderer config: {e}"),
            RenderError::Io(e) => write!(f, "io error: {e}"),
            RenderError::Texture(e) => write!(f, "texture error: {e}"),
            RenderError::Shader(e) => write!(f, "shader error: {e}"),
            RenderError::Gpu(e) => write!(f, "gpu initialization failed: {e}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e.to_string())
    }
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        RenderError::Texture(e.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(e: serde_json::Error) -> Self {
        RenderError::Config(e.to_string())
    }
}

/// Shorthand for results carrying a [`RenderError`].
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failing_stage() {
        let err = RenderError::Shader("missing entry point".into());
        assert_eq!(err.to_string(), "shader error: missing entry point");

        let err = RenderError::Gpu("no adapter".into());
        assert!(err.to_string().starts_with("gpu initialization failed"));
    }

    #[test]
    fn json_errors_become_config_errors() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("{");
        let err: RenderError = parse.unwrap_err().into();
        assert!(matches!(err, RenderError::Config(_)));
    }
}
