//! # Strata — Depth-Bucketed Sprite Batching
//!
//! The rendering core of a 2D engine: sprites are grouped into one GPU batch
//! per integer depth, batches are drawn in ascending depth order, and each
//! batch keeps its vertex buffer between frames, re-uploading only when a
//! sprite changed.
//!
//! Start with `use strata::prelude::*`, build a
//! [`Renderer`](render2d::Renderer) on a [`RenderDevice`](render2d::RenderDevice),
//! and hand it [`SpriteHandle`](render2d::SpriteHandle)s.

pub mod config;
pub mod error;
pub mod logging;
pub mod math;
pub mod prelude;
pub mod render;
pub mod render2d;
pub mod scene;
