//! Render pipelines used by [`Context`](crate::context::Context).
//!
//! - `basic` is the lit, fogged pipeline every mesh is drawn with
//! - `light` holds the per-frame uniform with camera, sun, ambient and fog

pub mod basic;
pub mod light;
