//! flow-playground
//!
//! An interactive 3D playground runtime. A scene is described as data, built
//! into a scene graph, and driven by a per-frame tick: an orbit camera moved
//! with the arrow keys, clickable objects that cycle through material
//! variants, glTF models and textures attached as they finish loading in the
//! background, and ambient animations such as a circling sun.
//!
//! High-level modules
//! - `animation`: the tick clock and ambient animations
//! - `app`: winit window host that feeds events into a flow
//! - `attachment`: asynchronous asset requests and their attachment to the graph
//! - `camera`: orbit camera, projection, ray casting and the key controller
//! - `config`: runtime settings with environment overrides
//! - `context`: wgpu renderer (feature `gpu`)
//! - `data_structures`: scene graph, geometry, materials, textures, transforms
//! - `flow`: the running state of a scene and its tick
//! - `input`: held keys and pointer snapshot
//! - `pick`: ray picking and material cycling on click
//! - `pipelines`: render pipelines and shaders (feature `gpu`)
//! - `render`: renderer seam and flattened draw lists
//! - `resources`: file-backed asset source and glTF/texture loaders
//! - `scene`: declarative scene descriptors
//! - `scenes`: the ready-made playground scenes
//!

pub mod animation;
pub mod app;
pub mod attachment;
pub mod camera;
pub mod config;
#[cfg(feature = "gpu")]
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod input;
pub mod pick;
#[cfg(feature = "gpu")]
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod scenes;

// Re-exports commonly used types for convenience in downstream code.
pub use winit::dpi::PhysicalPosition;
pub use winit::keyboard::KeyCode;
