//! Scene data structures: nodes, geometry, materials, textures and transforms.
//!
//! This module contains the core data types for scene representation:
//!
//! - `instance` holds per-node transformation data
//! - `mesh` contains procedural and loaded geometry with bounding boxes
//! - `material` contains materials, material cycles and pickable targets
//! - `texture` contains decoded texture images
//! - `scene_graph` enables hierarchical scene organization

pub mod instance;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
