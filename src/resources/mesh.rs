//! Conversion of glTF nodes into scene nodes.

use std::sync::Arc;

use cgmath::Quaternion;

use crate::data_structures::{
    instance::Instance,
    material::MaterialId,
    mesh::{Geometry, MeshData},
    scene_graph::Node,
};

/// Converts a glTF node and its descendants.
///
/// Material ids refer to the model's own material list, in glTF order;
/// primitives without a material get `fallback`.
pub fn to_model_node(node: gltf::scene::Node, buffers: &[Vec<u8>], fallback: MaterialId) -> Node {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.index()));
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Instance {
        position: translation.into(),
        // glTF stores quaternions as [x, y, z, w]
        rotation: Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let mut scene_node = Node::group(name.as_str()).with_transform(transform);

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping primitive {} of {}: only triangle lists are supported, got {:?}.",
                    primitive.index(),
                    name,
                    primitive.mode()
                );
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(positions) => positions.collect(),
                None => continue,
            };
            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|normals| normals.collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };
            let material = primitive
                .material()
                .index()
                .map(MaterialId)
                .unwrap_or(fallback);
            let data = MeshData::new(positions, normals, indices);
            scene_node.add_child(
                Node::mesh(
                    format!("{} #{}", name, primitive.index()),
                    Geometry::Mesh(Arc::new(data)),
                    material,
                )
                .with_shadows(true, false),
            );
        }
    }

    for child in node.children() {
        scene_node.add_child(to_model_node(child, buffers, fallback));
    }
    scene_node
}
