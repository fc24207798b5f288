//! Scene graph and hierarchical scene organization.
//!
//! A [`SceneGraph`] owns a tree of [`Node`]s rooted in a group node, the
//! material library the nodes refer to, and the textures loaded so far.
//! Children are owned by their parent: attaching moves a subtree into the
//! tree and dropping a node drops its subtree. There is no removal; the
//! observed scenes only ever grow.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

use cgmath::{Matrix4, SquareMatrix};
use log::warn;

use crate::data_structures::{
    instance::Instance,
    material::{Material, MaterialId},
    mesh::Geometry,
    texture::TextureData,
};

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a node. Unique for the lifetime of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    /// Uniform light from every direction. Position is irrelevant.
    Ambient,
    /// Parallel rays shining from the node's position towards the origin.
    Directional,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub colour: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh {
        geometry: Geometry,
        material: MaterialId,
    },
    Light(Light),
}

/// A positioned element of the scene tree.
///
/// Not `Clone`: ids must stay unique within a graph.
#[derive(Debug)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub transform: Instance,
    pub kind: NodeKind,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            transform: Instance::new(),
            kind,
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: MaterialId) -> Self {
        Self::new(name, NodeKind::Mesh { geometry, material })
    }

    pub fn light(name: impl Into<String>, light: Light) -> Self {
        Self::new(name, NodeKind::Light(light))
    }

    pub fn with_transform(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    /// Sets the shadow flags on this node and its whole subtree.
    pub fn set_shadows(&mut self, cast: bool, receive: bool) {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        for child in &mut self.children {
            child.set_shadows(cast, receive);
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn material(&self) -> Option<MaterialId> {
        match &self.kind {
            NodeKind::Mesh { material, .. } => Some(*material),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut Light> {
        match &mut self.kind {
            NodeKind::Light(light) => Some(light),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Depth-first walk over the subtree with each node's world matrix.
    pub fn walk<'g>(&'g self, parent: &Matrix4<f32>, visit: &mut dyn FnMut(&'g Node, &Matrix4<f32>)) {
        let world = parent * self.transform.to_matrix();
        visit(self, &world);
        for child in &self.children {
            child.walk(&world, visit);
        }
    }

    fn world_transform(&self, id: NodeId, parent: &Matrix4<f32>) -> Option<Matrix4<f32>> {
        let world = parent * self.transform.to_matrix();
        if self.id == id {
            return Some(world);
        }
        self.children
            .iter()
            .find_map(|child| child.world_transform(id, &world))
    }

    fn offset_materials(&mut self, offset: usize) {
        if let NodeKind::Mesh { material, .. } = &mut self.kind {
            material.0 += offset;
        }
        self.children
            .iter_mut()
            .for_each(|child| child.offset_materials(offset));
    }
}

/// Linear distance fog.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub colour: [f32; 3],
    pub near: f32,
    pub far: f32,
}

/// A subtree produced by a model loader together with the materials it
/// refers to. Material ids inside `root` index into `materials`; texture
/// names in `materials` refer to `textures`.
#[derive(Debug)]
pub struct LoadedModel {
    pub root: Node,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureData>,
}

pub struct SceneGraph {
    root: Node,
    materials: Vec<Material>,
    textures: HashMap<String, Arc<TextureData>>,
    pub background: [f32; 3],
    pub fog: Option<Fog>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            root: Node::group("root"),
            materials: Vec::new(),
            textures: HashMap::new(),
            background: [0.0, 0.0, 0.0],
            fog: None,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_id(&self) -> NodeId {
        self.root.id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Inserts `child` as the last child of `parent`.
    ///
    /// Returns the id of the attached child, `None` if `parent` is not part
    /// of this graph (the child is dropped).
    pub fn attach(&mut self, parent: NodeId, child: Node) -> Option<NodeId> {
        let Some(parent_node) = self.root.find_mut(parent) else {
            warn!(
                "You tried to attach {} to node {:?}, which is not part of the scene.",
                child.name, parent
            );
            return None;
        };
        let id = child.id;
        parent_node.add_child(child);
        Some(id)
    }

    /// Attaches a loaded model, merging its materials into the library and
    /// registering its textures.
    pub fn import(&mut self, parent: NodeId, model: LoadedModel) -> Option<NodeId> {
        if !self.contains(parent) {
            warn!(
                "You tried to import {} under node {:?}, which is not part of the scene.",
                model.root.name, parent
            );
            return None;
        }
        let LoadedModel {
            mut root,
            materials,
            textures,
        } = model;
        root.offset_materials(self.materials.len());
        self.materials.extend(materials);
        for texture in textures {
            self.add_texture(texture);
        }
        self.attach(parent, root)
    }

    /// Replaces the material of a mesh node. Returns `false` if the node does
    /// not exist or is not a mesh.
    pub fn set_material(&mut self, id: NodeId, material: MaterialId) -> bool {
        if material.0 >= self.materials.len() {
            warn!("Material {:?} is not part of the material library.", material);
            return false;
        }
        match self.root.find_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Mesh { material: slot, .. }) => {
                *slot = material;
                true
            }
            _ => false,
        }
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn add_texture(&mut self, texture: TextureData) {
        self.textures
            .insert(texture.name.clone(), Arc::new(texture));
    }

    pub fn texture(&self, name: &str) -> Option<&Arc<TextureData>> {
        self.textures.get(name)
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Matrix4<f32>> {
        self.root.world_transform(id, &Matrix4::identity())
    }

    pub fn walk<'g>(&'g self, visit: &mut dyn FnMut(&'g Node, &Matrix4<f32>)) {
        self.root.walk(&Matrix4::identity(), visit);
    }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize {
        self.root.subtree_len()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
