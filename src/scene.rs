//! Declarative scene descriptions.
//!
//! A [`SceneDescriptor`] lists everything a scene starts with: materials,
//! nodes, pickable targets, assets to load and ambient animations. Entries
//! refer to each other by string keys. [`SceneDescriptor::build`] turns the
//! description into a live [`BuiltScene`], rejecting dangling keys.

use std::collections::HashMap;

use anyhow::{Context, bail};

use crate::{
    animation::{AmbientAnimation, AnimationTarget},
    attachment::{AssetRequest, AttachmentId, Attachments},
    data_structures::{
        instance::Instance,
        material::{Material, MaterialCycle, MaterialId, PickableTarget},
        mesh::Geometry,
        scene_graph::{Fog, Light, Node, NodeId, SceneGraph},
    },
    pick::PickingController,
    resources::AssetSource,
};

#[derive(Clone, Debug, PartialEq)]
pub enum NodeSpecKind {
    Group,
    /// `material` is a material key.
    Mesh { geometry: Geometry, material: String },
    Light(Light),
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpec {
    pub key: String,
    /// Key of a previously listed node, the scene root if `None`.
    pub parent: Option<String>,
    pub kind: NodeSpecKind,
    pub transform: Instance,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl NodeSpec {
    fn new(key: impl Into<String>, kind: NodeSpecKind) -> Self {
        Self {
            key: key.into(),
            parent: None,
            kind,
            transform: Instance::new(),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn group(key: impl Into<String>) -> Self {
        Self::new(key, NodeSpecKind::Group)
    }

    pub fn mesh(key: impl Into<String>, geometry: Geometry, material: impl Into<String>) -> Self {
        Self::new(
            key,
            NodeSpecKind::Mesh {
                geometry,
                material: material.into(),
            },
        )
    }

    pub fn light(key: impl Into<String>, light: Light) -> Self {
        Self::new(key, NodeSpecKind::Light(light))
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn at(mut self, transform: Instance) -> Self {
        self.transform = transform;
        self
    }

    pub fn shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }
}

/// A pickable target by keys. `materials` is the cycle, in order.
#[derive(Clone, Debug, PartialEq)]
pub struct PickableSpec {
    pub name: String,
    pub members: Vec<String>,
    pub hit_only: Vec<String>,
    pub materials: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetSpec {
    pub key: String,
    pub request: AssetRequest,
    /// Node key the asset is attached below, the scene root if `None`.
    pub anchor: Option<String>,
}

impl AssetSpec {
    pub fn model(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            request: AssetRequest::model(path),
            anchor: None,
        }
    }

    pub fn at(mut self, transform: Instance) -> Self {
        self.request.transform = transform;
        self
    }

    pub fn shadows(mut self, cast: bool, receive: bool) -> Self {
        self.request.cast_shadow = cast;
        self.request.receive_shadow = receive;
        self
    }

    pub fn under(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TargetSpec {
    Node(String),
    Asset(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum AnimationSpec {
    OrbitLight {
        target: TargetSpec,
        radius: f32,
        speed: f32,
    },
    Pulse {
        target: TargetSpec,
        floor: f32,
        amplitude: f32,
        frequency: f32,
    },
    Spin {
        target: TargetSpec,
        speed: f32,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneDescriptor {
    pub name: String,
    pub background: [f32; 3],
    pub fog: Option<Fog>,
    pub materials: Vec<(String, Material)>,
    pub nodes: Vec<NodeSpec>,
    pub pickables: Vec<PickableSpec>,
    pub assets: Vec<AssetSpec>,
    /// Textures to load besides those named by materials.
    pub textures: Vec<String>,
    pub animations: Vec<AnimationSpec>,
}

/// The live state produced from a [`SceneDescriptor`].
pub struct BuiltScene {
    pub graph: SceneGraph,
    pub picking: PickingController,
    pub attachments: Attachments,
    pub animations: Vec<AmbientAnimation>,
    pub nodes: HashMap<String, NodeId>,
    pub assets: HashMap<String, AttachmentId>,
}

impl BuiltScene {
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    pub fn asset(&self, key: &str) -> Option<AttachmentId> {
        self.assets.get(key).copied()
    }
}

impl SceneDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Every texture this scene needs, material textures first, without
    /// duplicates.
    pub fn texture_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let named = self
            .materials
            .iter()
            .filter_map(|(_, material)| material.texture.clone());
        for path in named.chain(self.textures.iter().cloned()) {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Builds the scene and starts every asset load.
    ///
    /// # Arguments
    ///
    /// * `source` is where textures and models are requested from
    ///
    /// # Returns
    ///
    /// The built scene, or an error naming the first dangling or duplicate key.
    pub fn build(&self, source: &dyn AssetSource) -> anyhow::Result<BuiltScene> {
        let mut graph = SceneGraph::new();
        graph.background = self.background;
        graph.fog = self.fog;

        let mut materials: HashMap<&str, MaterialId> = HashMap::new();
        for (key, material) in &self.materials {
            if materials.contains_key(key.as_str()) {
                bail!("scene {}: material {} is defined twice", self.name, key);
            }
            materials.insert(key.as_str(), graph.add_material(material.clone()));
        }
        let material = |key: &str| {
            materials
                .get(key)
                .copied()
                .with_context(|| format!("scene {}: unknown material {}", self.name, key))
        };

        let mut nodes: HashMap<String, NodeId> = HashMap::new();
        for spec in &self.nodes {
            if nodes.contains_key(&spec.key) {
                bail!("scene {}: node {} is defined twice", self.name, spec.key);
            }
            let parent = match &spec.parent {
                None => graph.root_id(),
                Some(parent) => *nodes.get(parent).with_context(|| {
                    format!(
                        "scene {}: node {} names unknown parent {}",
                        self.name, spec.key, parent
                    )
                })?,
            };
            let node = match &spec.kind {
                NodeSpecKind::Group => Node::group(spec.key.as_str()),
                NodeSpecKind::Mesh {
                    geometry,
                    material: key,
                } => Node::mesh(spec.key.as_str(), geometry.clone(), material(key)?),
                NodeSpecKind::Light(light) => Node::light(spec.key.as_str(), light.clone()),
            }
            .with_transform(spec.transform.clone())
            .with_shadows(spec.cast_shadow, spec.receive_shadow);
            let id = graph
                .attach(parent, node)
                .with_context(|| format!("scene {}: could not attach {}", self.name, spec.key))?;
            nodes.insert(spec.key.clone(), id);
        }
        let node = |key: &String| {
            nodes
                .get(key)
                .copied()
                .with_context(|| format!("scene {}: unknown node {}", self.name, key))
        };

        let mut picking = PickingController::new();
        for spec in &self.pickables {
            if spec.materials.is_empty() {
                bail!("scene {}: pickable {} has no materials", self.name, spec.name);
            }
            let cycle = spec
                .materials
                .iter()
                .map(|key| material(key))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let members = spec.members.iter().map(node).collect::<anyhow::Result<Vec<_>>>()?;
            let hit_only = spec.hit_only.iter().map(node).collect::<anyhow::Result<Vec<_>>>()?;
            let target = PickableTarget::new(spec.name.as_str(), members, MaterialCycle::new(cycle))
                .with_hit_only(hit_only);
            target.apply(&mut graph);
            picking.register(target);
        }

        let mut attachments = Attachments::new();
        for path in self.texture_paths() {
            attachments.request(source, AssetRequest::texture(path));
        }
        let mut assets: HashMap<String, AttachmentId> = HashMap::new();
        for spec in &self.assets {
            if assets.contains_key(&spec.key) {
                bail!("scene {}: asset {} is defined twice", self.name, spec.key);
            }
            let mut request = spec.request.clone();
            if let Some(anchor) = &spec.anchor {
                request.anchor = Some(node(anchor)?);
            }
            assets.insert(spec.key.clone(), attachments.request(source, request));
        }

        let target = |spec: &TargetSpec| -> anyhow::Result<AnimationTarget> {
            match spec {
                TargetSpec::Node(key) => node(key).map(AnimationTarget::Node),
                TargetSpec::Asset(key) => assets
                    .get(key)
                    .copied()
                    .map(AnimationTarget::Attachment)
                    .with_context(|| format!("scene {}: unknown asset {}", self.name, key)),
            }
        };
        let animations = self
            .animations
            .iter()
            .map(|spec| -> anyhow::Result<AmbientAnimation> {
                Ok(match spec {
                    AnimationSpec::OrbitLight {
                        target: t,
                        radius,
                        speed,
                    } => AmbientAnimation::OrbitLight {
                        target: target(t)?,
                        radius: *radius,
                        speed: *speed,
                    },
                    AnimationSpec::Pulse {
                        target: t,
                        floor,
                        amplitude,
                        frequency,
                    } => AmbientAnimation::Pulse {
                        target: target(t)?,
                        floor: *floor,
                        amplitude: *amplitude,
                        frequency: *frequency,
                    },
                    AnimationSpec::Spin { target: t, speed } => AmbientAnimation::Spin {
                        target: target(t)?,
                        speed: *speed,
                    },
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        log::info!(
            "Built scene {} with {} nodes, {} pickable targets and {} pending assets.",
            self.name,
            graph.len(),
            picking.targets().len(),
            attachments.pending()
        );
        Ok(BuiltScene {
            graph,
            picking,
            attachments,
            animations,
            nodes,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use futures::{FutureExt, future::LocalBoxFuture};

    use super::*;
    use crate::resources::{AssetKind, Resource};

    /// Never resolves; everything stays pending.
    struct Stalled;

    impl AssetSource for Stalled {
        fn load(&self, _: &str, _: AssetKind) -> LocalBoxFuture<'static, anyhow::Result<Resource>> {
            futures::future::pending().boxed_local()
        }
    }

    fn boxed() -> Geometry {
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    fn two_colours() -> SceneDescriptor {
        let mut scene = SceneDescriptor::new("test");
        scene.materials = vec![
            ("red".into(), Material::new("red", [1.0, 0.0, 0.0])),
            (
                "blue".into(),
                Material::new("blue", [0.0, 0.0, 1.0]).with_texture("blue.png"),
            ),
        ];
        scene
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut scene = two_colours();
        scene.nodes.push(NodeSpec::mesh("box", boxed(), "red").under("nowhere"));
        let error = scene.build(&Stalled).err().unwrap();
        assert!(error.to_string().contains("nowhere"));
    }

    #[test]
    fn unknown_material_is_rejected() {
        let mut scene = two_colours();
        scene.nodes.push(NodeSpec::mesh("box", boxed(), "green"));
        assert!(scene.build(&Stalled).is_err());
    }

    #[test]
    fn pickables_start_on_their_first_material() {
        let mut scene = two_colours();
        scene.nodes.push(NodeSpec::group("building"));
        scene
            .nodes
            .push(NodeSpec::mesh("walls", boxed(), "red").under("building"));
        scene.pickables.push(PickableSpec {
            name: "building".into(),
            members: vec!["walls".into()],
            hit_only: Vec::new(),
            materials: vec!["blue".into(), "red".into()],
        });
        let built = scene.build(&Stalled).unwrap();
        let walls = built.node("walls").unwrap();
        assert_eq!(built.graph.node(walls).unwrap().material(), Some(MaterialId(1)));
        assert_eq!(built.picking.targets().len(), 1);
    }

    #[test]
    fn textures_are_requested_once() {
        let mut scene = two_colours();
        scene.textures = vec!["blue.png".into(), "extra.png".into()];
        assert_eq!(scene.texture_paths(), vec!["blue.png", "extra.png"]);
        let built = scene.build(&Stalled).unwrap();
        assert_eq!(built.attachments.len(), 2);
        assert_eq!(built.attachments.pending(), 2);
    }

    #[test]
    fn animations_may_target_assets() {
        let mut scene = two_colours();
        scene.assets.push(AssetSpec::model("merry", "model/merry/scene.gltf"));
        scene.animations.push(AnimationSpec::Spin {
            target: TargetSpec::Asset("merry".into()),
            speed: 1.0,
        });
        let built = scene.build(&Stalled).unwrap();
        let merry = built.asset("merry").unwrap();
        assert_eq!(
            built.animations[0].target(),
            AnimationTarget::Attachment(merry)
        );

        scene.animations.push(AnimationSpec::Spin {
            target: TargetSpec::Asset("swing".into()),
            speed: 1.0,
        });
        assert!(scene.build(&Stalled).is_err());
    }
}
