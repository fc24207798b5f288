//! Renderer seam and draw list composition.
//!
//! This module defines the [`Renderer`] trait the scene runtime draws
//! through, and [`Frame`], a flattened view of a scene graph that renderers
//! can consume without walking the tree themselves.
//!
//! # Key types
//!
//! - [`Renderer`] draws a scene graph through a camera onto some surface
//! - [`Frame`] collects every mesh and light of a graph with world transforms
//! - [`DrawItem`] is one mesh to draw, with its resolved material colour
//! - [`LightItem`] is one light with its world position

use cgmath::{Matrix4, Point3, Transform};

use crate::{
    camera::CameraView,
    data_structures::{
        material::Material,
        mesh::Geometry,
        scene_graph::{Fog, LightKind, NodeId, NodeKind, SceneGraph},
    },
};

/// Draws a scene graph from a given camera onto a display surface.
pub trait Renderer {
    /// Draws one frame. Errors are reported to the caller, which logs them
    /// and keeps going.
    fn render(&mut self, graph: &SceneGraph, camera: &CameraView) -> anyhow::Result<()>;

    /// Called when the display surface changed size (physical pixels).
    fn resize(&mut self, width: u32, height: u32);

    /// Current surface size in physical pixels.
    fn viewport(&self) -> (u32, u32);
}

/// A mesh to draw.
#[derive(Clone, Debug)]
pub struct DrawItem<'a> {
    pub node: NodeId,
    pub world: Matrix4<f32>,
    pub geometry: &'a Geometry,
    pub material: &'a Material,
    /// Material colour, tinted by the mean colour of its texture once loaded.
    pub colour: [f32; 3],
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightItem {
    pub node: NodeId,
    pub kind: LightKind,
    pub colour: [f32; 3],
    pub intensity: f32,
    pub position: Point3<f32>,
}

/// Everything visible in a scene graph, flattened.
#[derive(Clone, Debug)]
pub struct Frame<'a> {
    pub items: Vec<DrawItem<'a>>,
    pub lights: Vec<LightItem>,
    pub background: [f32; 3],
    pub fog: Option<Fog>,
}

impl<'a> Frame<'a> {
    pub fn collect(graph: &'a SceneGraph) -> Self {
        let mut items = Vec::new();
        let mut lights = Vec::new();
        graph.walk(&mut |node, world| match &node.kind {
            NodeKind::Mesh { geometry, material } => {
                let Some(material) = graph.material(*material) else {
                    log::warn!("{} refers to a missing material, skipping it.", node.name);
                    return;
                };
                items.push(DrawItem {
                    node: node.id(),
                    world: *world,
                    geometry,
                    material,
                    colour: resolve_colour(graph, material),
                    cast_shadow: node.cast_shadow,
                    receive_shadow: node.receive_shadow,
                });
            }
            NodeKind::Light(light) => lights.push(LightItem {
                node: node.id(),
                kind: light.kind,
                colour: light.colour,
                intensity: light.intensity,
                position: world.transform_point(Point3::new(0.0, 0.0, 0.0)),
            }),
            NodeKind::Group => {}
        });
        Self {
            items,
            lights,
            background: graph.background,
            fog: graph.fog,
        }
    }

    /// Sum of all ambient light contributions.
    pub fn ambient(&self) -> [f32; 3] {
        self.lights
            .iter()
            .filter(|light| light.kind == LightKind::Ambient)
            .fold([0.0; 3], |acc, light| {
                [
                    acc[0] + light.colour[0] * light.intensity,
                    acc[1] + light.colour[1] * light.intensity,
                    acc[2] + light.colour[2] * light.intensity,
                ]
            })
    }

    /// The first directional light, if any.
    pub fn sun(&self) -> Option<&LightItem> {
        self.lights
            .iter()
            .find(|light| light.kind == LightKind::Directional)
    }
}

fn resolve_colour(graph: &SceneGraph, material: &Material) -> [f32; 3] {
    let tint = material
        .texture
        .as_deref()
        .and_then(|name| graph.texture(name))
        .map(|texture| texture.mean_colour())
        .unwrap_or([1.0; 3]);
    [
        material.colour[0] * tint[0],
        material.colour[1] * tint[1],
        material.colour[2] * tint[2],
    ]
}
