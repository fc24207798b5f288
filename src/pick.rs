//! Object picking and cyclic material selection.
//!
//! Picking works as follows:
//! 1. Normalize the pointer position to device coordinates
//! 2. Cast a ray from the camera eye through that point
//! 3. Ask a [`RayIntersector`] for the nearest hit among every registered target's nodes
//! 4. Advance the cycle of the target owning the hit node and apply it to all of its members
//!
//! Misses change nothing. Picking never moves the camera.

use cgmath::{Matrix4, SquareMatrix, Transform, Vector2};
use winit::dpi::PhysicalPosition;

use crate::{
    camera::{OrbitCamera, Projection, Ray},
    data_structures::{
        material::{MaterialId, PickableTarget},
        scene_graph::{Node, NodeId, NodeKind, SceneGraph},
    },
};

/// Nearest intersection reported by a [`RayIntersector`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// The candidate that was hit (not the descendant whose geometry was hit).
    pub node: NodeId,
    /// World space distance from the ray origin.
    pub distance: f32,
}

/// Finds the nearest node hit by a ray.
///
/// A hit on any descendant of a candidate is reported as a hit on that
/// candidate, so groups (e.g. a building made of walls and a roof) can be
/// registered as a single node.
pub trait RayIntersector {
    fn intersect(&self, ray: &Ray, graph: &SceneGraph, candidates: &[NodeId]) -> Option<Hit>;
}

/// Tests rays against the triangles of mesh geometry.
///
/// Each mesh is tested in its own space with its bounding box as a quick
/// reject, so rotated and scaled nodes need no re-tessellation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TriangleIntersector;

impl TriangleIntersector {
    fn nearest_in(node: &Node, world: &Matrix4<f32>, ray: &Ray) -> Option<f32> {
        let mut nearest = match &node.kind {
            NodeKind::Mesh { geometry, .. } => world.invert().and_then(|inverse| {
                let origin = inverse.transform_point(ray.origin);
                let direction = inverse.transform_vector(ray.direction);
                // affine maps keep the ray parameter, and `ray.direction` is
                // unit length, so `t` is already a world distance
                geometry.intersect(origin, direction)
            }),
            _ => None,
        };
        for child in node.children() {
            let child_world = world * child.transform.to_matrix();
            if let Some(t) = Self::nearest_in(child, &child_world, ray) {
                nearest = Some(nearest.map_or(t, |best: f32| best.min(t)));
            }
        }
        nearest
    }
}

impl RayIntersector for TriangleIntersector {
    fn intersect(&self, ray: &Ray, graph: &SceneGraph, candidates: &[NodeId]) -> Option<Hit> {
        candidates
            .iter()
            .filter_map(|&id| {
                let node = graph.node(id)?;
                let world = graph.world_transform(id)?;
                Self::nearest_in(node, &world, ray).map(|distance| Hit { node: id, distance })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Result of a successful pick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pick {
    /// Index of the target as returned by [`PickingController::register`].
    pub target: usize,
    pub node: NodeId,
    pub distance: f32,
    /// Material now shown on the target's members.
    pub material: MaterialId,
}

/// Converts a pointer position in physical pixels to normalized device
/// coordinates (`x` grows right, `y` grows up).
///
/// Returns `None` for an empty viewport.
pub fn normalize(position: PhysicalPosition<f64>, width: u32, height: u32) -> Option<Vector2<f32>> {
    if width == 0 || height == 0 {
        return None;
    }
    let x = position.x / f64::from(width) * 2.0 - 1.0;
    let y = -(position.y / f64::from(height)) * 2.0 + 1.0;
    Some(Vector2::new(x as f32, y as f32))
}

/// Owns the pickable targets of a scene.
#[derive(Debug, Default)]
pub struct PickingController {
    targets: Vec<PickableTarget>,
}

impl PickingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, target: PickableTarget) -> usize {
        self.targets.push(target);
        self.targets.len() - 1
    }

    pub fn targets(&self) -> &[PickableTarget] {
        &self.targets
    }

    pub fn target(&self, index: usize) -> Option<&PickableTarget> {
        self.targets.get(index)
    }

    /// Pick through a point in normalized device coordinates.
    ///
    /// # Arguments
    ///
    /// * `ndc` is the point on screen, see [`normalize`]
    /// * `camera` and `projection` define the ray through that point
    /// * `graph` is the scene whose materials change on a hit
    /// * `intersector` answers the ray query
    ///
    /// # Returns
    ///
    /// The pick if a target was hit, `None` on a miss (nothing changed).
    pub fn pick_ndc(
        &mut self,
        ndc: Vector2<f32>,
        camera: &OrbitCamera,
        projection: &Projection,
        graph: &mut SceneGraph,
        intersector: &dyn RayIntersector,
    ) -> Option<Pick> {
        let ray = camera.cast_ray(ndc, projection);
        self.pick_ray(&ray, graph, intersector)
    }

    pub fn pick_ray(
        &mut self,
        ray: &Ray,
        graph: &mut SceneGraph,
        intersector: &dyn RayIntersector,
    ) -> Option<Pick> {
        let candidates: Vec<NodeId> = self
            .targets
            .iter()
            .flat_map(|target| target.hit_nodes())
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let Some(hit) = intersector.intersect(ray, graph, &candidates) else {
            log::debug!("Pick ray from {:?} hit nothing.", ray.origin);
            return None;
        };
        let Some(index) = self.targets.iter().position(|t| t.contains(hit.node)) else {
            log::warn!(
                "Intersector reported node {:?}, which is not a pick candidate.",
                hit.node
            );
            return None;
        };

        let target = &mut self.targets[index];
        let material = target.advance_and_apply(graph);
        log::info!(
            "Picked {} at distance {:.2}, now showing material {} of {}.",
            target.name,
            hit.distance,
            target.cycle.index() + 1,
            target.cycle.len()
        );
        Some(Pick {
            target: index,
            node: hit.node,
            distance: hit.distance,
            material,
        })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Point3, Vector3};

    use super::*;
    use crate::data_structures::{
        instance::Instance,
        material::{Material, MaterialCycle},
        mesh::Geometry,
    };

    fn unit_box() -> Geometry {
        Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        }
    }

    #[test]
    fn normalize_maps_corners_and_centre() {
        let centre = normalize(PhysicalPosition::new(400.0, 300.0), 800, 600).unwrap();
        assert_eq!(centre, Vector2::new(0.0, 0.0));
        let top_left = normalize(PhysicalPosition::new(0.0, 0.0), 800, 600).unwrap();
        assert_eq!(top_left, Vector2::new(-1.0, 1.0));
        let bottom_right = normalize(PhysicalPosition::new(800.0, 600.0), 800, 600).unwrap();
        assert_eq!(bottom_right, Vector2::new(1.0, -1.0));
        assert_eq!(normalize(PhysicalPosition::new(1.0, 1.0), 0, 600), None);
    }

    #[test]
    fn nearest_candidate_wins() {
        let mut graph = SceneGraph::new();
        let paint = graph.add_material(Material::new("paint", [1.0; 3]));
        let near = Node::mesh("near", unit_box(), paint).with_transform(Instance::at(0.0, 0.0, 2.0));
        let far = Node::mesh("far", unit_box(), paint).with_transform(Instance::at(0.0, 0.0, -2.0));
        let near = graph.attach(graph.root_id(), near).unwrap();
        let far = graph.attach(graph.root_id(), far).unwrap();

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = TriangleIntersector.intersect(&ray, &graph, &[far, near]).unwrap();
        assert_eq!(hit.node, near);
        assert!((hit.distance - 7.5).abs() < 1.0e-4);
    }

    #[test]
    fn descendants_count_as_their_candidate() {
        let mut graph = SceneGraph::new();
        let paint = graph.add_material(Material::new("paint", [1.0; 3]));
        let mut group = Node::group("model").with_transform(Instance::at(3.0, 0.0, 0.0));
        group.add_child(Node::mesh("part", unit_box(), paint));
        let group = graph.attach(graph.root_id(), group).unwrap();

        let ray = Ray::new(Point3::new(3.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(
            TriangleIntersector.intersect(&ray, &graph, &[group]).map(|hit| hit.node),
            Some(group)
        );
        let beside = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(TriangleIntersector.intersect(&beside, &graph, &[group]), None);
    }

    #[test]
    fn air_around_a_rotated_pyramid_is_not_a_hit() {
        let mut graph = SceneGraph::new();
        let paint = graph.add_material(Material::new("paint", [1.0; 3]));
        let pyramid = Geometry::Cone {
            radius: 4.0,
            height: 2.0,
            segments: 4,
        };
        let roof = Node::mesh("roof", pyramid, paint)
            .with_transform(Instance::at(2.0, 5.0, -1.0).with_euler(0.0, std::f32::consts::FRAC_PI_4, 0.0));
        let roof = graph.attach(graph.root_id(), roof).unwrap();

        // inside the rotated bounds, outside the square footprint
        let beside = Ray::new(Point3::new(6.9, 20.0, -1.0), Vector3::new(0.0, -1.0, 0.0));
        assert_eq!(TriangleIntersector.intersect(&beside, &graph, &[roof]), None);

        let onto = Ray::new(Point3::new(2.5, 20.0, -1.0), Vector3::new(0.0, -1.0, 0.0));
        let hit = TriangleIntersector.intersect(&onto, &graph, &[roof]).unwrap();
        assert!(hit.distance > 14.0 && hit.distance < 16.0);
    }

    #[test]
    fn scaled_nodes_report_world_distance() {
        let mut graph = SceneGraph::new();
        let paint = graph.add_material(Material::new("paint", [1.0; 3]));
        let node = Node::mesh("big", unit_box(), paint).with_transform(Instance::new().with_uniform_scale(4.0));
        let node = graph.attach(graph.root_id(), node).unwrap();

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = TriangleIntersector.intersect(&ray, &graph, &[node]).unwrap();
        assert!((hit.distance - 8.0).abs() < 1.0e-4);
    }

    fn cycling_box(graph: &mut SceneGraph) -> (PickingController, NodeId, [MaterialId; 2]) {
        let red = graph.add_material(Material::new("red", [1.0, 0.0, 0.0]));
        let blue = graph.add_material(Material::new("blue", [0.0, 0.0, 1.0]));
        let node = graph
            .attach(graph.root_id(), Node::mesh("box", unit_box(), red))
            .unwrap();
        let mut picking = PickingController::new();
        picking.register(PickableTarget::new(
            "box",
            vec![node],
            MaterialCycle::new(vec![red, blue]),
        ));
        (picking, node, [red, blue])
    }

    #[test]
    fn miss_changes_nothing() {
        let mut graph = SceneGraph::new();
        let (mut picking, node, [red, _]) = cycling_box(&mut graph);

        let ray = Ray::new(Point3::new(5.0, 5.0, 5.0), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(picking.pick_ray(&ray, &mut graph, &TriangleIntersector), None);
        assert_eq!(picking.target(0).unwrap().cycle.index(), 0);
        assert_eq!(graph.node(node).unwrap().material(), Some(red));
    }

    #[test]
    fn two_hits_round_trip() {
        let mut graph = SceneGraph::new();
        let (mut picking, node, [red, blue]) = cycling_box(&mut graph);
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));

        let first = picking.pick_ray(&ray, &mut graph, &TriangleIntersector).unwrap();
        assert_eq!(first.material, blue);
        assert_eq!(graph.node(node).unwrap().material(), Some(blue));

        let second = picking.pick_ray(&ray, &mut graph, &TriangleIntersector).unwrap();
        assert_eq!(second.material, red);
        assert_eq!(picking.target(0).unwrap().cycle.index(), 0);
        assert_eq!(graph.node(node).unwrap().material(), Some(red));
    }
}
