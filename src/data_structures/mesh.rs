//! Geometry of drawable nodes.
//!
//! Procedural primitives (plane, box, cone) are described by their
//! dimensions and tessellated on demand; loaded models carry their triangle
//! data in a shared [`MeshData`]. Every geometry reports a local
//! axis-aligned bounding box, and rays are tested against its triangles with
//! the box as a cheap reject.

use std::{f32::consts::PI, sync::Arc};

use cgmath::{InnerSpace, Point3, Vector3};

/// Planes are infinitely thin; give their bounds a sliver of depth so that
/// slab tests stay well defined for rays parallel to the plane's normal axis.
const PLANE_HALF_DEPTH: f32 = 1.0e-4;

/// An axis-aligned bounding box in some local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Box of the given extents centred on the origin.
    pub fn centred(width: f32, height: f32, depth: f32) -> Self {
        let (hw, hh, hd) = (width * 0.5, height * 0.5, depth * 0.5);
        Self::new(Point3::new(-hw, -hh, -hd), Point3::new(hw, hh, hd))
    }

    /// Smallest box around `points`, `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = Point3::from(*points.next()?);
        let bounds = points.fold(Self::new(first, first), |bounds, p| Self {
            min: Point3::new(
                bounds.min.x.min(p[0]),
                bounds.min.y.min(p[1]),
                bounds.min.z.min(p[2]),
            ),
            max: Point3::new(
                bounds.max.x.max(p[0]),
                bounds.max.y.max(p[1]),
                bounds.max.z.max(p[2]),
            ),
        });
        Some(bounds)
    }

    /// Slab test. Returns the ray parameter of the entry point (or `0.0` when
    /// the origin is inside), `None` on a miss or when the box lies behind.
    pub fn intersect(&self, origin: Point3<f32>, direction: Vector3<f32>) -> Option<f32> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (t0, t1) = ((lo - o) / d, (hi - o) / d);
            let (t0, t1) = if t0 > t1 { (t1, t0) } else { (t0, t1) };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}

/// Triangle data of a loaded or tessellated mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    bounds: Aabb,
}

impl MeshData {
    /// Missing normals are filled with face normals accumulated per vertex.
    pub fn new(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let bounds = Aabb::from_points(&positions)
            .unwrap_or_else(|| Aabb::centred(0.0, 0.0, 0.0));
        let normals = if normals.len() == positions.len() {
            normals
        } else {
            accumulate_normals(&positions, &indices)
        };
        Self {
            positions,
            normals,
            indices,
            bounds,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Ray parameter of the nearest triangle hit. Both faces count.
    pub fn intersect(&self, origin: Point3<f32>, direction: Vector3<f32>) -> Option<f32> {
        self.bounds.intersect(origin, direction)?;
        self.indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = self.positions.get(tri[0] as usize)?;
                let b = self.positions.get(tri[1] as usize)?;
                let c = self.positions.get(tri[2] as usize)?;
                ray_triangle(origin, direction, [a, b, c].map(|p| Point3::from(*p)))
            })
            .min_by(f32::total_cmp)
    }
}

/// Barycentric slack so rays through shared edges and vertices still hit.
const EDGE_TOLERANCE: f32 = 1.0e-5;

/// Möller-Trumbore.
fn ray_triangle(origin: Point3<f32>, direction: Vector3<f32>, [a, b, c]: [Point3<f32>; 3]) -> Option<f32> {
    let (e1, e2) = (b - a, c - a);
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() <= f32::EPSILON * e1.magnitude() * e2.magnitude() * direction.magnitude() {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - a;
    let u = s.dot(p) * inv;
    if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = direction.dot(q) * inv;
    if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t >= 0.0).then_some(t)
}

fn accumulate_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vector3::from(positions[a]),
            Vector3::from(positions[b]),
            Vector3::from(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > 0.0 {
                n.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

/// What a mesh node draws.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    /// A rectangle in the local XY plane, facing +Z.
    Plane { width: f32, height: f32 },
    Box { width: f32, height: f32, depth: f32 },
    /// A cone (or pyramid for few segments) standing on its base, apex up.
    Cone { radius: f32, height: f32, segments: u32 },
    Mesh(Arc<MeshData>),
}

impl Geometry {
    pub fn bounds(&self) -> Aabb {
        match self {
            Geometry::Plane { width, height } => {
                let mut bounds = Aabb::centred(*width, *height, 0.0);
                bounds.min.z = -PLANE_HALF_DEPTH;
                bounds.max.z = PLANE_HALF_DEPTH;
                bounds
            }
            Geometry::Box {
                width,
                height,
                depth,
            } => Aabb::centred(*width, *height, *depth),
            Geometry::Cone { radius, height, .. } => {
                Aabb::centred(radius * 2.0, *height, radius * 2.0)
            }
            Geometry::Mesh(mesh) => mesh.bounds(),
        }
    }

    /// Ray parameter of the nearest surface hit in local space.
    pub fn intersect(&self, origin: Point3<f32>, direction: Vector3<f32>) -> Option<f32> {
        match self {
            Geometry::Mesh(mesh) => mesh.intersect(origin, direction),
            other => {
                other.bounds().intersect(origin, direction)?;
                other.tessellate().intersect(origin, direction)
            }
        }
    }

    /// Triangles of this geometry in local space.
    pub fn tessellate(&self) -> MeshData {
        match self {
            Geometry::Plane { width, height } => plane(*width, *height),
            Geometry::Box {
                width,
                height,
                depth,
            } => cuboid(*width, *height, *depth),
            Geometry::Cone {
                radius,
                height,
                segments,
            } => cone(*radius, *height, (*segments).max(3)),
            Geometry::Mesh(mesh) => mesh.as_ref().clone(),
        }
    }
}

fn plane(width: f32, height: f32) -> MeshData {
    let (hw, hh) = (width * 0.5, height * 0.5);
    MeshData::new(
        vec![[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
        vec![[0.0, 0.0, 1.0]; 4],
        vec![0, 1, 2, 0, 2, 3],
    )
}

fn cuboid(width: f32, height: f32, depth: f32) -> MeshData {
    let (hw, hh, hd) = (width * 0.5, height * 0.5, depth * 0.5);
    // (normal, u axis, v axis) per face, each scaled to the half extents
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -hd], [0.0, hh, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, hd], [0.0, hh, 0.0]),
        ([0.0, 1.0, 0.0], [hw, 0.0, 0.0], [0.0, 0.0, -hd]),
        ([0.0, -1.0, 0.0], [hw, 0.0, 0.0], [0.0, 0.0, hd]),
        ([0.0, 0.0, 1.0], [hw, 0.0, 0.0], [0.0, hh, 0.0]),
        ([0.0, 0.0, -1.0], [-hw, 0.0, 0.0], [0.0, hh, 0.0]),
    ];
    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let centre = Vector3::new(normal[0] * hw, normal[1] * hh, normal[2] * hd);
        let (u, v) = (Vector3::from(u), Vector3::from(v));
        let base = positions.len() as u32;
        for corner in [centre - u - v, centre + u - v, centre + u + v, centre - u + v] {
            positions.push(corner.into());
            normals.push(normal);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    MeshData::new(positions, normals, indices)
}

fn cone(radius: f32, height: f32, segments: u32) -> MeshData {
    let half = height * 0.5;
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let rim = |i: u32| {
        let angle = i as f32 / segments as f32 * 2.0 * PI;
        [radius * angle.sin(), -half, radius * angle.cos()]
    };
    // sides: one triangle per segment with its own apex so normals stay flat
    for i in 0..segments {
        let base = positions.len() as u32;
        positions.extend_from_slice(&[rim(i), rim(i + 1), [0.0, half, 0.0]]);
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    // base cap, facing down
    let centre = positions.len() as u32;
    positions.push([0.0, -half, 0.0]);
    for i in 0..segments {
        let base = positions.len() as u32;
        positions.extend_from_slice(&[rim(i), rim(i + 1)]);
        indices.extend_from_slice(&[centre, base + 1, base]);
    }
    MeshData::new(positions, Vec::new(), indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_through_centre_enters_front_face() {
        let bounds = Aabb::centred(1.0, 1.0, 1.0);
        let t = bounds.intersect(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(t, Some(4.5));
    }

    #[test]
    fn ray_pointing_away_misses() {
        let bounds = Aabb::centred(1.0, 1.0, 1.0);
        let t = bounds.intersect(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(t, None);
    }

    #[test]
    fn plane_bounds_have_thickness() {
        let bounds = Geometry::Plane {
            width: 2.0,
            height: 2.0,
        }
        .bounds();
        assert!(bounds.max.z > bounds.min.z);
        let t = bounds.intersect(Point3::new(0.5, 0.5, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(t.is_some());
    }

    #[test]
    fn triangle_hits_count_edges_and_both_faces() {
        let plane = Geometry::Plane {
            width: 2.0,
            height: 2.0,
        };
        // the shared diagonal of the two triangles
        let front = plane.intersect(Point3::new(0.0, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0));
        assert!((front.unwrap() - 3.0).abs() < 1.0e-5);
        let back = plane.intersect(Point3::new(0.5, -0.5, -2.0), Vector3::new(0.0, 0.0, 1.0));
        assert!((back.unwrap() - 2.0).abs() < 1.0e-5);
        assert_eq!(
            plane.intersect(Point3::new(1.5, 0.0, 3.0), Vector3::new(0.0, 0.0, -1.0)),
            None
        );
    }

    #[test]
    fn empty_space_inside_the_bounds_is_not_a_hit() {
        let pyramid = Geometry::Cone {
            radius: 4.0,
            height: 2.0,
            segments: 4,
        };
        // the rim corners sit on the axes, so the bounds corner is empty air
        let corner = (Point3::new(3.5, 5.0, 3.5), Vector3::new(0.0, -1.0, 0.0));
        assert!(pyramid.bounds().intersect(corner.0, corner.1).is_some());
        assert_eq!(pyramid.intersect(corner.0, corner.1), None);

        // the apex is 1 above the centre, the ray starts at 5
        let apex = pyramid.intersect(Point3::new(0.0, 5.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        assert!((apex.unwrap() - 4.0).abs() < 1.0e-4);
        // halfway out along a face the slope is at height 0
        let slope = pyramid.intersect(Point3::new(1.0, 5.0, 1.0), Vector3::new(0.0, -1.0, 0.0));
        assert!((slope.unwrap() - 5.0).abs() < 1.0e-4);
    }

    #[test]
    fn tessellated_primitives_are_indexed_triangles() {
        for geometry in [
            Geometry::Plane {
                width: 50.0,
                height: 5.0,
            },
            Geometry::Box {
                width: 5.0,
                height: 6.0,
                depth: 5.0,
            },
            Geometry::Cone {
                radius: 4.0,
                height: 2.0,
                segments: 4,
            },
        ] {
            let mesh = geometry.tessellate();
            assert_eq!(mesh.indices.len() % 3, 0);
            assert_eq!(mesh.normals.len(), mesh.positions.len());
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
        }
    }
}
