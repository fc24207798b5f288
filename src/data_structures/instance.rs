//! Local transforms of scene nodes.
//!
//! An [`Instance`] is the position, rotation and scale of a node relative to
//! its parent. World transforms are obtained by multiplying their matrices
//! down the tree.

use cgmath::{Euler, One, Rad};

/// Position, rotation (as quaternion) and scale of a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Create a new instance with identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: cgmath::Vector3::new(x, y, z),
            ..Self::new()
        }
    }

    /// Rotation from XYZ Euler angles in radians.
    pub fn with_euler(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Euler::new(Rad(x), Rad(y), Rad(z)).into();
        self
    }

    pub fn with_uniform_scale(mut self, factor: f32) -> Self {
        self.scale = cgmath::Vector3::new(factor, factor, factor);
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}
