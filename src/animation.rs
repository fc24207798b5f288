//! Scene clock and ambient animations.
//!
//! Ambient animations are small, stateless functions of the clock that run
//! once per tick before the camera moves: a light circling the scene, a
//! pulsing light intensity, an attachment spinning in place. Each names its
//! target either directly or through an asset attachment; while the target
//! cannot be resolved (still loading, failed) the animation does nothing.

use instant::Duration;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3};

use crate::{
    attachment::{AttachmentId, Attachments},
    data_structures::scene_graph::{NodeId, SceneGraph},
};

/// How the clock advances per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Timing {
    /// A fixed increment per tick. Animation speed follows the display's
    /// refresh rate.
    #[default]
    FixedStep,
    /// The increment is scaled by the frame duration so that animation speed
    /// matches `FixedStep` at `reference_hz` regardless of the refresh rate.
    Scaled { reference_hz: f32 },
}

/// Monotonic animation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    elapsed: f32,
    step: f32,
    timing: Timing,
}

impl Clock {
    pub fn new(step: f32, timing: Timing) -> Self {
        Self {
            elapsed: 0.0,
            step: step.max(0.0),
            timing,
        }
    }

    /// Advances by one tick that took `dt`. Returns the increment.
    pub fn advance(&mut self, dt: Duration) -> f32 {
        let increment = match self.timing {
            Timing::FixedStep => self.step,
            Timing::Scaled { reference_hz } => self.step * dt.as_secs_f32() * reference_hz,
        };
        self.elapsed += increment;
        increment
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }
}

/// What an animation moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationTarget {
    Node(NodeId),
    /// The root of a loaded asset. Unresolved until the asset is loaded.
    Attachment(AttachmentId),
}

impl AnimationTarget {
    pub fn resolve(&self, graph: &SceneGraph, attachments: &Attachments) -> Option<NodeId> {
        let node = match self {
            AnimationTarget::Node(node) => *node,
            AnimationTarget::Attachment(id) => attachments.loaded_node(*id)?,
        };
        graph.contains(node).then_some(node)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AmbientAnimation {
    /// Moves the target on a horizontal circle around the vertical axis:
    /// `x = r sin(t * speed)`, `z = r cos(t * speed)`. Height is untouched.
    OrbitLight {
        target: AnimationTarget,
        radius: f32,
        speed: f32,
    },
    /// Sets the intensity of a light node to
    /// `floor + amplitude * (0.5 + 0.5 sin(t * frequency))`.
    Pulse {
        target: AnimationTarget,
        floor: f32,
        amplitude: f32,
        frequency: f32,
    },
    /// Rotates the target about its vertical axis by `speed` radians per
    /// unit of clock time.
    Spin { target: AnimationTarget, speed: f32 },
}

impl AmbientAnimation {
    pub fn target(&self) -> AnimationTarget {
        match self {
            AmbientAnimation::OrbitLight { target, .. }
            | AmbientAnimation::Pulse { target, .. }
            | AmbientAnimation::Spin { target, .. } => *target,
        }
    }

    /// Applies one tick. Returns `false` if the target is unresolved or of
    /// the wrong kind, in which case nothing changed.
    pub fn apply(
        &self,
        clock: &Clock,
        increment: f32,
        graph: &mut SceneGraph,
        attachments: &Attachments,
    ) -> bool {
        let Some(id) = self.target().resolve(graph, attachments) else {
            return false;
        };
        let Some(node) = graph.node_mut(id) else {
            return false;
        };
        let t = clock.elapsed();
        match *self {
            AmbientAnimation::OrbitLight { radius, speed, .. } => {
                node.transform.position.x = radius * (t * speed).sin();
                node.transform.position.z = radius * (t * speed).cos();
                true
            }
            AmbientAnimation::Pulse {
                floor,
                amplitude,
                frequency,
                ..
            } => match node.light_mut() {
                Some(light) => {
                    light.intensity = floor + amplitude * (0.5 + 0.5 * (t * frequency).sin());
                    true
                }
                None => false,
            },
            AmbientAnimation::Spin { speed, .. } => {
                let turn = Quaternion::from_angle_y(Rad(speed * increment));
                node.transform.rotation = (turn * node.transform.rotation).normalize();
                true
            }
        }
    }
}
