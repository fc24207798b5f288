//! Orbit camera, projection and pointer rays.
//!
//! The camera is described by two angles on a sphere of fixed radius around
//! a fixed target. Its position is derived from the angles every time it is
//! needed and never stored, so it cannot drift.
//!
//! # Key types
//!
//! - [`OrbitCamera`] is the angular camera state
//! - [`OrbitCameraController`] turns held keys into angle changes each tick
//! - [`Projection`] is the perspective projection, resized with the viewport
//! - [`CameraView`] is the per-frame snapshot handed to renderers
//! - [`Ray`] is a pointer ray cast through the camera

use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector2, Vector3, Vector4};
use winit::keyboard::KeyCode;

use crate::input::InputState;

/// A half-line in world space. `direction` is normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    pub fn at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.direction * distance
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    /// Zero sized viewports (minimized windows) keep the previous aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// OpenGL-style clip space (depth in `-1..=1`).
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Angular camera state orbiting a fixed target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    /// Angle around the vertical axis, radians. Unbounded.
    pub horizontal: f32,
    /// Elevation angle, radians. Unbounded.
    pub vertical: f32,
    radius: f32,
    target: Point3<f32>,
    min_height: f32,
}

impl OrbitCamera {
    pub fn new(radius: f32, target: Point3<f32>, min_height: f32) -> Self {
        Self {
            horizontal: 0.0,
            vertical: 0.0,
            radius,
            target,
            min_height,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    /// `(t.x + R sin h, max(t.y + R sin v, min_height), t.z + R cos h)`.
    pub fn position(&self) -> Point3<f32> {
        Point3::new(
            self.target.x + self.radius * self.horizontal.sin(),
            (self.target.y + self.radius * self.vertical.sin()).max(self.min_height),
            self.target.z + self.radius * self.horizontal.cos(),
        )
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }

    pub fn view(&self, projection: &Projection) -> CameraView {
        CameraView {
            eye: self.position(),
            target: self.target,
            view: self.view_matrix(),
            projection: projection.calc_matrix(),
        }
    }

    /// Ray from the eye through a point given in normalized device
    /// coordinates (`x` left to right, `y` bottom to top, both in `-1..=1`).
    pub fn cast_ray(&self, ndc: Vector2<f32>, projection: &Projection) -> Ray {
        let eye = self.position();
        let inverse = (projection.calc_matrix() * self.view_matrix())
            .invert()
            .unwrap_or_else(Matrix4::identity);
        let on_near_plane = inverse * Vector4::new(ndc.x, ndc.y, -1.0, 1.0);
        let on_near_plane = Point3::from_homogeneous(on_near_plane);
        let direction = on_near_plane - eye;
        if direction.magnitude2() <= f32::EPSILON {
            return Ray::new(eye, self.target - eye);
        }
        Ray::new(eye, direction)
    }
}

/// Everything a renderer needs to know about the camera for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,
}

impl CameraView {
    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    pub fn eye_vector(&self) -> Vector3<f32> {
        self.eye.to_vec()
    }
}

/// Keys steering the orbit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            left: KeyCode::ArrowLeft,
            right: KeyCode::ArrowRight,
            up: KeyCode::ArrowUp,
            down: KeyCode::ArrowDown,
        }
    }
}

/// Moves an [`OrbitCamera`] by a fixed angle per tick for every held key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCameraController {
    step: f32,
    bindings: KeyBindings,
}

impl OrbitCameraController {
    pub fn new(step: f32) -> Self {
        Self {
            step,
            bindings: KeyBindings::default(),
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Applies one tick of movement. Opposing keys are both applied and
    /// cancel out. Returns whether any steering key was held.
    pub fn update(&self, camera: &mut OrbitCamera, input: &InputState) -> bool {
        let mut moving = false;
        if input.is_held(self.bindings.left) {
            camera.horizontal -= self.step;
            moving = true;
        }
        if input.is_held(self.bindings.right) {
            camera.horizontal += self.step;
            moving = true;
        }
        if input.is_held(self.bindings.up) {
            camera.vertical += self.step;
            moving = true;
        }
        if input.is_held(self.bindings.down) {
            camera.vertical -= self.step;
            moving = true;
        }
        moving
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: f32 = 0.02;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0e-5
    }

    #[test]
    fn held_key_moves_angle_by_k_steps() {
        let controller = OrbitCameraController::new(STEP);
        let mut camera = OrbitCamera::new(20.0, Point3::new(0.0, 0.0, 0.0), 2.0);
        let mut input = InputState::new();
        input.press(KeyCode::ArrowRight);

        let mut expected = 0.0f32;
        for _ in 0..25 {
            assert!(controller.update(&mut camera, &input));
            expected += STEP;
        }
        assert_eq!(camera.horizontal, expected);
        assert_eq!(camera.vertical, 0.0);

        let position = camera.position();
        assert_eq!(position.x, 20.0 * expected.sin());
        assert_eq!(position.z, 20.0 * expected.cos());
    }

    #[test]
    fn each_arrow_key_turns_its_angle_by_k_steps() {
        let controller = OrbitCameraController::new(STEP);
        let radius = 20.0;
        let target = Point3::new(1.0, 3.0, -2.0);
        // key, held ticks, expected (horizontal, vertical)
        let table = [
            (KeyCode::ArrowRight, 7, (7.0 * STEP, 0.0)),
            (KeyCode::ArrowLeft, 9, (-9.0 * STEP, 0.0)),
            (KeyCode::ArrowUp, 30, (0.0, 30.0 * STEP)),
            (KeyCode::ArrowDown, 4, (0.0, -4.0 * STEP)),
        ];
        for (key, ticks, (h, v)) in table {
            let mut camera = OrbitCamera::new(radius, target, 0.0);
            let mut input = InputState::new();
            input.press(key);
            for _ in 0..ticks {
                assert!(controller.update(&mut camera, &input));
            }
            assert!(close(camera.horizontal, h), "{key:?}: {}", camera.horizontal);
            assert!(close(camera.vertical, v), "{key:?}: {}", camera.vertical);

            // every case stays above the floor, so y follows the orbit
            let (h, v) = (camera.horizontal, camera.vertical);
            let position = camera.position();
            assert!(position.y > camera.min_height());
            assert!(close(position.x, target.x + radius * h.sin()), "{key:?}");
            assert!(close(position.y, target.y + radius * v.sin()), "{key:?}");
            assert!(close(position.z, target.z + radius * h.cos()), "{key:?}");
        }
    }

    #[test]
    fn opposing_keys_cancel() {
        let controller = OrbitCameraController::new(STEP);
        let mut camera = OrbitCamera::new(20.0, Point3::new(0.0, 0.0, 0.0), 2.0);
        let mut input = InputState::new();
        input.press(KeyCode::ArrowUp);
        input.press(KeyCode::ArrowDown);
        for _ in 0..10 {
            controller.update(&mut camera, &input);
        }
        assert_eq!(camera.vertical, 0.0);
    }

    #[test]
    fn idle_controller_reports_no_motion() {
        let controller = OrbitCameraController::new(STEP);
        let mut camera = OrbitCamera::new(20.0, Point3::new(0.0, 0.0, 0.0), 2.0);
        assert!(!controller.update(&mut camera, &InputState::new()));
    }

    #[test]
    fn height_never_drops_below_floor() {
        let mut camera = OrbitCamera::new(20.0, Point3::new(0.0, 0.0, 0.0), 2.0);
        for i in -400..400 {
            camera.vertical = i as f32 * 0.05;
            assert!(camera.position().y >= 2.0);
        }
        camera.vertical = std::f32::consts::FRAC_PI_2;
        assert!(close(camera.position().y, 20.0));
    }

    #[test]
    fn centre_ray_points_at_target() {
        let camera = OrbitCamera::new(5.0, Point3::new(0.0, 0.0, 0.0), 0.0);
        let projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
        let ray = camera.cast_ray(Vector2::new(0.0, 0.0), &projection);
        assert!(close(ray.origin.z, 5.0));
        assert!(close(ray.direction.x, 0.0));
        assert!(close(ray.direction.y, 0.0));
        assert!(close(ray.direction.z, -1.0));
    }

    #[test]
    fn right_edge_ray_leans_right() {
        let camera = OrbitCamera::new(5.0, Point3::new(0.0, 0.0, 0.0), 0.0);
        let projection = Projection::new(800, 600, cgmath::Deg(75.0), 0.1, 1000.0);
        let ray = camera.cast_ray(Vector2::new(1.0, 0.0), &projection);
        assert!(ray.direction.x > 0.0);
        let ray = camera.cast_ray(Vector2::new(0.0, 1.0), &projection);
        assert!(ray.direction.y > 0.0);
    }
}
