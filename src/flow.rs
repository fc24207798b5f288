//! Flow control: the running state of one scene.
//!
//! A [`SceneFlow`] owns everything a scene needs while it runs: the scene
//! graph, the orbit camera and its controller, the input snapshot, the
//! pickable targets, the asset attachments and the ambient animations.
//! Hosts feed it input events and call [`SceneFlow::tick`] once per display
//! frame.
//!
//! # Lifecycle Flow
//!
//! Each tick follows this pattern, strictly in order:
//! 1. Advance the clock
//! 2. Apply ambient animations (unresolved targets are skipped)
//! 3. Move the camera according to the held keys
//! 4. Render the scene graph through the camera
//!
//! Resolved asset loads are applied by [`SceneFlow::pump_assets`], which
//! hosts call between ticks. Input handlers and picking run whenever the
//! host receives the corresponding event.

use std::collections::HashMap;

use instant::Duration;
use winit::{dpi::PhysicalPosition, keyboard::KeyCode};

use crate::{
    animation::{AmbientAnimation, Clock},
    attachment::{AssetRequest, AttachmentId, Attachments},
    camera::{OrbitCamera, OrbitCameraController, Projection, Ray},
    config::Config,
    data_structures::scene_graph::{NodeId, SceneGraph},
    input::InputState,
    pick::{self, Pick, PickingController, RayIntersector},
    render::Renderer,
    resources::AssetSource,
    scene::SceneDescriptor,
};

pub struct SceneFlow {
    name: String,
    graph: SceneGraph,
    camera: OrbitCamera,
    projection: Projection,
    controller: OrbitCameraController,
    input: InputState,
    picking: PickingController,
    attachments: Attachments,
    animations: Vec<AmbientAnimation>,
    clock: Clock,
    source: Box<dyn AssetSource>,
    intersector: Box<dyn RayIntersector>,
    nodes: HashMap<String, NodeId>,
    assets: HashMap<String, AttachmentId>,
    ticks: u64,
}

impl SceneFlow {
    /// Builds the scene described by `descriptor` and starts its asset loads.
    ///
    /// # Arguments
    ///
    /// * `descriptor` is the initial content of the scene
    /// * `config` holds camera, clock and projection settings
    /// * `source` serves every asset request of this flow
    /// * `intersector` answers pick rays
    pub fn build(
        descriptor: &SceneDescriptor,
        config: &Config,
        source: Box<dyn AssetSource>,
        intersector: Box<dyn RayIntersector>,
    ) -> anyhow::Result<Self> {
        let built = descriptor.build(source.as_ref())?;
        Ok(Self {
            name: descriptor.name.clone(),
            graph: built.graph,
            camera: OrbitCamera::new(config.orbit_radius, config.look_at, config.min_height),
            projection: Projection::new(1, 1, config.fovy, config.znear, config.zfar),
            controller: OrbitCameraController::new(config.angle_step),
            input: InputState::new(),
            picking: built.picking,
            attachments: built.attachments,
            animations: built.animations,
            clock: Clock::new(config.clock_step, config.timing),
            source,
            intersector,
            nodes: built.nodes,
            assets: built.assets,
            ticks: 0,
        })
    }

    /// Runs one iteration of the animation loop. Render failures are logged
    /// and do not stop the loop.
    pub fn tick(&mut self, renderer: &mut dyn Renderer, dt: Duration) {
        let increment = self.clock.advance(dt);
        for animation in &self.animations {
            animation.apply(&self.clock, increment, &mut self.graph, &self.attachments);
        }
        if self.controller.update(&mut self.camera, &self.input) {
            log::debug!("{}: camera moved to {:?}", self.name, self.camera.position());
        }
        let view = self.camera.view(&self.projection);
        if let Err(e) = renderer.render(&self.graph, &view) {
            log::error!("Unable to render {}: {:#}", self.name, e);
        }
        self.ticks += 1;
    }

    /// Applies every asset load that resolved since the last call.
    pub fn pump_assets(&mut self) -> usize {
        self.attachments.pump(&mut self.graph)
    }

    /// Requests an additional asset while the scene runs.
    pub fn request(&mut self, request: AssetRequest) -> AttachmentId {
        self.attachments.request(self.source.as_ref(), request)
    }

    pub fn key_down(&mut self, key: KeyCode) {
        self.input.press(key);
    }

    pub fn key_up(&mut self, key: KeyCode) {
        self.input.release(key);
    }

    pub fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        self.input.move_pointer(position);
    }

    /// Picks at the last known pointer position.
    ///
    /// Returns `None` on a miss, when the pointer was never seen or when the
    /// viewport is empty.
    pub fn click(&mut self, viewport: (u32, u32)) -> Option<Pick> {
        let pointer = self.input.pointer()?;
        self.click_at(pointer, viewport)
    }

    pub fn click_at(&mut self, position: PhysicalPosition<f64>, viewport: (u32, u32)) -> Option<Pick> {
        let (width, height) = viewport;
        let ndc = pick::normalize(position, width, height)?;
        self.input.record_pick(ndc);
        let mut projection = self.projection;
        projection.resize(width, height);
        self.picking.pick_ndc(
            ndc,
            &self.camera,
            &projection,
            &mut self.graph,
            self.intersector.as_ref(),
        )
    }

    /// Picks along an arbitrary world-space ray.
    pub fn pick_ray(&mut self, ray: &Ray) -> Option<Pick> {
        self.picking
            .pick_ray(ray, &mut self.graph, self.intersector.as_ref())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn picking(&self) -> &PickingController {
        &self.picking
    }

    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Node created from the descriptor entry with this key.
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.nodes.get(key).copied()
    }

    /// Attachment created from the descriptor asset with this key.
    pub fn asset(&self, key: &str) -> Option<AttachmentId> {
        self.assets.get(key).copied()
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
