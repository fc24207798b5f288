//! Window host.
//!
//! [`run`] opens a window, builds a [`SceneFlow`] from a descriptor and
//! drives it with winit events: keys and pointer movement update the input
//! snapshot, left clicks pick, and every redraw pumps finished asset loads
//! and runs one tick. The host owns the tokio runtime asset loads run on.

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::{
    config::Config,
    flow::SceneFlow,
    pick::TriangleIntersector,
    render::Renderer,
    resources::FileSource,
    scene::SceneDescriptor,
};

/// Creates the renderer once the window exists.
pub type RendererFactory<R> = Box<dyn FnOnce(Arc<Window>) -> anyhow::Result<R>>;

struct AppState<R> {
    window: Arc<Window>,
    renderer: R,
    flow: SceneFlow,
}

struct App<R: Renderer> {
    async_runtime: tokio::runtime::Runtime,
    descriptor: SceneDescriptor,
    config: Config,
    factory: Option<RendererFactory<R>>,
    state: Option<AppState<R>>,
    error: Option<anyhow::Error>,
    last_time: Instant,
}

impl<R: Renderer> App<R> {
    fn new(descriptor: SceneDescriptor, config: Config, factory: RendererFactory<R>) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            descriptor,
            config,
            factory: Some(factory),
            state: None,
            error: None,
            last_time: Instant::now(),
        })
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState<R>> {
        let Some(factory) = self.factory.take() else {
            anyhow::bail!("the renderer was already created");
        };
        let attributes = Window::default_attributes().with_title(self.config.title.as_str());
        let window = Arc::new(event_loop.create_window(attributes)?);
        let renderer = factory(window.clone())?;
        let source = FileSource::new(
            self.config.asset_root.clone(),
            self.async_runtime.handle().clone(),
        );
        let mut flow = SceneFlow::build(
            &self.descriptor,
            &self.config,
            Box::new(source),
            Box::new(TriangleIntersector),
        )?;
        let (width, height) = renderer.viewport();
        flow.resize(width, height);
        Ok(AppState {
            window,
            renderer,
            flow,
        })
    }
}

impl<R: Renderer> ApplicationHandler for App<R> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                state.window.request_redraw();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Could not start {}: {:#}", self.descriptor.name, e);
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                state.renderer.resize(size.width, size.height);
                state.flow.resize(size.width, size.height);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        ..
                    },
                ..
            } => match key_state {
                ElementState::Pressed => state.flow.key_down(code),
                ElementState::Released => state.flow.key_up(code),
            },
            WindowEvent::CursorMoved { position, .. } => state.flow.pointer_moved(position),
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                state.flow.click(state.renderer.viewport());
            }
            WindowEvent::RedrawRequested => {
                state.flow.pump_assets();
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                state.flow.tick(&mut state.renderer, dt);
                state.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Opens a window and runs `descriptor` until the window is closed.
///
/// # Arguments
///
/// * `descriptor` is the scene to run
/// * `config` holds camera, clock and asset settings
/// * `factory` creates the renderer for the window
///
/// # Returns
///
/// An error if the event loop, the window, the renderer or the scene could
/// not be created.
pub fn run<R, F>(descriptor: SceneDescriptor, config: Config, factory: F) -> anyhow::Result<()>
where
    R: Renderer + 'static,
    F: FnOnce(Arc<Window>) -> anyhow::Result<R> + 'static,
{
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app: App<R> = App::new(descriptor, config, Box::new(factory))?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
