//! GPU context: the wgpu [`Renderer`] used by the windowed playground.
//!
//! The context owns the surface, device and queue, the depth buffer and the
//! two scene pipelines (back-face culled and double sided). Every frame the
//! scene graph is flattened into world-space vertices and drawn in at most
//! two draw calls.

use std::sync::Arc;

use anyhow::{Context as _, anyhow};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::CameraView,
    data_structures::scene_graph::SceneGraph,
    pipelines::{
        basic::{self, DEPTH_FORMAT, SceneVertex},
        light::{self, SceneUniform},
    },
    render::{Frame, Renderer},
};

struct DepthTexture {
    #[allow(unused)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, size: [u32; 2]) -> Self {
        let desc = wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

pub struct Context {
    #[allow(unused)]
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    is_surface_configured: bool,
    depth_texture: DepthTexture,
    scene_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    culled: wgpu::RenderPipeline,
    double_sided: wgpu::RenderPipeline,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No graphics adapter can present to the window")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Cannot open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colours, an sRGB surface does the conversion.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("The surface supports no texture format"))?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let scene_buffer = light::mk_buffer(&device, SceneUniform::default());
        let scene_layout = light::mk_bind_group_layout(&device);
        let scene_bind_group = light::mk_bind_group(&device, &scene_layout, &scene_buffer);

        let culled = basic::mk_basic_pipeline(&device, &config, &scene_layout, Some(wgpu::Face::Back));
        let double_sided = basic::mk_basic_pipeline(&device, &config, &scene_layout, None);
        let depth_texture = DepthTexture::new(&device, [config.width, config.height]);

        let mut ctx = Self {
            window,
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            depth_texture,
            scene_buffer,
            scene_bind_group,
            culled,
            double_sided,
        };
        ctx.resize(size.width, size.height);
        Ok(ctx)
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    fn vertex_buffer(&self, label: &str, vertices: &[SceneVertex]) -> Option<wgpu::Buffer> {
        if vertices.is_empty() {
            return None;
        }
        Some(
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
        )
    }
}

impl Renderer for Context {
    fn render(&mut self, graph: &SceneGraph, camera: &CameraView) -> anyhow::Result<()> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let frame = Frame::collect(graph);
        self.queue.write_buffer(
            &self.scene_buffer,
            0,
            bytemuck::cast_slice(&[SceneUniform::new(&frame, camera)]),
        );

        let mut culled = Vec::new();
        let mut double_sided = Vec::new();
        for item in &frame.items {
            if item.material.double_sided {
                basic::flatten(item, &mut double_sided);
            } else {
                basic::flatten(item, &mut culled);
            }
        }
        let culled_buffer = self.vertex_buffer("Scene Vertex Buffer", &culled);
        let double_sided_buffer = self.vertex_buffer("Double Sided Vertex Buffer", &double_sided);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring.");
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(anyhow!("Cannot acquire the next frame: {e}")),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let [r, g, b] = frame.background;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
            for (pipeline, buffer, count) in [
                (&self.culled, &culled_buffer, culled.len()),
                (&self.double_sided, &double_sided_buffer, double_sided.len()),
            ] {
                let Some(buffer) = buffer else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..count as u32, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.is_surface_configured = true;
            self.reconfigure();
            self.depth_texture = DepthTexture::new(&self.device, [width, height]);
        }
    }

    fn viewport(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}
