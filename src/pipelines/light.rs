use wgpu::util::DeviceExt;

use crate::{camera::CameraView, render::Frame};

/// Converts cgmath's OpenGL clip space (z in -1..1) to wgpu's (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Everything the basic shader needs besides the vertices.
///
/// Uniforms require 16 byte alignment, hence the trailing scalar in every
/// vec3 slot.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneUniform {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 3],
    fog_near: f32,
    sun_position: [f32; 3],
    fog_far: f32,
    sun_colour: [f32; 3],
    _padding: u32,
    ambient: [f32; 3],
    _padding2: u32,
    fog_colour: [f32; 3],
    fog_enabled: u32,
}

impl SceneUniform {
    pub fn new(frame: &Frame, camera: &CameraView) -> Self {
        let (sun_position, sun_colour) = match frame.sun() {
            Some(sun) => (
                sun.position.into(),
                [
                    sun.colour[0] * sun.intensity,
                    sun.colour[1] * sun.intensity,
                    sun.colour[2] * sun.intensity,
                ],
            ),
            None => ([0.0, 1.0, 0.0], [0.0; 3]),
        };
        let (fog_colour, fog_near, fog_far, fog_enabled) = match frame.fog {
            Some(fog) => (fog.colour, fog.near, fog.far, 1),
            None => ([0.0; 3], 0.0, 1.0, 0),
        };
        Self {
            view_proj: (OPENGL_TO_WGPU_MATRIX * camera.view_proj()).into(),
            eye: camera.eye.into(),
            fog_near,
            sun_position,
            fog_far,
            sun_colour,
            _padding: 0,
            ambient: frame.ambient(),
            _padding2: 0,
            fog_colour,
            fog_enabled,
        }
    }
}

impl Default for SceneUniform {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

pub fn mk_buffer(device: &wgpu::Device, uniform: SceneUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Scene Uniform Buffer"),
        contents: bytemuck::cast_slice(&[uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("scene_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("scene_bind_group"),
    })
}
