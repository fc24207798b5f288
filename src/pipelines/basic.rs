use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Point3, SquareMatrix, Transform, Vector3};

use crate::{data_structures::mesh::Geometry, render::DrawItem};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A world-space vertex. Meshes are flattened on the CPU every frame so a
/// single draw call per pipeline covers the whole scene.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub colour: [f32; 3],
}

impl SceneVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SceneVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Appends the triangles of `item` to `out` in world space.
pub fn flatten(item: &DrawItem, out: &mut Vec<SceneVertex>) {
    let tessellated;
    let mesh = match item.geometry {
        Geometry::Mesh(mesh) => mesh.as_ref(),
        other => {
            tessellated = other.tessellate();
            &tessellated
        }
    };
    let normal_matrix = normal_matrix(&item.world);
    for &index in &mesh.indices {
        let index = index as usize;
        let (Some(position), Some(normal)) = (mesh.positions.get(index), mesh.normals.get(index))
        else {
            continue;
        };
        let position = item.world.transform_point(Point3::from(*position));
        let normal = normal_matrix * Vector3::from(*normal);
        let normal = if normal.magnitude2() > 0.0 {
            normal.normalize()
        } else {
            Vector3::unit_y()
        };
        out.push(SceneVertex {
            position: position.into(),
            normal: normal.into(),
            colour: item.colour,
        });
    }
}

fn normal_matrix(world: &Matrix4<f32>) -> Matrix3<f32> {
    let linear = Matrix3::from_cols(world.x.truncate(), world.y.truncate(), world.z.truncate());
    linear
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(linear)
}

/// Builds the scene pipeline. `cull` is `None` for double-sided materials.
pub fn mk_basic_pipeline(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    scene_bind_group_layout: &wgpu::BindGroupLayout,
    cull: Option<wgpu::Face>,
) -> wgpu::RenderPipeline {
    let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[scene_bind_group_layout],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("basic.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        &render_pipeline_layout,
        config.format,
        Some(wgpu::BlendState::REPLACE),
        Some(DEPTH_FORMAT),
        cull,
        &[SceneVertex::desc()],
        shader,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    depth_format: Option<wgpu::TextureFormat>,
    cull: Option<wgpu::Face>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: wgpu::ShaderModuleDescriptor,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(shader);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(if cull.is_some() {
            "Scene Pipeline"
        } else {
            "Double Sided Scene Pipeline"
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: cull,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
