use crate::data::types::{FrameUniformStd140 as FrameUniform, SceneGpu};
use wgpu::util::DeviceExt;

/// Which fragment stage and blending a [`PointsPipeline`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointsVariant {
    /// Style colors, alpha blended into the swap chain.
    Visible,
    /// Identity colors, written unblended into the picking target.
    Pick,
}

impl PointsVariant {
    fn label(self) -> &'static str {
        match self {
            Self::Visible => "Points Pipeline (visible)",
            Self::Pick => "Points Pipeline (pick)",
        }
    }

    fn fragment_entry(self) -> &'static str {
        match self {
            Self::Visible => "fs_visible",
            Self::Pick => "fs_pick",
        }
    }

    fn blend(self) -> Option<wgpu::BlendState> {
        match self {
            Self::Visible => Some(wgpu::BlendState::ALPHA_BLENDING),
            Self::Pick => None,
        }
    }
}

/// Draws a [`SceneGpu`] as instanced quads, one circular sprite per point.
pub struct PointsPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub frame_layout: wgpu::BindGroupLayout,
    quad_vb: wgpu::Buffer,
}

impl PointsPipeline {
    pub fn new(
        device: &wgpu::Device,
        color_fmt: wgpu::TextureFormat,
        depth_fmt: wgpu::TextureFormat,
        variant: PointsVariant,
    ) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Points Frame UBO Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<FrameUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shaders/points.wgsl"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../../shaders/points.wgsl").into()),
        });

        let quad_corners: [[f32; 2]; 6] = [
            [-1.0, -1.0],
            [1.0, -1.0],
            [1.0, 1.0],
            [-1.0, -1.0],
            [1.0, 1.0],
            [-1.0, 1.0],
        ];

        let quad_vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Points Quad VB"),
            contents: bytemuck::cast_slice(&quad_corners),
            usage: wgpu::BufferUsages::VERTEX,
        });

        // Quad corners + one buffer per instance attribute.
        let vbuf_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 0,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x2,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 1,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: SceneGpu::COLOR_STRIDE,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 2,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32x4,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: SceneGpu::SCALE_STRIDE,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    shader_location: 3,
                    offset: 0,
                    format: wgpu::VertexFormat::Float32,
                }],
            },
        ];

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Points PipelineLayout"),
            bind_group_layouts: &[&frame_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(variant.label()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &vbuf_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: depth_fmt,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: variant.fragment_entry(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_fmt,
                    blend: variant.blend(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Self {
            pipeline,
            frame_layout,
            quad_vb,
        }
    }

    /// Creates a frame uniform buffer and its bind group for this pipeline.
    pub fn create_frame_binding(
        &self,
        device: &wgpu::Device,
        label: &str,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Frame UBO")),
            size: std::mem::size_of::<FrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} Frame Bind Group")),
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });
        (ubo, bind)
    }

    pub fn draw_scene<'a>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'a>,
        frame_bind: &'a wgpu::BindGroup,
        scene: &'a SceneGpu,
    ) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame_bind, &[]);
        rpass.set_vertex_buffer(0, self.quad_vb.slice(..));
        rpass.set_vertex_buffer(1, scene.positions.slice(..));
        rpass.set_vertex_buffer(2, scene.colors.slice(..));
        rpass.set_vertex_buffer(3, scene.scales.slice(..));
        rpass.draw(0..6, 0..scene.len);
    }
}
