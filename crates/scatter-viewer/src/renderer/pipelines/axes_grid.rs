// Reference lines under the scatter plot: a square grid on the XZ plane and
// red/green/blue X/Y/Z axes from the origin.

use wgpu::util::DeviceExt;

/// Side length of the reference grid, world units.
pub const GRID_SIZE: f32 = 10.0;
/// Cells per grid side.
pub const GRID_DIVISIONS: u32 = 10;
/// Axis lines run from the origin to this length.
pub const AXIS_LENGTH: f32 = 1.0;

const GRID_COLOR:        [f32; 4] = [0.533, 0.533, 0.533, 1.0];
const GRID_CENTER_COLOR: [f32; 4] = [0.267, 0.267, 0.267, 1.0];
const AXIS_COLORS: [[f32; 4]; 3] = [
    [1.0, 0.0, 0.0, 1.0], // X
    [0.0, 0.5, 0.0, 1.0], // Y
    [0.0, 0.0, 1.0, 1.0], // Z
];

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3], // 12 B
    pub color:    [f32; 4], // +16 -> 28
}

const _: [(); 28] = [(); core::mem::size_of::<LineVertex>()];

/// Line-list vertices: grid lines first (center lines darker), then the
/// three axes, so the axes draw over the grid's center lines.
pub fn axes_grid_vertices(grid_size: f32, divisions: u32, axis_length: f32) -> Vec<LineVertex> {
    let divisions = divisions.max(1);
    let half = grid_size * 0.5;
    let step = grid_size / divisions as f32;
    let mut out = Vec::with_capacity((divisions as usize + 1) * 4 + 6);

    for i in 0..=divisions {
        let k = -half + i as f32 * step;
        let color = if 2 * i == divisions { GRID_CENTER_COLOR } else { GRID_COLOR };
        for (a, b) in [
            ([-half, 0.0, k], [half, 0.0, k]),
            ([k, 0.0, -half], [k, 0.0, half]),
        ] {
            out.push(LineVertex { position: a, color });
            out.push(LineVertex { position: b, color });
        }
    }

    for (axis, color) in AXIS_COLORS.into_iter().enumerate() {
        let mut end = [0.0; 3];
        end[axis] = axis_length;
        out.push(LineVertex { position: [0.0; 3], color });
        out.push(LineVertex { position: end, color });
    }
    out
}

pub struct AxesGridPipeline {
    pipeline:     wgpu::RenderPipeline,
    vb:           wgpu::Buffer,
    vertex_count: u32,
}

impl AxesGridPipeline {
    /// `frame_layout` is the points pipeline's frame layout, so both passes
    /// share one frame uniform.
    pub fn new(
        device:       &wgpu::Device,
        color_fmt:    wgpu::TextureFormat,
        depth_fmt:    wgpu::TextureFormat,
        frame_layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let vertices = axes_grid_vertices(GRID_SIZE, GRID_DIVISIONS, AXIS_LENGTH);
        let vb = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label:    Some("Axes Grid VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage:    wgpu::BufferUsages::VERTEX,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label:  Some("Axes Grid WGSL"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label:                Some("Axes Grid Pipeline Layout"),
            bind_group_layouts:   &[frame_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label:  Some("Axes Grid Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module:      &shader,
                entry_point: "vs_main",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<LineVertex>() as u64,
                    step_mode:    wgpu::VertexStepMode::Vertex,
                    attributes:   &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4],
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module:      &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format:     color_fmt,
                    blend:      Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format:              depth_fmt,
                depth_write_enabled: false, // Do not occlude points
                depth_compare:       wgpu::CompareFunction::LessEqual,
                stencil:             wgpu::StencilState::default(),
                bias:                wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview:   None,
        });

        Self {
            pipeline,
            vb,
            vertex_count: vertices.len() as u32,
        }
    }

    pub fn draw<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, frame_bind: &'a wgpu::BindGroup) {
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, frame_bind, &[]);
        rpass.set_vertex_buffer(0, self.vb.slice(..));
        rpass.draw(0..self.vertex_count, 0..1);
    }
}

// `Frame` must match `FrameUniformStd140`; only `view_proj` is used.
pub const LINES_WGSL: &str = r#"
struct Frame {
    view_proj: mat4x4<f32>,
    viewport_size: vec2<f32>,
    point_size_px: f32,
    min_point_size_px: f32,
    camera_pos: vec3<f32>,
    attenuation: f32,
    zoom_scale: f32,
};
@group(0) @binding(0) var<uniform> frame: Frame;

struct VSOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) color: vec4<f32>) -> VSOut {
    var out: VSOut;
    out.clip  = frame.view_proj * vec4<f32>(position, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VSOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_lies_on_the_floor_within_its_extent() {
        let v = axes_grid_vertices(10.0, 10, 1.0);
        assert_eq!(v.len(), 11 * 4 + 6);
        for line in &v[..44] {
            assert_eq!(line.position[1], 0.0);
            assert!(line.position[0].abs() <= 5.0 && line.position[2].abs() <= 5.0);
        }
        let centers = v[..44]
            .iter()
            .filter(|l| l.color == GRID_CENTER_COLOR)
            .count();
        assert_eq!(centers, 4);
    }

    #[test]
    fn axes_are_red_green_blue_from_the_origin() {
        let v = axes_grid_vertices(10.0, 10, 1.0);
        let axes = &v[v.len() - 6..];
        let ends: Vec<_> = axes.chunks(2).map(|l| (l[0].position, l[1].position, l[1].color)).collect();
        assert_eq!(ends[0], ([0.0; 3], [1.0, 0.0, 0.0], AXIS_COLORS[0]));
        assert_eq!(ends[1], ([0.0; 3], [0.0, 1.0, 0.0], AXIS_COLORS[1]));
        assert_eq!(ends[2], ([0.0; 3], [0.0, 0.0, 1.0], AXIS_COLORS[2]));
        assert_eq!(AXIS_COLORS[0][0], 1.0);
        assert_eq!(AXIS_COLORS[2][2], 1.0);
    }

    #[test]
    fn odd_division_count_has_no_center_line() {
        let v = axes_grid_vertices(3.0, 3, 1.0);
        assert!(v[..16].iter().all(|l| l.color == GRID_COLOR));
        assert_eq!(v[0].position, [-1.5, 0.0, -1.5]);
    }
}
