//! GPU-facing data types for the scatter viewer.

use wgpu::util::DeviceExt;

/// Per-frame uniform buffer data, respecting std140 layout.
/// Must match the layout of `Frame` in `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniformStd140 {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Size of the render target in physical pixels.
    pub viewport_size: [f32; 2],
    /// Base sprite diameter in pixels.
    pub point_size_px: f32,
    /// Lower bound on the scaled sprite diameter in pixels.
    pub min_point_size_px: f32,
    /// Camera position, used for distance-based size attenuation.
    pub camera_pos: [f32; 3],
    /// Reference distance for attenuation; 0 disables it.
    pub attenuation: f32,
    /// Sprite size factor from the camera zoom, used when attenuation is off.
    pub zoom_scale: f32,
    pub _pad: [f32; 3],
}

/// Per-point attribute buffers of one rendered scene. Positions, colors and
/// scales live in separate vertex buffers so colors and scales can be
/// patched point by point.
#[derive(Debug)]
pub struct SceneGpu {
    pub positions: wgpu::Buffer,
    pub colors: wgpu::Buffer,
    pub scales: wgpu::Buffer,
    pub len: u32,
}

impl SceneGpu {
    pub const COLOR_STRIDE: u64 = std::mem::size_of::<[f32; 4]>() as u64;
    pub const SCALE_STRIDE: u64 = std::mem::size_of::<f32>() as u64;

    /// Uploads a scene. Returns `None` for an empty point set, which has
    /// nothing to draw.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        positions: &[[f32; 3]],
        colors: &[[f32; 4]],
        scales: &[f32],
    ) -> Option<Self> {
        if positions.is_empty() {
            return None;
        }
        debug_assert_eq!(positions.len(), colors.len());
        debug_assert_eq!(positions.len(), scales.len());

        let make = |what: &str, contents: &[u8]| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} {what}")),
                contents,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            })
        };

        Some(Self {
            positions: make("Positions", bytemuck::cast_slice(positions)),
            colors: make("Colors", bytemuck::cast_slice(colors)),
            scales: make("Scales", bytemuck::cast_slice(scales)),
            len: positions.len() as u32,
        })
    }

    /// Overwrites colors starting at point `first`.
    pub fn write_colors(&self, queue: &wgpu::Queue, first: usize, colors: &[[f32; 4]]) {
        queue.write_buffer(
            &self.colors,
            first as u64 * Self::COLOR_STRIDE,
            bytemuck::cast_slice(colors),
        );
    }

    /// Overwrites scale factors starting at point `first`.
    pub fn write_scales(&self, queue: &wgpu::Queue, first: usize, scales: &[f32]) {
        queue.write_buffer(
            &self.scales,
            first as u64 * Self::SCALE_STRIDE,
            bytemuck::cast_slice(scales),
        );
    }
}
