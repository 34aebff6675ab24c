//! Depth target for the visible points pass.

pub struct Targets {
    // Keep the texture alive for the lifetime of the view.
    _depth_tex: wgpu::Texture,
    pub depth: wgpu::TextureView,
    pub depth_fmt: wgpu::TextureFormat,
}

impl Targets {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    pub fn new(device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) -> Self {
        let depth_tex = create_depth_texture(device, "Scene Depth Target", size.width, size.height);
        Self {
            depth: depth_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            _depth_tex: depth_tex,
            depth_fmt: Self::DEPTH_FORMAT,
        }
    }

    /// Resize all render targets to the new window size.
    pub fn resize(&mut self, device: &wgpu::Device, size: winit::dpi::PhysicalSize<u32>) {
        *self = Self::new(device, size);
    }
}

/// Creates a depth texture of at least 1x1 pixels.
pub fn create_depth_texture(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: Targets::DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}
