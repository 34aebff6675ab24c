//! The visible-scene renderer. Owns the GPU context, the depth target, the
//! reference axes and grid, the points pipeline and the egui renderer. The picking pass lives in
//! [`crate::picker`] and shares this renderer's device and queue.

pub mod context;
pub mod pipelines;
pub mod targets;

use self::{
    context::GfxContext,
    pipelines::{
        axes_grid::AxesGridPipeline,
        points::{PointsPipeline, PointsVariant},
    },
    targets::Targets,
};
use crate::data::types::{FrameUniformStd140, SceneGpu};
use scatterpick::VisualState;
use std::sync::Arc;
use winit::window::Window;

/// Clear color behind the points.
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 1.0,
    b: 1.0,
    a: 1.0,
};

/// Owns all rendering-related state.
pub struct Renderer {
    pub gfx: GfxContext,
    pub targets: Targets,
    pub points: PointsPipeline,
    pub axes_grid: AxesGridPipeline,
    /// Draw the reference axes and grid behind the points.
    pub show_axes: bool,
    frame_ubo: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    scene: Option<SceneGpu>,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let targets = Targets::new(&gfx.device, gfx.size);
        let points = PointsPipeline::new(
            &gfx.device,
            gfx.config.format,
            targets.depth_fmt,
            PointsVariant::Visible,
        );
        let axes_grid = AxesGridPipeline::new(
            &gfx.device,
            gfx.config.format,
            targets.depth_fmt,
            &points.frame_layout,
        );
        let (frame_ubo, frame_bind) = points.create_frame_binding(&gfx.device, "Visible");
        let egui_renderer = egui_wgpu::Renderer::new(&gfx.device, gfx.config.format, None, 1);

        Ok(Self {
            gfx,
            targets,
            points,
            axes_grid,
            show_axes: true,
            frame_ubo,
            frame_bind,
            scene: None,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.gfx.resize(new_size);
            self.targets.resize(&self.gfx.device, new_size);
        }
    }

    /// Replaces the visible scene.
    pub fn upload_scene(&mut self, positions: &[[f32; 3]], visual: &VisualState) {
        self.scene = SceneGpu::new(
            &self.gfx.device,
            "Visible Scene",
            positions,
            &visual.colors,
            &visual.scales,
        );
    }

    /// Rewrites every color and scale after a full visual rebuild.
    pub fn write_visual(&self, visual: &VisualState) {
        if let Some(scene) = &self.scene {
            scene.write_colors(&self.gfx.queue, 0, &visual.colors);
            scene.write_scales(&self.gfx.queue, 0, &visual.scales);
        }
    }

    /// Rewrites the color and scale of a single point.
    pub fn write_point(&self, index: usize, visual: &VisualState) {
        let Some(scene) = &self.scene else {
            return;
        };
        if index < scene.len as usize {
            scene.write_colors(&self.gfx.queue, index, &visual.colors[index..=index]);
            scene.write_scales(&self.gfx.queue, index, &visual.scales[index..=index]);
        }
    }

    pub fn write_frame(&self, frame: &FrameUniformStd140) {
        self.gfx
            .queue
            .write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(frame));
    }

    pub fn render(&mut self, swap_view: &wgpu::TextureView) {
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.show_axes {
                self.axes_grid.draw(&mut pass, &self.frame_bind);
            }
            if let Some(scene) = &self.scene {
                self.points.draw_scene(&mut pass, &self.frame_bind, scene);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}
