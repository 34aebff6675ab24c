use crate::{
    camera::{Camera, CameraController},
    config::Config,
    data::dataset_file,
    picker::GpuPicker,
    renderer::Renderer,
    ui::{self, HudStats},
};
use anyhow::{Context, Result};
use scatterpick::{
    normalize, pointer_to_ndc, Dataset, HoverMachine, HoverTransition, PickingPipeline,
    ResolvedStyle, ScatterBoundingBox, Selection, Viewport, VisualState, VisualStateBuilder,
};
use std::{sync::Arc, time::Instant};
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

/// Pointer travel (physical pixels) below which a press/release is a click.
const CLICK_SLOP_PX: f64 = 4.0;

/// Logical-pixel box spanned by two physical cursor positions.
pub fn selection_box(
    start: PhysicalPosition<f64>,
    end: PhysicalPosition<f64>,
    scale_factor: f64,
) -> ScatterBoundingBox {
    ScatterBoundingBox {
        x: start.x.min(end.x) / scale_factor,
        y: start.y.min(end.y) / scale_factor,
        width: (start.x - end.x).abs() / scale_factor,
        height: (start.y - end.y).abs() / scale_factor,
    }
}

pub fn is_click(start: PhysicalPosition<f64>, end: PhysicalPosition<f64>) -> bool {
    (end.x - start.x).hypot(end.y - start.y) < CLICK_SLOP_PX
}

/// The picking target tracks the surface's physical size exactly.
fn viewport_of(window: &Window) -> Viewport {
    let size = window.inner_size();
    Viewport::from_physical(size.width, size.height, window.scale_factor())
}

/// Left-button gesture in progress.
#[derive(Debug, Clone, Copy)]
struct Press {
    start: PhysicalPosition<f64>,
    boxed: bool,
}

pub struct App {
    pub renderer: Renderer,
    pub camera: Camera,
    pub camera_controller: CameraController,
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    config: Config,
    picking: PickingPipeline<GpuPicker>,
    hover: HoverMachine,
    selection: Selection,
    style: ResolvedStyle,
    visual: VisualState,
    dataset: Option<Dataset>,
    positions: Vec<[f32; 3]>,
    cursor: Option<PhysicalPosition<f64>>,
    shift: bool,
    press: Option<Press>,
    last_frame: Instant,
}

impl App {
    pub async fn new(window: Arc<Window>, config: Config) -> Result<Self> {
        let mut renderer = Renderer::new(window.clone()).await?;
        renderer.show_axes = !config.hide_axes;
        let size = renderer.gfx.size;

        let camera = Camera::new(
            config.cube_length,
            size.width as f32 / size.height.max(1) as f32,
        );
        let camera_controller = CameraController::new(&camera);

        let picker = GpuPicker::new(renderer.gfx.device.clone(), renderer.gfx.queue.clone());
        let picking = PickingPipeline::new(picker, viewport_of(&window))
            .context("creating the picking target")?;

        let style = VisualStateBuilder::new()
            .resolve(&config.load_style()?)
            .context("resolving point style")?;

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui_ctx.viewport_id(),
            &*window,
            None,
            None,
        );

        Ok(Self {
            renderer,
            camera,
            camera_controller,
            egui_ctx,
            egui_state,
            config,
            picking,
            hover: HoverMachine::new(),
            selection: Selection::new(),
            style,
            visual: VisualState::default(),
            dataset: None,
            positions: Vec::new(),
            cursor: None,
            shift: false,
            press: None,
            last_frame: Instant::now(),
        })
    }

    /// Loads the configured dataset and uploads both scenes.
    pub fn load_dataset(&mut self) -> Result<()> {
        let dataset = dataset_file::load(&self.config.dataset)?;
        self.set_dataset(dataset)
    }

    pub fn set_dataset(&mut self, dataset: Dataset) -> Result<()> {
        self.positions = normalize(&dataset, self.config.cube_length);
        self.selection.clear();
        self.hover.reset();
        self.visual = VisualState::build(dataset.len(), &self.selection, None, &self.style);

        self.renderer.upload_scene(&self.positions, &self.visual);
        self.picking
            .set_scene(&self.positions, &self.visual.scales)
            .context("uploading the picking scene")?;

        self.dataset = Some(dataset);
        Ok(())
    }

    pub fn resize(&mut self, window: &Window, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.renderer.resize(new_size);
            self.camera
                .set_aspect(new_size.width as f32 / new_size.height as f32);
            if let Err(e) = self.picking.set_viewport(viewport_of(window)) {
                log::error!("Failed to resize picking target: {e}");
            }
        }
    }

    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.egui_state.on_window_event(window, event);
        if response.consumed {
            return true;
        }

        if self.camera_controller.handle_event(event, &mut self.camera) {
            self.picking.mark_camera_moved();
        }

        match event {
            WindowEvent::Resized(physical_size) => self.resize(window, *physical_size),
            WindowEvent::ScaleFactorChanged { .. } => self.resize(window, window.inner_size()),
            WindowEvent::ModifiersChanged(mods) => self.shift = mods.state().shift_key(),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(*position);
                let vp = self.picking.viewport();
                let scale = vp.device_pixel_ratio;
                self.picking.set_pointer(Some(pointer_to_ndc(
                    position.x / scale,
                    position.y / scale,
                    &vp,
                )));
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.picking.set_pointer(None);
                if let Some(t) = self.hover.pointer_left() {
                    self.apply_hover(t);
                }
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => {
                    self.press = self.cursor.map(|start| Press {
                        start,
                        boxed: self.shift,
                    });
                }
                ElementState::Released => {
                    if let (Some(press), Some(end)) = (self.press.take(), self.cursor) {
                        self.finish_press(window, press, end);
                    }
                }
            },
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::KeyC) =>
            {
                self.set_selection(Selection::new());
            }
            _ => {}
        }

        false
    }

    fn finish_press(&mut self, window: &Window, press: Press, end: PhysicalPosition<f64>) {
        if press.boxed {
            let bbox = selection_box(press.start, end, window.scale_factor());
            match self
                .picking
                .query_bounding_box(&bbox, self.dataset.as_ref().map(|_| &self.positions[..]))
            {
                Ok(ids) => {
                    log::info!("Box selection picked {} points.", ids.len());
                    self.set_selection(ids.into_iter().collect());
                }
                Err(e) => log::error!("Box selection failed: {e}"),
            }
        } else if is_click(press.start, end) {
            let mut selection = self.selection.clone();
            match self.hover.hovered() {
                Some(index) => {
                    selection.toggle(index);
                }
                None => selection.clear(),
            }
            self.set_selection(selection);
        }
    }

    /// Replaces the selection and rebuilds every point's look.
    fn set_selection(&mut self, selection: Selection) {
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        let count = self.dataset.as_ref().map_or(0, Dataset::len);
        self.visual = VisualState::build(count, &self.selection, self.hover.hovered(), &self.style);
        self.renderer.write_visual(&self.visual);
        if let Err(e) = self.picking.set_scales(&self.visual.scales) {
            log::error!("Failed to mirror scales into the picking scene: {e}");
        }
    }

    /// Incremental hover update: only the touched points are rewritten.
    fn apply_hover(&mut self, transition: HoverTransition) {
        self.visual
            .apply_transition(transition, &self.selection, &self.style);
        for index in transition.touched() {
            self.renderer.write_point(index, &self.visual);
            if let Err(e) = self.picking.patch_scale(index, self.visual.scales[index]) {
                log::warn!("Failed to patch picking scale for point {index}: {e}");
            }
        }
    }

    fn update_camera(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let dragging = self.camera_controller.is_dragging() || self.press.is_some();
        if self.config.auto_rotate != 0.0 && !dragging {
            self.camera.advance(dt, self.config.auto_rotate);
            self.picking.mark_camera_moved();
        }

        let frame = self.camera.make_frame_uniform(
            [
                self.renderer.gfx.size.width as f32,
                self.renderer.gfx.size.height as f32,
            ],
            self.config.point_size,
            self.config.min_point_size,
            self.config.size_attenuation,
        );
        self.renderer.write_frame(&frame);
        self.picking.backend_mut().set_frame(frame);
    }

    fn pick(&mut self) {
        match self.picking.tick() {
            Ok(outcome) => {
                if let Some(t) = self.hover.apply(outcome) {
                    self.apply_hover(t);
                }
            }
            Err(e) => log::error!("Picking failed: {e}"),
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        self.update_camera();
        self.pick();

        let frame = self.renderer.gfx.surface.get_current_texture()?;
        let swap_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.renderer.render(&swap_view);

        let egui_input = self.egui_state.take_egui_input(window);
        self.egui_ctx.begin_frame(egui_input);

        let hovered = self.hover.hovered().map(|i| {
            (
                i,
                self.dataset.as_ref().and_then(|d| d.metadata(i)),
            )
        });
        ui::draw_hud(
            &self.egui_ctx,
            &HudStats {
                point_count: self.positions.len(),
                dimensions: self.dataset.as_ref().map_or(0, |d| d.dimensions().len()),
                selected: self.selection.len(),
                hovered,
            },
        );

        if let (Some(press), Some(cursor)) = (self.press, self.cursor) {
            if press.boxed {
                let scale = window.scale_factor();
                let b = selection_box(press.start, cursor, scale);
                let rect = egui::Rect::from_min_size(
                    egui::pos2(b.x as f32, b.y as f32),
                    egui::vec2(b.width as f32, b.height as f32),
                );
                ui::draw_selection_box(&self.egui_ctx, rect);
            }
        }

        let egui_output = self.egui_ctx.end_frame();
        let shapes = self
            .egui_ctx
            .tessellate(egui_output.shapes, self.egui_ctx.pixels_per_point());

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [
                self.renderer.gfx.config.width,
                self.renderer.gfx.config.height,
            ],
            pixels_per_point: self.egui_ctx.pixels_per_point(),
        };

        let mut encoder = self
            .renderer
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("UI Encoder"),
            });

        for (id, delta) in &egui_output.textures_delta.set {
            self.renderer.egui_renderer.update_texture(
                &self.renderer.gfx.device,
                &self.renderer.gfx.queue,
                *id,
                delta,
            );
        }

        self.renderer.egui_renderer.update_buffers(
            &self.renderer.gfx.device,
            &self.renderer.gfx.queue,
            &mut encoder,
            &shapes,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("EGUI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &swap_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.renderer
                .egui_renderer
                .render(&mut render_pass, &shapes, &screen_descriptor);
        }

        for id in &egui_output.textures_delta.free {
            self.renderer.egui_renderer.free_texture(id);
        }

        self.renderer
            .gfx
            .queue
            .submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_box_is_normalized_and_logical() {
        let b = selection_box(
            PhysicalPosition::new(300.0, 40.0),
            PhysicalPosition::new(100.0, 240.0),
            2.0,
        );
        assert_eq!(
            b,
            ScatterBoundingBox {
                x: 50.0,
                y: 20.0,
                width: 100.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn small_travel_is_a_click() {
        let p = PhysicalPosition::new(10.0, 10.0);
        assert!(is_click(p, PhysicalPosition::new(12.0, 11.0)));
        assert!(!is_click(p, PhysicalPosition::new(20.0, 10.0)));
    }
}
