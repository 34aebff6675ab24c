use crate::data::types::FrameUniformStd140 as FrameUniform;
use glam::{Mat4, Vec3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

const FOV_Y_DEG: f32 = 45.0;
const NEAR: f32 = 0.01;
const FAR: f32 = 100.0;

// Sprite scaling against zoom when size attenuation is off.
const MIN_ZOOM_SCALE: f32 = 0.1;
const MAX_ZOOM_SCALE: f32 = 15.0;
/// Shrink rate when zooming out.
const ZOOM_OUT_SPEED: f32 = 2.0;
/// Growth rate when zooming in.
const ZOOM_IN_SPEED: f32 = 0.02;
/// Shifts the pivot where sprites keep their nominal size.
const ZOOM_OFFSET: f32 = 0.3;

/// Sprite size factor for a zoom level: 1 at the pivot, easing towards
/// `MIN_ZOOM_SCALE` when zoomed out and `MAX_ZOOM_SCALE` when zoomed in.
pub fn zoom_point_scale(zoom: f32) -> f32 {
    use std::f32::consts::PI;
    let zoom = zoom + ZOOM_OFFSET;
    if zoom < 1.0 {
        let out_norm = (1.0 - MIN_ZOOM_SCALE) / ZOOM_OUT_SPEED.atan();
        1.0 + out_norm * (ZOOM_OUT_SPEED * (zoom - 1.0)).atan()
    } else {
        1.0 + 2.0 / PI * (MAX_ZOOM_SCALE - 1.0) * (ZOOM_IN_SPEED * (zoom - 1.0)).atan()
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    // --- Orbital Parameters (Primary State) ---
    /// The point the camera orbits around (the center of the data cube).
    pub target: Vec3,
    /// Distance from the camera to the target.
    pub radius: f32,
    /// Radius that frames the whole cube; zoom is measured against it.
    pub home_radius: f32,
    /// Azimuth angle around the world Y axis (radians).
    pub azimuth_rad: f32,
    /// Elevation angle above the XZ plane (radians).
    pub elevation_rad: f32,

    /// Camera position, derived by `update()`.
    position: Vec3,

    // --- Projection Matrix ---
    pub proj: Mat4,
}

impl Camera {
    /// Creates an orbit camera framing a data cube of side `cube_length`
    /// centered on the origin.
    pub fn new(cube_length: f32, aspect: f32) -> Self {
        let radius = Self::framing_radius(cube_length);
        let mut camera = Self {
            target: Vec3::ZERO,
            radius,
            home_radius: radius,
            azimuth_rad: 0.0,
            elevation_rad: 0.0,
            position: Vec3::ZERO,
            proj: Self::projection(aspect),
        };
        camera.update();
        camera
    }

    /// Distance at which the whole cube fits the vertical field of view.
    pub fn framing_radius(cube_length: f32) -> f32 {
        let half_diag = cube_length * 3f32.sqrt() * 0.5;
        half_diag / (FOV_Y_DEG.to_radians() * 0.5).sin()
    }

    /// Perspective projection with wgpu's [0, 1] depth range.
    pub fn projection(aspect: f32) -> Mat4 {
        Mat4::perspective_rh(FOV_Y_DEG.to_radians(), aspect.max(1e-3), NEAR, FAR)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.proj = Self::projection(aspect);
    }

    /// Recalculates the camera position from its orbital parameters. This
    /// must be called after any orbital parameter changes.
    pub fn update(&mut self) {
        let (sin_az, cos_az) = self.azimuth_rad.sin_cos();
        let (sin_el, cos_el) = self.elevation_rad.sin_cos();
        let offset = Vec3::new(
            self.radius * cos_el * sin_az,
            self.radius * sin_el,
            self.radius * cos_el * cos_az,
        );
        self.position = self.target + offset;
    }

    /// Rotates the orbit around the vertical axis.
    pub fn advance(&mut self, dt_s: f32, speed_rad_s: f32) {
        self.azimuth_rad = (self.azimuth_rad + dt_s * speed_rad_s).rem_euclid(std::f32::consts::TAU);
        self.update();
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view()
    }

    /// Horizontal projection scale, magnified by how far the orbit has
    /// moved in from the framing distance.
    pub fn zoom(&self) -> f32 {
        self.proj.x_axis.x * self.home_radius / self.radius.max(1e-6)
    }

    /// Builds the per-frame uniform shared by the visible and picking passes.
    pub fn make_frame_uniform(
        &self,
        viewport_size: [f32; 2],
        point_size_px: f32,
        min_point_size_px: f32,
        size_attenuation: bool,
    ) -> FrameUniform {
        FrameUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
            viewport_size,
            point_size_px,
            min_point_size_px,
            camera_pos: self.position.to_array(),
            // Sprites keep their nominal size at the initial orbit distance.
            attenuation: if size_attenuation { self.radius } else { 0.0 },
            zoom_scale: if size_attenuation { 1.0 } else { zoom_point_scale(self.zoom()) },
            _pad: [0.0; 3],
        }
    }
}

/// Drag-to-orbit and scroll-to-zoom. A drag started with Shift held belongs
/// to box selection and leaves the camera alone.
pub struct CameraController {
    mouse_down: bool,
    shift: bool,
    last_mouse: Option<(f64, f64)>,
    min_radius: f32,
    max_radius: f32,
}

impl CameraController {
    pub fn new(camera: &Camera) -> Self {
        Self {
            mouse_down: false,
            shift: false,
            last_mouse: None,
            min_radius: camera.radius * 0.05,
            max_radius: camera.radius * 10.0,
        }
    }

    #[inline]
    pub fn is_dragging(&self) -> bool {
        self.mouse_down
    }

    /// Handles window events and updates the camera. Returns whether the
    /// camera moved.
    pub fn handle_event(&mut self, event: &WindowEvent, camera: &mut Camera) -> bool {
        match event {
            WindowEvent::ModifiersChanged(mods) => {
                self.shift = mods.state().shift_key();
                false
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if *button == MouseButton::Left {
                    self.mouse_down = *state == ElementState::Pressed && !self.shift;
                }
                false
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.handle_cursor_orbit((position.x, position.y), camera)
            }
            WindowEvent::CursorLeft { .. } => {
                self.last_mouse = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.handle_scroll(scroll, camera)
            }
            _ => false,
        }
    }

    fn handle_scroll(&mut self, delta: f32, camera: &mut Camera) -> bool {
        // Positive delta = scroll up = zoom in = decrease radius.
        let radius = (camera.radius * 1.1_f32.powf(-delta)).clamp(self.min_radius, self.max_radius);
        if radius == camera.radius {
            return false;
        }
        camera.radius = radius;
        camera.update();
        true
    }

    fn handle_cursor_orbit(&mut self, xy: (f64, f64), camera: &mut Camera) -> bool {
        let mut moved = false;
        if let Some(last) = self.last_mouse {
            if self.mouse_down {
                let dx = ((xy.0 - last.0) * 0.005) as f32;
                let dy = ((xy.1 - last.1) * 0.005) as f32;

                camera.azimuth_rad -= dx;
                // Clamp elevation to prevent flipping over the poles.
                camera.elevation_rad = (camera.elevation_rad + dy)
                    .clamp(-89f32.to_radians(), 89f32.to_radians());
                camera.update();
                moved = dx != 0.0 || dy != 0.0;
            }
        }
        self.last_mouse = Some(xy);
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn starts_on_the_positive_z_axis() {
        let cam = Camera::new(2.0, 1.5);
        assert!(approx(cam.position(), Vec3::new(0.0, 0.0, cam.radius)));
        // The origin projects to the center of the screen.
        let clip = cam.view_proj() * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
        let depth = clip.z / clip.w;
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn whole_cube_fits_in_view() {
        let cam = Camera::new(2.0, 1.0);
        for corner in [
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, -1.0),
        ] {
            let clip = cam.view_proj() * corner.extend(1.0);
            assert!((clip.x / clip.w).abs() <= 1.0, "{corner} off screen");
            assert!((clip.y / clip.w).abs() <= 1.0, "{corner} off screen");
        }
    }

    #[test]
    fn auto_rotate_keeps_distance() {
        let mut cam = Camera::new(2.0, 1.0);
        let r = cam.position().length();
        cam.advance(0.5, std::f32::consts::PI);
        assert!((cam.position().length() - r).abs() < 1e-4);
        assert!(approx(cam.position(), Vec3::new(r, 0.0, 0.0)));
    }

    #[test]
    fn attenuation_only_when_enabled() {
        let cam = Camera::new(2.0, 1.0);
        let off = cam.make_frame_uniform([800.0, 600.0], 6.0, 2.0, false);
        let on = cam.make_frame_uniform([800.0, 600.0], 6.0, 2.0, true);
        assert_eq!(off.attenuation, 0.0);
        assert_eq!(on.attenuation, cam.radius);
        assert_eq!(on.viewport_size, [800.0, 600.0]);
        assert_eq!(on.zoom_scale, 1.0);
        assert_eq!(off.zoom_scale, zoom_point_scale(cam.zoom()));
    }

    #[test]
    fn zoom_scale_is_one_at_the_pivot_and_bounded() {
        assert!((zoom_point_scale(1.0 - ZOOM_OFFSET) - 1.0).abs() < 1e-5);
        let mut prev = 0.0;
        for step in 0..200 {
            let s = zoom_point_scale(step as f32 * 0.5);
            assert!(s > MIN_ZOOM_SCALE && s < MAX_ZOOM_SCALE, "{s}");
            assert!(s >= prev);
            prev = s;
        }
        assert!(zoom_point_scale(1e6) > 14.0);
    }

    #[test]
    fn scrolling_in_grows_sprites_without_attenuation() {
        let mut cam = Camera::new(2.0, 1.0);
        let mut ctrl = CameraController::new(&cam);
        let before = cam.make_frame_uniform([800.0, 600.0], 6.0, 2.0, false).zoom_scale;
        assert!(ctrl.handle_scroll(5.0, &mut cam));
        let after = cam.make_frame_uniform([800.0, 600.0], 6.0, 2.0, false).zoom_scale;
        assert!(after > before, "{after} <= {before}");
    }
}
