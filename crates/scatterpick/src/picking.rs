//! GPU-assisted picking: render points as identity colors into an
//! off-screen target, read pixels back, decode them into point indices.
//!
//! The rendering capability is abstracted by [`PickingBackend`]. The only
//! blocking call is [`PickingBackend::read_pixels`]; everything else only
//! records GPU work.
//!
//! Per-frame protocol ([`PickingPipeline::tick`]):
//! 1. bind the off-screen target and clear it;
//! 2. render the picking scene with the shared camera;
//! 3. map the last pointer position (NDC) to target pixels;
//! 4. if inside the target, read one pixel back;
//! 5. decode it into `Hit(index)` or `Miss`;
//! 6. unbind so the visible scene renders normally.
//!
//! Target pixel coordinates have their origin at the top-left corner.

use crate::codec::{identity_colors, index_from_pixel};
use crate::constants::RGBA_NUM_ELEMENTS;
use thiserror::Error;

/// Logical viewport size plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Self {
            width,
            height,
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Builds a viewport from a physical surface size, as windowing
    /// systems report it.
    pub fn from_physical(width_px: u32, height_px: u32, device_pixel_ratio: f64) -> Self {
        let dpr = if device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self::new(
            f64::from(width_px.max(1)) / dpr,
            f64::from(height_px.max(1)) / dpr,
            dpr,
        )
    }

    /// The physical size the off-screen target must have. Rounded, so a
    /// viewport built with [`Viewport::from_physical`] maps back onto the
    /// surface size exactly.
    pub fn target_size(&self) -> TargetSize {
        let px = |v: f64| (v * self.device_pixel_ratio).round().max(1.0) as u32;
        TargetSize {
            width: px(self.width),
            height: px(self.height),
        }
    }
}

/// Off-screen target size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// A rectangle of target pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes `read_pixels` writes for this rectangle (tightly packed RGBA8).
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.pixel_count() * RGBA_NUM_ELEMENTS
    }
}

/// Pointer position in normalized device coordinates (`x` right, `y` up,
/// both in `[-1, 1]` over the viewport).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub ndc_x: f64,
    pub ndc_y: f64,
}

/// A selection rectangle in logical UI coordinates; `(x, y)` is its
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterBoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Attribute buffers of the picking scene. Positions and scales mirror the
/// visible scene; colors carry identities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickingAttributes {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 4]>,
    pub scales: Vec<f32>,
}

impl PickingAttributes {
    pub fn new(positions: &[[f32; 3]], scales: &[f32]) -> Self {
        debug_assert_eq!(positions.len(), scales.len());
        Self {
            positions: positions.to_vec(),
            colors: identity_colors(positions.len()),
            scales: scales.to_vec(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.positions.len()
    }
}

/// Rendering capability the picking pipeline drives.
///
/// Implementations own the off-screen target and the picking scene's GPU
/// buffers. The camera is shared with the visible scene and is the host's
/// business.
pub trait PickingBackend {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Creates (or recreates) the off-screen target at `size`.
    fn recreate_target(&mut self, size: TargetSize) -> Result<(), Self::Error>;

    /// Current target size; `None` before the first `recreate_target`.
    fn target_size(&self) -> Option<TargetSize>;

    fn bind_target(&mut self) -> Result<(), Self::Error>;

    fn clear_target(&mut self) -> Result<(), Self::Error>;

    fn render_picking_scene(&mut self) -> Result<(), Self::Error>;

    /// Synchronously reads `rect` as tightly packed RGBA8 into `out`
    /// (`rect.byte_len()` bytes). Stalls until the GPU has finished.
    fn read_pixels(&mut self, rect: PixelRect, out: &mut [u8]) -> Result<(), Self::Error>;

    fn unbind_target(&mut self) -> Result<(), Self::Error>;

    /// Replaces every attribute of the picking scene.
    fn upload_scene(&mut self, attributes: &PickingAttributes) -> Result<(), Self::Error>;

    /// Overwrites scale factors starting at point `first`.
    fn write_scales(&mut self, first: usize, scales: &[f32]) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum PickError<E: std::error::Error + 'static> {
    #[error("picking backend failed: {0}")]
    Backend(#[source] E),
    #[error("scale patch for point {index} but the picking scene has {point_count} points")]
    ScaleOutOfRange { index: usize, point_count: usize },
    #[error("got {found} scale factors for {point_count} points")]
    ScaleCount { found: usize, point_count: usize },
}

/// Result of one picking frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickOutcome {
    /// The pointer is over point `index`.
    Hit(usize),
    /// The pointer is over empty space.
    Miss,
    /// No pixel was read this frame (no pointer, or pointer outside the
    /// target); the previous hover state stands.
    Unchanged,
}

/// Converts a position in logical viewport coordinates (origin top-left,
/// `y` down) to NDC.
pub fn pointer_to_ndc(x: f64, y: f64, viewport: &Viewport) -> Pointer {
    Pointer {
        ndc_x: (x / viewport.width) * 2.0 - 1.0,
        ndc_y: -(y / viewport.height) * 2.0 + 1.0,
    }
}

/// Slack for the logical to NDC to pixel round trip, so a pointer on an
/// integer pixel edge lands on that pixel and not the one before it.
const PIXEL_EPSILON: f64 = 1e-6;

/// Target pixel (possibly outside the target) under an NDC position. Hover
/// reads and box reads both go through here, so they agree on every pixel.
fn ndc_to_pixel_floor(pointer: Pointer, size: TargetSize) -> (f64, f64) {
    let x = (pointer.ndc_x * 0.5 + 0.5) * f64::from(size.width);
    let y = (0.5 - pointer.ndc_y * 0.5) * f64::from(size.height);
    ((x + PIXEL_EPSILON).floor(), (y + PIXEL_EPSILON).floor())
}

/// Maps an NDC pointer to a target pixel; `None` outside `[0,w) x [0,h)`.
pub fn ndc_to_target_pixel(pointer: Pointer, size: TargetSize) -> Option<(u32, u32)> {
    let (x, y) = ndc_to_pixel_floor(pointer, size);
    let inside =
        x >= 0.0 && x < f64::from(size.width) && y >= 0.0 && y < f64::from(size.height);
    inside.then_some((x as u32, y as u32))
}

/// Decodes a single RGBA8 pixel into a frame outcome.
#[inline]
pub fn decode_pixel(pixel: &[u8], point_count: usize) -> PickOutcome {
    match index_from_pixel(pixel, point_count) {
        Some(index) => PickOutcome::Hit(index),
        None => PickOutcome::Miss,
    }
}

/// Clips a logical bounding box to target pixels. The corner is mapped the
/// same way as the hover pointer; width and height scale by target pixels
/// per logical unit and are at least one pixel.
pub fn bounding_box_to_rect(
    bbox: &ScatterBoundingBox,
    viewport: &Viewport,
    size: TargetSize,
) -> Option<PixelRect> {
    let (x, y) = ndc_to_pixel_floor(pointer_to_ndc(bbox.x, bbox.y, viewport), size);
    let w = (bbox.width * f64::from(size.width) / viewport.width + PIXEL_EPSILON)
        .floor()
        .max(1.0);
    let h = (bbox.height * f64::from(size.height) / viewport.height + PIXEL_EPSILON)
        .floor()
        .max(1.0);

    let x0 = x.max(0.0);
    let y0 = y.max(0.0);
    let x1 = (x + w).min(f64::from(size.width));
    let y1 = (y + h).min(f64::from(size.height));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Owns the picking backend (and with it the off-screen target) and runs
/// the per-frame hit test.
pub struct PickingPipeline<B: PickingBackend> {
    backend: B,
    viewport: Viewport,
    pointer: Option<Pointer>,
    point_count: usize,
    pixel: [u8; RGBA_NUM_ELEMENTS],
    region: Vec<u8>,
    dirty: bool,
    last: PickOutcome,
}

impl<B: PickingBackend> PickingPipeline<B> {
    /// Creates the pipeline and a target sized for `viewport`.
    pub fn new(mut backend: B, viewport: Viewport) -> Result<Self, PickError<B::Error>> {
        backend
            .recreate_target(viewport.target_size())
            .map_err(PickError::Backend)?;
        Ok(Self {
            backend,
            viewport,
            pointer: None,
            point_count: 0,
            pixel: [0; RGBA_NUM_ELEMENTS],
            region: Vec::new(),
            dirty: true,
            last: PickOutcome::Unchanged,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Records a viewport change and recreates the target right away, so no
    /// read ever hits a target sized for an older viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), PickError<B::Error>> {
        let resized = viewport.target_size() != self.viewport.target_size();
        self.viewport = viewport;
        if resized {
            self.ensure_target()?;
        }
        self.dirty = true;
        Ok(())
    }

    /// Last known pointer position, updated from pointer-move events.
    /// `None` means the pointer is not over the surface.
    pub fn set_pointer(&mut self, pointer: Option<Pointer>) {
        if self.pointer != pointer {
            self.pointer = pointer;
            self.dirty = true;
        }
    }

    pub fn pointer(&self) -> Option<Pointer> {
        self.pointer
    }

    /// The camera moved since the last frame; the next tick must re-render.
    pub fn mark_camera_moved(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds the picking scene from the visible scene's positions and
    /// scale factors.
    pub fn set_scene(
        &mut self,
        positions: &[[f32; 3]],
        scales: &[f32],
    ) -> Result<(), PickError<B::Error>> {
        let attributes = PickingAttributes::new(positions, scales);
        self.backend
            .upload_scene(&attributes)
            .map_err(PickError::Backend)?;
        self.point_count = attributes.point_count();
        self.dirty = true;
        log::debug!("picking scene rebuilt with {} points", self.point_count);
        Ok(())
    }

    /// Mirrors a single visible scale change into the picking scene.
    pub fn patch_scale(&mut self, index: usize, scale: f32) -> Result<(), PickError<B::Error>> {
        if index >= self.point_count {
            return Err(PickError::ScaleOutOfRange {
                index,
                point_count: self.point_count,
            });
        }
        self.backend
            .write_scales(index, &[scale])
            .map_err(PickError::Backend)?;
        self.dirty = true;
        Ok(())
    }

    /// Mirrors a full rebuild of the visible scale factors.
    pub fn set_scales(&mut self, scales: &[f32]) -> Result<(), PickError<B::Error>> {
        if scales.len() != self.point_count {
            return Err(PickError::ScaleCount {
                found: scales.len(),
                point_count: self.point_count,
            });
        }
        if scales.is_empty() {
            return Ok(());
        }
        self.backend
            .write_scales(0, scales)
            .map_err(PickError::Backend)?;
        self.dirty = true;
        Ok(())
    }

    /// Runs one frame of the picking protocol.
    ///
    /// When neither the pointer, the camera, the viewport nor the scene
    /// changed since the previous tick, the previous outcome is returned
    /// without touching the GPU.
    pub fn tick(&mut self) -> Result<PickOutcome, PickError<B::Error>> {
        if !self.dirty {
            return Ok(self.last);
        }
        self.ensure_target()?;

        self.backend.bind_target().map_err(PickError::Backend)?;
        let outcome = self.render_and_read();
        let unbind = self.backend.unbind_target().map_err(PickError::Backend);
        let outcome = outcome?;
        unbind?;

        self.dirty = false;
        self.last = outcome;
        Ok(outcome)
    }

    fn render_and_read(&mut self) -> Result<PickOutcome, PickError<B::Error>> {
        self.backend.clear_target().map_err(PickError::Backend)?;
        self.backend
            .render_picking_scene()
            .map_err(PickError::Backend)?;

        let Some(pointer) = self.pointer else {
            return Ok(PickOutcome::Unchanged);
        };
        let size = self.viewport.target_size();
        let Some((x, y)) = ndc_to_target_pixel(pointer, size) else {
            return Ok(PickOutcome::Unchanged);
        };

        let rect = PixelRect {
            x,
            y,
            width: 1,
            height: 1,
        };
        self.backend
            .read_pixels(rect, &mut self.pixel)
            .map_err(PickError::Backend)?;
        Ok(decode_pixel(&self.pixel, self.point_count))
    }

    /// Returns every point with at least one pixel inside `bbox`, ascending.
    ///
    /// Reads the target as last rendered by [`tick`](Self::tick), re-rendering
    /// it first if the camera, viewport or scene changed since. Empty when
    /// `positions` is absent or the box lies outside the target.
    pub fn query_bounding_box(
        &mut self,
        bbox: &ScatterBoundingBox,
        positions: Option<&[[f32; 3]]>,
    ) -> Result<Vec<usize>, PickError<B::Error>> {
        let Some(positions) = positions else {
            return Ok(Vec::new());
        };
        let point_count = positions.len();
        self.ensure_target()?;

        let size = self.viewport.target_size();
        let Some(rect) = bounding_box_to_rect(bbox, &self.viewport, size) else {
            return Ok(Vec::new());
        };

        self.region.resize(rect.byte_len(), 0);
        self.backend.bind_target().map_err(PickError::Backend)?;
        let read = self.render_if_dirty_and_read(rect);
        let unbind = self.backend.unbind_target().map_err(PickError::Backend);
        read?;
        unbind?;

        let mut hit = vec![false; point_count];
        for pixel in self.region.chunks_exact(RGBA_NUM_ELEMENTS) {
            if let Some(index) = index_from_pixel(pixel, point_count) {
                hit[index] = true;
            }
        }

        Ok(hit
            .iter()
            .enumerate()
            .filter_map(|(i, &h)| h.then_some(i))
            .collect())
    }

    /// The hover outcome is not refreshed here, so `dirty` stays set for the
    /// next tick.
    fn render_if_dirty_and_read(&mut self, rect: PixelRect) -> Result<(), PickError<B::Error>> {
        if self.dirty {
            self.backend.clear_target().map_err(PickError::Backend)?;
            self.backend
                .render_picking_scene()
                .map_err(PickError::Backend)?;
        }
        self.backend
            .read_pixels(rect, &mut self.region)
            .map_err(PickError::Backend)
    }

    fn ensure_target(&mut self) -> Result<(), PickError<B::Error>> {
        let wanted = self.viewport.target_size();
        if self.backend.target_size() != Some(wanted) {
            log::debug!(
                "recreating picking target at {}x{}",
                wanted.width,
                wanted.height
            );
            self.backend
                .recreate_target(wanted)
                .map_err(PickError::Backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_bytes;

    #[derive(Debug, Error)]
    #[error("mock backend failure")]
    struct MockError;

    /// Serves pixels from a synthetic RGBA8 frame and records calls.
    #[derive(Default)]
    struct MockBackend {
        size: Option<TargetSize>,
        frame: Vec<u8>,
        calls: Vec<&'static str>,
        scene: PickingAttributes,
        reads: Vec<PixelRect>,
        fail_reads: bool,
    }

    impl MockBackend {
        fn paint(&mut self, x: u32, y: u32, raw_id: u32) {
            let size = self.size.unwrap();
            let i = ((y * size.width + x) as usize) * 4;
            let [r, g, b] = encode_bytes(raw_id);
            self.frame[i..i + 4].copy_from_slice(&[r, g, b, 255]);
        }

        fn paint_point(&mut self, x: u32, y: u32, index: usize) {
            self.paint(x, y, index as u32 + 1);
        }
    }

    impl PickingBackend for MockBackend {
        type Error = MockError;

        fn recreate_target(&mut self, size: TargetSize) -> Result<(), MockError> {
            self.calls.push("recreate");
            self.size = Some(size);
            self.frame = vec![0; (size.width * size.height * 4) as usize];
            Ok(())
        }

        fn target_size(&self) -> Option<TargetSize> {
            self.size
        }

        fn bind_target(&mut self) -> Result<(), MockError> {
            self.calls.push("bind");
            Ok(())
        }

        fn clear_target(&mut self) -> Result<(), MockError> {
            self.calls.push("clear");
            Ok(())
        }

        fn render_picking_scene(&mut self) -> Result<(), MockError> {
            self.calls.push("render");
            Ok(())
        }

        fn read_pixels(&mut self, rect: PixelRect, out: &mut [u8]) -> Result<(), MockError> {
            self.calls.push("read");
            self.reads.push(rect);
            if self.fail_reads {
                return Err(MockError);
            }
            let size = self.size.unwrap();
            let row = rect.width as usize * 4;
            for r in 0..rect.height {
                let src = (((rect.y + r) * size.width + rect.x) * 4) as usize;
                let dst = r as usize * row;
                out[dst..dst + row].copy_from_slice(&self.frame[src..src + row]);
            }
            Ok(())
        }

        fn unbind_target(&mut self) -> Result<(), MockError> {
            self.calls.push("unbind");
            Ok(())
        }

        fn upload_scene(&mut self, attributes: &PickingAttributes) -> Result<(), MockError> {
            self.calls.push("upload");
            self.scene = attributes.clone();
            Ok(())
        }

        fn write_scales(&mut self, first: usize, scales: &[f32]) -> Result<(), MockError> {
            self.calls.push("scales");
            self.scene.scales[first..first + scales.len()].copy_from_slice(scales);
            Ok(())
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(100.0, 50.0, 1.0)
    }

    fn pipeline(points: usize) -> PickingPipeline<MockBackend> {
        let mut p = PickingPipeline::new(MockBackend::default(), viewport()).unwrap();
        let positions = vec![[0.0; 3]; points];
        let scales = vec![1.0; points];
        p.set_scene(&positions, &scales).unwrap();
        p
    }

    #[test]
    fn hit_under_pointer() {
        let mut p = pipeline(10);
        p.backend_mut().paint_point(25, 10, 4);
        p.set_pointer(Some(pointer_to_ndc(25.5, 10.5, &viewport())));

        assert_eq!(p.tick().unwrap(), PickOutcome::Hit(4));
        let b = p.backend();
        assert_eq!(
            &b.calls[b.calls.len() - 5..],
            &["bind", "clear", "render", "read", "unbind"]
        );
        assert_eq!(
            b.reads,
            vec![PixelRect {
                x: 25,
                y: 10,
                width: 1,
                height: 1
            }]
        );
    }

    #[test]
    fn point_zero_is_pickable() {
        let mut p = pipeline(3);
        p.backend_mut().paint_point(0, 0, 0);
        p.set_pointer(Some(pointer_to_ndc(0.0, 0.0, &viewport())));
        assert_eq!(p.tick().unwrap(), PickOutcome::Hit(0));
    }

    #[test]
    fn background_and_out_of_range_ids_miss() {
        let mut p = pipeline(3);
        p.set_pointer(Some(pointer_to_ndc(50.0, 25.0, &viewport())));
        assert_eq!(p.tick().unwrap(), PickOutcome::Miss);

        p.backend_mut().paint_point(50, 25, 3);
        p.mark_camera_moved();
        assert_eq!(p.tick().unwrap(), PickOutcome::Miss);
    }

    #[test]
    fn pointer_outside_target_issues_no_read() {
        let mut p = pipeline(3);
        p.set_pointer(Some(Pointer {
            ndc_x: 1.5,
            ndc_y: 0.0,
        }));
        assert_eq!(p.tick().unwrap(), PickOutcome::Unchanged);
        assert!(p.backend().reads.is_empty());
        assert_eq!(p.backend().calls.last(), Some(&"unbind"));

        p.set_pointer(None);
        assert_eq!(p.tick().unwrap(), PickOutcome::Unchanged);
        assert!(p.backend().reads.is_empty());
    }

    #[test]
    fn idle_frames_skip_the_gpu() {
        let mut p = pipeline(5);
        p.backend_mut().paint_point(10, 10, 2);
        p.set_pointer(Some(pointer_to_ndc(10.5, 10.5, &viewport())));
        assert_eq!(p.tick().unwrap(), PickOutcome::Hit(2));
        let calls = p.backend().calls.len();

        assert_eq!(p.tick().unwrap(), PickOutcome::Hit(2));
        assert_eq!(p.backend().calls.len(), calls);

        p.mark_camera_moved();
        p.tick().unwrap();
        assert!(p.backend().calls.len() > calls);
    }

    #[test]
    fn resize_recreates_target_before_next_read() {
        let mut p = pipeline(5);
        p.set_viewport(Viewport::new(40.0, 30.0, 2.0)).unwrap();
        assert_eq!(
            p.backend().size,
            Some(TargetSize {
                width: 80,
                height: 60
            })
        );

        p.backend_mut().paint_point(79, 59, 1);
        p.set_pointer(Some(pointer_to_ndc(39.9, 29.9, &p.viewport())));
        assert_eq!(p.tick().unwrap(), PickOutcome::Hit(1));
        assert_eq!(p.backend().calls.iter().filter(|c| **c == "recreate").count(), 2);
    }

    #[test]
    fn backend_failure_still_unbinds() {
        let mut p = pipeline(2);
        p.backend_mut().fail_reads = true;
        p.set_pointer(Some(pointer_to_ndc(1.0, 1.0, &viewport())));
        assert!(matches!(p.tick(), Err(PickError::Backend(MockError))));
        assert_eq!(p.backend().calls.last(), Some(&"unbind"));
    }

    #[test]
    fn scene_mirrors_positions_and_scales() {
        let mut p = PickingPipeline::new(MockBackend::default(), viewport()).unwrap();
        p.set_scene(&[[0.5, 0.0, -0.5], [1.0, 1.0, 1.0]], &[1.0, 1.5])
            .unwrap();
        let scene = &p.backend().scene;
        assert_eq!(scene.positions[0], [0.5, 0.0, -0.5]);
        assert_eq!(scene.colors[1], crate::codec::identity_color(1));

        p.patch_scale(1, 2.0).unwrap();
        assert_eq!(p.backend().scene.scales, vec![1.0, 2.0]);
        p.set_scales(&[1.5, 1.0]).unwrap();
        assert_eq!(p.backend().scene.scales, vec![1.5, 1.0]);
        assert!(matches!(
            p.set_scales(&[1.0]),
            Err(PickError::ScaleCount { found: 1, point_count: 2 })
        ));
        assert!(matches!(
            p.patch_scale(2, 2.0),
            Err(PickError::ScaleOutOfRange { index: 2, point_count: 2 })
        ));
    }

    #[test]
    fn bounding_box_collects_unique_ids_in_order() {
        let mut p = pipeline(10);
        {
            let b = p.backend_mut();
            b.paint_point(11, 11, 7);
            b.paint_point(12, 11, 7);
            b.paint_point(13, 12, 2);
            b.paint_point(14, 13, 0);
            b.paint(12, 12, 40); // beyond the dataset
            b.paint_point(30, 30, 5); // outside the box
        }
        let positions = vec![[0.0; 3]; 10];
        let ids = p
            .query_bounding_box(
                &ScatterBoundingBox {
                    x: 10.0,
                    y: 10.0,
                    width: 5.0,
                    height: 5.0,
                },
                Some(&positions),
            )
            .unwrap();
        assert_eq!(ids, vec![0, 2, 7]);
        assert_eq!(
            p.backend().reads.last(),
            Some(&PixelRect {
                x: 10,
                y: 10,
                width: 5,
                height: 5
            })
        );
    }

    #[test]
    fn bounding_box_without_positions_is_empty() {
        let mut p = pipeline(3);
        let bbox = ScatterBoundingBox {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        assert!(p.query_bounding_box(&bbox, None).unwrap().is_empty());
        assert!(p.backend().reads.is_empty());
    }

    #[test]
    fn unit_box_agrees_with_hover_read() {
        let positions = vec![[0.0; 3]; 6];
        for (x, y, painted) in [(33u32, 17u32, Some(5usize)), (3, 40, None)] {
            let mut p = pipeline(6);
            if let Some(i) = painted {
                p.backend_mut().paint_point(x, y, i);
            }
            let (fx, fy) = (f64::from(x) + 0.5, f64::from(y) + 0.5);
            p.set_pointer(Some(pointer_to_ndc(fx, fy, &viewport())));
            let hover = match p.tick().unwrap() {
                PickOutcome::Hit(i) => vec![i],
                _ => Vec::new(),
            };
            let bbox = ScatterBoundingBox {
                x: fx,
                y: fy,
                width: 1.0,
                height: 1.0,
            };
            assert_eq!(p.query_bounding_box(&bbox, Some(&positions)).unwrap(), hover);
        }
    }

    #[test]
    fn fractional_dpr_box_and_hover_pick_the_same_pixels() {
        let dpr = 1.75;
        let vp = Viewport::new(122.0 / dpr, 40.0, dpr);
        assert_eq!(
            vp.target_size(),
            TargetSize {
                width: 122,
                height: 70
            }
        );

        let mut p = PickingPipeline::new(MockBackend::default(), vp).unwrap();
        let positions = vec![[0.0; 3]; 4];
        p.set_scene(&positions, &[1.0; 4]).unwrap();
        for x in 0..122 {
            p.backend_mut().paint_point(x, 10, x as usize % 4);
        }

        let fy = 10.5 / dpr;
        for x in 0..122u32 {
            let fx = (f64::from(x) + 0.5) / dpr;
            p.set_pointer(Some(pointer_to_ndc(fx, fy, &vp)));
            let hover = p.tick().unwrap();
            assert_eq!(hover, PickOutcome::Hit(x as usize % 4), "column {x}");

            let bbox = ScatterBoundingBox {
                x: fx,
                y: fy,
                width: 1.0 / dpr,
                height: 1.0 / dpr,
            };
            let ids = p.query_bounding_box(&bbox, Some(&positions)).unwrap();
            assert_eq!(ids, vec![x as usize % 4], "column {x}");
            assert_eq!(
                p.backend().reads.last(),
                Some(&PixelRect {
                    x,
                    y: 10,
                    width: 1,
                    height: 1
                })
            );
        }
    }

    #[test]
    fn physical_viewport_maps_back_to_surface_size() {
        for (w, h, dpr) in [(122, 70, 1.75), (1366, 705, 1.25), (801, 599, 1.5), (640, 480, 0.0)] {
            assert_eq!(
                Viewport::from_physical(w, h, dpr).target_size(),
                TargetSize {
                    width: w,
                    height: h
                }
            );
        }
    }

    #[test]
    fn box_query_rerenders_a_stale_target() {
        let mut p = pipeline(4);
        p.set_pointer(Some(pointer_to_ndc(1.5, 1.5, &viewport())));
        p.tick().unwrap();
        let bbox = ScatterBoundingBox {
            x: 0.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        let positions = vec![[0.0; 3]; 4];

        // Fresh target: only the region is read.
        p.backend_mut().calls.clear();
        p.query_bounding_box(&bbox, Some(&positions)).unwrap();
        assert_eq!(p.backend().calls, ["bind", "read", "unbind"]);

        // After a camera move the box must not see the previous frame.
        p.mark_camera_moved();
        p.backend_mut().calls.clear();
        p.query_bounding_box(&bbox, Some(&positions)).unwrap();
        assert_eq!(
            p.backend().calls,
            ["bind", "clear", "render", "read", "unbind"]
        );

        // The hover pixel still gets refreshed on the next tick.
        p.backend_mut().calls.clear();
        p.tick().unwrap();
        assert!(p.backend().calls.contains(&"render"));
    }

    #[test]
    fn box_is_clipped_and_scaled() {
        let size = TargetSize {
            width: 200,
            height: 100,
        };
        let bbox = ScatterBoundingBox {
            x: 90.0,
            y: -5.0,
            width: 20.0,
            height: 0.2,
        };
        let vp = Viewport::new(100.0, 50.0, 2.0);
        // Entirely above the target.
        assert_eq!(bounding_box_to_rect(&bbox, &vp, size), None);
        let bbox = ScatterBoundingBox {
            x: 90.0,
            y: 10.0,
            width: 20.0,
            height: 0.2,
        };
        assert_eq!(
            bounding_box_to_rect(&bbox, &vp, size),
            Some(PixelRect {
                x: 180,
                y: 20,
                width: 20,
                height: 1
            })
        );
    }

    #[test]
    fn ndc_round_trip_to_pixels() {
        let size = TargetSize {
            width: 200,
            height: 100,
        };
        let vp = Viewport::new(100.0, 50.0, 2.0);
        assert_eq!(
            ndc_to_target_pixel(pointer_to_ndc(0.0, 0.0, &vp), size),
            Some((0, 0))
        );
        assert_eq!(
            ndc_to_target_pixel(pointer_to_ndc(50.0, 25.0, &vp), size),
            Some((100, 50))
        );
        assert_eq!(
            ndc_to_target_pixel(pointer_to_ndc(100.0, 25.0, &vp), size),
            None
        );
        assert_eq!(
            ndc_to_target_pixel(pointer_to_ndc(-1.0, 25.0, &vp), size),
            None
        );
    }
}
