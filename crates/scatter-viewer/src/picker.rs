//! wgpu implementation of [`PickingBackend`].
//!
//! The picking target is an `Rgba8Unorm` color texture plus depth. "Binding"
//! the target opens a command encoder; clear and render record passes into
//! it; a pixel read copies the region into a mappable buffer, submits, and
//! blocks on the map. Unbinding submits whatever is still recorded.

use crate::data::types::{FrameUniformStd140, SceneGpu};
use crate::renderer::pipelines::points::{PointsPipeline, PointsVariant};
use crate::renderer::targets::{create_depth_texture, Targets};
use scatterpick::constants::RGBA_NUM_ELEMENTS;
use scatterpick::{PickingAttributes, PickingBackend, PixelRect, TargetSize};
use std::sync::{mpsc, Arc};
use thiserror::Error;

pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[derive(Debug, Error)]
pub enum GpuPickerError {
    #[error("picking target has not been created")]
    NoTarget,
    #[error("read region {rect:?} exceeds the {width}x{height} picking target")]
    RegionOutOfBounds {
        rect: PixelRect,
        width: u32,
        height: u32,
    },
    #[error("output buffer holds {found} bytes, region needs {needed}")]
    OutputTooSmall { found: usize, needed: usize },
    #[error("mapping the readback buffer failed: {0}")]
    Map(#[from] wgpu::BufferAsyncError),
    #[error("readback callback was dropped before completing")]
    MapCallbackDropped,
    #[error("scale write for points {first}..{end} but the picking scene has {len} points")]
    ScaleOutOfRange { first: usize, end: usize, len: usize },
}

/// Bytes per row of a texture copy, padded to wgpu's copy alignment.
pub fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * RGBA_NUM_ELEMENTS as u32;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

/// Copies `row_bytes`-wide rows out of a buffer padded to `padded_row` per row.
pub fn strip_row_padding(padded: &[u8], padded_row: usize, row_bytes: usize, out: &mut [u8]) {
    for (src, dst) in padded
        .chunks(padded_row)
        .zip(out.chunks_exact_mut(row_bytes))
    {
        dst.copy_from_slice(&src[..row_bytes]);
    }
}

struct PickingTarget {
    color_tex: wgpu::Texture,
    color: wgpu::TextureView,
    _depth_tex: wgpu::Texture,
    depth: wgpu::TextureView,
    size: TargetSize,
}

impl PickingTarget {
    fn new(device: &wgpu::Device, size: TargetSize) -> Self {
        let color_tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Picking Color Target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth_tex = create_depth_texture(device, "Picking Depth Target", size.width, size.height);
        Self {
            color: color_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            depth: depth_tex.create_view(&wgpu::TextureViewDescriptor::default()),
            color_tex,
            _depth_tex: depth_tex,
            size,
        }
    }
}

/// Mappable buffer that grows to fit the largest region read so far.
struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
}

impl ReadbackBuffer {
    const INITIAL_CAPACITY: u64 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64;

    fn new(device: &wgpu::Device, capacity: u64) -> Self {
        Self {
            buffer: Self::create(device, capacity),
            capacity,
        }
    }

    fn create(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Picking Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        })
    }

    /// Ensure the buffer can hold at least `size` bytes, recreating if needed.
    fn ensure_capacity(&mut self, device: &wgpu::Device, size: u64) {
        if size > self.capacity {
            let new_capacity = (self.capacity * 3 / 2).max(size);
            self.buffer = Self::create(device, new_capacity);
            self.capacity = new_capacity;
        }
    }
}

fn pending_encoder<'a>(
    slot: &'a mut Option<wgpu::CommandEncoder>,
    device: &wgpu::Device,
) -> &'a mut wgpu::CommandEncoder {
    slot.get_or_insert_with(|| {
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Picking Encoder"),
        })
    })
}

/// Off-screen picking renderer sharing the device with the visible scene.
pub struct GpuPicker {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    points: PointsPipeline,
    frame_ubo: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    frame: FrameUniformStd140,
    target: Option<PickingTarget>,
    scene: Option<SceneGpu>,
    readback: ReadbackBuffer,
    encoder: Option<wgpu::CommandEncoder>,
}

impl GpuPicker {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let points = PointsPipeline::new(
            &device,
            PICK_FORMAT,
            Targets::DEPTH_FORMAT,
            PointsVariant::Pick,
        );
        let (frame_ubo, frame_bind) = points.create_frame_binding(&device, "Picking");
        let readback = ReadbackBuffer::new(&device, ReadbackBuffer::INITIAL_CAPACITY);
        Self {
            device,
            queue,
            points,
            frame_ubo,
            frame_bind,
            frame: bytemuck::Zeroable::zeroed(),
            target: None,
            scene: None,
            readback,
            encoder: None,
        }
    }

    /// Camera and sprite parameters shared with the visible pass. The
    /// viewport size is replaced with the picking target's own size.
    pub fn set_frame(&mut self, frame: FrameUniformStd140) {
        self.frame = frame;
    }

    fn submit_pending(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn check_region(&self, rect: PixelRect) -> Result<(), GpuPickerError> {
        let target = self.target.as_ref().ok_or(GpuPickerError::NoTarget)?;
        let TargetSize { width, height } = target.size;
        let fits = rect.width > 0
            && rect.height > 0
            && rect.x.checked_add(rect.width).is_some_and(|x1| x1 <= width)
            && rect.y.checked_add(rect.height).is_some_and(|y1| y1 <= height);
        if fits {
            Ok(())
        } else {
            Err(GpuPickerError::RegionOutOfBounds { rect, width, height })
        }
    }
}

impl PickingBackend for GpuPicker {
    type Error = GpuPickerError;

    fn recreate_target(&mut self, size: TargetSize) -> Result<(), GpuPickerError> {
        // Anything recorded against the old target is stale.
        self.encoder = None;
        self.target = Some(PickingTarget::new(&self.device, size));
        Ok(())
    }

    fn target_size(&self) -> Option<TargetSize> {
        self.target.as_ref().map(|t| t.size)
    }

    fn bind_target(&mut self) -> Result<(), GpuPickerError> {
        let size = self.target_size().ok_or(GpuPickerError::NoTarget)?;
        self.frame.viewport_size = [size.width as f32, size.height as f32];
        self.queue
            .write_buffer(&self.frame_ubo, 0, bytemuck::bytes_of(&self.frame));
        pending_encoder(&mut self.encoder, &self.device);
        Ok(())
    }

    fn clear_target(&mut self) -> Result<(), GpuPickerError> {
        let target = self.target.as_ref().ok_or(GpuPickerError::NoTarget)?;
        let encoder = pending_encoder(&mut self.encoder, &self.device);

        // Alpha 0 marks "nothing drawn here".
        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Picking Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        Ok(())
    }

    fn render_picking_scene(&mut self) -> Result<(), GpuPickerError> {
        let target = self.target.as_ref().ok_or(GpuPickerError::NoTarget)?;
        let Some(scene) = self.scene.as_ref() else {
            return Ok(());
        };
        let encoder = pending_encoder(&mut self.encoder, &self.device);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Picking Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.points.draw_scene(&mut pass, &self.frame_bind, scene);
        Ok(())
    }

    fn read_pixels(&mut self, rect: PixelRect, out: &mut [u8]) -> Result<(), GpuPickerError> {
        self.check_region(rect)?;
        let needed = rect.byte_len();
        if out.len() < needed {
            return Err(GpuPickerError::OutputTooSmall {
                found: out.len(),
                needed,
            });
        }

        let padded_row = aligned_bytes_per_row(rect.width);
        let size = u64::from(padded_row) * u64::from(rect.height);
        self.readback.ensure_capacity(&self.device, size);

        let mut encoder = self.encoder.take().unwrap_or_else(|| {
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Picking Readback Encoder"),
                })
        });
        let target = self.target.as_ref().ok_or(GpuPickerError::NoTarget)?;
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &target.color_tex,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x,
                    y: rect.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &self.readback.buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row),
                    rows_per_image: Some(rect.height),
                },
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        // The single blocking point of the picking protocol.
        let slice = self.readback.buffer.slice(..size);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        rx.recv().map_err(|_| GpuPickerError::MapCallbackDropped)??;

        {
            let data = slice.get_mapped_range();
            let row_bytes = rect.width as usize * RGBA_NUM_ELEMENTS;
            strip_row_padding(&data, padded_row as usize, row_bytes, &mut out[..needed]);
        }
        self.readback.buffer.unmap();
        Ok(())
    }

    fn unbind_target(&mut self) -> Result<(), GpuPickerError> {
        self.submit_pending();
        Ok(())
    }

    fn upload_scene(&mut self, attributes: &PickingAttributes) -> Result<(), GpuPickerError> {
        self.scene = SceneGpu::new(
            &self.device,
            "Picking Scene",
            &attributes.positions,
            &attributes.colors,
            &attributes.scales,
        );
        Ok(())
    }

    fn write_scales(&mut self, first: usize, scales: &[f32]) -> Result<(), GpuPickerError> {
        let len = self.scene.as_ref().map_or(0, |s| s.len as usize);
        let end = first + scales.len();
        if end > len {
            return Err(GpuPickerError::ScaleOutOfRange { first, end, len });
        }
        if let Some(scene) = self.scene.as_ref() {
            scene.write_scales(&self.queue, first, scales);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        // Two rows of one pixel each, padded to 8 bytes.
        let padded = [1, 2, 3, 4, 0, 0, 0, 0, 5, 6, 7, 8, 0, 0, 0, 0];
        let mut out = [0u8; 8];
        strip_row_padding(&padded, 8, 4, &mut out);
        assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
