//! Point identity <-> RGB color packing.
//!
//! `encode`/`decode` are a plain bijection over 24-bit integers:
//! red carries bits 16-23, green bits 8-15, blue bits 0-7.
//!
//! The picking helpers (`identity_color`, `index_from_pixel`) shift every
//! point index up by one before encoding, so the cleared background
//! (`BACKGROUND_ID`) is never mistaken for point 0.

use crate::constants::{BACKGROUND_ID, MAX_ENCODED_ID, RGBA_NUM_ELEMENTS};

/// An identity color with channels normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Splits the low 24 bits of `id` into `[r, g, b]` bytes.
#[inline]
pub fn encode_bytes(id: u32) -> [u8; 3] {
    [
        ((id >> 16) & 0xFF) as u8,
        ((id >> 8) & 0xFF) as u8,
        (id & 0xFF) as u8,
    ]
}

/// Encodes `id` as a normalized color. Bits above 23 are discarded.
#[inline]
pub fn encode(id: u32) -> IdColor {
    let [r, g, b] = encode_bytes(id);
    IdColor {
        r: f32::from(r) / 255.0,
        g: f32::from(g) / 255.0,
        b: f32::from(b) / 255.0,
    }
}

/// Reassembles the integer carried by byte-valued channels.
#[inline]
pub fn decode(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// The RGBA color point `index` is drawn with in the picking scene.
#[inline]
pub fn identity_color(index: usize) -> [f32; 4] {
    debug_assert!(index < MAX_ENCODED_ID as usize);
    let c = encode(index as u32 + 1);
    [c.r, c.g, c.b, 1.0]
}

/// Identity colors for points `0..point_count`, in order.
pub fn identity_colors(point_count: usize) -> Vec<[f32; 4]> {
    (0..point_count).map(identity_color).collect()
}

/// Decodes one RGBA8 picking pixel.
///
/// Returns `None` for pixels nothing was drawn into (alpha 0), for the
/// background value, and for indices outside `0..point_count`.
#[inline]
pub fn index_from_pixel(pixel: &[u8], point_count: usize) -> Option<usize> {
    debug_assert!(pixel.len() >= RGBA_NUM_ELEMENTS);
    if pixel[3] == 0 {
        return None;
    }
    let raw = decode(pixel[0], pixel[1], pixel[2]);
    if raw == BACKGROUND_ID {
        return None;
    }
    let index = (raw - 1) as usize;
    (index < point_count).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_bytes(c: IdColor) -> (u8, u8, u8) {
        let q = |v: f32| (v * 255.0).round() as u8;
        (q(c.r), q(c.g), q(c.b))
    }

    #[test]
    fn encodes_channels_by_bit_range() {
        assert_eq!(
            encode(1),
            IdColor {
                r: 0.0,
                g: 0.0,
                b: 1.0 / 255.0
            }
        );
        assert_eq!(decode(0, 0, 1), 1);
        assert_eq!(encode_bytes(0x123456), [0x12, 0x34, 0x56]);
        assert_eq!(decode(0x12, 0x34, 0x56), 0x123456);
        assert_eq!(decode(0x41, 0x41, 0xA1), 0x4141A1);
        assert_eq!(decode(0xFF, 0xFF, 0xFF), MAX_ENCODED_ID);
        assert_eq!(decode(0, 0, 0), BACKGROUND_ID);
    }

    #[test]
    fn round_trips_every_24_bit_id() {
        for id in 0..=MAX_ENCODED_ID {
            let (r, g, b) = to_bytes(encode(id));
            assert_eq!(decode(r, g, b), id, "round trip failed for {id}");
        }
    }

    #[test]
    fn identity_colors_never_hit_background() {
        let colors = identity_colors(3);
        assert_eq!(colors[0], [0.0, 0.0, 1.0 / 255.0, 1.0]);
        assert_eq!(colors[2], [0.0, 0.0, 3.0 / 255.0, 1.0]);

        let px = |c: [f32; 4]| {
            let q = |v: f32| (v * 255.0).round() as u8;
            [q(c[0]), q(c[1]), q(c[2]), q(c[3])]
        };
        assert_eq!(index_from_pixel(&px(colors[0]), 3), Some(0));
        assert_eq!(index_from_pixel(&px(colors[2]), 3), Some(2));
    }

    #[test]
    fn pixel_misses() {
        // Nothing drawn.
        assert_eq!(index_from_pixel(&[0, 0, 5, 0], 10), None);
        // Cleared background with opaque alpha.
        assert_eq!(index_from_pixel(&[0, 0, 0, 255], 10), None);
        // Decodes past the end of the dataset.
        assert_eq!(index_from_pixel(&[0, 0, 11, 255], 10), None);
        assert_eq!(index_from_pixel(&[0, 0, 10, 255], 10), Some(9));
    }
}
