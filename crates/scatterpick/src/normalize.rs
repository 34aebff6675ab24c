//! Coordinate normalization into the fixed-size plot cube.
//!
//! Each axis is rescaled into a symmetric range around the origin. The axis
//! with the widest input range spans exactly `[-L/2, L/2]`; the others are
//! shrunk by the same ratio so the cloud keeps its aspect.

use crate::dataset::{Dataset, Dimensions};
use rayon::prelude::*;

/// The `[min, max]` pair of one coordinate axis across a dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: f64,
    pub max: f64,
}

impl Extent {
    /// Extent of an axis that carries no data (the z axis of 2D datasets).
    pub const ZERO: Self = Self { min: 0.0, max: 0.0 };

    /// Computes the extent of a sequence of values; `None` if it is empty.
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self { min: v, max: v }),
            Some(e) => Some(Self {
                min: e.min.min(v),
                max: e.max.max(v),
            }),
        })
    }

    #[inline]
    pub fn range(&self) -> f64 {
        (self.max - self.min).abs()
    }

    #[inline]
    fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Maps `value` linearly from `domain` onto `[lo, hi]`.
///
/// A zero-width domain has no slope; the midpoint of the output range is
/// returned instead of NaN.
#[inline]
pub fn scale_linear(value: f64, domain: Extent, (lo, hi): (f64, f64)) -> f64 {
    let span = domain.max - domain.min;
    if span == 0.0 {
        return (lo + hi) * 0.5;
    }
    (value - domain.min) / span * (hi - lo) + lo
}

/// Per-axis extents `[x, y, z]`; z is [`Extent::ZERO`] for 2D data.
pub fn axis_extents(dataset: &Dataset) -> [Extent; 3] {
    let stride = dataset.dimensions().len();
    let empty = [Extent {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    }; 3];

    let mut extents = dataset
        .coords()
        .par_chunks_exact(stride)
        .map(|p| {
            let mut e = [Extent::ZERO; 3];
            for (axis, &v) in p.iter().enumerate() {
                e[axis] = Extent { min: v, max: v };
            }
            e
        })
        .reduce(
            || empty,
            |a, b| [a[0].union(b[0]), a[1].union(b[1]), a[2].union(b[2])],
        );

    if dataset.is_empty() {
        extents = [Extent::ZERO; 3];
    }
    if dataset.dimensions() == Dimensions::Two {
        extents[2] = Extent::ZERO;
    }
    extents
}

/// Normalizes every point of `dataset` into a cube of side `cube_length`.
///
/// Returns one `[x, y, z]` per point in dataset order; z is exactly 0 for
/// 2D datasets. Constant axes and fully coincident datasets map to 0.
pub fn normalize(dataset: &Dataset, cube_length: f32) -> Vec<[f32; 3]> {
    let extents = axis_extents(dataset);
    let ranges = extents.map(|e| e.range());
    let max_range = ranges[0].max(ranges[1]).max(ranges[2]);
    let half = f64::from(cube_length) / 2.0;

    let out_ranges = ranges.map(|range| {
        if max_range > 0.0 {
            let s = half * (range / max_range);
            (-s, s)
        } else {
            (0.0, 0.0)
        }
    });

    let is_3d = dataset.dimensions() == Dimensions::Three;
    dataset
        .coords()
        .par_chunks_exact(dataset.dimensions().len())
        .map(|p| {
            let x = scale_linear(p[0], extents[0], out_ranges[0]);
            let y = scale_linear(p[1], extents[1], out_ranges[1]);
            let z = if is_3d {
                scale_linear(p[2], extents[2], out_ranges[2])
            } else {
                0.0
            };
            [x as f32, y as f32, z as f32]
        })
        .collect()
}

/// Views a position buffer as the flat `3 × N` float array GPUs consume.
#[inline]
pub fn as_flat(positions: &[[f32; 3]]) -> &[f32] {
    bytemuck::cast_slice(positions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ds<P: AsRef<[f64]>>(points: &[P]) -> Dataset {
        Dataset::new(points, Vec::new()).unwrap()
    }

    #[test]
    fn widest_axis_spans_the_cube() {
        let positions = normalize(
            &ds(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0], [0.0, 0.0, 0.0]]),
            2.0,
        );
        assert_eq!(
            as_flat(&positions),
            &[-1.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0, 0.0, 0.0]
        );
    }

    #[test]
    fn narrower_axes_keep_their_ratio() {
        let positions = normalize(&ds(&[[0.0, 0.0], [4.0, 2.0], [2.0, 1.0]]), 2.0);
        assert_eq!(positions[0], [-1.0, -0.5, 0.0]);
        assert_eq!(positions[1], [1.0, 0.5, 0.0]);
        assert_eq!(positions[2], [0.0, 0.0, 0.0]);

        let max_abs = as_flat(&positions)
            .iter()
            .fold(0.0f32, |m, v| m.max(v.abs()));
        assert_eq!(max_abs, 1.0);
    }

    #[test]
    fn larger_cube_scales_uniformly() {
        let positions = normalize(&ds(&[[-5.0, 100.0, 3.0], [5.0, 120.0, 8.0]]), 10.0);
        // y has the widest range (20) and spans [-5, 5].
        assert_eq!(positions[0][1], -5.0);
        assert_eq!(positions[1][1], 5.0);
        assert_eq!(positions[0][0], -2.5);
        assert_eq!(positions[1][0], 2.5);
        assert_eq!(positions[0][2], -1.25);
        assert_eq!(positions[1][2], 1.25);
    }

    #[test]
    fn coincident_points_collapse_to_origin() {
        let positions = normalize(&ds(&[[3.0, 3.0, 3.0], [3.0, 3.0, 3.0]]), 2.0);
        assert!(as_flat(&positions).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn constant_axis_maps_to_zero_without_nan() {
        let positions = normalize(&ds(&[[0.0, 7.0], [2.0, 7.0]]), 2.0);
        assert_eq!(positions, vec![[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
    }

    #[test]
    fn extents_ignore_z_for_2d() {
        let e = axis_extents(&ds(&[[1.0, -2.0], [3.0, 4.0]]));
        assert_eq!(e[0], Extent { min: 1.0, max: 3.0 });
        assert_eq!(e[1], Extent { min: -2.0, max: 4.0 });
        assert_eq!(e[2], Extent::ZERO);
        assert_eq!(Extent::of([2.0, -1.0, 5.0]), Some(Extent { min: -1.0, max: 5.0 }));
        assert_eq!(Extent::of(std::iter::empty::<f64>()), None);
    }
}
