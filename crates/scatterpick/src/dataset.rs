//! Immutable point sets handed to the normalizer and the picking engine.

use crate::constants::MAX_POINTS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Number of coordinate components every point of a dataset carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimensions {
    Two,
    Three,
}

impl Dimensions {
    /// Maps a component count onto a supported dimensionality.
    pub fn from_len(len: usize) -> Option<Self> {
        match len {
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }

    #[inline]
    pub fn len(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// A metadata field value: either numeric or textual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Text(String),
}

/// Per-point metadata. Unknown keys land in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, MetadataValue>,
}

impl PointMetadata {
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// Errors raised while constructing a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("dataset has no points; dimensionality cannot be determined")]
    Empty,
    #[error("points must be 2 or 3 dimensional, found {found} components")]
    UnsupportedDimensions { found: usize },
    #[error("point {index} has {found} components, expected {expected}")]
    InconsistentDimensions {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("metadata has {metadata} entries but there are {points} points")]
    MetadataLength { points: usize, metadata: usize },
    #[error("{count} points exceed the pickable limit of {max}")]
    TooManyPoints { count: usize, max: usize },
    #[error("point {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// An ordered, immutable sequence of 2D or 3D points plus optional metadata.
///
/// Coordinates are stored flat with a stride of `dimensions.len()`.
/// Replacing points means building a new `Dataset`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    dimensions: Dimensions,
    coords: Vec<f64>,
    metadata: Vec<PointMetadata>,
}

impl Dataset {
    /// Builds a dataset from individual points. The first point fixes the
    /// dimensionality; every other point must match it.
    pub fn new<P: AsRef<[f64]>>(
        points: &[P],
        metadata: Vec<PointMetadata>,
    ) -> Result<Self, DatasetError> {
        let first = points.first().ok_or(DatasetError::Empty)?;
        let found = first.as_ref().len();
        let dimensions =
            Dimensions::from_len(found).ok_or(DatasetError::UnsupportedDimensions { found })?;

        let mut coords = Vec::with_capacity(points.len() * dimensions.len());
        for (index, point) in points.iter().enumerate() {
            let point = point.as_ref();
            if point.len() != dimensions.len() {
                return Err(DatasetError::InconsistentDimensions {
                    index,
                    expected: dimensions.len(),
                    found: point.len(),
                });
            }
            coords.extend_from_slice(point);
        }

        Self::from_flat(dimensions, coords, metadata)
    }

    /// Builds a dataset from an already-flattened coordinate buffer.
    pub fn from_flat(
        dimensions: Dimensions,
        coords: Vec<f64>,
        metadata: Vec<PointMetadata>,
    ) -> Result<Self, DatasetError> {
        let stride = dimensions.len();
        if coords.is_empty() {
            return Err(DatasetError::Empty);
        }
        if coords.len() % stride != 0 {
            return Err(DatasetError::InconsistentDimensions {
                index: coords.len() / stride,
                expected: stride,
                found: coords.len() % stride,
            });
        }

        let count = coords.len() / stride;
        if count > MAX_POINTS {
            return Err(DatasetError::TooManyPoints {
                count,
                max: MAX_POINTS,
            });
        }
        if !metadata.is_empty() && metadata.len() != count {
            return Err(DatasetError::MetadataLength {
                points: count,
                metadata: metadata.len(),
            });
        }
        if let Some(pos) = coords.iter().position(|v| !v.is_finite()) {
            return Err(DatasetError::NonFinite {
                index: pos / stride,
            });
        }

        Ok(Self {
            dimensions,
            coords,
            metadata,
        })
    }

    #[inline]
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len() / self.dimensions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Coordinates of point `index`; panics if out of range, like slice indexing.
    #[inline]
    pub fn point(&self, index: usize) -> &[f64] {
        let stride = self.dimensions.len();
        &self.coords[index * stride..(index + 1) * stride]
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.coords.chunks_exact(self.dimensions.len())
    }

    /// The flat coordinate buffer, `dimensions.len()` values per point.
    #[inline]
    pub fn coords(&self) -> &[f64] {
        &self.coords
    }

    /// Metadata for point `index`, if the dataset carries metadata.
    pub fn metadata(&self, index: usize) -> Option<&PointMetadata> {
        self.metadata.get(index)
    }

    pub fn has_metadata(&self) -> bool {
        !self.metadata.is_empty()
    }
}
