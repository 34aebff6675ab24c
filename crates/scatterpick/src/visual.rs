//! Per-point color and scale arrays driven by selection and hover.
//!
//! Precedence, later steps overwriting earlier ones:
//! 1. every point gets the "no selection" color (or "unselected" when the
//!    selection is non-empty) and the default scale;
//! 2. selected points get the selected color and scale;
//! 3. the hovered point gets the hover color and scale, whatever its
//!    selection state.

use crate::color::{ColorCache, ColorParseError, Rgba};
use crate::constants::RGBA_NUM_ELEMENTS;
use crate::dataset::Dataset;
use crate::hover::HoverTransition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// User-facing point styling. Colors are CSS-style strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    pub color_no_selection: String,
    pub color_unselected: String,
    pub color_selected: String,
    pub color_hover: String,
    pub scale_default: f32,
    pub scale_selected: f32,
    pub scale_hover: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color_no_selection: "rgba(117, 117, 217, 0.7)".into(),
            color_unselected: "rgba(227, 227, 227, 0.7)".into(),
            color_selected: "rgba(250, 102, 102, 0.7)".into(),
            color_hover: "rgba(118, 11, 79, 0.7)".into(),
            scale_default: 1.0,
            scale_selected: 1.5,
            scale_hover: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("style option `{option}`: {source}")]
    Color {
        option: &'static str,
        #[source]
        source: ColorParseError,
    },
    #[error("style option `{option}` must be a positive number, got {value}")]
    NonPositiveScale { option: &'static str, value: f32 },
}

/// A [`StyleConfig`] with parsed colors and validated scales.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub no_selection: Rgba,
    pub unselected: Rgba,
    pub selected: Rgba,
    pub hover: Rgba,
    pub scale_default: f32,
    pub scale_selected: f32,
    pub scale_hover: f32,
}

/// The set of selected point identities. Iterates in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(BTreeSet<usize>);

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) -> bool {
        self.0.insert(index)
    }

    pub fn remove(&mut self, index: usize) -> bool {
        self.0.remove(&index)
    }

    /// Flips membership of `index`; returns whether it is now selected.
    pub fn toggle(&mut self, index: usize) -> bool {
        if self.0.remove(&index) {
            false
        } else {
            self.0.insert(index);
            true
        }
    }

    pub fn replace(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.0 = indices.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<usize> for Selection {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Color (`r, g, b, opacity`) and scale factor for every point, by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisualState {
    pub colors: Vec<[f32; 4]>,
    pub scales: Vec<f32>,
}

impl VisualState {
    /// Full rebuild for `point_count` points.
    pub fn build(
        point_count: usize,
        selection: &Selection,
        hover: Option<usize>,
        style: &ResolvedStyle,
    ) -> Self {
        let base = if selection.is_empty() {
            style.no_selection
        } else {
            style.unselected
        };
        let mut colors = vec![base.to_array(); point_count];
        let mut scales = vec![style.scale_default; point_count];

        let selected = style.selected.to_array();
        for index in selection.iter() {
            if index >= point_count {
                log::warn!("selected point {index} is out of range ({point_count} points)");
                continue;
            }
            colors[index] = selected;
            scales[index] = style.scale_selected;
        }

        if let Some(index) = hover {
            if index < point_count {
                colors[index] = style.hover.to_array();
                scales[index] = style.scale_hover;
            } else {
                log::warn!("hover point {index} is out of range ({point_count} points)");
            }
        }

        Self { colors, scales }
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// The color array as `RGBA_NUM_ELEMENTS` floats per point.
    pub fn colors_flat(&self) -> &[f32] {
        let flat: &[f32] = bytemuck::cast_slice(&self.colors);
        debug_assert_eq!(flat.len(), self.len() * RGBA_NUM_ELEMENTS);
        flat
    }

    /// What point `index` looks like when it is not hovered.
    pub fn base_entry(index: usize, selection: &Selection, style: &ResolvedStyle) -> ([f32; 4], f32) {
        if selection.contains(index) {
            (style.selected.to_array(), style.scale_selected)
        } else if selection.is_empty() {
            (style.no_selection.to_array(), style.scale_default)
        } else {
            (style.unselected.to_array(), style.scale_default)
        }
    }

    /// Incremental hover update: restores the previously hovered point to
    /// its base look, then paints the newly hovered one. Equivalent to a
    /// full rebuild with the new hover index.
    pub fn apply_transition(
        &mut self,
        transition: HoverTransition,
        selection: &Selection,
        style: &ResolvedStyle,
    ) {
        if let Some(prev) = transition.from {
            if prev < self.len() {
                let (color, scale) = Self::base_entry(prev, selection, style);
                self.colors[prev] = color;
                self.scales[prev] = scale;
            }
        }
        if let Some(next) = transition.to {
            if next < self.len() {
                self.colors[next] = style.hover.to_array();
                self.scales[next] = style.scale_hover;
            }
        }
    }
}

/// Resolves styles through an owned color cache and builds visual state.
#[derive(Debug, Default)]
pub struct VisualStateBuilder {
    cache: ColorCache,
}

impl VisualStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, style: &StyleConfig) -> Result<ResolvedStyle, StyleError> {
        let mut color = |option: &'static str, value: &str| {
            self.cache
                .get(value)
                .map_err(|source| StyleError::Color { option, source })
        };
        let no_selection = color("colorNoSelection", &style.color_no_selection)?;
        let unselected = color("colorUnselected", &style.color_unselected)?;
        let selected = color("colorSelected", &style.color_selected)?;
        let hover = color("colorHover", &style.color_hover)?;

        let scale = |option: &'static str, value: f32| {
            if value > 0.0 && value.is_finite() {
                Ok(value)
            } else {
                Err(StyleError::NonPositiveScale { option, value })
            }
        };

        Ok(ResolvedStyle {
            no_selection,
            unselected,
            selected,
            hover,
            scale_default: scale("scaleDefault", style.scale_default)?,
            scale_selected: scale("scaleSelected", style.scale_selected)?,
            scale_hover: scale("scaleHover", style.scale_hover)?,
        })
    }

    /// Builds fresh color and scale arrays for `dataset`.
    pub fn build(
        &mut self,
        dataset: &Dataset,
        selection: &Selection,
        hover: Option<usize>,
        style: &StyleConfig,
    ) -> Result<VisualState, StyleError> {
        let resolved = self.resolve(style)?;
        Ok(VisualState::build(dataset.len(), selection, hover, &resolved))
    }

    pub fn cache(&self) -> &ColorCache {
        &self.cache
    }
}
