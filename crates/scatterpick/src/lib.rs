//! Scatterpick: normalization and color-id picking for large scatter plots.
//!
//! - `dataset`: immutable 2D/3D point sets with per-point metadata.
//! - `normalize`: maps arbitrary-range coordinates into a fixed cube,
//!   preserving the aspect ratio between axes.
//! - `codec`: packs point indices into 24-bit RGB "identity colors".
//! - `color` / `visual`: CSS color parsing and the per-point color and
//!   scale arrays driven by selection and hover.
//! - `hover`: the Idle / Hovering state machine fed by picking results.
//! - `picking`: the per-frame off-screen render + readback protocol,
//!   written against the `PickingBackend` capability trait.
//!
//! Picking convention: every identity color encodes `index + 1`, so the
//! cleared background `0x000000` never decodes to a point.

pub mod codec;
pub mod color;
pub mod constants;
pub mod dataset;
pub mod hover;
pub mod normalize;
pub mod picking;
pub mod visual;

pub use self::color::{ColorCache, ColorParseError, Rgba};
pub use self::dataset::{Dataset, DatasetError, Dimensions, MetadataValue, PointMetadata};
pub use self::hover::{HoverMachine, HoverState, HoverTransition};
pub use self::normalize::{axis_extents, normalize, Extent};
pub use self::picking::{
    bounding_box_to_rect, decode_pixel, ndc_to_target_pixel, pointer_to_ndc, PickError,
    PickOutcome, PickingAttributes, PickingBackend, PickingPipeline, PixelRect, Pointer,
    ScatterBoundingBox, TargetSize, Viewport,
};
pub use self::visual::{
    ResolvedStyle, Selection, StyleConfig, StyleError, VisualState, VisualStateBuilder,
};
