//! Shared constants for the picking and normalization engine.

/// Side length of the cube every dataset is normalized into.
pub const SCATTER_PLOT_CUBE_LENGTH: f32 = 2.0;

/// Components per entry of the visual color array (r, g, b, opacity).
pub const RGBA_NUM_ELEMENTS: usize = 4;

/// Components per entry of the world-space position array.
pub const XYZ_NUM_ELEMENTS: usize = 3;

/// Raw 24-bit value a cleared picking target reads back as.
pub const BACKGROUND_ID: u32 = 0x000000;

/// Largest value the identity codec can carry.
pub const MAX_ENCODED_ID: u32 = 0xFF_FFFF;

/// Pickable point limit. Identities are offset by one so that
/// `BACKGROUND_ID` never aliases point 0.
pub const MAX_POINTS: usize = MAX_ENCODED_ID as usize;
