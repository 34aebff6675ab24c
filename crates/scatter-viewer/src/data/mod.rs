// src/data/mod.rs
//! Data handling modules for the scatter viewer.
//!
//! This module provides functionality for:
//! - Loading JSON datasets into a validated `scatterpick::Dataset`.
//! - Defining the data structures for GPU buffers.

pub mod dataset_file;
pub mod types;

// Re-export commonly used types for convenience.
pub use self::types::{FrameUniformStd140, SceneGpu};
