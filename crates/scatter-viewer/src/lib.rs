// src/lib.rs
//! Interactive 2D/3D scatter plot viewer.
//!
//! Renders a normalized point set as instanced sprites with wgpu and uses
//! `scatterpick`'s off-screen color-id picking for hover and selection.

pub mod app;
pub mod camera;
pub mod config;
pub mod data;
pub mod picker;
pub mod renderer;
pub mod ui;
