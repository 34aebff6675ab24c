use anyhow::{Context, Result};
use clap::Parser;
use scatterpick::constants::SCATTER_PLOT_CUBE_LENGTH;
use scatterpick::StyleConfig;
use std::path::PathBuf;

/// `scatter_viewer` - An interactive 2D/3D scatter plot.
///
/// Loads a point set from JSON, fits it into a cube around the origin and
/// renders it with hover highlighting and click/box selection.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Path to the dataset JSON file.
    ///
    /// Either `{"points": [[x, y(, z)], ..], "metadata": [..]}` or a
    /// projection export with `projection`, `labels` and `labelNames`.
    #[arg(env = "SCATTER_DATASET")]
    pub dataset: PathBuf,

    /// Side length of the cube the data is normalized into.
    #[arg(long, env = "SCATTER_CUBE_LENGTH", default_value_t = SCATTER_PLOT_CUBE_LENGTH)]
    pub cube_length: f32,

    /// Base point sprite diameter in pixels, before per-point scaling.
    #[arg(long, env = "SCATTER_POINT_SIZE", default_value_t = 6.0)]
    pub point_size: f32,

    /// Lower bound on the on-screen sprite diameter in pixels.
    #[arg(long, env = "SCATTER_MIN_POINT_SIZE", default_value_t = 2.0)]
    pub min_point_size: f32,

    /// Shrink sprites with distance from the camera.
    #[arg(long, env = "SCATTER_SIZE_ATTENUATION", default_value_t = false)]
    pub size_attenuation: bool,

    /// Hide the reference grid and the X/Y/Z axis lines.
    #[arg(long, env = "SCATTER_HIDE_AXES", default_value_t = false)]
    pub hide_axes: bool,

    /// Auto-rotation speed in radians per second; 0 disables it.
    #[arg(long, env = "SCATTER_AUTO_ROTATE", default_value_t = 0.0)]
    pub auto_rotate: f32,

    /// Optional JSON file overriding the point style (camelCase keys).
    #[arg(long, env = "SCATTER_STYLE")]
    pub style: Option<PathBuf>,
}

impl Config {
    /// Reads the style file, or returns the default style when none is set.
    pub fn load_style(&self) -> Result<StyleConfig> {
        let Some(path) = &self.style else {
            return Ok(StyleConfig::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading style file {}", path.display()))?;
        parse_style(&raw).with_context(|| format!("parsing style file {}", path.display()))
    }
}

fn parse_style(raw: &str) -> Result<StyleConfig> {
    Ok(serde_json::from_str(raw)?)
}
