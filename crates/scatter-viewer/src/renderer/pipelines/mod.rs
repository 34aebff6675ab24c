pub mod axes_grid;
pub mod points;
