pub mod align;
pub mod dataset;
