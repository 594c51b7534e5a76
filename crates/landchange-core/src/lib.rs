pub mod align;
pub mod config;
pub mod dataset;
pub mod geotable;
pub mod grid;
pub mod outputs;

pub use align::{align_to_grid, AlignError, AlignOptions, AlignResult, AlignSummary};
pub use config::{ConfigError, DatasetConfig};
pub use dataset::{ChangeDataset, DatasetError, DerivedSample, IndexedDataset};
pub use geotable::{Crs, GeoTable};
pub use grid::{GridCentroid, GridError, GridIndex, UtmGrid, UtmZone};
