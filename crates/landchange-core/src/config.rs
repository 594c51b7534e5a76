use std::fs;
use std::path::{Path, PathBuf};

use landchange_parser::ReferenceSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{ChangeTarget, DatasetOptions, IndexBands, SampleMode};

/// Landsat 8 Collection 2 bands exported per sample.
pub const DEFAULT_BANDS: [&str; 8] = [
    "Global_SR_B1",
    "Global_SR_B2",
    "Global_SR_B3",
    "Global_SR_B4",
    "Global_SR_B5",
    "Global_SR_B6",
    "Global_SR_B7",
    "Global_ST_B10",
];

/// Land cover classes recorded in the reference fractions.
pub const DEFAULT_CLASSES: [&str; 12] = [
    "bare",
    "burnt",
    "crops",
    "fallow_shifting_cultivation",
    "grassland",
    "lichen_and_moss",
    "shrub",
    "snow_and_ice",
    "tree",
    "urban_built_up",
    "water",
    "wetland_herbaceous",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid dataset config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Dataset description, usually loaded from a TOML file:
///
/// ```toml
/// change_reference = "data/raw/Data_Global_quoted.csv"
/// timeseries_dir = "data/raw/timeseries"
/// mode = "index-series"
/// target = "binary"
/// ```
///
/// Band `name` is read from `<timeseries_dir>/<name>.<table_extension>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub change_reference: PathBuf,
    pub timeseries_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub table_extension: String,
    #[serde(default = "default_bands")]
    pub bands: Vec<String>,
    #[serde(default = "default_classes")]
    pub classes: Vec<String>,
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    #[serde(default)]
    pub mode: SampleMode,
    #[serde(default)]
    pub target: ChangeTarget,
    #[serde(default)]
    pub index_bands: IndexBands,
}

impl DatasetConfig {
    pub fn new(change_reference: impl Into<PathBuf>, timeseries_dir: impl Into<PathBuf>) -> Self {
        Self {
            change_reference: change_reference.into(),
            timeseries_dir: timeseries_dir.into(),
            table_extension: default_extension(),
            bands: default_bands(),
            classes: default_classes(),
            id_column: default_id_column(),
            year_column: default_year_column(),
            first_year: default_first_year(),
            mode: SampleMode::default(),
            target: ChangeTarget::default(),
            index_bands: IndexBands::default(),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a config file. Relative paths inside it resolve against the
    /// file's own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;

        if let Some(base) = path.parent() {
            config.change_reference = base.join(&config.change_reference);
            config.timeseries_dir = base.join(&config.timeseries_dir);
        }
        Ok(config)
    }

    pub fn band_path(&self, band: &str) -> PathBuf {
        self.timeseries_dir
            .join(format!("{band}.{}", self.table_extension))
    }

    pub fn schema(&self) -> ReferenceSchema {
        ReferenceSchema {
            id_column: self.id_column.clone(),
            year_column: self.year_column.clone(),
            classes: self.classes.clone(),
        }
    }

    pub fn options(&self) -> DatasetOptions {
        DatasetOptions {
            first_year: self.first_year,
            mode: self.mode,
            target: self.target,
            index_bands: self.index_bands.clone(),
        }
    }
}

fn default_extension() -> String {
    "csv".to_string()
}

fn default_bands() -> Vec<String> {
    DEFAULT_BANDS.iter().map(|band| band.to_string()).collect()
}

fn default_classes() -> Vec<String> {
    DEFAULT_CLASSES.iter().map(|class| class.to_string()).collect()
}

fn default_id_column() -> String {
    "sample_id".to_string()
}

fn default_year_column() -> String {
    "reference_year".to_string()
}

fn default_first_year() -> i32 {
    2015
}
