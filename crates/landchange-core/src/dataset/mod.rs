//! Year-over-year land cover change samples paired with their band time series.
//!
//! The addressable samples are the reference records dated after the
//! baseline year. Each `get` diffs a record against the same sample's record
//! one year earlier and attaches that sample's observations, shaped by
//! [`SampleMode`]. Nothing is cached; every call reads the immutable tables
//! loaded at construction, so `get` is safe to call from many threads.

mod sample;
mod series;

use chrono::NaiveDate;
use landchange_parser::{BandTable, ChangeReference, ChangeReferenceRecord, TableError};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatasetConfig;

pub use sample::{
    fraction_deltas, is_changed, ClassChange, ClassDelta, DerivedSample, IndexSeriesSample,
    TensorSample, YearContext, CHANGE_THRESHOLD,
};
pub use series::{normalized_difference, SampleSeries};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("sample {sample_id} has no reference record for {prior_year}, needed to diff {year}")]
    PriorYearNotFound {
        sample_id: String,
        year: i32,
        prior_year: i32,
    },
    #[error("band {band} does not share the date axis of {reference_band}: {reason}")]
    BandColumnMismatch {
        band: String,
        reference_band: String,
        reason: String,
    },
    #[error("sample {sample_id} has no row in band {band}")]
    SampleNotInBand { sample_id: String, band: String },
    #[error("index {index} is out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("index-series mode needs band {0}, which is not loaded")]
    MissingIndexBand(String),
    #[error("at least one band table is required")]
    NoBands,
    #[error("year {0} has no calendar representation")]
    InvalidYear(i32),
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Random access over derived samples.
pub trait IndexedDataset: Send + Sync {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Self::Item, DatasetError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleMode {
    /// Multi-band observations within the requested year.
    #[default]
    Tensor,
    /// One normalised difference index over every date up to the requested year.
    IndexSeries,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeTarget {
    #[default]
    Fractions,
    Binary,
}

/// Bands combined as `(nir - red) / (nir + red)` in index-series mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBands {
    pub nir: String,
    pub red: String,
}

impl Default for IndexBands {
    fn default() -> Self {
        Self {
            nir: "Global_SR_B5".to_string(),
            red: "Global_SR_B4".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOptions {
    pub first_year: i32,
    pub mode: SampleMode,
    pub target: ChangeTarget,
    pub index_bands: IndexBands,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            first_year: 2015,
            mode: SampleMode::default(),
            target: ChangeTarget::default(),
            index_bands: IndexBands::default(),
        }
    }
}

#[derive(Debug)]
pub struct ChangeDataset {
    reference: ChangeReference,
    addressable: Vec<usize>,
    bands: Vec<BandTable>,
    dates: Vec<NaiveDate>,
    index_positions: Option<(usize, usize)>,
    options: DatasetOptions,
}

impl ChangeDataset {
    pub fn new(
        reference: ChangeReference,
        bands: Vec<BandTable>,
        options: DatasetOptions,
    ) -> Result<Self, DatasetError> {
        let bands = align_band_dates(bands)?;
        let dates = bands[0].dates().to_vec();

        let index_positions = match options.mode {
            SampleMode::Tensor => None,
            SampleMode::IndexSeries => {
                let position = |name: &str| {
                    bands
                        .iter()
                        .position(|band| band.band() == name)
                        .ok_or_else(|| DatasetError::MissingIndexBand(name.to_string()))
                };
                Some((
                    position(&options.index_bands.nir)?,
                    position(&options.index_bands.red)?,
                ))
            }
        };

        let addressable = reference
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| record.year > options.first_year)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();

        info!(
            samples = addressable.len(),
            reference_records = reference.len(),
            bands = bands.len(),
            dates = dates.len(),
            first_year = options.first_year,
            mode = ?options.mode,
            "change dataset ready"
        );

        Ok(Self {
            reference,
            addressable,
            bands,
            dates,
            index_positions,
            options,
        })
    }

    /// Loads the reference table and every configured band from disk.
    pub fn open(config: &DatasetConfig) -> Result<Self, DatasetError> {
        let reference =
            landchange_parser::read_change_reference(&config.change_reference, &config.schema())?;

        let mut bands = Vec::with_capacity(config.bands.len());
        for band in &config.bands {
            bands.push(landchange_parser::read_band_table(
                &config.band_path(band),
                band,
                &config.id_column,
            )?);
        }

        Self::new(reference, bands, config.options())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|band| band.band()).collect()
    }

    pub fn classes(&self) -> &[String] {
        self.reference.classes()
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    /// `(sample_id, year)` behind an index.
    pub fn locate(&self, index: usize) -> Result<(&str, i32), DatasetError> {
        let record = self.record(index)?;
        Ok((record.sample_id.as_str(), record.year))
    }

    pub fn class_change(&self, index: usize) -> Result<ClassChange, DatasetError> {
        let record = self.record(index)?;
        self.change_for(record)
    }

    /// Every band's observations for one sample, on the shared date axis.
    pub fn series(&self, sample_id: &str) -> Result<SampleSeries, DatasetError> {
        let mut values = Array2::from_elem((self.dates.len(), self.bands.len()), f64::NAN);
        for (column, band) in self.bands.iter().enumerate() {
            let row = band
                .row(sample_id)
                .ok_or_else(|| DatasetError::SampleNotInBand {
                    sample_id: sample_id.to_string(),
                    band: band.band().to_string(),
                })?;
            values.column_mut(column).assign(&row);
        }

        Ok(SampleSeries {
            dates: self.dates.clone(),
            bands: self.bands.iter().map(|band| band.band().to_string()).collect(),
            values,
        })
    }

    fn record(&self, index: usize) -> Result<&ChangeReferenceRecord, DatasetError> {
        let position = self
            .addressable
            .get(index)
            .ok_or(DatasetError::IndexOutOfRange {
                index,
                len: self.addressable.len(),
            })?;
        Ok(&self.reference.records()[*position])
    }

    fn change_for(&self, record: &ChangeReferenceRecord) -> Result<ClassChange, DatasetError> {
        let prior_year = record.year - 1;
        let previous = self
            .reference
            .find(&record.sample_id, prior_year)
            .ok_or_else(|| DatasetError::PriorYearNotFound {
                sample_id: record.sample_id.clone(),
                year: record.year,
                prior_year,
            })?;

        let deltas = fraction_deltas(&record.fractions, &previous.fractions);
        Ok(match self.options.target {
            ChangeTarget::Binary => ClassChange::Binary(is_changed(&deltas)),
            ChangeTarget::Fractions => ClassChange::Fractions(
                self.reference
                    .classes()
                    .iter()
                    .zip(deltas)
                    .map(|(class, delta)| ClassDelta {
                        class: class.clone(),
                        delta,
                    })
                    .collect(),
            ),
        })
    }
}

impl IndexedDataset for ChangeDataset {
    type Item = DerivedSample;

    fn len(&self) -> usize {
        self.addressable.len()
    }

    fn get(&self, index: usize) -> Result<DerivedSample, DatasetError> {
        let record = self.record(index)?;
        let change = self.change_for(record)?;
        let series = self.series(&record.sample_id)?;

        match (self.options.mode, self.index_positions) {
            (SampleMode::IndexSeries, Some((nir, red))) => {
                let start_of_year = NaiveDate::from_ymd_opt(record.year, 1, 1)
                    .ok_or(DatasetError::InvalidYear(record.year))?;
                let (dates, values) = series.through_year(record.year);
                let ndi = normalized_difference(values.column(nir), values.column(red));

                Ok(DerivedSample::IndexSeries(IndexSeriesSample {
                    sample_id: record.sample_id.clone(),
                    context: YearContext {
                        start_of_year,
                        dates,
                    },
                    series: ndi.insert_axis(Axis(1)).insert_axis(Axis(2)),
                    change,
                }))
            }
            (SampleMode::IndexSeries, None) => Err(DatasetError::MissingIndexBand(
                self.options.index_bands.nir.clone(),
            )),
            (SampleMode::Tensor, _) => Ok(DerivedSample::Tensor(TensorSample {
                sample_id: record.sample_id.clone(),
                year: record.year,
                series: series.for_year(record.year),
                change,
            })),
        }
    }
}

/// The first band defines the date axis. Others must match it column for
/// column; extra trailing columns are trimmed.
fn align_band_dates(bands: Vec<BandTable>) -> Result<Vec<BandTable>, DatasetError> {
    let mut bands = bands.into_iter();
    let first = bands.next().ok_or(DatasetError::NoBands)?;
    let axis = first.dates().to_vec();
    let reference_band = first.band().to_string();

    let mut aligned = vec![first];
    for band in bands {
        let dates = band.dates();
        if dates.len() < axis.len() {
            return Err(DatasetError::BandColumnMismatch {
                band: band.band().to_string(),
                reference_band,
                reason: format!("{} date columns, expected {}", dates.len(), axis.len()),
            });
        }
        if let Some(column) = (0..axis.len()).find(|&idx| dates[idx] != axis[idx]) {
            return Err(DatasetError::BandColumnMismatch {
                band: band.band().to_string(),
                reference_band,
                reason: format!(
                    "date column {column} is {}, expected {}",
                    dates[column], axis[column]
                ),
            });
        }
        if dates.len() > axis.len() {
            warn!(
                band = band.band(),
                extra = dates.len() - axis.len(),
                "trimming trailing date columns"
            );
            aligned.push(band.truncated(axis.len()));
        } else {
            aligned.push(band);
        }
    }

    Ok(aligned)
}
