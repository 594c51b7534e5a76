use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use serde::Serialize;

/// Sum of absolute per-class deltas (percentage points) above which a sample
/// counts as changed. Strictly greater: a full swap of one half, 50 + 50, is
/// not enough.
pub const CHANGE_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassDelta {
    pub class: String,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassChange {
    Fractions(Vec<ClassDelta>),
    Binary(bool),
}

pub fn fraction_deltas(current: &[f64], previous: &[f64]) -> Vec<f64> {
    current
        .iter()
        .zip(previous)
        .map(|(now, before)| now - before)
        .collect()
}

pub fn is_changed(deltas: &[f64]) -> bool {
    deltas.iter().map(|delta| delta.abs()).sum::<f64>() > CHANGE_THRESHOLD
}

/// Observations for the requested year only, shaped (dates in year, bands).
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSample {
    pub sample_id: String,
    pub year: i32,
    pub series: Array2<f64>,
    pub change: ClassChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearContext {
    pub start_of_year: NaiveDate,
    pub dates: Vec<NaiveDate>,
}

/// Normalised difference index for every date up to the end of the requested
/// year, shaped (dates, 1, 1).
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeriesSample {
    pub sample_id: String,
    pub context: YearContext,
    pub series: Array3<f64>,
    pub change: ClassChange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DerivedSample {
    Tensor(TensorSample),
    IndexSeries(IndexSeriesSample),
}

impl DerivedSample {
    pub fn sample_id(&self) -> &str {
        match self {
            DerivedSample::Tensor(sample) => &sample.sample_id,
            DerivedSample::IndexSeries(sample) => &sample.sample_id,
        }
    }

    pub fn change(&self) -> &ClassChange {
        match self {
            DerivedSample::Tensor(sample) => &sample.change,
            DerivedSample::IndexSeries(sample) => &sample.change,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            DerivedSample::Tensor(sample) => sample.series.shape().to_vec(),
            DerivedSample::IndexSeries(sample) => sample.series.shape().to_vec(),
        }
    }
}
