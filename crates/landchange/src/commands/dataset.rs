use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use landchange_core::dataset::{ChangeDataset, DerivedSample, IndexedDataset};
use landchange_core::DatasetConfig;
use serde_json::{json, Value};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Print sample count, bands, classes and the date span
    Summary {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print one derived sample
    Sample {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        index: usize,
    },
}

pub fn handle_dataset_command(command: DatasetCommand) -> Result<()> {
    match command {
        DatasetCommand::Summary { config } => {
            let dataset = open_dataset(&config)?;
            let summary = json!({
                "samples": dataset.len(),
                "bands": dataset.band_names(),
                "classes": dataset.classes(),
                "first_date": dataset.dates().first(),
                "last_date": dataset.dates().last(),
                "dates": dataset.dates().len(),
                "first_year": dataset.options().first_year,
                "mode": dataset.options().mode,
                "target": dataset.options().target,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        DatasetCommand::Sample { config, index } => {
            let dataset = open_dataset(&config)?;
            let sample = dataset
                .get(index)
                .with_context(|| format!("failed to derive sample {index}"))?;
            println!("{}", serde_json::to_string_pretty(&sample_to_json(&sample))?);
        }
    }
    Ok(())
}

fn open_dataset(path: &Path) -> Result<ChangeDataset> {
    let config = DatasetConfig::load(path)
        .with_context(|| format!("failed to load dataset config {}", path.display()))?;
    let dataset = ChangeDataset::open(&config).context("failed to open change dataset")?;
    info!(config = %path.display(), samples = dataset.len(), "dataset opened");
    Ok(dataset)
}

fn sample_to_json(sample: &DerivedSample) -> Value {
    let (values, extra) = match sample {
        DerivedSample::Tensor(tensor) => (
            tensor.series.iter().copied().map(finite_or_null).collect::<Vec<_>>(),
            json!({ "year": tensor.year }),
        ),
        DerivedSample::IndexSeries(series) => (
            series.series.iter().copied().map(finite_or_null).collect(),
            json!({ "context": series.context }),
        ),
    };

    let mut object = json!({
        "sample_id": sample.sample_id(),
        "change": sample.change(),
        "shape": sample.shape(),
        "values": values,
    });
    if let (Some(object), Value::Object(extra)) = (object.as_object_mut(), extra) {
        object.extend(extra);
    }
    object
}

fn finite_or_null(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use landchange_core::dataset::{ClassChange, IndexSeriesSample, TensorSample, YearContext};
    use ndarray::Array2;

    use super::*;

    #[test]
    fn tensor_sample_json_nulls_missing_values() {
        let sample = DerivedSample::Tensor(TensorSample {
            sample_id: "1001".to_string(),
            year: 2016,
            series: ndarray_2x1(),
            change: ClassChange::Binary(true),
        });

        let value = sample_to_json(&sample);
        assert_eq!(value["sample_id"], "1001");
        assert_eq!(value["year"], 2016);
        assert_eq!(value["shape"], json!([2, 1]));
        assert_eq!(value["values"], json!([0.25, null]));
        assert_eq!(value["change"], json!({ "binary": true }));
    }

    #[test]
    fn index_series_json_carries_year_context() {
        let start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let sample = DerivedSample::IndexSeries(IndexSeriesSample {
            sample_id: "1002".to_string(),
            context: YearContext {
                start_of_year: start,
                dates: vec![start],
            },
            series: ndarray_2x1().into_shape_with_order((2, 1, 1)).unwrap(),
            change: ClassChange::Fractions(Vec::new()),
        });

        let value = sample_to_json(&sample);
        assert_eq!(value["context"]["start_of_year"], "2016-01-01");
        assert_eq!(value["shape"], json!([2, 1, 1]));
    }

    fn ndarray_2x1() -> Array2<f64> {
        Array2::from_shape_vec((2, 1), vec![0.25, f64::NAN]).unwrap()
    }
}
