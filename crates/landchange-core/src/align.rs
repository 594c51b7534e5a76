use std::collections::HashSet;

use geo_types::{LineString, Polygon};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geotable::{Crs, GeoTable};
use crate::grid::{GridError, GridIndex};

pub const CENTROID_X: &str = "centroid_x";
pub const CENTROID_Y: &str = "centroid_y";
pub const TILE: &str = "tile";

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("input is missing column '{0}'")]
    MissingColumn(String),
    #[error("row {row} could not be placed on the grid: {source}")]
    Grid {
        row: usize,
        #[source]
        source: GridError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignOptions {
    pub x_field: String,
    pub y_field: String,
    /// Grid cell side in metres.
    pub cell_size: f64,
    pub key_field: Option<String>,
    /// Keep only cells whose tile id starts with this prefix (e.g. a UTM zone number).
    pub tile_prefix: Option<String>,
    pub crs: Crs,
    /// Largest tolerated mean centroid drift, in degrees, before warning.
    pub centroid_tolerance: f64,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            x_field: "x".to_string(),
            y_field: "y".to_string(),
            cell_size: 100.0,
            key_field: None,
            tile_prefix: None,
            crs: Crs::wgs84(),
            centroid_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignSummary {
    pub input_rows: usize,
    pub missing_coordinates: usize,
    pub duplicate_keys: usize,
    pub outside_tile_prefix: usize,
    pub output_rows: usize,
}

#[derive(Debug, Clone)]
pub struct AlignResult {
    pub table: GeoTable,
    pub summary: AlignSummary,
}

/// Drops rows whose x or y is null or NaN. Returns the kept frame and the drop count.
pub fn drop_missing_coordinates(
    df: &DataFrame,
    x_field: &str,
    y_field: &str,
) -> Result<(DataFrame, usize), AlignError> {
    let xs = float_column(df, x_field)?;
    let ys = float_column(df, y_field)?;

    let mut keep = Vec::with_capacity(df.height());
    let mut dropped = 0;
    for (row, (x, y)) in xs.f64()?.into_iter().zip(ys.f64()?.into_iter()).enumerate() {
        let valid = matches!((x, y), (Some(x), Some(y)) if !x.is_nan() && !y.is_nan());
        if !valid {
            debug!(row, x = ?x, y = ?y, "dropping row with missing coordinate");
            dropped += 1;
        }
        keep.push(valid);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, dropped))
}

/// Keeps the first row for every distinct `key` value. Null keys compare equal.
pub fn dedupe_by_key(df: &DataFrame, key: &str) -> Result<(DataFrame, usize), AlignError> {
    let keys = df
        .column(key)
        .map_err(|_| AlignError::MissingColumn(key.to_string()))?
        .cast(&DataType::String)?;

    let mut seen: HashSet<Option<String>> = HashSet::with_capacity(df.height());
    let mut keep = Vec::with_capacity(df.height());
    let mut dropped = 0;
    for (row, value) in keys.str()?.into_iter().enumerate() {
        let first = seen.insert(value.map(str::to_owned));
        if !first {
            debug!(row, key = value, "dropping duplicate key");
            dropped += 1;
        }
        keep.push(first);
    }

    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok((df.filter(&mask)?, dropped))
}

/// Replaces every point with the polygon of the grid cell it falls in.
///
/// All input columns pass through; `centroid_x`, `centroid_y` and `tile` are
/// (re)computed. When the input already carried `centroid_x`, its mean
/// absolute drift from the recomputed value is reported but never enforced.
pub fn align_to_grid(
    df: &DataFrame,
    options: &AlignOptions,
    grid: &dyn GridIndex,
) -> Result<AlignResult, AlignError> {
    let mut summary = AlignSummary {
        input_rows: df.height(),
        ..AlignSummary::default()
    };

    let (frame, missing) = drop_missing_coordinates(df, &options.x_field, &options.y_field)?;
    summary.missing_coordinates = missing;

    let mut frame = match options.key_field.as_deref() {
        Some(key) => {
            let (deduped, duplicates) = dedupe_by_key(&frame, key)?;
            summary.duplicate_keys = duplicates;
            deduped
        }
        None => frame,
    };

    let rows = frame.height();
    let xs = float_column(&frame, &options.x_field)?;
    let ys = float_column(&frame, &options.y_field)?;
    let (xs, ys) = (xs.f64()?, ys.f64()?);

    let mut centroid_x = Vec::with_capacity(rows);
    let mut centroid_y = Vec::with_capacity(rows);
    let mut tiles = Vec::with_capacity(rows);
    let mut geometries = Vec::with_capacity(rows);

    for row in 0..rows {
        let x = xs.get(row).unwrap_or(f64::NAN);
        let y = ys.get(row).unwrap_or(f64::NAN);

        let centroid = grid
            .centroid(x, y, options.cell_size)
            .map_err(|source| AlignError::Grid { row, source })?;
        let corners = grid
            .bounding_box(&centroid, options.cell_size)
            .map_err(|source| AlignError::Grid { row, source })?;

        geometries.push(Polygon::new(LineString::from(corners.to_vec()), vec![]));
        centroid_x.push(centroid.x);
        centroid_y.push(centroid.y);
        tiles.push(centroid.tile);
    }

    let centroid_deviation = match frame.column(CENTROID_X) {
        Ok(existing) => mean_abs_deviation(existing, &centroid_x)?,
        Err(_) => None,
    };
    if let Some(deviation) = centroid_deviation {
        if deviation > options.centroid_tolerance {
            warn!(
                deviation,
                tolerance = options.centroid_tolerance,
                "precomputed centroids disagree with the grid; check cell size or centroid metadata"
            );
        } else {
            debug!(deviation, "precomputed centroids match the grid");
        }
    }

    let keep: Vec<bool> = match options.tile_prefix.as_deref() {
        Some(prefix) => tiles.iter().map(|tile| tile.starts_with(prefix)).collect(),
        None => vec![true; rows],
    };
    summary.outside_tile_prefix = keep.iter().filter(|kept| !**kept).count();

    frame.with_column(Series::new(CENTROID_X.into(), centroid_x))?;
    frame.with_column(Series::new(CENTROID_Y.into(), centroid_y))?;
    frame.with_column(Series::new(TILE.into(), tiles))?;

    if summary.outside_tile_prefix > 0 {
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        frame = frame.filter(&mask)?;
        geometries = geometries
            .into_iter()
            .zip(keep.iter())
            .filter_map(|(geometry, &kept)| kept.then_some(geometry))
            .collect();
    }

    summary.output_rows = frame.height();
    info!(
        input_rows = summary.input_rows,
        missing_coordinates = summary.missing_coordinates,
        duplicate_keys = summary.duplicate_keys,
        outside_tile_prefix = summary.outside_tile_prefix,
        output_rows = summary.output_rows,
        cell_size = options.cell_size,
        "aligned samples to grid"
    );

    Ok(AlignResult {
        table: GeoTable {
            frame,
            geometries,
            crs: options.crs,
            key_field: options.key_field.clone(),
            centroid_deviation,
        },
        summary,
    })
}

fn float_column(df: &DataFrame, name: &str) -> Result<Column, AlignError> {
    let column = df
        .column(name)
        .map_err(|_| AlignError::MissingColumn(name.to_string()))?;
    Ok(column.cast(&DataType::Float64)?)
}

fn mean_abs_deviation(existing: &Column, recomputed: &[f64]) -> Result<Option<f64>, AlignError> {
    let existing = existing.cast(&DataType::Float64)?;
    let (sum, count) = existing
        .f64()?
        .into_iter()
        .zip(recomputed)
        .filter_map(|(given, fresh)| {
            given
                .filter(|value| !value.is_nan())
                .map(|value| (value - fresh).abs())
        })
        .fold((0.0, 0usize), |(sum, count), delta| (sum + delta, count + 1));

    Ok((count > 0).then(|| sum / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("id".into(), ["a", "b", "a", "c", "b"]).into(),
            Series::new(
                "x".into(),
                [Some(1.0), None, Some(3.0), Some(f64::NAN), Some(5.0)],
            )
            .into(),
            Series::new("y".into(), [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn missing_coordinates_drop_null_and_nan() {
        let (kept, dropped) = drop_missing_coordinates(&frame(), "x", "y").unwrap();
        assert_eq!(dropped, 3);
        assert_eq!(kept.height(), 2);
        let ids: Vec<_> = kept.column("id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("a"), Some("b")]);
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let (kept, dropped) = dedupe_by_key(&frame(), "id").unwrap();
        assert_eq!(dropped, 2);
        let xs: Vec<_> = kept.column("x").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(xs.len(), 3);
        assert_eq!(xs[0], Some(1.0));
        assert_eq!(xs[1], None);
    }

    #[test]
    fn missing_field_is_reported() {
        let err = drop_missing_coordinates(&frame(), "lon", "y").unwrap_err();
        assert!(matches!(err, AlignError::MissingColumn(name) if name == "lon"));
    }

    #[test]
    fn deviation_ignores_missing_values() {
        let existing = Column::new("centroid_x".into(), [Some(1.0), None, Some(f64::NAN), Some(4.5)]);
        let deviation = mean_abs_deviation(&existing, &[1.5, 9.0, 9.0, 4.0]).unwrap();
        assert_eq!(deviation, Some(0.5));
    }
}
