use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::{s, Array2, ArrayView1};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dates::date_columns;
use crate::errors::TableError;

/// Column naming for a change reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSchema {
    pub id_column: String,
    pub year_column: String,
    pub classes: Vec<String>,
}

/// One `(sample_id, year)` row. `fractions` follows the order of
/// [`ChangeReference::classes`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeReferenceRecord {
    pub sample_id: String,
    pub year: i32,
    pub fractions: Vec<f64>,
}

/// Every row of a change reference table, in table order. Rows repeating a
/// `(sample_id, year)` pair stay in `records`; `find` resolves to the first.
#[derive(Debug, Clone)]
pub struct ChangeReference {
    classes: Vec<String>,
    records: Vec<ChangeReferenceRecord>,
    by_key: HashMap<(String, i32), usize>,
}

impl ChangeReference {
    pub fn from_frame(
        table: &str,
        df: &DataFrame,
        schema: &ReferenceSchema,
    ) -> Result<Self, TableError> {
        let ids = require_column(table, df, &schema.id_column)?.cast(&DataType::String)?;
        let ids = ids.str()?;
        let years = require_column(table, df, &schema.year_column)?.cast(&DataType::Int64)?;
        let years = years.i64()?;

        let mut class_columns = Vec::with_capacity(schema.classes.len());
        for class in &schema.classes {
            class_columns.push(require_column(table, df, class)?.cast(&DataType::Float64)?);
        }
        let class_values = class_columns
            .iter()
            .map(|column| column.f64())
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(df.height());
        let mut by_key = HashMap::with_capacity(df.height());

        for row in 0..df.height() {
            let sample_id = ids.get(row).ok_or_else(|| TableError::NullValue {
                table: table.to_string(),
                row,
                column: schema.id_column.clone(),
            })?;
            let year = years.get(row).ok_or_else(|| TableError::NullValue {
                table: table.to_string(),
                row,
                column: schema.year_column.clone(),
            })?;
            let year = i32::try_from(year).map_err(|_| TableError::YearOutOfRange {
                table: table.to_string(),
                row,
                value: year,
            })?;

            let fractions = class_values
                .iter()
                .map(|values| values.get(row).unwrap_or(f64::NAN))
                .collect();

            let key = (sample_id.to_string(), year);
            if by_key.contains_key(&key) {
                warn!(
                    table,
                    sample_id,
                    year,
                    row,
                    "duplicate reference record; lookups use the first"
                );
            } else {
                by_key.insert(key, records.len());
            }
            records.push(ChangeReferenceRecord {
                sample_id: sample_id.to_string(),
                year,
                fractions,
            });
        }

        debug!(table, records = records.len(), "loaded change reference");

        Ok(Self {
            classes: schema.classes.clone(),
            records,
            by_key,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn records(&self) -> &[ChangeReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, sample_id: &str, year: i32) -> Option<&ChangeReferenceRecord> {
        self.by_key
            .get(&(sample_id.to_string(), year))
            .map(|&idx| &self.records[idx])
    }

    pub fn fraction(&self, record: &ChangeReferenceRecord, class: &str) -> Option<f64> {
        let position = self.classes.iter().position(|name| name == class)?;
        record.fractions.get(position).copied()
    }
}

/// One spectral band: a samples × dates matrix of reflectance values.
/// Missing observations are NaN.
#[derive(Debug, Clone)]
pub struct BandTable {
    band: String,
    dates: Vec<NaiveDate>,
    sample_ids: Vec<String>,
    rows: HashMap<String, usize>,
    values: Array2<f64>,
}

impl BandTable {
    pub fn from_frame(band: &str, df: &DataFrame, id_column: &str) -> Result<Self, TableError> {
        let date_cols = date_columns(band, df)?;
        if date_cols.is_empty() {
            return Err(TableError::NoDateColumns {
                table: band.to_string(),
            });
        }
        for pair in date_cols.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(TableError::UnorderedDates {
                    table: band.to_string(),
                    column: pair[1].name.clone(),
                });
            }
        }

        let ids = require_column(band, df, id_column)?.cast(&DataType::String)?;
        let ids = ids.str()?;

        let mut sample_ids = Vec::with_capacity(df.height());
        let mut rows = HashMap::with_capacity(df.height());
        for (row, id) in ids.into_iter().enumerate() {
            let id = id.ok_or_else(|| TableError::NullValue {
                table: band.to_string(),
                row,
                column: id_column.to_string(),
            })?;
            if rows.contains_key(id) {
                warn!(band, sample_id = id, row, "duplicate sample row ignored");
            } else {
                rows.insert(id.to_string(), row);
            }
            sample_ids.push(id.to_string());
        }

        let mut values = Array2::from_elem((df.height(), date_cols.len()), f64::NAN);
        for (col_idx, date_col) in date_cols.iter().enumerate() {
            let column = df.column(&date_col.name)?.cast(&DataType::Float64)?;
            for (row, value) in column.f64()?.into_iter().enumerate() {
                if let Some(value) = value {
                    values[[row, col_idx]] = value;
                }
            }
        }

        Ok(Self {
            band: band.to_string(),
            dates: date_cols.into_iter().map(|col| col.date).collect(),
            sample_ids,
            rows,
            values,
        })
    }

    pub fn band(&self) -> &str {
        &self.band
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn row(&self, sample_id: &str) -> Option<ArrayView1<'_, f64>> {
        self.rows
            .get(sample_id)
            .map(|&row| self.values.row(row))
    }

    /// Keeps only the first `count` date columns.
    pub fn truncated(self, count: usize) -> Self {
        let count = count.min(self.dates.len());
        let values = self.values.slice(s![.., ..count]).to_owned();
        let mut dates = self.dates;
        dates.truncate(count);
        Self {
            band: self.band,
            dates,
            sample_ids: self.sample_ids,
            rows: self.rows,
            values,
        }
    }
}

fn require_column<'a>(
    table: &str,
    df: &'a DataFrame,
    name: &str,
) -> Result<&'a Column, TableError> {
    df.column(name).map_err(|_| TableError::MissingColumn {
        table: table.to_string(),
        column: name.to_string(),
    })
}
