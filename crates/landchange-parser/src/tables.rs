use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::errors::TableError;
use crate::model::{BandTable, ChangeReference, ReferenceSchema};

/// Reads a `.csv` (with header) or `.parquet` table into a DataFrame.
pub fn read_table(path: &Path) -> Result<DataFrame, TableError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let df = CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?;
            Ok(df)
        }
        Some("parquet") => {
            let file = File::open(path).map_err(|source| TableError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(ParquetReader::new(file).finish()?)
        }
        _ => Err(TableError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub fn read_change_reference(
    path: &Path,
    schema: &ReferenceSchema,
) -> Result<ChangeReference, TableError> {
    let df = read_table(path)?;
    ChangeReference::from_frame(&path.display().to_string(), &df, schema)
}

pub fn read_band_table(path: &Path, band: &str, id_column: &str) -> Result<BandTable, TableError> {
    let df = read_table(path)?;
    BandTable::from_frame(band, &df, id_column)
}
