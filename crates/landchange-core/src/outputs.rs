use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geo_types::Polygon;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use polars::prelude::{AnyValue, PolarsError};
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use crate::align::TILE;
use crate::geotable::GeoTable;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),
    #[error("reduced output needs a key field")]
    MissingKeyField,
    #[error("table has {rows} attribute rows but {geometries} geometries")]
    LengthMismatch { rows: usize, geometries: usize },
}

/// Builds the full container: one feature per row, every column a property.
pub fn to_feature_collection(table: &GeoTable) -> Result<FeatureCollection, OutputError> {
    check_lengths(table)?;

    let columns = table.frame.get_columns();
    let mut features = Vec::with_capacity(table.len());
    for (row, polygon) in table.geometries.iter().enumerate() {
        let mut properties = JsonObject::new();
        for column in columns {
            properties.insert(
                column.name().to_string(),
                any_value_to_json(column.get(row)?),
            );
        }

        features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(polygon_value(polygon))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let mut crs_properties = JsonObject::new();
    crs_properties.insert("name".to_string(), JsonValue::String(table.crs.urn()));
    let mut crs = JsonObject::new();
    crs.insert("type".to_string(), JsonValue::String("name".to_string()));
    crs.insert("properties".to_string(), JsonValue::Object(crs_properties));
    let mut foreign_members = JsonObject::new();
    foreign_members.insert("crs".to_string(), JsonValue::Object(crs));

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    })
}

pub fn write_geojson(table: &GeoTable, path: &Path) -> Result<(), OutputError> {
    let collection = to_feature_collection(table)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    info!(path = %path.display(), features = table.len(), crs = %table.crs, "wrote GeoJSON");
    Ok(())
}

/// `POLYGON ((x y, ...))`, exterior ring only.
pub fn polygon_to_wkt(polygon: &Polygon<f64>) -> String {
    let ring = polygon
        .exterior()
        .coords()
        .map(|coord| format!("{} {}", coord.x, coord.y))
        .collect::<Vec<_>>()
        .join(", ");
    format!("POLYGON (({ring}))")
}

/// Reduced form: `tile`, the key column, and the geometry as WKT.
pub fn write_wkt_csv_to<W: Write>(table: &GeoTable, writer: W) -> Result<(), OutputError> {
    check_lengths(table)?;
    let key_field = table
        .key_field
        .as_deref()
        .ok_or(OutputError::MissingKeyField)?;

    let tiles = table.frame.column(TILE)?;
    let keys = table.frame.column(key_field)?;

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([TILE, key_field, "geometry"])?;
    for (row, polygon) in table.geometries.iter().enumerate() {
        let tile = any_value_to_field(tiles.get(row)?);
        let key = any_value_to_field(keys.get(row)?);
        csv.write_record([tile, key, polygon_to_wkt(polygon)])?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_wkt_csv(table: &GeoTable, path: &Path) -> Result<(), OutputError> {
    write_wkt_csv_to(table, BufWriter::new(File::create(path)?))?;
    info!(path = %path.display(), rows = table.len(), "wrote WKT CSV");
    Ok(())
}

fn check_lengths(table: &GeoTable) -> Result<(), OutputError> {
    if table.frame.height() != table.geometries.len() {
        return Err(OutputError::LengthMismatch {
            rows: table.frame.height(),
            geometries: table.geometries.len(),
        });
    }
    Ok(())
}

fn polygon_value(polygon: &Polygon<f64>) -> Value {
    let exterior = polygon
        .exterior()
        .coords()
        .map(|coord| vec![coord.x, coord.y])
        .collect();
    Value::Polygon(vec![exterior])
}

fn any_value_to_json(value: AnyValue<'_>) -> JsonValue {
    match value {
        AnyValue::Null => JsonValue::Null,
        AnyValue::Boolean(v) => JsonValue::Bool(v),
        AnyValue::String(v) => JsonValue::String(v.to_string()),
        AnyValue::StringOwned(v) => JsonValue::String(v.to_string()),
        AnyValue::Int32(v) => v.into(),
        AnyValue::Int64(v) => v.into(),
        AnyValue::UInt32(v) => v.into(),
        AnyValue::UInt64(v) => v.into(),
        AnyValue::Float32(v) => float_to_json(f64::from(v)),
        AnyValue::Float64(v) => float_to_json(v),
        other => JsonValue::String(other.to_string()),
    }
}

// JSON has no NaN
fn float_to_json(value: f64) -> JsonValue {
    serde_json::Number::from_f64(value)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn any_value_to_field(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(v) => v.to_string(),
        AnyValue::StringOwned(v) => v.to_string(),
        other => other.to_string(),
    }
}
