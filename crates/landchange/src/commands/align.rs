use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use landchange_core::grid::UtmGrid;
use landchange_core::outputs::{write_geojson, write_wkt_csv};
use landchange_core::{align_to_grid, AlignOptions};
use tracing::info;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// FeatureCollection with every input column as a property
    #[default]
    Geojson,
    /// tile, key and WKT geometry only
    WktCsv,
}

#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Point table (.csv or .parquet)
    #[arg(short, long)]
    pub input: PathBuf,
    #[arg(short, long)]
    pub output: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Geojson)]
    pub format: OutputFormat,
    #[arg(long, default_value = "x")]
    pub x_field: String,
    #[arg(long, default_value = "y")]
    pub y_field: String,
    /// Column used to drop duplicate samples; required for wkt-csv
    #[arg(long)]
    pub key_field: Option<String>,
    /// Grid cell side in metres
    #[arg(long, default_value_t = 100.0)]
    pub cell_size: f64,
    /// Keep only cells whose tile id starts with this prefix
    #[arg(long)]
    pub tile_prefix: Option<String>,
}

pub fn handle_align_command(args: AlignArgs) -> Result<()> {
    if args.format == OutputFormat::WktCsv && args.key_field.is_none() {
        bail!("--format wkt-csv needs --key-field");
    }

    let frame = landchange_parser::read_table(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let options = AlignOptions {
        x_field: args.x_field,
        y_field: args.y_field,
        cell_size: args.cell_size,
        key_field: args.key_field,
        tile_prefix: args.tile_prefix,
        ..AlignOptions::default()
    };
    let result = align_to_grid(&frame, &options, &UtmGrid).context("grid alignment failed")?;

    match args.format {
        OutputFormat::Geojson => write_geojson(&result.table, &args.output),
        OutputFormat::WktCsv => write_wkt_csv(&result.table, &args.output),
    }
    .with_context(|| format!("failed to write {}", args.output.display()))?;

    info!(output = %args.output.display(), format = ?args.format, "alignment written");
    println!("{}", serde_json::to_string_pretty(&result.summary)?);
    Ok(())
}
