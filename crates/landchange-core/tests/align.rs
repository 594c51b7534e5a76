use std::path::PathBuf;

use landchange_core::align::{
    align_to_grid, drop_missing_coordinates, AlignError, AlignOptions, CENTROID_X, TILE,
};
use landchange_core::grid::UtmGrid;
use landchange_parser::read_table;
use polars::prelude::*;
use proptest::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../landchange-parser/tests/data")
        .join(name)
}

fn keyed_options() -> AlignOptions {
    AlignOptions {
        key_field: Some("id".to_string()),
        ..AlignOptions::default()
    }
}

#[test]
fn nan_coordinate_rows_are_dropped_end_to_end() {
    let df = read_table(&fixture_path("points_nan.csv")).expect("failed to read fixture");
    assert_eq!(df.height(), 3);

    let result = align_to_grid(&df, &AlignOptions::default(), &UtmGrid).expect("align failed");
    let table = result.table;

    assert_eq!(table.len(), 2);
    assert_eq!(table.frame.height(), 2);
    assert_eq!(result.summary.missing_coordinates, 1);

    for polygon in &table.geometries {
        let ring: Vec<_> = polygon.exterior().coords().collect();
        assert_eq!(ring.len(), 5, "closed ring of four corners");
        assert_eq!(ring[0], ring[4]);
        for (idx, a) in ring[..4].iter().enumerate() {
            for b in &ring[idx + 1..4] {
                assert_ne!(a, b, "corners must be distinct");
            }
        }
    }

    let tiles = table.frame.column(TILE).unwrap();
    assert_eq!(tiles.null_count(), 0);
    assert_eq!(table.crs.epsg(), 4326);
    assert!(table.centroid_deviation.is_none());
}

#[test]
fn keyed_alignment_dedupes_and_keeps_attributes() {
    let df = read_table(&fixture_path("points.csv")).expect("failed to read fixture");
    let result = align_to_grid(&df, &keyed_options(), &UtmGrid).expect("align failed");

    assert_eq!(result.summary.input_rows, 6);
    assert_eq!(result.summary.missing_coordinates, 1);
    assert_eq!(result.summary.duplicate_keys, 1);
    assert_eq!(result.summary.output_rows, 4);

    let frame = &result.table.frame;
    let ids: Vec<_> = frame.column("id").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(ids, vec![Some("A1"), Some("A2"), Some("A4"), Some("A5")]);

    // first A1 wins
    let landcover: Vec<_> = frame
        .column("landcover")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(landcover[0], Some("tree"));

    let tiles: Vec<_> = frame.column(TILE).unwrap().str().unwrap().into_iter().collect();
    assert_eq!(
        tiles,
        vec![Some("31UFU"), Some("31UFU"), Some("21HUB"), Some("32VNM")]
    );

    // precomputed centroids were the raw coordinates, so drift stays within one cell
    let deviation = result.table.centroid_deviation.expect("deviation computed");
    assert!(deviation > 0.0 && deviation < 2e-3, "deviation {deviation}");

    let centroid_x = frame.column(CENTROID_X).unwrap().f64().unwrap();
    assert_eq!(centroid_x.null_count(), 0);
    assert_eq!(result.table.key_field.as_deref(), Some("id"));
}

#[test]
fn tile_prefix_limits_output_to_one_zone() {
    let df = read_table(&fixture_path("points.csv")).expect("failed to read fixture");
    let options = AlignOptions {
        tile_prefix: Some("31".to_string()),
        ..keyed_options()
    };

    let result = align_to_grid(&df, &options, &UtmGrid).expect("align failed");
    assert_eq!(result.summary.outside_tile_prefix, 2);
    assert_eq!(result.table.len(), 2);
    assert_eq!(result.table.frame.height(), 2);
}

#[test]
fn points_off_the_grid_fail_with_their_row() {
    let df = DataFrame::new(vec![
        Series::new("x".into(), [4.9, 10.0]).into(),
        Series::new("y".into(), [52.4, 86.0]).into(),
    ])
    .unwrap();

    let err = align_to_grid(&df, &AlignOptions::default(), &UtmGrid).unwrap_err();
    assert!(matches!(err, AlignError::Grid { row: 1, .. }), "got {err:?}");
}

#[test]
fn missing_key_column_is_reported() {
    let df = read_table(&fixture_path("points_nan.csv")).unwrap();
    let options = AlignOptions {
        key_field: Some("sample_id".to_string()),
        ..AlignOptions::default()
    };
    let err = align_to_grid(&df, &options, &UtmGrid).unwrap_err();
    assert!(matches!(err, AlignError::MissingColumn(name) if name == "sample_id"));
}

fn coordinate() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        4 => (-170.0f64..170.0).prop_map(Some),
        1 => Just(None),
        1 => Just(Some(f64::NAN)),
    ]
}

proptest! {
    #[test]
    fn dropping_missing_coordinates_is_idempotent(
        rows in prop::collection::vec((coordinate(), coordinate()), 0..40)
    ) {
        let (xs, ys): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
        let df = DataFrame::new(vec![
            Series::new("x".into(), xs).into(),
            Series::new("y".into(), ys).into(),
        ])
        .unwrap();

        let (once, _) = drop_missing_coordinates(&df, "x", "y").unwrap();
        let (twice, dropped_again) = drop_missing_coordinates(&once, "x", "y").unwrap();

        prop_assert_eq!(once.height(), twice.height());
        prop_assert_eq!(dropped_again, 0);
    }
}
