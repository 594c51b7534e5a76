use landchange_core::grid::{square_corners, GridIndex, UtmGrid, UtmZone};
use proptest::prelude::*;

#[test]
fn tiles_follow_mgrs_naming() {
    let grid = UtmGrid;
    let cases = [
        ((4.8952, 52.3702), "31UFU"),
        ((-58.3816, -34.6037), "21HUB"),
        ((10.7522, 59.9139), "32VNM"),
    ];

    for ((lon, lat), expected) in cases {
        let centroid = grid.centroid(lon, lat, 100.0).expect("centroid failed");
        assert_eq!(centroid.tile, expected, "tile for ({lon}, {lat})");
    }
}

#[test]
fn centroid_is_centre_of_containing_cell() {
    let grid = UtmGrid;
    let (lon, lat) = (4.8952, 52.3702);
    let centroid = grid.centroid(lon, lat, 100.0).expect("centroid failed");

    let (easting, northing) = grid.project(centroid.zone, lon, lat).unwrap();
    assert!((easting - centroid.easting).abs() <= 50.0);
    assert!((northing - centroid.northing).abs() <= 50.0);
    assert_eq!(centroid.easting.rem_euclid(100.0), 50.0);
    assert_eq!(centroid.northing.rem_euclid(100.0), 50.0);

    // the lon/lat centroid lands back on the projected cell centre
    let (e, n) = grid.project(centroid.zone, centroid.x, centroid.y).unwrap();
    assert!((e - centroid.easting).abs() < 1e-3);
    assert!((n - centroid.northing).abs() < 1e-3);
}

#[test]
fn bounding_box_is_a_square_in_the_utm_plane() {
    let grid = UtmGrid;
    let centroid = grid.centroid(-58.3816, -34.6037, 100.0).unwrap();
    let corners = grid.bounding_box(&centroid, 100.0).unwrap();
    let expected = square_corners(centroid.easting, centroid.northing, 100.0);

    for (corner, expected) in corners.iter().zip(expected.iter()) {
        let (e, n) = grid.project(centroid.zone, corner.x, corner.y).unwrap();
        assert!((e - expected.x).abs() < 1e-3, "easting {e} vs {}", expected.x);
        assert!((n - expected.y).abs() < 1e-3, "northing {n} vs {}", expected.y);
    }

    // SW, SE, NE, NW in lon/lat as well
    assert!(corners[0].x < corners[1].x);
    assert!(corners[1].y < corners[2].y);
    assert!(corners[3].x < corners[2].x);
}

#[test]
fn cell_straddling_a_latitude_band_has_one_tile() {
    let grid = UtmGrid;
    let zone = UtmZone::for_lonlat(9.0, 48.0).unwrap();
    // on the central meridian, so latitude rises with northing alone
    let (easting, northing) = grid.project(zone, 9.0, 48.0).unwrap();
    let (south_lon, south_lat) = grid.unproject(zone, easting, northing - 0.01).unwrap();
    let (north_lon, north_lat) = grid.unproject(zone, easting, northing + 0.01).unwrap();
    assert!(south_lat < 48.0 && north_lat >= 48.0);

    let south = grid.centroid(south_lon, south_lat, 100.0).unwrap();
    let north = grid.centroid(north_lon, north_lat, 100.0).unwrap();

    assert_eq!(south.easting, north.easting);
    assert_eq!(south.northing, north.northing);
    assert_eq!(south.tile, north.tile);
    let band = if south.y < 48.0 { 'T' } else { 'U' };
    assert_eq!(south.tile.chars().nth(2), Some(band));
}

#[test]
fn invalid_inputs_are_rejected() {
    let grid = UtmGrid;
    assert!(grid.centroid(10.0, 84.5, 100.0).is_err());
    assert!(grid.centroid(f64::NAN, 10.0, 100.0).is_err());
    assert!(grid.centroid(10.0, 10.0, 0.0).is_err());
    assert!(grid.centroid(10.0, 10.0, -100.0).is_err());
}

proptest! {
    #[test]
    fn square_corners_have_side_and_centre(
        cx in -1.0e6f64..1.0e7,
        cy in -1.0e6f64..1.0e7,
        size in 1.0f64..10_000.0,
    ) {
        let corners = square_corners(cx, cy, size);
        let tolerance = 1e-6 * (1.0 + cx.abs().max(cy.abs()));

        for idx in 0..4 {
            let a = corners[idx];
            let b = corners[(idx + 1) % 4];
            let side = ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            prop_assert!((side - size).abs() <= tolerance);
        }

        let mean_x = corners.iter().map(|c| c.x).sum::<f64>() / 4.0;
        let mean_y = corners.iter().map(|c| c.y).sum::<f64>() / 4.0;
        prop_assert!((mean_x - cx).abs() <= tolerance);
        prop_assert!((mean_y - cy).abs() <= tolerance);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Kept clear of zone and latitude band edges, where a cell centre may sit
    // on the other side of the boundary from the point that produced it.
    #[test]
    fn snapping_a_centroid_again_is_stable(
        zone in 1u8..=60,
        zone_offset in -2.5f64..2.5,
        band in 0u8..17,
        band_offset in 0.5f64..7.5,
    ) {
        let lon = -183.0 + 6.0 * f64::from(zone) + zone_offset;
        let lat = -80.0 + 8.0 * f64::from(band) + band_offset;
        let grid = UtmGrid;
        let first = grid.centroid(lon, lat, 100.0).unwrap();
        let second = grid.centroid(first.x, first.y, 100.0).unwrap();

        prop_assert_eq!(&first.tile, &second.tile);
        prop_assert!((first.easting - second.easting).abs() < 1e-6);
        prop_assert!((first.northing - second.northing).abs() < 1e-6);
    }
}
