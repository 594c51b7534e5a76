//! Fixed UTM grid indexing.
//!
//! Points are snapped to the centre of a `cell_size` metre cell in their UTM
//! zone, and each cell is labelled with the MGRS 100 km square it falls in
//! (the same tile naming Sentinel-2 products use, e.g. `31UFU`).

use geo_types::Coord;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use thiserror::Error;

const LATITUDE_BANDS: &[u8] = b"CDEFGHJKLMNPQRSTUVWX";
const MGRS_ROW_LETTERS: &[u8] = b"ABCDEFGHJKLMNPQRSTUV";
const MGRS_COLUMN_SETS: [&[u8]; 3] = [b"STUVWXYZ", b"ABCDEFGH", b"JKLMNPQR"];
const HUNDRED_KM: f64 = 100_000.0;
const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

#[derive(Debug, Error)]
pub enum GridError {
    #[error("coordinate ({x}, {y}) is not finite")]
    NonFinite { x: f64, y: f64 },
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("latitude {0} is outside the UTM grid [-80, 84)")]
    LatitudeOutOfRange(f64),
    #[error("cell size must be a positive number of metres, got {0}")]
    InvalidCellSize(f64),
    #[error("projection failed for UTM zone {zone}: {message}")]
    Projection { zone: UtmZone, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtmZone {
    pub number: u8,
    pub south: bool,
}

impl UtmZone {
    /// Zone for a WGS84 position, including the Norway and Svalbard exceptions.
    pub fn for_lonlat(lon: f64, lat: f64) -> Result<Self, GridError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GridError::NonFinite { x: lon, y: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(GridError::LongitudeOutOfRange(lon));
        }
        if !(-80.0..84.0).contains(&lat) {
            return Err(GridError::LatitudeOutOfRange(lat));
        }

        let mut number = (((lon + 180.0) / 6.0).floor() as u8 + 1).min(60);

        if (56.0..64.0).contains(&lat) && (3.0..12.0).contains(&lon) {
            number = 32;
        }
        if (72.0..84.0).contains(&lat) {
            number = match lon {
                l if (0.0..9.0).contains(&l) => 31,
                l if (9.0..21.0).contains(&l) => 33,
                l if (21.0..33.0).contains(&l) => 35,
                l if (33.0..42.0).contains(&l) => 37,
                _ => number,
            };
        }

        Ok(Self {
            number,
            south: lat < 0.0,
        })
    }

    pub fn epsg(&self) -> u32 {
        if self.south {
            32700 + u32::from(self.number)
        } else {
            32600 + u32::from(self.number)
        }
    }

    fn proj_string(&self) -> String {
        let hemisphere = if self.south { " +south" } else { "" };
        format!(
            "+proj=utm +zone={}{hemisphere} +datum=WGS84 +units=m +no_defs",
            self.number
        )
    }
}

impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, if self.south { 'S' } else { 'N' })
    }
}

/// A snapped grid cell centre, in both lon/lat and zone-local metres.
#[derive(Debug, Clone, PartialEq)]
pub struct GridCentroid {
    pub x: f64,
    pub y: f64,
    pub easting: f64,
    pub northing: f64,
    pub zone: UtmZone,
    pub tile: String,
}

/// Maps raw coordinates onto a fixed grid.
pub trait GridIndex: Send + Sync {
    fn centroid(&self, x: f64, y: f64, cell_size: f64) -> Result<GridCentroid, GridError>;

    /// Cell corners in the output coordinate system, ordered SW, SE, NE, NW.
    fn bounding_box(
        &self,
        centroid: &GridCentroid,
        cell_size: f64,
    ) -> Result<[Coord<f64>; 4], GridError>;
}

/// Centre of the `size` cell containing `value`.
pub fn snap_to_cell(value: f64, size: f64) -> f64 {
    (value / size).floor() * size + size / 2.0
}

/// Axis-aligned square of side `size` centred on `(cx, cy)`, ordered SW, SE, NE, NW.
pub fn square_corners(cx: f64, cy: f64, size: f64) -> [Coord<f64>; 4] {
    let half = size / 2.0;
    [
        Coord { x: cx - half, y: cy - half },
        Coord { x: cx + half, y: cy - half },
        Coord { x: cx + half, y: cy + half },
        Coord { x: cx - half, y: cy + half },
    ]
}

pub fn latitude_band(lat: f64) -> char {
    let idx = (((lat + 80.0) / 8.0).floor().max(0.0) as usize).min(LATITUDE_BANDS.len() - 1);
    LATITUDE_BANDS[idx] as char
}

/// MGRS 100 km square identifier, e.g. `31UFU`.
pub fn mgrs_tile(zone: UtmZone, lat: f64, easting: f64, northing: f64) -> String {
    let set = (usize::from(zone.number) - 1) % 6 + 1;
    let columns = MGRS_COLUMN_SETS[set % 3];
    let column_idx = ((easting / HUNDRED_KM).floor() as i64 - 1).clamp(0, 7) as usize;

    let mut row_idx = (northing / HUNDRED_KM).floor().max(0.0) as usize % 20;
    if set % 2 == 0 {
        row_idx = (row_idx + 5) % 20;
    }

    format!(
        "{:02}{}{}{}",
        zone.number,
        latitude_band(lat),
        columns[column_idx] as char,
        MGRS_ROW_LETTERS[row_idx] as char
    )
}

/// WGS84 lon/lat in, WGS84 lon/lat out; snapping happens in the local UTM zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtmGrid;

impl UtmGrid {
    pub fn project(&self, zone: UtmZone, lon: f64, lat: f64) -> Result<(f64, f64), GridError> {
        ZoneProjection::new(zone)?.forward(lon, lat)
    }

    pub fn unproject(
        &self,
        zone: UtmZone,
        easting: f64,
        northing: f64,
    ) -> Result<(f64, f64), GridError> {
        ZoneProjection::new(zone)?.inverse(easting, northing)
    }
}

impl GridIndex for UtmGrid {
    fn centroid(&self, x: f64, y: f64, cell_size: f64) -> Result<GridCentroid, GridError> {
        check_cell_size(cell_size)?;
        let zone = UtmZone::for_lonlat(x, y)?;
        let projection = ZoneProjection::new(zone)?;
        let (easting, northing) = projection.forward(x, y)?;

        let easting = snap_to_cell(easting, cell_size);
        let northing = snap_to_cell(northing, cell_size);
        let (lon, lat) = projection.inverse(easting, northing)?;

        // band from the cell centre, not the input point
        Ok(GridCentroid {
            x: lon,
            y: lat,
            easting,
            northing,
            zone,
            tile: mgrs_tile(zone, lat, easting, northing),
        })
    }

    fn bounding_box(
        &self,
        centroid: &GridCentroid,
        cell_size: f64,
    ) -> Result<[Coord<f64>; 4], GridError> {
        check_cell_size(cell_size)?;
        let projection = ZoneProjection::new(centroid.zone)?;
        let corners = square_corners(centroid.easting, centroid.northing, cell_size);
        let mut lonlat = [Coord { x: 0.0, y: 0.0 }; 4];
        for (out, corner) in lonlat.iter_mut().zip(corners.iter()) {
            let (lon, lat) = projection.inverse(corner.x, corner.y)?;
            *out = Coord { x: lon, y: lat };
        }
        Ok(lonlat)
    }
}

fn check_cell_size(cell_size: f64) -> Result<(), GridError> {
    if cell_size.is_finite() && cell_size > 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidCellSize(cell_size))
    }
}

/// Geographic and UTM definitions for one zone, parsed once and reused for
/// every point and corner of a cell.
struct ZoneProjection {
    zone: UtmZone,
    geographic: Proj,
    utm: Proj,
}

impl ZoneProjection {
    fn new(zone: UtmZone) -> Result<Self, GridError> {
        let parse = |definition: &str| {
            Proj::from_proj_string(definition).map_err(|err| GridError::Projection {
                zone,
                message: format!("{err:?}"),
            })
        };
        Ok(Self {
            zone,
            geographic: parse(WGS84_LONLAT)?,
            utm: parse(&zone.proj_string())?,
        })
    }

    fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), GridError> {
        let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.geographic, &self.utm, &mut point).map_err(|err| self.error(err))?;
        Ok((point.0, point.1))
    }

    fn inverse(&self, easting: f64, northing: f64) -> Result<(f64, f64), GridError> {
        let mut point = (easting, northing, 0.0);
        transform(&self.utm, &self.geographic, &mut point).map_err(|err| self.error(err))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }

    fn error(&self, err: impl std::fmt::Debug) -> GridError {
        GridError::Projection {
            zone: self.zone,
            message: format!("{err:?}"),
        }
    }
}
