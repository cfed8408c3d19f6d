//! Area of latitude/longitude grid cells
//!
//! Global flux integrals weight each cell by its area in m². [`area_grid`] accounts
//! for the flattening of the Earth using the WGS84 ellipsoid, while
//! [`area_grid_spherical`] gives exact areas on a sphere for regular global grids.

use crate::errors::{SeaFluxError, SeaFluxResult};
use crate::field::{Field, FloatValue};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// WGS84 equatorial radius (m)
const EQUATORIAL_RADIUS: FloatValue = 6378137.0;
/// WGS84 polar radius (m)
const POLAR_RADIUS: FloatValue = 6356752.0;
/// Mean radius of a spherical Earth (m)
const MEAN_RADIUS: FloatValue = 6371000.0;

/// Cell centre coordinates of a latitude/longitude grid in decimal degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLonGrid {
    pub lat: Vec<FloatValue>,
    pub lon: Vec<FloatValue>,
}

impl LatLonGrid {
    /// Create a grid, checking that both axes have at least two finite values
    /// and that latitudes fall within ±90°
    pub fn new(lat: Vec<FloatValue>, lon: Vec<FloatValue>) -> SeaFluxResult<Self> {
        if lat.len() < 2 || lon.len() < 2 {
            return Err(SeaFluxError::InvalidGrid(format!(
                "at least two latitudes and longitudes are required, got {} and {}",
                lat.len(),
                lon.len()
            )));
        }
        if lat.iter().chain(lon.iter()).any(|v| !v.is_finite()) {
            return Err(SeaFluxError::InvalidGrid(
                "coordinates must be finite".to_string(),
            ));
        }
        if lat.iter().any(|v| v.abs() > 90.0) {
            return Err(SeaFluxError::InvalidGrid(
                "latitudes must be within -90 and 90".to_string(),
            ));
        }
        Ok(Self { lat, lon })
    }

    /// Global grid with cell centres offset by half of `resolution` from the edges
    pub fn regular(resolution: FloatValue) -> SeaFluxResult<Self> {
        let (n_lat, n_lon) = regular_counts(resolution)?;
        let lat = (0..n_lat)
            .map(|i| -90.0 + resolution * (i as FloatValue + 0.5))
            .collect();
        let lon = (0..n_lon)
            .map(|i| -180.0 + resolution * (i as FloatValue + 0.5))
            .collect();
        Self::new(lat, lon)
    }

    /// `(lat, lon)`
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Ellipsoidal cell areas, see [`area_grid`]
    pub fn area(&self) -> SeaFluxResult<Field> {
        area_grid(&self.lat, &self.lon)
    }

    /// Latitudes shaped `(lat, 1)` so they broadcast against `(time, lat, lon)` fields
    pub fn lat_column(&self) -> Field {
        Array2::from_shape_fn((self.lat.len(), 1), |(i, _)| self.lat[i]).into_dyn()
    }
}

fn regular_counts(resolution: FloatValue) -> SeaFluxResult<(usize, usize)> {
    let n_lat = 180.0 / resolution;
    if !(resolution > 0.0) || (n_lat - n_lat.round()).abs() > 1e-9 || n_lat.round() < 2.0 {
        return Err(SeaFluxError::InvalidGrid(format!(
            "resolution {} does not divide 180 degrees into at least two bands",
            resolution
        )));
    }
    let n_lat = n_lat.round() as usize;
    Ok((n_lat, n_lat * 2))
}

/// Radius of the WGS84 ellipsoid at a given latitude (m)
pub fn earth_radius(lat: FloatValue) -> FloatValue {
    let (sin, cos) = lat.to_radians().sin_cos();
    let a = EQUATORIAL_RADIUS;
    let b = POLAR_RADIUS;

    let numerator = (a.powi(2) * cos).powi(2) + (b.powi(2) * sin).powi(2);
    let denominator = (a * cos).powi(2) + (b * sin).powi(2);
    (numerator / denominator).sqrt()
}

/// Absolute spacing between coordinates, using central differences in the
/// interior and one-sided differences at the edges
fn gradient(coords: &[FloatValue]) -> Array1<FloatValue> {
    let n = coords.len();
    Array1::from_shape_fn(n, |i| {
        let step = match i {
            0 => coords[1] - coords[0],
            i if i == n - 1 => coords[n - 1] - coords[n - 2],
            i => (coords[i + 1] - coords[i - 1]) / 2.0,
        };
        step.abs()
    })
}

/// Area of each grid cell (m²) with shape `(lat, lon)`
///
/// Cell widths are taken from the spacing of the coordinates, so irregular grids
/// are supported. Axes may run in either direction. Both axes need at least two
/// coordinates.
pub fn area_grid(lat: &[FloatValue], lon: &[FloatValue]) -> SeaFluxResult<Field> {
    if lat.len() < 2 || lon.len() < 2 {
        return Err(SeaFluxError::InvalidGrid(format!(
            "at least two latitudes and longitudes are required, got {} and {}",
            lat.len(),
            lon.len()
        )));
    }

    let dlat = gradient(lat);
    let dlon = gradient(lon);

    let area = Array2::from_shape_fn((lat.len(), lon.len()), |(i, j)| {
        let radius = earth_radius(lat[i]);
        let dy = dlat[i].to_radians() * radius;
        let dx = dlon[j].to_radians() * radius * lat[i].to_radians().cos();
        dy * dx
    });

    Ok(area.into_dyn())
}

/// Area of each cell (m²) of a regular global grid on a sphere
///
/// Latitude bands are integrated exactly between their edges. The output has
/// shape `(180 / resolution, 360 / resolution)` and matches
/// [`LatLonGrid::regular`].
pub fn area_grid_spherical(resolution: FloatValue) -> SeaFluxResult<Field> {
    let (n_lat, n_lon) = regular_counts(resolution)?;
    let r_sq = MEAN_RADIUS.powi(2);
    let dlon = resolution.to_radians();

    let area = Array2::from_shape_fn((n_lat, n_lon), |(i, _)| {
        let south = (-90.0 + resolution * i as FloatValue).to_radians();
        let north = (-90.0 + resolution * (i + 1) as FloatValue).to_radians();
        r_sq * dlon * (north.sin() - south.sin())
    });

    Ok(area.into_dyn())
}
