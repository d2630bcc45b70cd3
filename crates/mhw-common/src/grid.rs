//! Latitude/longitude grid coordinates.
//!
//! Every stage of the pipeline receives the grid explicitly. Longitude is
//! treated as cyclic when the axis spans the full circle; latitude never is.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{MhwError, MhwResult};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Relative tolerance used when comparing coordinate spacings.
const SPACING_TOLERANCE: f64 = 1e-3;

/// Coordinates of a (lat, lon) grid, cell centres in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCoords {
    /// Latitude of each row (monotonic).
    pub lat: Vec<f64>,
    /// Longitude of each column (strictly increasing).
    pub lon: Vec<f64>,
}

impl GridCoords {
    /// Create grid coordinates, checking that both axes are non-empty and ordered.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> MhwResult<Self> {
        let coords = Self { lat, lon };
        coords.validate()?;
        Ok(coords)
    }

    /// A regular global grid with `nlat` rows and `nlon` columns of cell centres,
    /// latitude running south to north and longitude from 0 eastwards.
    pub fn global(nlat: usize, nlon: usize) -> Self {
        let dlat = 180.0 / nlat.max(1) as f64;
        let dlon = 360.0 / nlon.max(1) as f64;
        Self {
            lat: (0..nlat).map(|i| -90.0 + (i as f64 + 0.5) * dlat).collect(),
            lon: (0..nlon).map(|j| (j as f64 + 0.5) * dlon).collect(),
        }
    }

    /// Check the coordinate contract.
    pub fn validate(&self) -> MhwResult<()> {
        if self.lat.is_empty() || self.lon.is_empty() {
            return Err(MhwError::degenerate_input(format!(
                "grid has {} latitudes and {} longitudes",
                self.lat.len(),
                self.lon.len()
            )));
        }

        if self.lat.iter().chain(self.lon.iter()).any(|v| !v.is_finite()) {
            return Err(MhwError::invalid_input("grid coordinates must be finite"));
        }

        let lat_increasing = self.lat.windows(2).all(|w| w[1] > w[0]);
        let lat_decreasing = self.lat.windows(2).all(|w| w[1] < w[0]);
        if !(lat_increasing || lat_decreasing) {
            return Err(MhwError::invalid_input("latitude must be strictly monotonic"));
        }

        if !self.lon.windows(2).all(|w| w[1] > w[0]) {
            return Err(MhwError::invalid_input("longitude must be strictly increasing"));
        }

        Ok(())
    }

    /// Grid shape as (lat, lon).
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }

    /// Uniform longitude spacing, if the axis is regular.
    pub fn lon_spacing(&self) -> Option<f64> {
        if self.lon.len() < 2 {
            return None;
        }
        let step = self.lon[1] - self.lon[0];
        let regular = self
            .lon
            .windows(2)
            .all(|w| ((w[1] - w[0]) - step).abs() <= step.abs() * SPACING_TOLERANCE);
        regular.then_some(step)
    }

    /// Whether the longitude axis closes on itself: regular spacing whose
    /// `count * step` covers 360 degrees.
    pub fn is_lon_cyclic(&self) -> bool {
        match self.lon_spacing() {
            Some(step) => {
                let span = step * self.lon.len() as f64;
                (span - 360.0).abs() <= step * SPACING_TOLERANCE
            }
            None => false,
        }
    }

    /// Physical area of every cell in km², from spherical cell geometry.
    pub fn cell_areas(&self) -> Array2<f64> {
        let (nlat, nlon) = self.shape();
        let lat_widths = axis_widths(&self.lat, 180.0);
        let lon_widths = axis_widths(&self.lon, 360.0);

        Array2::from_shape_fn((nlat, nlon), |(i, j)| {
            let cos_lat = self.lat[i].to_radians().cos().max(0.0);
            EARTH_RADIUS_KM
                * EARTH_RADIUS_KM
                * lat_widths[i].to_radians()
                * lon_widths[j].to_radians()
                * cos_lat
        })
    }

    /// Coordinates of the centre of cell (row, col).
    pub fn cell_center(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        Some((*self.lon.get(col)?, *self.lat.get(row)?))
    }
}

/// Width of each cell along one axis, from the distance to its neighbours.
fn axis_widths(centers: &[f64], single_cell_width: f64) -> Vec<f64> {
    let n = centers.len();
    if n == 1 {
        return vec![single_cell_width];
    }

    (0..n)
        .map(|i| {
            let width = if i == 0 {
                centers[1] - centers[0]
            } else if i == n - 1 {
                centers[n - 1] - centers[n - 2]
            } else {
                (centers[i + 1] - centers[i - 1]) / 2.0
            };
            width.abs()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_grid_is_cyclic() {
        let grid = GridCoords::global(18, 36);
        assert_eq!(grid.shape(), (18, 36));
        assert!(grid.is_lon_cyclic());
        assert!((grid.lon_spacing().unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_regional_grid_not_cyclic() {
        let grid = GridCoords::new(vec![0.0, 1.0], vec![100.0, 101.0, 102.0]).unwrap();
        assert!(!grid.is_lon_cyclic());
    }

    #[test]
    fn test_irregular_lon_not_cyclic() {
        let grid = GridCoords::new(vec![0.0], vec![0.0, 90.0, 300.0]).unwrap();
        assert!(grid.lon_spacing().is_none());
        assert!(!grid.is_lon_cyclic());
    }

    #[test]
    fn test_empty_axis_is_degenerate() {
        let err = GridCoords::new(vec![], vec![0.0]).unwrap_err();
        assert!(matches!(err, MhwError::DegenerateInput(_)));
    }

    #[test]
    fn test_unordered_lon_rejected() {
        let err = GridCoords::new(vec![0.0], vec![10.0, 5.0]).unwrap_err();
        assert!(matches!(err, MhwError::InvalidInput(_)));
    }

    #[test]
    fn test_descending_lat_accepted() {
        assert!(GridCoords::new(vec![10.0, 0.0, -10.0], vec![0.0, 1.0]).is_ok());
    }

    #[test]
    fn test_cell_areas_sum_to_sphere() {
        let grid = GridCoords::global(180, 360);
        let total: f64 = grid.cell_areas().sum();
        let sphere = 4.0 * std::f64::consts::PI * EARTH_RADIUS_KM * EARTH_RADIUS_KM;
        assert!((total - sphere).abs() / sphere < 1e-3);
    }

    #[test]
    fn test_cell_areas_shrink_poleward() {
        let grid = GridCoords::global(18, 36);
        let areas = grid.cell_areas();
        assert!(areas[[0, 0]] < areas[[9, 0]]);
        assert!((areas[[9, 0]] - areas[[9, 35]]).abs() < 1e-9);
    }
}
