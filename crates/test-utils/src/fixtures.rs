//! Common test fixtures for heatwave tracking tests.
//!
//! Grid shapes, reference times and field names shared by the test suites.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mhw_common::{GridCoords, TimeAxis};

/// Common grid shapes (`nlat`, `nlon`) for testing.
pub mod grid {
    /// 10 degree global grid.
    pub const COARSE_GLOBAL: (usize, usize) = (18, 36);

    /// 5 degree global grid.
    pub const GLOBAL_5DEG: (usize, usize) = (36, 72);

    /// Smallest grid that still has distinct interior cells.
    pub const TINY: (usize, usize) = (4, 6);
}

/// Name of the anomaly field used by the synthetic datasets.
pub const SSTA: &str = "ssta";

/// First day of every synthetic time axis.
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Daily time axis starting at [`reference_time`].
pub fn daily_axis(count: usize) -> TimeAxis {
    TimeAxis::regular(reference_time(), Duration::days(1), count)
}

/// Cyclic global grid of the given shape.
pub fn global_coords(shape: (usize, usize)) -> GridCoords {
    GridCoords::global(shape.0, shape.1)
}

/// Regional grid whose longitude axis does not close on itself.
pub fn regional_coords() -> GridCoords {
    GridCoords {
        lat: vec![-10.0, 0.0, 10.0, 20.0],
        lon: vec![140.0, 150.0, 160.0, 170.0, 180.0, 190.0],
    }
}
