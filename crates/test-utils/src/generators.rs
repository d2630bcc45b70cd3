//! Synthetic masks and anomaly fields.
//!
//! These generators create predictable, verifiable patterns whose labeled
//! output can be worked out by hand.

use std::ops::Range;

use mhw_common::Dataset;
use ndarray::{Array2, Array3};

use crate::fixtures::{daily_axis, global_coords, SSTA};

/// An `nlat x nlon` mask that is true on `rows x cols`.
///
/// ```
/// use test_utils::rectangle;
///
/// let mask = rectangle((4, 6), 1..3, 2..5);
/// assert_eq!(mask.iter().filter(|&&m| m).count(), 6);
/// assert!(mask[[1, 2]] && !mask[[0, 2]]);
/// ```
pub fn rectangle(shape: (usize, usize), rows: Range<usize>, cols: Range<usize>) -> Array2<bool> {
    Array2::from_shape_fn(shape, |(y, x)| rows.contains(&y) && cols.contains(&x))
}

/// A rectangle split by the longitude seam: the first `west` columns are
/// filled on the left edge and `east` columns on the right edge.
///
/// ```
/// use test_utils::straddling_rectangle;
///
/// let mask = straddling_rectangle((4, 10), 1..3, 2, 3);
/// assert!(mask[[1, 0]] && mask[[1, 1]] && !mask[[1, 2]]);
/// assert!(mask[[2, 7]] && mask[[2, 9]] && !mask[[2, 6]]);
/// ```
pub fn straddling_rectangle(
    shape: (usize, usize),
    rows: Range<usize>,
    west: usize,
    east: usize,
) -> Array2<bool> {
    let nlon = shape.1;
    Array2::from_shape_fn(shape, |(y, x)| {
        rows.contains(&y) && (x < west || x + east >= nlon)
    })
}

/// Scattered isolated cells on a fixed lattice, useful as morphological noise.
/// No two cells are 8-connected.
pub fn speckle(shape: (usize, usize), spacing: usize) -> Array2<bool> {
    let spacing = spacing.max(2);
    Array2::from_shape_fn(shape, |(y, x)| y % spacing == 1 && x % spacing == 1)
}

/// Anomaly field that is `value` wherever the per-timestep mask is true and
/// a cool background elsewhere.
pub fn anomaly_field(masks: &[Array2<bool>], value: f32) -> Array3<f32> {
    let (nlat, nlon) = masks.first().map(|m| m.dim()).unwrap_or((0, 0));
    Array3::from_shape_fn((masks.len(), nlat, nlon), |(t, y, x)| {
        if masks[t][[y, x]] {
            value
        } else {
            -0.5
        }
    })
}

/// Daily, cyclic global dataset carrying one anomaly field named [`SSTA`].
pub fn heatwave_dataset(values: Array3<f32>) -> Dataset {
    let (nt, nlat, nlon) = values.dim();
    let dataset = Dataset::new(daily_axis(nt), global_coords((nlat, nlon)));
    match dataset.with_field(SSTA, values) {
        Ok(dataset) => dataset,
        Err(e) => panic!("synthetic field does not match its own grid: {}", e),
    }
}

/// OR of two masks of the same shape.
pub fn union(a: &Array2<bool>, b: &Array2<bool>) -> Array2<bool> {
    Array2::from_shape_fn(a.dim(), |idx| a[idx] || b[idx])
}
