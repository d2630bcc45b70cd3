//! Binary morphology on lat/lon masks.
//!
//! Dilation and erosion use a shift-and-combine strategy: for each offset of
//! the structuring element, the whole grid is shifted and OR-ed (dilation) or
//! AND-ed (erosion) into the result. Each axis either wraps or not, as set by
//! [`EdgeWrap`]. Neighbours beyond a non-wrapping edge are ignored by both
//! operations, which keeps them adjoint so that closing and opening are
//! idempotent.

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Zip};
use serde::{Deserialize, Serialize};

/// A flat, symmetric structuring element stored as `(dy, dx)` offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuringElement {
    radius: usize,
    offsets: Vec<(isize, isize)>,
}

impl StructuringElement {
    /// Disk of cells with `dy² + dx² <= radius²`. Radius 0 is a single cell.
    pub fn disk(radius: usize) -> Self {
        let r = radius as isize;
        let offsets = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dy, dx)))
            .filter(|(dy, dx)| dy * dy + dx * dx <= r * r)
            .collect();
        Self { radius, offsets }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }

    /// The element rendered as a `(2r+1, 2r+1)` boolean footprint.
    pub fn footprint(&self) -> Array2<bool> {
        let size = 2 * self.radius + 1;
        let mut footprint = Array2::from_elem((size, size), false);
        let r = self.radius as isize;
        for &(dy, dx) in &self.offsets {
            footprint[[(dy + r) as usize, (dx + r) as usize]] = true;
        }
        footprint
    }
}

/// Which grid edges are joined to the opposite edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeWrap {
    /// First and last longitude columns are neighbours.
    pub longitude: bool,
    /// First and last latitude rows are neighbours.
    pub poles: bool,
}

impl Default for EdgeWrap {
    /// A global grid: cyclic longitude, open poles.
    fn default() -> Self {
        Self {
            longitude: true,
            poles: false,
        }
    }
}

impl EdgeWrap {
    /// No edge wraps, as on a regional grid.
    pub fn none() -> Self {
        Self {
            longitude: false,
            poles: false,
        }
    }
}

/// Closing-then-opening filter with a disk structuring element.
#[derive(Debug, Clone)]
pub struct MorphologicalFilter {
    element: StructuringElement,
    wrap: EdgeWrap,
}

impl MorphologicalFilter {
    /// Create a filter with a disk of `radius` pixels on a grid with cyclic
    /// longitude.
    pub fn new(radius: usize, wrap_poles: bool) -> Self {
        Self {
            element: StructuringElement::disk(radius),
            wrap: EdgeWrap {
                poles: wrap_poles,
                ..EdgeWrap::default()
            },
        }
    }

    /// Treat the east and west edges as neighbours only when `wrap` is set.
    pub fn with_wrap_longitude(mut self, wrap: bool) -> Self {
        self.wrap.longitude = wrap;
        self
    }

    pub fn element(&self) -> &StructuringElement {
        &self.element
    }

    pub fn wrap(&self) -> EdgeWrap {
        self.wrap
    }

    /// Close (fill gaps, merge fragments) then open (strip speckle).
    pub fn apply(&self, mask: ArrayView2<bool>) -> Array2<bool> {
        let closed = closing(mask, &self.element, self.wrap);
        opening(closed.view(), &self.element, self.wrap)
    }
}

/// Binary dilation.
pub fn dilate(mask: ArrayView2<bool>, element: &StructuringElement, wrap: EdgeWrap) -> Array2<bool> {
    let mut result = Array2::from_elem(mask.dim(), false);
    for_each_shift(mask, element, wrap, &mut result, |dst, src| {
        Zip::from(dst).and(src).for_each(|d, &v| *d |= v);
    });
    result
}

/// Binary erosion. Cells beyond a non-wrapping edge do not erode.
pub fn erode(mask: ArrayView2<bool>, element: &StructuringElement, wrap: EdgeWrap) -> Array2<bool> {
    let mut result = Array2::from_elem(mask.dim(), true);
    for_each_shift(mask, element, wrap, &mut result, |dst, src| {
        Zip::from(dst).and(src).for_each(|d, &v| *d &= v);
    });
    result
}

/// Dilation followed by erosion.
pub fn closing(mask: ArrayView2<bool>, element: &StructuringElement, wrap: EdgeWrap) -> Array2<bool> {
    let dilated = dilate(mask, element, wrap);
    erode(dilated.view(), element, wrap)
}

/// Erosion followed by dilation.
pub fn opening(mask: ArrayView2<bool>, element: &StructuringElement, wrap: EdgeWrap) -> Array2<bool> {
    let eroded = erode(mask, element, wrap);
    dilate(eroded.view(), element, wrap)
}

/// Visit every overlapping (destination, source) block pair for each offset,
/// where `source[i, j] = mask[i + dy, j + dx]`.
fn for_each_shift<F>(
    mask: ArrayView2<bool>,
    element: &StructuringElement,
    wrap: EdgeWrap,
    result: &mut Array2<bool>,
    mut combine: F,
) where
    F: FnMut(ArrayViewMut2<bool>, ArrayView2<bool>),
{
    let (rows, cols) = mask.dim();
    if rows == 0 || cols == 0 {
        return;
    }

    for &(dy, dx) in element.offsets() {
        let row_segments = shift_segments(dy, rows, wrap.poles);
        let col_segments = shift_segments(dx, cols, wrap.longitude);

        for &(dst_r, src_r, h) in &row_segments {
            for &(dst_c, src_c, w) in &col_segments {
                combine(
                    result.slice_mut(s![dst_r..dst_r + h, dst_c..dst_c + w]),
                    mask.slice(s![src_r..src_r + h, src_c..src_c + w]),
                );
            }
        }
    }
}

/// Contiguous `(dst_start, src_start, len)` runs along one axis such that
/// `src = dst + offset`, wrapping cyclically when `wrap` is set.
fn shift_segments(offset: isize, size: usize, wrap: bool) -> Vec<(usize, usize, usize)> {
    if wrap {
        let shift = offset.rem_euclid(size as isize) as usize;
        if shift == 0 {
            return vec![(0, 0, size)];
        }
        return vec![(0, shift, size - shift), (size - shift, 0, shift)];
    }

    let magnitude = offset.unsigned_abs();
    if magnitude >= size {
        return Vec::new();
    }
    if offset >= 0 {
        vec![(0, magnitude, size - magnitude)]
    } else {
        vec![(magnitude, 0, size - magnitude)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn block(rows: usize, cols: usize, r0: usize, r1: usize, c0: usize, c1: usize) -> Array2<bool> {
        Array2::from_shape_fn((rows, cols), |(i, j)| i >= r0 && i < r1 && j >= c0 && j < c1)
    }

    #[test]
    fn test_disk_shapes() {
        assert_eq!(StructuringElement::disk(0).offsets(), &[(0, 0)]);
        assert_eq!(
            StructuringElement::disk(1).footprint(),
            array![[false, true, false], [true, true, true], [false, true, false]]
        );
        // r = 2: 5x5 square minus the four corners and their neighbours at distance sqrt(5)
        assert_eq!(StructuringElement::disk(2).offsets().len(), 13);
    }

    #[test]
    fn test_shift_segments() {
        assert_eq!(shift_segments(0, 5, false), vec![(0, 0, 5)]);
        assert_eq!(shift_segments(2, 5, false), vec![(0, 2, 3)]);
        assert_eq!(shift_segments(-2, 5, false), vec![(2, 0, 3)]);
        assert!(shift_segments(5, 5, false).is_empty());
        assert_eq!(shift_segments(-1, 5, true), vec![(0, 4, 1), (1, 0, 4)]);
        assert_eq!(shift_segments(7, 5, true), vec![(0, 2, 3), (3, 0, 2)]);
    }

    #[test]
    fn test_dilate_wraps_longitude() {
        let mut mask = Array2::from_elem((3, 6), false);
        mask[[1, 0]] = true;
        let dilated = dilate(mask.view(), &StructuringElement::disk(1), EdgeWrap::default());
        assert!(dilated[[1, 5]]);
        assert!(dilated[[1, 1]]);
        assert!(dilated[[0, 0]]);
        assert!(dilated[[2, 0]]);
        assert!(!dilated[[0, 5]]);
    }

    #[test]
    fn test_dilate_does_not_wrap_poles_by_default() {
        let mut mask = Array2::from_elem((4, 4), false);
        mask[[0, 1]] = true;
        assert!(!dilate(mask.view(), &StructuringElement::disk(1), EdgeWrap::default())[[3, 1]]);
        let polar = EdgeWrap {
            poles: true,
            ..EdgeWrap::default()
        };
        assert!(dilate(mask.view(), &StructuringElement::disk(1), polar)[[3, 1]]);
    }

    #[test]
    fn test_erode_keeps_polar_edge() {
        // A band touching the top row survives erosion without pole wrapping.
        let mask = block(6, 8, 0, 3, 0, 8);
        let eroded = erode(mask.view(), &StructuringElement::disk(1), EdgeWrap::default());
        assert!(eroded.row(0).iter().all(|&v| v));
        assert!(eroded.row(1).iter().all(|&v| v));
        assert!(eroded.row(2).iter().all(|&v| !v));
    }

    #[test]
    fn test_closing_fills_gap() {
        let mut mask = block(7, 12, 2, 5, 2, 10);
        mask[[3, 6]] = false;
        let closed = closing(mask.view(), &StructuringElement::disk(1), EdgeWrap::default());
        assert!(closed[[3, 6]]);
    }

    #[test]
    fn test_opening_removes_speckle() {
        let mut mask = block(10, 12, 2, 8, 2, 8);
        mask[[0, 11]] = true;
        let opened = opening(mask.view(), &StructuringElement::disk(1), EdgeWrap::default());

        // The cross-shaped element cannot reach the square's corners.
        let mut expected = block(10, 12, 2, 8, 2, 8);
        for (i, j) in [(2, 2), (2, 7), (7, 2), (7, 7)] {
            expected[[i, j]] = false;
        }
        assert!(!opened[[0, 11]]);
        assert_eq!(opened, expected);
    }

    #[test]
    fn test_radius_zero_is_identity() {
        let mask = array![[true, false, true], [false, true, false]];
        let filter = MorphologicalFilter::new(0, false);
        assert_eq!(filter.apply(mask.view()), mask);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut mask = block(20, 30, 4, 12, 3, 15);
        mask[[6, 20]] = true;
        mask[[15, 25]] = true;
        mask[[16, 25]] = true;
        mask[[8, 8]] = false;
        for j in 26..30 {
            mask[[10, j]] = true;
        }
        mask[[10, 0]] = true;

        let filter = MorphologicalFilter::new(2, false);
        let once = filter.apply(mask.view());
        let twice = filter.apply(once.view());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_regional_grid_edges_stay_apart() {
        // Full-height strips near the west and east edges, two cells apart
        // across the seam.
        let mask = Array2::from_shape_fn((6, 12), |(_, j)| j < 3 || (7..10).contains(&j));

        let regional = MorphologicalFilter::new(1, false).with_wrap_longitude(false);
        assert!(!regional.wrap().longitude);
        let cleaned = regional.apply(mask.view());
        assert_eq!(cleaned, mask);

        // On a cyclic grid closing fills the gap across the seam.
        let global = MorphologicalFilter::new(1, false).apply(mask.view());
        assert!(global.column(10).iter().all(|&v| v));
        assert!(global.column(11).iter().all(|&v| v));
    }

    #[test]
    fn test_erode_keeps_regional_edge() {
        let mask = block(5, 6, 0, 5, 0, 2);
        let eroded = erode(mask.view(), &StructuringElement::disk(1), EdgeWrap::none());
        assert!(eroded.column(0).iter().all(|&v| v));
        let wrapped = erode(mask.view(), &StructuringElement::disk(1), EdgeWrap::default());
        assert!(wrapped.column(0).iter().all(|&v| !v));
    }
}
