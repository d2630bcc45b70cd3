//! Labeling that joins regions split by the longitude seam.
//!
//! A first pass labels the mask with native adjacency. A second pass labels a
//! wrapped view in which the last longitude column is placed in front of the
//! first one, so cells on either side of the seam become neighbours. First-pass
//! labels that land in the same wrapped component are merged, the lowest
//! first-pass id surviving, and the result is renumbered densely from 1.

use ndarray::{Array3, ArrayView2, ArrayView3, Axis};
use tracing::debug;

use crate::labeling::{backward_offsets, label_volume, Connectivity2d, LabelMap};
use crate::union_find::DisjointSet;

/// 2-D labeler that treats longitude as cyclic.
#[derive(Debug, Clone, Copy)]
pub struct MeridianAwareLabeler {
    connectivity: Connectivity2d,
    wrap: bool,
}

impl Default for MeridianAwareLabeler {
    fn default() -> Self {
        Self::new(Connectivity2d::default())
    }
}

impl MeridianAwareLabeler {
    /// A labeler that merges across the seam.
    pub fn new(connectivity: Connectivity2d) -> Self {
        Self {
            connectivity,
            wrap: true,
        }
    }

    /// Disable the seam merge, leaving plain 2-D labeling.
    pub fn without_wrap(mut self) -> Self {
        self.wrap = false;
        self
    }

    pub fn connectivity(&self) -> Connectivity2d {
        self.connectivity
    }

    /// Label `mask`. Total over any boolean grid.
    pub fn label(&self, mask: ArrayView2<bool>) -> LabelMap {
        let volume = mask.insert_axis(Axis(0));
        let offsets = backward_offsets(self.connectivity.rank(), true);
        let (mut labels, mut num_labels) = label_volume(volume, &offsets);

        if self.wrap {
            num_labels = merge_across_meridian(volume, &mut labels, num_labels, &offsets);
        }

        LabelMap {
            labels: labels.index_axis_move(Axis(0), 0),
            num_labels,
        }
    }
}

/// Merge first-pass labels of a `(time, lat, lon)` volume that touch across
/// the longitude seam. Returns the new label count; `labels` is rewritten with
/// dense ids.
pub(crate) fn merge_across_meridian(
    mask: ArrayView3<bool>,
    labels: &mut Array3<u32>,
    num_labels: u32,
    offsets: &[[isize; 3]],
) -> u32 {
    let nlon = mask.len_of(Axis(2));
    if num_labels < 2 || nlon == 0 {
        return num_labels;
    }

    // Wrapped view: column 0 is a copy of the last column.
    let (nt, nlat, _) = mask.dim();
    let seam_column = |x: usize| (x + nlon - 1) % nlon;
    let wrapped_mask =
        Array3::from_shape_fn((nt, nlat, nlon + 1), |(t, y, x)| mask[[t, y, seam_column(x)]]);
    let wrapped_first =
        Array3::from_shape_fn((nt, nlat, nlon + 1), |(t, y, x)| labels[[t, y, seam_column(x)]]);
    let (wrapped, num_wrapped) = label_volume(wrapped_mask.view(), offsets);

    // Every first-pass label seen under a wrapped label joins that label's set.
    let mut representative = vec![0u32; num_wrapped as usize + 1];
    let mut sets = DisjointSet::with_labels(num_labels);
    for (&w, &first) in wrapped.iter().zip(wrapped_first.iter()) {
        if w == 0 {
            continue;
        }
        let slot = &mut representative[w as usize];
        if *slot == 0 {
            *slot = first;
        } else if *slot != first {
            *slot = sets.union(*slot, first);
        }
    }

    let (mapping, merged) = sets.dense_relabel();
    if merged != num_labels {
        debug!(
            before = num_labels,
            after = merged,
            "Merged regions across the longitude seam"
        );
        labels.mapv_inplace(|l| mapping[l as usize]);
    }
    merged
}
