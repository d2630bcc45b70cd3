//! Connected-component labeling on boolean grids and volumes.
//!
//! Both the 2-D and 3-D labelers share one raster-scan, union-find pass over
//! a `(time, lat, lon)` volume; a 2-D grid is a volume with one timestep.
//!
//! # Algorithm
//! 1. **First pass**: scan in `(t, y, x)` order, give each true cell the label
//!    of an already-visited neighbour (or a fresh one) and record equivalences.
//! 2. **Resolve**: the smallest provisional label of each set is its root.
//! 3. **Second pass**: replace provisional labels with dense ids.
//!
//! Roots are the first-seen cell of each component, so final ids follow
//! first-seen order along time, then latitude, then longitude.

use std::fmt;

use mhw_common::{MhwError, MhwResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::union_find::DisjointSet;

/// Neighbourhood for 2-D labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity2d {
    /// 4-neighbour: cells sharing an edge.
    Face,
    /// 8-neighbour: edges and corners.
    #[default]
    Full,
}

impl Connectivity2d {
    /// Maximum number of orthogonal steps between neighbours.
    pub fn rank(self) -> u8 {
        match self {
            Self::Face => 1,
            Self::Full => 2,
        }
    }
}

impl TryFrom<u8> for Connectivity2d {
    type Error = String;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        match rank {
            1 => Ok(Self::Face),
            2 => Ok(Self::Full),
            other => Err(format!("2-D connectivity must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Connectivity2d> for u8 {
    fn from(c: Connectivity2d) -> u8 {
        c.rank()
    }
}

impl fmt::Display for Connectivity2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank())
    }
}

/// Neighbourhood for 3-D `(time, lat, lon)` labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity3d {
    /// 6-neighbour: cells sharing a face.
    Face,
    /// 18-neighbour: faces and edges.
    Edge,
    /// 26-neighbour: faces, edges and corners.
    #[default]
    Full,
}

impl Connectivity3d {
    /// Maximum number of orthogonal steps between neighbours.
    pub fn rank(self) -> u8 {
        match self {
            Self::Face => 1,
            Self::Edge => 2,
            Self::Full => 3,
        }
    }
}

impl TryFrom<u8> for Connectivity3d {
    type Error = String;

    fn try_from(rank: u8) -> Result<Self, Self::Error> {
        match rank {
            1 => Ok(Self::Face),
            2 => Ok(Self::Edge),
            3 => Ok(Self::Full),
            other => Err(format!("3-D connectivity must be 1, 2 or 3, got {}", other)),
        }
    }
}

impl From<Connectivity3d> for u8 {
    fn from(c: Connectivity3d) -> u8 {
        c.rank()
    }
}

impl fmt::Display for Connectivity3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rank())
    }
}

/// A 2-D label map: 0 is background, 1..=num_labels are regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    pub labels: Array2<u32>,
    pub num_labels: u32,
}

impl LabelMap {
    /// An all-background map.
    pub fn empty(shape: (usize, usize)) -> Self {
        Self {
            labels: Array2::zeros(shape),
            num_labels: 0,
        }
    }

    /// True where any region is present.
    pub fn has_label(&self) -> Array2<bool> {
        self.labels.mapv(|l| l != 0)
    }

    /// Largest label present, 0 for an all-background map.
    pub fn max_label(&self) -> u32 {
        self.labels.iter().copied().max().unwrap_or(0)
    }

    /// Check that every label lies within `0..=num_labels`.
    pub fn validate(&self) -> MhwResult<()> {
        let max = self.max_label();
        if max > self.num_labels {
            return Err(MhwError::invalid_input(format!(
                "label map contains label {} but declares {} labels",
                max, self.num_labels
            )));
        }
        Ok(())
    }

    /// Cell count per label, indexed by label (index 0 is background). Covers
    /// every label present even if it exceeds `num_labels`.
    pub fn pixel_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.num_labels.max(self.max_label()) as usize + 1];
        for &label in self.labels.iter() {
            counts[label as usize] += 1;
        }
        counts
    }
}

/// Offsets `[dt, dy, dx]` of neighbours visited before the current cell in
/// raster order, limited to `rank` non-zero components.
pub(crate) fn backward_offsets(rank: u8, spatial_only: bool) -> Vec<[isize; 3]> {
    let mut offsets = Vec::new();
    let dts: &[isize] = if spatial_only { &[0] } else { &[-1, 0] };
    for &dt in dts {
        for dy in -1isize..=1 {
            for dx in -1isize..=1 {
                let before = dt < 0 || dy < 0 || (dy == 0 && dx < 0);
                let hops = [dt, dy, dx].iter().filter(|&&d| d != 0).count();
                if before && hops as u8 <= rank {
                    offsets.push([dt, dy, dx]);
                }
            }
        }
    }
    offsets
}

/// Label a volume given the backward neighbour offsets.
pub(crate) fn label_volume(mask: ArrayView3<bool>, offsets: &[[isize; 3]]) -> (Array3<u32>, u32) {
    let (nt, ny, nx) = mask.dim();
    let mut labels = Array3::<u32>::zeros((nt, ny, nx));
    let mut sets = DisjointSet::new();

    for t in 0..nt {
        for y in 0..ny {
            for x in 0..nx {
                if !mask[[t, y, x]] {
                    continue;
                }

                let mut assigned = 0u32;
                for offset in offsets {
                    let (Some(tn), Some(yn), Some(xn)) = (
                        step(t, offset[0], nt),
                        step(y, offset[1], ny),
                        step(x, offset[2], nx),
                    ) else {
                        continue;
                    };

                    let neighbor = labels[[tn, yn, xn]];
                    if neighbor == 0 {
                        continue;
                    }
                    assigned = if assigned == 0 {
                        neighbor
                    } else {
                        sets.union(assigned, neighbor)
                    };
                }

                labels[[t, y, x]] = if assigned == 0 {
                    sets.make_set()
                } else {
                    assigned
                };
            }
        }
    }

    let provisional = sets.len();
    let (mapping, count) = sets.dense_relabel();
    labels.mapv_inplace(|l| mapping[l as usize]);
    tracing::trace!(provisional, components = count, "Resolved label equivalences");

    (labels, count)
}

#[inline]
fn step(index: usize, delta: isize, size: usize) -> Option<usize> {
    let moved = index as isize + delta;
    (moved >= 0 && (moved as usize) < size).then_some(moved as usize)
}

/// Label 2-D connected components without any wrap-around.
pub fn label_2d(mask: ArrayView2<bool>, connectivity: Connectivity2d) -> LabelMap {
    let offsets = backward_offsets(connectivity.rank(), true);
    let (labels, num_labels) = label_volume(mask.insert_axis(Axis(0)), &offsets);
    LabelMap {
        labels: labels.index_axis_move(Axis(0), 0),
        num_labels,
    }
}

/// Label 3-D connected components of a `(time, lat, lon)` volume.
pub fn label_3d(mask: ArrayView3<bool>, connectivity: Connectivity3d) -> (Array3<u32>, u32) {
    let offsets = backward_offsets(connectivity.rank(), false);
    label_volume(mask, &offsets)
}
