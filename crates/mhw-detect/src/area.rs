//! Region areas and the percentile-based minimum-size filter.

use mhw_common::{BoundingBox, GridCoords, MhwError, MhwResult};
use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::labeling::LabelMap;

/// One labeled region of one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Label id within its timestep.
    pub label: u32,
    /// Index of the timestep the region belongs to.
    pub timestep: usize,
    /// Number of member cells.
    pub pixel_count: usize,
    /// Physical area in km².
    pub area: f64,
    /// Extent of member cell centres.
    pub bbox: BoundingBox,
    /// Whether the region survived the area filter.
    pub kept: bool,
}

/// Scalar outcome of the area filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaFilterSummary {
    /// Smallest area retained, km².
    pub minimum_area: f64,
    /// Fraction (0–1) of total region area that was kept.
    pub percent_area_kept: f64,
    /// Sum of all region areas, km².
    pub total_area: f64,
    /// Sum of kept region areas, km².
    pub kept_area: f64,
    /// Number of regions before filtering.
    pub regions_initial: usize,
    /// Number of regions kept.
    pub regions_kept: usize,
}

impl AreaFilterSummary {
    /// Sum of discarded region areas, km².
    pub fn discarded_area(&self) -> f64 {
        self.total_area - self.kept_area
    }
}

/// Kept-cell mask of one label map plus its regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaFilterResult {
    pub kept: Array2<bool>,
    pub regions: Vec<Region>,
    pub summary: AreaFilterSummary,
}

/// Kept-cell masks of a label-map series plus the pooled regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesAreaFilterResult {
    /// `[time, lat, lon]`.
    pub kept: Array3<bool>,
    pub regions: Vec<Region>,
    pub summary: AreaFilterSummary,
}

/// Discards regions smaller than a percentile of the region-area distribution.
#[derive(Debug, Clone, Copy)]
pub struct RegionAreaFilter {
    percentile: f64,
}

impl RegionAreaFilter {
    /// `percentile` is a fraction in `[0, 1]`.
    pub fn new(percentile: f64) -> MhwResult<Self> {
        if !percentile.is_finite() || !(0.0..=1.0).contains(&percentile) {
            return Err(MhwError::invalid_input(format!(
                "percentile must be within [0, 1], got {}",
                percentile
            )));
        }
        Ok(Self { percentile })
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Minimum retained area for a set of regions. A single region sets the
    /// threshold to its own area; no regions give 0.
    pub fn minimum_area(&self, regions: &[Region]) -> f64 {
        let areas: Vec<f64> = regions.iter().map(|r| r.area).collect();
        match areas.len() {
            0 => 0.0,
            1 => areas[0],
            _ => percentile(&areas, self.percentile),
        }
    }

    /// Filter one label map.
    pub fn filter(
        &self,
        label_map: &LabelMap,
        cell_areas: ArrayView2<f64>,
        coords: &GridCoords,
    ) -> MhwResult<AreaFilterResult> {
        let result = self.filter_series(std::slice::from_ref(label_map), cell_areas, coords)?;
        Ok(AreaFilterResult {
            kept: result.kept.index_axis_move(Axis(0), 0),
            regions: result.regions,
            summary: result.summary,
        })
    }

    /// Filter a series of label maps with one threshold taken over the regions
    /// of every timestep.
    pub fn filter_series(
        &self,
        label_maps: &[LabelMap],
        cell_areas: ArrayView2<f64>,
        coords: &GridCoords,
    ) -> MhwResult<SeriesAreaFilterResult> {
        let (nlat, nlon) = coords.shape();
        if cell_areas.dim() != (nlat, nlon) {
            return Err(MhwError::shape_mismatch(
                "cell area grid",
                &[nlat, nlon],
                cell_areas.shape(),
            ));
        }

        let mut regions = Vec::new();
        for (timestep, map) in label_maps.iter().enumerate() {
            if map.labels.dim() != (nlat, nlon) {
                return Err(MhwError::shape_mismatch(
                    &format!("label map {}", timestep),
                    &[nlat, nlon],
                    map.labels.shape(),
                ));
            }
            map.validate()?;
            regions.extend(measure_regions(map, cell_areas, coords, timestep));
        }

        let minimum_area = self.minimum_area(&regions);
        let mut total_area = 0.0;
        let mut kept_area = 0.0;
        for region in &mut regions {
            region.kept = region.area >= minimum_area;
            total_area += region.area;
            if region.kept {
                kept_area += region.area;
            }
        }

        let discarded_area = total_area - kept_area;
        let percent_area_kept = if total_area > 0.0 {
            1.0 - discarded_area / total_area
        } else {
            1.0
        };
        let regions_kept = regions.iter().filter(|r| r.kept).count();

        let mut kept = Array3::from_elem((label_maps.len(), nlat, nlon), false);
        for (timestep, map) in label_maps.iter().enumerate() {
            let keep_label = keep_table(&regions, timestep, map);
            kept.index_axis_mut(Axis(0), timestep)
                .zip_mut_with(&map.labels, |k, &label| *k = keep_label[label as usize]);
        }

        if regions.is_empty() {
            debug!("No regions to filter");
        }
        info!(
            percentile = self.percentile,
            minimum_area,
            percent_area_kept,
            regions_initial = regions.len(),
            regions_kept,
            "Filtered regions by area"
        );

        Ok(SeriesAreaFilterResult {
            kept,
            summary: AreaFilterSummary {
                minimum_area,
                percent_area_kept,
                total_area,
                kept_area,
                regions_initial: regions.len(),
                regions_kept,
            },
            regions,
        })
    }
}

/// `keep[label]` for the labels of one timestep; background is never kept.
fn keep_table(regions: &[Region], timestep: usize, map: &LabelMap) -> Vec<bool> {
    let mut keep = vec![false; map.num_labels.max(map.max_label()) as usize + 1];
    for region in regions.iter().filter(|r| r.timestep == timestep) {
        keep[region.label as usize] = region.kept;
    }
    keep
}

/// Measure every region of one label map. Regions are returned in label order
/// and start out marked as kept.
pub fn measure_regions(
    label_map: &LabelMap,
    cell_areas: ArrayView2<f64>,
    coords: &GridCoords,
    timestep: usize,
) -> Vec<Region> {
    let n = label_map.num_labels.max(label_map.max_label()) as usize;
    let mut pixel_counts = vec![0usize; n + 1];
    let mut areas = vec![0.0f64; n + 1];
    let mut boxes: Vec<Option<BoundingBox>> = vec![None; n + 1];

    for ((row, col), &label) in label_map.labels.indexed_iter() {
        if label == 0 {
            continue;
        }
        let idx = label as usize;
        pixel_counts[idx] += 1;
        areas[idx] += cell_areas[[row, col]];

        if let Some((lon, lat)) = coords.cell_center(row, col) {
            boxes[idx]
                .get_or_insert(BoundingBox::from_point(lon, lat))
                .extend(lon, lat);
        }
    }

    (1..=n)
        .filter(|&idx| pixel_counts[idx] > 0)
        .map(|idx| Region {
            label: idx as u32,
            timestep,
            pixel_count: pixel_counts[idx],
            area: areas[idx],
            bbox: boxes[idx].unwrap_or_else(|| BoundingBox::from_point(f64::NAN, f64::NAN)),
            kept: true,
        })
        .collect()
}

/// `q`-quantile (q in `[0, 1]`) with linear interpolation between the closest
/// ranks. Returns NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let value = sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64);
    value.min(sorted[hi])
}
