//! End-to-end detection and tracking over a dataset field.
//!
//! ```text
//! field ─► MaskBuilder ─► MorphologicalFilter ─► MeridianAwareLabeler
//!                          (per timestep)           (per timestep)
//!                                                        │
//!                       RegionAreaFilter (pooled) ◄──────┘
//!                                │
//!                                ▼
//!                    SpatioTemporalTracker ─► TrackResult
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mhw_common::{Dataset, GridCoords, MhwError, MhwResult, TimeAxis};
use ndarray::{Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::area::{AreaFilterSummary, Region, RegionAreaFilter};
use crate::config::TrackerConfig;
use crate::labeling::LabelMap;
use crate::mask::MaskBuilder;
use crate::meridian::MeridianAwareLabeler;
use crate::morphology::MorphologicalFilter;
use crate::tracking::SpatioTemporalTracker;

/// Output of the 2-D stages: per-timestep masks of the regions that survived
/// the area filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSeries {
    pub time: TimeAxis,
    pub coords: GridCoords,
    /// `[time, lat, lon]`, true on cells of kept regions.
    pub mask: Array3<bool>,
    /// Every measured region, kept or not.
    pub regions: Vec<Region>,
    pub summary: AreaFilterSummary,
}

impl LabeledSeries {
    /// Kept regions only.
    pub fn kept_regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(|r| r.kept)
    }
}

/// Scalar attributes of a tracking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    /// Number of distinct tracked features.
    pub total_features: u32,
    /// Minimum region area used upstream, km².
    pub minimum_area: f64,
    /// Fraction of region area retained upstream.
    pub percent_area_kept: f64,
    pub regions_initial: usize,
    pub regions_kept: usize,
    pub timesteps: usize,
    pub radius: usize,
    pub min_size_percentile: f64,
    pub connectivity_3d: u8,
    /// Whether 2-D regions were merged across the longitude seam.
    pub wrap_longitude: bool,
    /// Whether tracks were merged across the longitude seam. When false a
    /// feature straddling the seam carries one id on each side.
    pub track_across_meridian: bool,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Lifetime of one tracked feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLifetime {
    pub id: u32,
    pub first_timestep: usize,
    pub last_timestep: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Total cells over the whole lifetime.
    pub cells: usize,
}

impl FeatureLifetime {
    /// Number of timesteps spanned, inclusive.
    pub fn duration_steps(&self) -> usize {
        self.last_timestep - self.first_timestep + 1
    }
}

/// Labeled `[time, lat, lon]` volume with its coordinates and attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResult {
    pub time: TimeAxis,
    pub coords: GridCoords,
    /// 0 is background.
    pub labels: Array3<u32>,
    pub summary: TrackSummary,
}

impl TrackResult {
    /// Cell count per feature id (index 0 is background).
    pub fn feature_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.summary.total_features as usize + 1];
        for &id in self.labels.iter() {
            sizes[id as usize] += 1;
        }
        sizes
    }

    /// First and last timestep of every feature, ordered by id.
    pub fn feature_lifetimes(&self) -> Vec<FeatureLifetime> {
        let mut spans: BTreeMap<u32, (usize, usize, usize)> = BTreeMap::new();
        for (t, step) in self.labels.axis_iter(Axis(0)).enumerate() {
            for &id in step.iter().filter(|&&id| id != 0) {
                let span = spans.entry(id).or_insert((t, t, 0));
                span.1 = t;
                span.2 += 1;
            }
        }

        let times = self.time.as_slice();
        spans
            .into_iter()
            .map(|(id, (first, last, cells))| FeatureLifetime {
                id,
                first_timestep: first,
                last_timestep: last,
                start: times[first],
                end: times[last],
                cells,
            })
            .collect()
    }
}

/// Runs the detection and tracking stages with one configuration.
#[derive(Debug, Clone)]
pub struct Tracker {
    config: TrackerConfig,
    domain: Option<Array2<bool>>,
    cell_areas: Option<Array2<f64>>,
}

impl Tracker {
    /// Create a tracker, validating the configuration.
    pub fn new(config: TrackerConfig) -> MhwResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            domain: None,
            cell_areas: None,
        })
    }

    /// Restrict features to a domain (e.g. ocean cells). The domain is applied
    /// to the raw mask and again after morphological filtering.
    pub fn with_domain(mut self, domain: Array2<bool>) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Use explicit cell areas (km²) instead of spherical cell geometry.
    pub fn with_cell_areas(mut self, cell_areas: Array2<f64>) -> Self {
        self.cell_areas = Some(cell_areas);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Mask, clean, label and size-filter every timestep of `field`.
    pub fn label_2d(&self, dataset: &Dataset, field: &str) -> MhwResult<LabeledSeries> {
        dataset.validate()?;
        let coords = &dataset.coords;
        if self.config.wrap_longitude && !coords.is_lon_cyclic() {
            return Err(MhwError::invalid_input(
                "longitude wrapping requested but the longitude axis is not cyclic",
            ));
        }

        let mut builder = MaskBuilder::new(self.config.criterion);
        if let Some(domain) = &self.domain {
            builder = builder.with_domain(domain.clone());
        }
        let raw = builder.build(dataset, field)?;

        let filter = MorphologicalFilter::new(self.config.radius, self.config.wrap_poles)
            .with_wrap_longitude(self.config.wrap_longitude);
        let mut labeler = MeridianAwareLabeler::new(self.config.connectivity_2d);
        if !self.config.wrap_longitude {
            labeler = labeler.without_wrap();
        }

        let label_maps: Vec<LabelMap> = raw
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(t, step)| {
                let mut cleaned = filter.apply(step);
                if let Some(domain) = &self.domain {
                    Zip::from(&mut cleaned).and(domain).for_each(|m, &d| *m &= d);
                }
                let map = labeler.label(cleaned.view());
                debug!(timestep = t, regions = map.num_labels, "Labeled timestep");
                map
            })
            .collect();

        let cell_areas = match &self.cell_areas {
            Some(areas) => areas.clone(),
            None => coords.cell_areas(),
        };
        let area_filter = RegionAreaFilter::new(self.config.min_size_percentile)?;
        let filtered = area_filter.filter_series(&label_maps, cell_areas.view(), coords)?;

        info!(
            field,
            timesteps = dataset.time.len(),
            regions = filtered.summary.regions_initial,
            kept = filtered.summary.regions_kept,
            minimum_area = filtered.summary.minimum_area,
            "Labeled 2-D features"
        );

        Ok(LabeledSeries {
            time: dataset.time.clone(),
            coords: coords.clone(),
            mask: filtered.kept,
            regions: filtered.regions,
            summary: filtered.summary,
        })
    }

    /// Link the kept regions of every timestep into persistent tracks.
    pub fn track_3d(&self, series: &LabeledSeries) -> MhwResult<TrackResult> {
        let (nlat, nlon) = series.coords.shape();
        let expected = [series.time.len(), nlat, nlon];
        if series.mask.shape() != expected.as_slice() {
            return Err(MhwError::shape_mismatch(
                "labeled series",
                &expected,
                series.mask.shape(),
            ));
        }
        if series.time.is_empty() {
            return Err(MhwError::degenerate_input("no timesteps to track"));
        }

        let tracker = SpatioTemporalTracker::new(self.config.connectivity_3d)
            .with_wrap_longitude(self.config.track_across_meridian);
        let volume = tracker.track(series.mask.view());

        let summary = TrackSummary {
            total_features: volume.num_features,
            minimum_area: series.summary.minimum_area,
            percent_area_kept: series.summary.percent_area_kept,
            regions_initial: series.summary.regions_initial,
            regions_kept: series.summary.regions_kept,
            timesteps: series.time.len(),
            radius: self.config.radius,
            min_size_percentile: self.config.min_size_percentile,
            connectivity_3d: self.config.connectivity_3d.rank(),
            wrap_longitude: self.config.wrap_longitude,
            track_across_meridian: self.config.track_across_meridian,
            start: series.time.first(),
            end: series.time.last(),
        };

        Ok(TrackResult {
            time: series.time.clone(),
            coords: series.coords.clone(),
            labels: volume.labels,
            summary,
        })
    }

    /// Both stages.
    pub fn run(&self, dataset: &Dataset, field: &str) -> MhwResult<TrackResult> {
        let series = self.label_2d(dataset, field)?;
        self.track_3d(&series)
    }
}
