//! Marine heatwave detection and tracking.
//!
//! Turns a gridded anomaly field into labeled, persistent features:
//!
//! - **Masking**: a criterion selects candidate cells per timestep
//! - **Morphology**: closing then opening with a disk element removes speckle
//!   and fills small holes
//! - **Labeling**: 2-D connected components, merged across the longitude seam
//! - **Area filter**: regions below a percentile of the pooled area
//!   distribution are dropped
//! - **Tracking**: 3-D connected components over `[time, lat, lon]`
//!
//! # Architecture
//!
//! ```text
//! Dataset field
//!      │
//!      ▼
//! MaskBuilder::build(criterion, domain)
//!      │
//!      ├─► per timestep: MorphologicalFilter::apply
//!      │                       │
//!      │                       └─► MeridianAwareLabeler::label
//!      │
//!      ├─► RegionAreaFilter::filter_series (pooled percentile)
//!      │
//!      └─► SpatioTemporalTracker::track
//!               │
//!               ▼
//!          TrackResult
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mhw_detect::{Tracker, TrackerConfig};
//!
//! let tracker = Tracker::new(TrackerConfig { radius: 3, ..Default::default() })?;
//! let result = tracker.run(&dataset, "ssta")?;
//! println!("{} features", result.summary.total_features);
//! ```

pub mod area;
pub mod config;
pub mod labeling;
pub mod mask;
pub mod meridian;
pub mod morphology;
pub mod pipeline;
pub mod tracking;
mod union_find;

// Re-export commonly used types at crate root
pub use area::{AreaFilterSummary, Region, RegionAreaFilter};
pub use config::TrackerConfig;
pub use labeling::{label_2d, label_3d, Connectivity2d, Connectivity3d, LabelMap};
pub use mask::{MaskBuilder, MaskCriterion};
pub use meridian::MeridianAwareLabeler;
pub use morphology::{EdgeWrap, MorphologicalFilter, StructuringElement};
pub use pipeline::{FeatureLifetime, LabeledSeries, TrackResult, TrackSummary, Tracker};
pub use tracking::{SpatioTemporalTracker, TrackVolume};
