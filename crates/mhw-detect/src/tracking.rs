//! Persistent feature ids from 3-D connected components.

use mhw_common::{MhwError, MhwResult};
use ndarray::{stack, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::labeling::{backward_offsets, label_volume, Connectivity3d};
use crate::meridian::merge_across_meridian;

/// Labeled `[time, lat, lon]` volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackVolume {
    /// 0 is background; one id per connected spatio-temporal feature.
    pub labels: Array3<u32>,
    /// Number of distinct non-zero ids.
    pub num_features: u32,
}

/// Labels a time-stacked mask so that a feature touching itself across
/// consecutive timesteps keeps one id.
///
/// Time is never cyclic. Longitude is only joined across the seam when
/// `wrap_longitude` is set; otherwise regions that straddle the date line must
/// already have been reconciled per timestep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatioTemporalTracker {
    connectivity: Connectivity3d,
    wrap_longitude: bool,
}

impl SpatioTemporalTracker {
    pub fn new(connectivity: Connectivity3d) -> Self {
        Self {
            connectivity,
            wrap_longitude: false,
        }
    }

    /// Also merge features that touch across the longitude seam.
    pub fn with_wrap_longitude(mut self, wrap: bool) -> Self {
        self.wrap_longitude = wrap;
        self
    }

    pub fn connectivity(&self) -> Connectivity3d {
        self.connectivity
    }

    /// Label a `[time, lat, lon]` mask. Ids follow first-seen scan order.
    pub fn track(&self, masks: ArrayView3<bool>) -> TrackVolume {
        let offsets = backward_offsets(self.connectivity.rank(), false);
        let (mut labels, mut num_features) = label_volume(masks, &offsets);
        debug!(
            timesteps = masks.len_of(Axis(0)),
            components = num_features,
            connectivity = %self.connectivity,
            "Labeled spatio-temporal components"
        );

        if self.wrap_longitude {
            num_features = merge_across_meridian(masks, &mut labels, num_features, &offsets);
        }

        info!(features = num_features, "Tracked features");
        TrackVolume {
            labels,
            num_features,
        }
    }

    /// Stack an ordered sequence of per-timestep masks and label it.
    pub fn track_sequence(&self, masks: &[ArrayView2<bool>]) -> MhwResult<TrackVolume> {
        if masks.is_empty() {
            return Err(MhwError::degenerate_input("no timesteps to track"));
        }
        let volume = stack(Axis(0), masks).map_err(|e| {
            MhwError::invalid_input(format!("per-timestep masks differ in shape: {}", e))
        })?;
        Ok(self.track(volume.view()))
    }
}
