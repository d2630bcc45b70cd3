//! Configuration for the detection and tracking pipeline.

use std::path::Path;

use mhw_common::{MhwError, MhwResult};
use serde::{Deserialize, Serialize};

use crate::labeling::{Connectivity2d, Connectivity3d};
use crate::mask::MaskCriterion;

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Radius of the disk structuring element, in grid cells.
    pub radius: usize,

    /// Percentile (0-1) of the region-area distribution used as minimum size.
    pub min_size_percentile: f64,

    /// Let morphological operations wrap across the polar rows.
    pub wrap_poles: bool,

    /// Merge 2-D regions across the longitude seam. Requires a cyclic grid.
    pub wrap_longitude: bool,

    /// Neighbourhood for 2-D labeling (1 = edges, 2 = edges and corners).
    pub connectivity_2d: Connectivity2d,

    /// Neighbourhood for 3-D tracking (1 = faces, 2 = +edges, 3 = +corners).
    pub connectivity_3d: Connectivity3d,

    /// Also merge tracks across the longitude seam during 3-D labeling.
    pub track_across_meridian: bool,

    /// Rule turning field values into feature cells.
    pub criterion: MaskCriterion,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            radius: 8,
            min_size_percentile: 0.75,
            wrap_poles: false,
            wrap_longitude: true,
            connectivity_2d: Connectivity2d::Full,
            connectivity_3d: Connectivity3d::Full,
            track_across_meridian: false,
            criterion: MaskCriterion::Positive,
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables over the defaults.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MHW_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.radius = radius;
            }
        }

        if let Ok(val) = std::env::var("MHW_MIN_SIZE_PERCENTILE") {
            if let Ok(percentile) = val.parse() {
                config.min_size_percentile = percentile;
            }
        }

        if let Ok(val) = std::env::var("MHW_WRAP_POLES") {
            config.wrap_poles = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("MHW_WRAP_LONGITUDE") {
            config.wrap_longitude = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("MHW_CONNECTIVITY_2D") {
            if let Some(c) = val.parse::<u8>().ok().and_then(|r| r.try_into().ok()) {
                config.connectivity_2d = c;
            }
        }

        if let Ok(val) = std::env::var("MHW_CONNECTIVITY_3D") {
            if let Some(c) = val.parse::<u8>().ok().and_then(|r| r.try_into().ok()) {
                config.connectivity_3d = c;
            }
        }

        if let Ok(val) = std::env::var("MHW_TRACK_ACROSS_MERIDIAN") {
            config.track_across_meridian = parse_flag(&val);
        }

        config
    }

    /// Parse a YAML document; missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> MhwResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> MhwResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MhwError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> MhwResult<()> {
        if !self.min_size_percentile.is_finite()
            || !(0.0..=1.0).contains(&self.min_size_percentile)
        {
            return Err(MhwError::config(format!(
                "min_size_percentile must be within [0, 1], got {}",
                self.min_size_percentile
            )));
        }

        if let MaskCriterion::Above(t) | MaskCriterion::Below(t) = self.criterion {
            if !t.is_finite() {
                return Err(MhwError::config("criterion threshold must be finite"));
            }
        }

        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.radius, 8);
        assert_eq!(config.min_size_percentile, 0.75);
        assert!(!config.wrap_poles);
        assert!(config.wrap_longitude);
        assert_eq!(config.connectivity_2d, Connectivity2d::Full);
        assert_eq!(config.connectivity_3d, Connectivity3d::Full);
        assert!(!config.track_across_meridian);
        assert_eq!(config.criterion, MaskCriterion::Positive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = TrackerConfig::default();
        config.min_size_percentile = 1.5;
        assert!(matches!(config.validate(), Err(MhwError::Config(_))));

        config = TrackerConfig::default();
        config.min_size_percentile = f64::NAN;
        assert!(config.validate().is_err());

        config = TrackerConfig::default();
        config.criterion = MaskCriterion::Above(f32::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = TrackerConfig::from_yaml_str(
            "radius: 3\nconnectivity_3d: 1\ncriterion:\n  kind: above\n  threshold: 0.5\n",
        )
        .unwrap();
        assert_eq!(config.radius, 3);
        assert_eq!(config.connectivity_3d, Connectivity3d::Face);
        assert_eq!(config.criterion, MaskCriterion::Above(0.5));
        assert_eq!(config.min_size_percentile, 0.75);
    }

    #[test]
    fn test_yaml_rejects_bad_connectivity() {
        let err = TrackerConfig::from_yaml_str("connectivity_2d: 3\n").unwrap_err();
        assert!(matches!(err, MhwError::Config(_)));
    }

    #[test]
    fn test_yaml_rejects_bad_percentile() {
        assert!(TrackerConfig::from_yaml_str("min_size_percentile: 2.0\n").is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "radius: 2\nwrap_poles: true").unwrap();
        let config = TrackerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.radius, 2);
        assert!(config.wrap_poles);
    }

    #[test]
    fn test_missing_yaml_file() {
        let err = TrackerConfig::from_yaml_file("/nonexistent/tracker.yaml").unwrap_err();
        assert!(matches!(err, MhwError::Config(_)));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("MHW_RADIUS", "5");
        std::env::set_var("MHW_CONNECTIVITY_3D", "2");
        std::env::set_var("MHW_WRAP_POLES", "TRUE");
        std::env::set_var("MHW_MIN_SIZE_PERCENTILE", "not a number");
        let config = TrackerConfig::from_env();
        std::env::remove_var("MHW_RADIUS");
        std::env::remove_var("MHW_CONNECTIVITY_3D");
        std::env::remove_var("MHW_WRAP_POLES");
        std::env::remove_var("MHW_MIN_SIZE_PERCENTILE");

        assert_eq!(config.radius, 5);
        assert_eq!(config.connectivity_3d, Connectivity3d::Edge);
        assert!(config.wrap_poles);
        assert_eq!(config.min_size_percentile, 0.75);
    }
}
